// src/handlers/policies.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{RequireRole, TeamLeaderOrAdmin},
    models::crm::{CreatePolicyPayload, Policy, PolicyChanges},
};

// POST /api/policies
#[utoipa::path(
    post,
    path = "/api/policies",
    tag = "Apólices",
    request_body = CreatePolicyPayload,
    responses(
        (status = 201, description = "Apólice criada, já com o melhor client_id derivável", body = Policy),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_policy(
    State(app_state): State<AppState>,
    Json(payload): Json<CreatePolicyPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let policy = app_state.crm_service.create_policy(&payload).await?;

    // A associação roda ANTES da resposta: a apólice pode ter nascido só
    // com lead_id e o cliente já existir
    let policy = app_state
        .sync_service
        .associate_policy_with_client(policy)
        .await;

    Ok((StatusCode::CREATED, Json(policy)))
}

// GET /api/policies
#[utoipa::path(
    get,
    path = "/api/policies",
    tag = "Apólices",
    responses(
        (status = 200, description = "Lista de apólices", body = Vec<Policy>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_policies(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let policies = app_state.crm_service.list_policies().await?;
    Ok((StatusCode::OK, Json(policies)))
}

// GET /api/policies/{id}
#[utoipa::path(
    get,
    path = "/api/policies/{id}",
    tag = "Apólices",
    params(("id" = Uuid, Path, description = "ID da apólice")),
    responses(
        (status = 200, description = "Apólice encontrada", body = Policy),
        (status = 404, description = "Apólice não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_policy(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let policy = app_state.crm_service.get_policy(id).await?;
    Ok((StatusCode::OK, Json(policy)))
}

// PATCH /api/policies/{id}
#[utoipa::path(
    patch,
    path = "/api/policies/{id}",
    tag = "Apólices",
    params(("id" = Uuid, Path, description = "ID da apólice")),
    request_body = PolicyChanges,
    responses(
        (status = 200, description = "Apólice atualizada (associação reverificada em melhor esforço)", body = Policy),
        (status = 404, description = "Apólice não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_policy(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<PolicyChanges>,
) -> Result<impl IntoResponse, AppError> {
    let policy = app_state.crm_service.update_policy(id, &changes).await?;

    // Reverifica a associação depois de todo update; falha aqui não
    // derruba a resposta
    app_state
        .sync_service
        .sync_policy_to_client(id, &policy)
        .await;

    Ok((StatusCode::OK, Json(policy)))
}

// DELETE /api/policies/{id} (restrito a admin/líder de equipe)
#[utoipa::path(
    delete,
    path = "/api/policies/{id}",
    tag = "Apólices",
    params(("id" = Uuid, Path, description = "ID da apólice")),
    responses(
        (status = 204, description = "Apólice removida"),
        (status = 403, description = "Papel insuficiente"),
        (status = 404, description = "Apólice não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_policy(
    State(app_state): State<AppState>,
    _guard: RequireRole<TeamLeaderOrAdmin>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.crm_service.delete_policy(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
