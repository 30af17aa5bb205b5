// src/handlers/clients.rs

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
    models::crm::{Client, ClientChanges, CreateClientPayload},
};

// POST /api/clients
#[utoipa::path(
    post,
    path = "/api/clients",
    tag = "Clientes",
    request_body = CreateClientPayload,
    responses(
        (status = 201, description = "Cliente criado", body = Client),
        (status = 409, description = "Já existe cliente vinculado ao lead informado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_client(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateClientPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let client = app_state.crm_service.create_client(&payload).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

// GET /api/clients
#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "Clientes",
    responses(
        (status = 200, description = "Lista de clientes", body = Vec<Client>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let clients = app_state.crm_service.list_clients().await?;
    Ok((StatusCode::OK, Json(clients)))
}

// GET /api/clients/{id}
#[utoipa::path(
    get,
    path = "/api/clients/{id}",
    tag = "Clientes",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente encontrado", body = Client),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_client(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state.crm_service.get_client(id).await?;
    Ok((StatusCode::OK, Json(client)))
}

// PATCH /api/clients/{id}
//
// Update direto do cliente. O fluxo inverso (cliente -> lead) não
// existe: a sincronização é unidirecional.
#[utoipa::path(
    patch,
    path = "/api/clients/{id}",
    tag = "Clientes",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = ClientChanges,
    responses(
        (status = 200, description = "Cliente atualizado", body = Client),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_client(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<ClientChanges>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state.crm_service.update_client(id, &changes).await?;
    Ok((StatusCode::OK, Json(client)))
}

// DELETE /api/clients/{id}
#[utoipa::path(
    delete,
    path = "/api/clients/{id}",
    tag = "Clientes",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 204, description = "Cliente e apólices vinculadas removidos"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_client(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.crm_service.delete_client(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
