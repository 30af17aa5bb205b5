// src/handlers/leads.rs
//
// Camada fina de rotas dos leads. O contrato com o motor de sincronização
// é sempre o mesmo: primeiro a escrita primária no repositório, DEPOIS a
// sincronização (síncrona, melhor esforço, nunca derruba a resposta).

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
    models::crm::{Client, CreateLeadPayload, Lead, LeadChanges, LeadWithConversion},
};

// POST /api/leads
#[utoipa::path(
    post,
    path = "/api/leads",
    tag = "Leads",
    request_body = CreateLeadPayload,
    responses(
        (status = 201, description = "Lead captado; com conversão ansiosa ligada, a resposta traz lead + cliente (ou clientError)", body = LeadWithConversion),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_lead(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let lead = app_state.crm_service.create_lead(&payload).await?;

    // Conversão ansiosa é opt-in. Com ela desligada (padrão), o cliente
    // nasce depois, pela ação explícita de conversão ou pelo backfill.
    if app_state.eager_conversion {
        let outcome = app_state.sync_service.on_lead_created(lead).await;
        return Ok((StatusCode::CREATED, Json(outcome)).into_response());
    }

    Ok((StatusCode::CREATED, Json(lead)).into_response())
}

// GET /api/leads
#[utoipa::path(
    get,
    path = "/api/leads",
    tag = "Leads",
    responses(
        (status = 200, description = "Lista de leads", body = Vec<Lead>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let leads = app_state.crm_service.list_leads().await?;
    Ok((StatusCode::OK, Json(leads)))
}

// GET /api/leads/{id}
#[utoipa::path(
    get,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Lead encontrado", body = Lead),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lead(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.crm_service.get_lead(id).await?;
    Ok((StatusCode::OK, Json(lead)))
}

// PATCH/PUT /api/leads/{id}
//
// Os dois verbos caem aqui e chamam o reconciliador identicamente. O
// corpo é o conjunto de campos alterados: só o que veio no JSON entra
// no update e, em seguida, na projeção para o cliente.
#[utoipa::path(
    patch,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = LeadChanges,
    responses(
        (status = 200, description = "Lead atualizado (cliente vinculado sincronizado em melhor esforço)", body = Lead),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_lead(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<LeadChanges>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.crm_service.update_lead(id, &changes).await?;

    // Escrita primária commitada; daqui pra frente nada pode falhar a resposta
    app_state
        .sync_service
        .sync_lead_to_client(id, &lead, &changes)
        .await;

    Ok((StatusCode::OK, Json(lead)))
}

// DELETE /api/leads/{id}
#[utoipa::path(
    delete,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 204, description = "Lead e apólices dependentes removidos"),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_lead(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.crm_service.delete_lead(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/leads/{id}/convert
#[utoipa::path(
    post,
    path = "/api/leads/{id}/convert",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 201, description = "Cliente materializado a partir do lead (idempotente: devolve o existente se já convertido)", body = Client),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn convert_lead(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.crm_service.get_lead(id).await?;
    let client = app_state.sync_service.convert_lead(&lead).await?;
    Ok((StatusCode::CREATED, Json(client)))
}
