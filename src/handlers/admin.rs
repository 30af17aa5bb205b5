// src/handlers/admin.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{AdminOnly, RequireRole},
    models::crm::BackfillSummary,
};

// POST /api/admin/backfill-clients
//
// Job operacional: materializa clientes para todos os leads sem vínculo.
// Idempotente: rodar de novo devolve created = 0.
#[utoipa::path(
    post,
    path = "/api/admin/backfill-clients",
    tag = "Admin",
    responses(
        (status = 200, description = "Resumo da varredura", body = BackfillSummary),
        (status = 403, description = "Somente admin")
    ),
    security(("api_jwt" = []))
)]
pub async fn backfill_clients(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state.sync_service.backfill_lead_client_links().await?;
    Ok((StatusCode::OK, Json(summary)))
}
