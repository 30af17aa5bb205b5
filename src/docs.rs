// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,

        // --- LEADS ---
        handlers::leads::create_lead,
        handlers::leads::list_leads,
        handlers::leads::get_lead,
        handlers::leads::update_lead,
        handlers::leads::delete_lead,
        handlers::leads::convert_lead,

        // --- CLIENTES ---
        handlers::clients::create_client,
        handlers::clients::list_clients,
        handlers::clients::get_client,
        handlers::clients::update_client,
        handlers::clients::delete_client,

        // --- APÓLICES ---
        handlers::policies::create_policy,
        handlers::policies::list_policies,
        handlers::policies::get_policy,
        handlers::policies::update_policy,
        handlers::policies::delete_policy,

        // --- Admin ---
        handlers::admin::backfill_clients,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::UserRole,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- CRM ---
            models::crm::Lead,
            models::crm::Client,
            models::crm::Policy,
            models::crm::LeadStatus,
            models::crm::PolicyStatus,
            models::crm::PremiumFrequency,

            // --- PAYLOADS ---
            models::crm::CreateLeadPayload,
            models::crm::CreateClientPayload,
            models::crm::CreatePolicyPayload,
            models::crm::LeadChanges,
            models::crm::ClientChanges,
            models::crm::PolicyChanges,

            // --- RESPOSTAS ---
            models::crm::LeadWithConversion,
            models::crm::BackfillSummary,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Leads", description = "Captação e Gestão de Prospectos"),
        (name = "Clientes", description = "Clientes Convertidos"),
        (name = "Apólices", description = "Contratos de Seguro"),
        (name = "Admin", description = "Jobs Operacionais")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
