// src/db/store.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::crm::{
        Client, ClientChanges, CreateClientPayload, CreateLeadPayload, CreatePolicyPayload, Lead,
        LeadChanges, Policy, PolicyChanges,
    },
};

// O contrato genérico de persistência que o motor de sincronização (e a
// camada de rotas) consome. O motor não sabe nem quer saber se por trás
// tem Postgres ou um mapa em memória, só precisa destas primitivas.
//
// Updates recebem o conjunto de campos alterados e devolvem o registro
// atualizado, ou None quando o id não existe.
#[async_trait]
pub trait CrmStore: Send + Sync {
    // --- Leads ---
    async fn create_lead(&self, data: &CreateLeadPayload) -> Result<Lead, AppError>;
    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError>;
    async fn get_leads(&self) -> Result<Vec<Lead>, AppError>;
    async fn update_lead(&self, id: Uuid, changes: &LeadChanges) -> Result<Option<Lead>, AppError>;
    async fn delete_lead(&self, id: Uuid) -> Result<u64, AppError>;

    // --- Clientes ---
    async fn create_client(&self, data: &CreateClientPayload) -> Result<Client, AppError>;
    async fn get_client(&self, id: Uuid) -> Result<Option<Client>, AppError>;
    async fn get_clients(&self) -> Result<Vec<Client>, AppError>;
    // Lookup pela soft FK. Pode devolver mais de um registro em dados
    // legados; os chamadores desempatam por "primeiro encontrado"
    // (ordem de inserção).
    async fn get_clients_by_lead_id(&self, lead_id: Uuid) -> Result<Vec<Client>, AppError>;
    async fn update_client(
        &self,
        id: Uuid,
        changes: &ClientChanges,
    ) -> Result<Option<Client>, AppError>;
    async fn delete_client(&self, id: Uuid) -> Result<u64, AppError>;

    // --- Apólices ---
    async fn create_policy(&self, data: &CreatePolicyPayload) -> Result<Policy, AppError>;
    async fn get_policy(&self, id: Uuid) -> Result<Option<Policy>, AppError>;
    async fn get_policies(&self) -> Result<Vec<Policy>, AppError>;
    async fn get_policies_by_lead_id(&self, lead_id: Uuid) -> Result<Vec<Policy>, AppError>;
    async fn get_policies_by_client_id(&self, client_id: Uuid) -> Result<Vec<Policy>, AppError>;
    async fn update_policy(
        &self,
        id: Uuid,
        changes: &PolicyChanges,
    ) -> Result<Option<Policy>, AppError>;
    async fn delete_policy(&self, id: Uuid) -> Result<u64, AppError>;
}
