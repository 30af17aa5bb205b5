// src/services/crm_service.rs
//
// Orquestração de CRUD das entidades do CRM. A sincronização entre
// entidades NÃO mora aqui (ver sync_service). Aqui ficam as regras de
// escrita primária: validação de vínculo na criação de cliente e os
// cascateamentos de deleção.

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CrmStore,
    models::crm::{
        Client, ClientChanges, CreateClientPayload, CreateLeadPayload, CreatePolicyPayload, Lead,
        LeadChanges, Policy, PolicyChanges,
    },
};

#[derive(Clone)]
pub struct CrmService<S> {
    store: S,
}

impl<S: CrmStore> CrmService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    // =========================================================================
    //  LEADS
    // =========================================================================

    pub async fn create_lead(&self, data: &CreateLeadPayload) -> Result<Lead, AppError> {
        self.store.create_lead(data).await
    }

    pub async fn get_lead(&self, id: Uuid) -> Result<Lead, AppError> {
        self.store
            .get_lead(id)
            .await?
            .ok_or(AppError::NotFound("Lead"))
    }

    pub async fn list_leads(&self) -> Result<Vec<Lead>, AppError> {
        self.store.get_leads().await
    }

    pub async fn update_lead(&self, id: Uuid, changes: &LeadChanges) -> Result<Lead, AppError> {
        self.store
            .update_lead(id, changes)
            .await?
            .ok_or(AppError::NotFound("Lead"))
    }

    // Lead nunca some sozinho: as apólices dependentes caem ANTES dele.
    // Lead sem apólice não dispara nenhuma deleção de apólice.
    pub async fn delete_lead(&self, id: Uuid) -> Result<(), AppError> {
        let lead = self
            .store
            .get_lead(id)
            .await?
            .ok_or(AppError::NotFound("Lead"))?;

        let policies = self.store.get_policies_by_lead_id(lead.id).await?;
        for policy in &policies {
            self.store.delete_policy(policy.id).await?;
        }
        if !policies.is_empty() {
            tracing::info!(
                "Lead {}: {} apólice(s) dependente(s) removida(s) em cascata.",
                lead.id,
                policies.len()
            );
        }

        self.store.delete_lead(lead.id).await?;
        Ok(())
    }

    // =========================================================================
    //  CLIENTES
    // =========================================================================

    pub async fn create_client(&self, data: &CreateClientPayload) -> Result<Client, AppError> {
        // Checagem de unicidade no ponto de criação: no máximo um cliente
        // por lead (o banco também barra, mas o erro daqui é mais claro)
        if let Some(lead_id) = data.lead_id {
            let existing = self.store.get_clients_by_lead_id(lead_id).await?;
            if !existing.is_empty() {
                return Err(AppError::UniqueConstraintViolation(
                    "Já existe um cliente vinculado a este lead.".to_string(),
                ));
            }
        }

        self.store.create_client(data).await
    }

    pub async fn get_client(&self, id: Uuid) -> Result<Client, AppError> {
        self.store
            .get_client(id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        self.store.get_clients().await
    }

    pub async fn update_client(
        &self,
        id: Uuid,
        changes: &ClientChanges,
    ) -> Result<Client, AppError> {
        self.store
            .update_client(id, changes)
            .await?
            .ok_or(AppError::NotFound("Cliente"))
    }

    // Deleção explícita de cliente cascateia as apólices vinculadas a ele
    pub async fn delete_client(&self, id: Uuid) -> Result<(), AppError> {
        let client = self
            .store
            .get_client(id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;

        let policies = self.store.get_policies_by_client_id(client.id).await?;
        for policy in &policies {
            self.store.delete_policy(policy.id).await?;
        }

        self.store.delete_client(client.id).await?;
        Ok(())
    }

    // =========================================================================
    //  APÓLICES
    // =========================================================================

    pub async fn create_policy(&self, data: &CreatePolicyPayload) -> Result<Policy, AppError> {
        self.store.create_policy(data).await
    }

    pub async fn get_policy(&self, id: Uuid) -> Result<Policy, AppError> {
        self.store
            .get_policy(id)
            .await?
            .ok_or(AppError::NotFound("Apólice"))
    }

    pub async fn list_policies(&self) -> Result<Vec<Policy>, AppError> {
        self.store.get_policies().await
    }

    pub async fn update_policy(
        &self,
        id: Uuid,
        changes: &PolicyChanges,
    ) -> Result<Policy, AppError> {
        self.store
            .update_policy(id, changes)
            .await?
            .ok_or(AppError::NotFound("Apólice"))
    }

    pub async fn delete_policy(&self, id: Uuid) -> Result<(), AppError> {
        let deleted = self.store.delete_policy(id).await?;
        if deleted == 0 {
            return Err(AppError::NotFound("Apólice"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemStore;
    use crate::models::crm::CreatePolicyPayload;

    fn lead_payload(first: &str, last: &str) -> CreateLeadPayload {
        CreateLeadPayload {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: None,
            phone_number: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            date_of_birth: None,
            sex: None,
            height: None,
            weight: None,
            smoker_status: None,
            medical_conditions: None,
            family_history: None,
            income_range: None,
            existing_coverage: None,
            coverage_needs: None,
            insurance_type_interest: None,
            lead_source: None,
            assigned_agent_id: None,
            status: None,
            notes: None,
        }
    }

    fn policy_payload(number: &str, lead_id: Option<Uuid>) -> CreatePolicyPayload {
        CreatePolicyPayload {
            policy_number: number.to_string(),
            carrier: "Seguradora Atlântica".to_string(),
            policy_type: "vida_inteira".to_string(),
            status: None,
            face_amount: None,
            premium: None,
            premium_frequency: None,
            application_date: None,
            issue_date: None,
            expiry_date: None,
            agent_id: Uuid::new_v4(),
            client_id: None,
            lead_id,
        }
    }

    #[tokio::test]
    async fn deleting_lead_removes_policies_first() {
        let store = MemStore::new();
        let svc = CrmService::new(store.clone());

        let lead = svc.create_lead(&lead_payload("Ana", "Souza")).await.unwrap();
        let p1 = svc
            .create_policy(&policy_payload("VID-1", Some(lead.id)))
            .await
            .unwrap();
        let p2 = svc
            .create_policy(&policy_payload("VID-2", Some(lead.id)))
            .await
            .unwrap();

        svc.delete_lead(lead.id).await.unwrap();

        assert!(store.get_lead(lead.id).await.unwrap().is_none());
        assert!(store.get_policy(p1.id).await.unwrap().is_none());
        assert!(store.get_policy(p2.id).await.unwrap().is_none());

        // Ordem do cascateamento: toda deleção de apólice vem antes da
        // deleção do lead
        let ops = store.ops();
        let lead_delete_pos = ops
            .iter()
            .position(|op| op == &format!("delete_lead:{}", lead.id))
            .unwrap();
        for policy_id in [p1.id, p2.id] {
            let policy_delete_pos = ops
                .iter()
                .position(|op| op == &format!("delete_policy:{}", policy_id))
                .unwrap();
            assert!(policy_delete_pos < lead_delete_pos);
        }
    }

    #[tokio::test]
    async fn deleting_lead_without_policies_skips_policy_deletes() {
        let store = MemStore::new();
        let svc = CrmService::new(store.clone());

        let lead = svc.create_lead(&lead_payload("Ana", "Souza")).await.unwrap();

        svc.delete_lead(lead.id).await.unwrap();

        assert!(store.get_lead(lead.id).await.unwrap().is_none());
        assert!(!store.ops().iter().any(|op| op.starts_with("delete_policy")));
    }

    #[tokio::test]
    async fn client_creation_rejects_second_link_to_same_lead() {
        let store = MemStore::new();
        let svc = CrmService::new(store.clone());

        let lead = svc.create_lead(&lead_payload("Ana", "Souza")).await.unwrap();

        let payload = CreateClientPayload {
            name: "ANA SOUZA".to_string(),
            email: "ana@example.com".to_string(),
            phone: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            sex: None,
            date_of_birth: None,
            insurance_info: None,
            insurance_type: None,
            assigned_agent_id: None,
            notes: None,
            status: None,
            lead_id: Some(lead.id),
        };

        svc.create_client(&payload).await.unwrap();
        let second = svc.create_client(&payload).await;

        assert!(matches!(
            second,
            Err(AppError::UniqueConstraintViolation(_))
        ));
    }
}
