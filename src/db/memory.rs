// src/db/memory.rs
//
// Implementação em memória do CrmStore, usada nos testes. Além de guardar
// os registros, mantém um log das operações executadas: os testes de
// sincronização precisam afirmar coisas como "nenhum update de cliente
// aconteceu" e "as apólices foram apagadas antes do lead".

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::CrmStore,
    models::crm::{
        Client, ClientChanges, CreateClientPayload, CreateLeadPayload, CreatePolicyPayload, Lead,
        LeadChanges, LeadStatus, Policy, PolicyChanges, PolicyStatus,
    },
};

#[derive(Default)]
struct MemState {
    leads: Vec<Lead>,
    clients: Vec<Client>,
    policies: Vec<Policy>,
    ops: Vec<String>,
    fail_client_updates: bool,
    fail_client_creates: bool,
}

#[derive(Clone, Default)]
pub struct MemStore {
    state: Arc<Mutex<MemState>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<String> {
        self.state.lock().unwrap().ops.clone()
    }

    // Injeção de falha: o próximo update/create de cliente rejeita,
    // simulando o repositório fora do ar
    pub fn fail_client_updates(&self) {
        self.state.lock().unwrap().fail_client_updates = true;
    }

    pub fn fail_client_creates(&self) {
        self.state.lock().unwrap().fail_client_creates = true;
    }

    pub fn seed_lead(&self, lead: Lead) {
        self.state.lock().unwrap().leads.push(lead);
    }

    pub fn seed_client(&self, client: Client) {
        self.state.lock().unwrap().clients.push(client);
    }

    pub fn seed_policy(&self, policy: Policy) {
        self.state.lock().unwrap().policies.push(policy);
    }

    pub fn client_count(&self) -> usize {
        self.state.lock().unwrap().clients.len()
    }

    fn log(&self, op: String) {
        self.state.lock().unwrap().ops.push(op);
    }
}

fn apply_lead_changes(lead: &mut Lead, c: &LeadChanges) {
    if let Some(v) = &c.first_name {
        lead.first_name = v.clone();
    }
    if let Some(v) = &c.last_name {
        lead.last_name = v.clone();
    }
    if let Some(v) = &c.email {
        lead.email = v.clone();
    }
    if let Some(v) = &c.phone_number {
        lead.phone_number = v.clone();
    }
    if let Some(v) = &c.address {
        lead.address = v.clone();
    }
    if let Some(v) = &c.city {
        lead.city = v.clone();
    }
    if let Some(v) = &c.state {
        lead.state = v.clone();
    }
    if let Some(v) = &c.zip_code {
        lead.zip_code = v.clone();
    }
    if let Some(v) = &c.date_of_birth {
        lead.date_of_birth = *v;
    }
    if let Some(v) = &c.sex {
        lead.sex = v.clone();
    }
    if let Some(v) = &c.height {
        lead.height = v.clone();
    }
    if let Some(v) = &c.weight {
        lead.weight = v.clone();
    }
    if let Some(v) = &c.smoker_status {
        lead.smoker_status = v.clone();
    }
    if let Some(v) = &c.medical_conditions {
        lead.medical_conditions = v.clone();
    }
    if let Some(v) = &c.family_history {
        lead.family_history = v.clone();
    }
    if let Some(v) = &c.income_range {
        lead.income_range = v.clone();
    }
    if let Some(v) = &c.existing_coverage {
        lead.existing_coverage = v.clone();
    }
    if let Some(v) = &c.coverage_needs {
        lead.coverage_needs = v.clone();
    }
    if let Some(v) = &c.insurance_type_interest {
        lead.insurance_type_interest = v.clone();
    }
    if let Some(v) = &c.lead_source {
        lead.lead_source = v.clone();
    }
    if let Some(v) = &c.assigned_agent_id {
        lead.assigned_agent_id = *v;
    }
    if let Some(v) = &c.status {
        lead.status = *v;
    }
    if let Some(v) = &c.notes {
        lead.notes = v.clone();
    }
    if let Some(v) = &c.last_contacted_at {
        lead.last_contacted_at = *v;
    }
    lead.updated_at = Utc::now();
}

fn apply_client_changes(client: &mut Client, c: &ClientChanges) {
    if let Some(v) = &c.name {
        client.name = v.clone();
    }
    if let Some(v) = &c.email {
        client.email = v.clone();
    }
    if let Some(v) = &c.phone {
        client.phone = v.clone();
    }
    if let Some(v) = &c.address {
        client.address = v.clone();
    }
    if let Some(v) = &c.city {
        client.city = v.clone();
    }
    if let Some(v) = &c.state {
        client.state = v.clone();
    }
    if let Some(v) = &c.zip_code {
        client.zip_code = v.clone();
    }
    if let Some(v) = &c.sex {
        client.sex = v.clone();
    }
    if let Some(v) = &c.date_of_birth {
        client.date_of_birth = *v;
    }
    if let Some(v) = &c.insurance_info {
        client.insurance_info = v.clone();
    }
    if let Some(v) = &c.insurance_type {
        client.insurance_type = v.clone();
    }
    if let Some(v) = &c.assigned_agent_id {
        client.assigned_agent_id = *v;
    }
    if let Some(v) = &c.notes {
        client.notes = v.clone();
    }
    if let Some(v) = &c.status {
        client.status = v.clone();
    }
    client.updated_at = Utc::now();
}

fn apply_policy_changes(policy: &mut Policy, c: &PolicyChanges) {
    if let Some(v) = &c.policy_number {
        policy.policy_number = v.clone();
    }
    if let Some(v) = &c.carrier {
        policy.carrier = v.clone();
    }
    if let Some(v) = &c.policy_type {
        policy.policy_type = v.clone();
    }
    if let Some(v) = &c.status {
        policy.status = *v;
    }
    if let Some(v) = &c.face_amount {
        policy.face_amount = *v;
    }
    if let Some(v) = &c.premium {
        policy.premium = *v;
    }
    if let Some(v) = &c.premium_frequency {
        policy.premium_frequency = *v;
    }
    if let Some(v) = &c.application_date {
        policy.application_date = *v;
    }
    if let Some(v) = &c.issue_date {
        policy.issue_date = *v;
    }
    if let Some(v) = &c.expiry_date {
        policy.expiry_date = *v;
    }
    if let Some(v) = &c.agent_id {
        policy.agent_id = *v;
    }
    if let Some(v) = &c.client_id {
        policy.client_id = *v;
    }
    if let Some(v) = &c.lead_id {
        policy.lead_id = *v;
    }
    policy.updated_at = Utc::now();
}

#[async_trait]
impl CrmStore for MemStore {
    async fn create_lead(&self, data: &CreateLeadPayload) -> Result<Lead, AppError> {
        self.log("create_lead".to_string());
        let now = Utc::now();
        let lead = Lead {
            id: Uuid::new_v4(),
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            email: data.email.clone(),
            phone_number: data.phone_number.clone(),
            address: data.address.clone(),
            city: data.city.clone(),
            state: data.state.clone(),
            zip_code: data.zip_code.clone(),
            date_of_birth: data.date_of_birth,
            sex: data.sex.clone(),
            height: data.height.clone(),
            weight: data.weight.clone(),
            smoker_status: data.smoker_status.clone(),
            medical_conditions: data.medical_conditions.clone(),
            family_history: data.family_history.clone(),
            income_range: data.income_range.clone(),
            existing_coverage: data.existing_coverage.clone(),
            coverage_needs: data.coverage_needs.clone(),
            insurance_type_interest: data.insurance_type_interest.clone(),
            lead_source: data.lead_source.clone(),
            assigned_agent_id: data.assigned_agent_id,
            status: data.status.unwrap_or(LeadStatus::New),
            notes: data.notes.clone(),
            last_contacted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().leads.push(lead.clone());
        Ok(lead)
    }

    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        self.log(format!("get_lead:{}", id));
        Ok(self
            .state
            .lock()
            .unwrap()
            .leads
            .iter()
            .find(|l| l.id == id)
            .cloned())
    }

    async fn get_leads(&self) -> Result<Vec<Lead>, AppError> {
        self.log("get_leads".to_string());
        Ok(self.state.lock().unwrap().leads.clone())
    }

    async fn update_lead(&self, id: Uuid, changes: &LeadChanges) -> Result<Option<Lead>, AppError> {
        self.log(format!("update_lead:{}", id));
        let mut state = self.state.lock().unwrap();
        match state.leads.iter_mut().find(|l| l.id == id) {
            Some(lead) => {
                apply_lead_changes(lead, changes);
                Ok(Some(lead.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_lead(&self, id: Uuid) -> Result<u64, AppError> {
        self.log(format!("delete_lead:{}", id));
        let mut state = self.state.lock().unwrap();
        let before = state.leads.len();
        state.leads.retain(|l| l.id != id);
        Ok((before - state.leads.len()) as u64)
    }

    async fn create_client(&self, data: &CreateClientPayload) -> Result<Client, AppError> {
        self.log("create_client".to_string());
        if self.state.lock().unwrap().fail_client_creates {
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "falha injetada no repositório"
            )));
        }
        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            email: data.email.clone(),
            phone: data.phone.clone(),
            address: data.address.clone(),
            city: data.city.clone(),
            state: data.state.clone(),
            zip_code: data.zip_code.clone(),
            sex: data.sex.clone(),
            date_of_birth: data.date_of_birth,
            insurance_info: data.insurance_info.clone(),
            insurance_type: data.insurance_type.clone(),
            assigned_agent_id: data.assigned_agent_id,
            notes: data.notes.clone(),
            status: data.status.clone().unwrap_or_else(|| "active".to_string()),
            username: None,
            portal_password_hash: None,
            has_portal_access: false,
            lead_id: data.lead_id,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().clients.push(client.clone());
        Ok(client)
    }

    async fn get_client(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        self.log(format!("get_client:{}", id));
        Ok(self
            .state
            .lock()
            .unwrap()
            .clients
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn get_clients(&self) -> Result<Vec<Client>, AppError> {
        self.log("get_clients".to_string());
        Ok(self.state.lock().unwrap().clients.clone())
    }

    async fn get_clients_by_lead_id(&self, lead_id: Uuid) -> Result<Vec<Client>, AppError> {
        self.log(format!("get_clients_by_lead_id:{}", lead_id));
        // Ordem de inserção preservada: o primeiro do Vec é o "primeiro
        // encontrado" do desempate
        Ok(self
            .state
            .lock()
            .unwrap()
            .clients
            .iter()
            .filter(|c| c.lead_id == Some(lead_id))
            .cloned()
            .collect())
    }

    async fn update_client(
        &self,
        id: Uuid,
        changes: &ClientChanges,
    ) -> Result<Option<Client>, AppError> {
        self.log(format!("update_client:{}", id));
        let mut state = self.state.lock().unwrap();
        if state.fail_client_updates {
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "falha injetada no repositório"
            )));
        }
        match state.clients.iter_mut().find(|c| c.id == id) {
            Some(client) => {
                apply_client_changes(client, changes);
                Ok(Some(client.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_client(&self, id: Uuid) -> Result<u64, AppError> {
        self.log(format!("delete_client:{}", id));
        let mut state = self.state.lock().unwrap();
        let before = state.clients.len();
        state.clients.retain(|c| c.id != id);
        Ok((before - state.clients.len()) as u64)
    }

    async fn create_policy(&self, data: &CreatePolicyPayload) -> Result<Policy, AppError> {
        self.log("create_policy".to_string());
        let now = Utc::now();
        let policy = Policy {
            id: Uuid::new_v4(),
            policy_number: data.policy_number.clone(),
            carrier: data.carrier.clone(),
            policy_type: data.policy_type.clone(),
            status: data.status.unwrap_or(PolicyStatus::Pending),
            face_amount: data.face_amount,
            premium: data.premium,
            premium_frequency: data.premium_frequency,
            application_date: data.application_date,
            issue_date: data.issue_date,
            expiry_date: data.expiry_date,
            agent_id: data.agent_id,
            client_id: data.client_id,
            lead_id: data.lead_id,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().policies.push(policy.clone());
        Ok(policy)
    }

    async fn get_policy(&self, id: Uuid) -> Result<Option<Policy>, AppError> {
        self.log(format!("get_policy:{}", id));
        Ok(self
            .state
            .lock()
            .unwrap()
            .policies
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn get_policies(&self) -> Result<Vec<Policy>, AppError> {
        self.log("get_policies".to_string());
        Ok(self.state.lock().unwrap().policies.clone())
    }

    async fn get_policies_by_lead_id(&self, lead_id: Uuid) -> Result<Vec<Policy>, AppError> {
        self.log(format!("get_policies_by_lead_id:{}", lead_id));
        Ok(self
            .state
            .lock()
            .unwrap()
            .policies
            .iter()
            .filter(|p| p.lead_id == Some(lead_id))
            .cloned()
            .collect())
    }

    async fn get_policies_by_client_id(&self, client_id: Uuid) -> Result<Vec<Policy>, AppError> {
        self.log(format!("get_policies_by_client_id:{}", client_id));
        Ok(self
            .state
            .lock()
            .unwrap()
            .policies
            .iter()
            .filter(|p| p.client_id == Some(client_id))
            .cloned()
            .collect())
    }

    async fn update_policy(
        &self,
        id: Uuid,
        changes: &PolicyChanges,
    ) -> Result<Option<Policy>, AppError> {
        self.log(format!("update_policy:{}", id));
        let mut state = self.state.lock().unwrap();
        match state.policies.iter_mut().find(|p| p.id == id) {
            Some(policy) => {
                apply_policy_changes(policy, changes);
                Ok(Some(policy.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_policy(&self, id: Uuid) -> Result<u64, AppError> {
        self.log(format!("delete_policy:{}", id));
        let mut state = self.state.lock().unwrap();
        let before = state.policies.len();
        state.policies.retain(|p| p.id != id);
        Ok((before - state.policies.len()) as u64)
    }
}
