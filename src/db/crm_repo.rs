// src/db/crm_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::CrmStore,
    models::crm::{
        Client, ClientChanges, CreateClientPayload, CreateLeadPayload, CreatePolicyPayload, Lead,
        LeadChanges, LeadStatus, Policy, PolicyChanges, PolicyStatus,
    },
};

// O repositório Postgres do CRM: leads, clientes e apólices.
// É a implementação "de verdade" do CrmStore.
#[derive(Clone)]
pub struct CrmRepository {
    pool: PgPool,
}

impl CrmRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CrmStore for CrmRepository {
    // =========================================================================
    //  LEADS
    // =========================================================================

    async fn create_lead(&self, data: &CreateLeadPayload) -> Result<Lead, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (
                first_name, last_name, email, phone_number,
                address, city, state, zip_code,
                date_of_birth, sex, height, weight,
                smoker_status, medical_conditions, family_history,
                income_range, existing_coverage, coverage_needs,
                insurance_type_interest, lead_source,
                assigned_agent_id, status, notes
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
            )
            RETURNING *
            "#,
        )
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(&data.phone_number)
        .bind(&data.address)
        .bind(&data.city)
        .bind(&data.state)
        .bind(&data.zip_code)
        .bind(data.date_of_birth)
        .bind(&data.sex)
        .bind(&data.height)
        .bind(&data.weight)
        .bind(&data.smoker_status)
        .bind(&data.medical_conditions)
        .bind(&data.family_history)
        .bind(&data.income_range)
        .bind(&data.existing_coverage)
        .bind(&data.coverage_needs)
        .bind(&data.insurance_type_interest)
        .bind(&data.lead_source)
        .bind(data.assigned_agent_id)
        .bind(data.status.unwrap_or(LeadStatus::New))
        .bind(&data.notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(lead)
    }

    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(lead)
    }

    async fn get_leads(&self) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>("SELECT * FROM leads ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(leads)
    }

    async fn update_lead(&self, id: Uuid, changes: &LeadChanges) -> Result<Option<Lead>, AppError> {
        // Payload vazio não gera UPDATE; devolve o registro como está
        if changes.is_empty() {
            return self.get_lead(id).await;
        }

        // UPDATE dinâmico: só entra no SET o que veio no payload
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE leads SET updated_at = NOW()");

        if let Some(v) = &changes.first_name {
            qb.push(", first_name = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.last_name {
            qb.push(", last_name = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.email {
            qb.push(", email = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.phone_number {
            qb.push(", phone_number = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.address {
            qb.push(", address = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.city {
            qb.push(", city = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.state {
            qb.push(", state = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.zip_code {
            qb.push(", zip_code = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.date_of_birth {
            qb.push(", date_of_birth = ").push_bind(*v);
        }
        if let Some(v) = &changes.sex {
            qb.push(", sex = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.height {
            qb.push(", height = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.weight {
            qb.push(", weight = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.smoker_status {
            qb.push(", smoker_status = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.medical_conditions {
            qb.push(", medical_conditions = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.family_history {
            qb.push(", family_history = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.income_range {
            qb.push(", income_range = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.existing_coverage {
            qb.push(", existing_coverage = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.coverage_needs {
            qb.push(", coverage_needs = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.insurance_type_interest {
            qb.push(", insurance_type_interest = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.lead_source {
            qb.push(", lead_source = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.assigned_agent_id {
            qb.push(", assigned_agent_id = ").push_bind(*v);
        }
        if let Some(v) = &changes.status {
            qb.push(", status = ").push_bind(*v);
        }
        if let Some(v) = &changes.notes {
            qb.push(", notes = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.last_contacted_at {
            qb.push(", last_contacted_at = ").push_bind(*v);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING *");

        let lead = qb
            .build_query_as::<Lead>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(lead)
    }

    async fn delete_lead(&self, id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    //  CLIENTES
    // =========================================================================

    async fn create_client(&self, data: &CreateClientPayload) -> Result<Client, AppError> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (
                name, email, phone,
                address, city, state, zip_code,
                sex, date_of_birth,
                insurance_info, insurance_type,
                assigned_agent_id, notes, status, lead_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.address)
        .bind(&data.city)
        .bind(&data.state)
        .bind(&data.zip_code)
        .bind(&data.sex)
        .bind(data.date_of_birth)
        .bind(&data.insurance_info)
        .bind(&data.insurance_type)
        .bind(data.assigned_agent_id)
        .bind(&data.notes)
        .bind(data.status.as_deref().unwrap_or("active"))
        .bind(data.lead_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // O índice parcial em clients.lead_id barra o segundo cliente
            // apontando pro mesmo lead
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(
                        "Já existe um cliente vinculado a este lead.".to_string(),
                    );
                }
            }
            AppError::DatabaseError(e)
        })?;

        Ok(client)
    }

    async fn get_client(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    async fn get_clients(&self) -> Result<Vec<Client>, AppError> {
        let clients = sqlx::query_as::<_, Client>("SELECT * FROM clients ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(clients)
    }

    async fn get_clients_by_lead_id(&self, lead_id: Uuid) -> Result<Vec<Client>, AppError> {
        // Ordenado por criação: o desempate "primeiro encontrado" dos
        // chamadores vira "primeiro inserido"
        let clients = sqlx::query_as::<_, Client>(
            "SELECT * FROM clients WHERE lead_id = $1 ORDER BY created_at ASC",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    async fn update_client(
        &self,
        id: Uuid,
        changes: &ClientChanges,
    ) -> Result<Option<Client>, AppError> {
        if changes.is_empty() {
            return self.get_client(id).await;
        }

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE clients SET updated_at = NOW()");

        if let Some(v) = &changes.name {
            qb.push(", name = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.email {
            qb.push(", email = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.phone {
            qb.push(", phone = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.address {
            qb.push(", address = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.city {
            qb.push(", city = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.state {
            qb.push(", state = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.zip_code {
            qb.push(", zip_code = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.sex {
            qb.push(", sex = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.date_of_birth {
            qb.push(", date_of_birth = ").push_bind(*v);
        }
        if let Some(v) = &changes.insurance_info {
            qb.push(", insurance_info = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.insurance_type {
            qb.push(", insurance_type = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.assigned_agent_id {
            qb.push(", assigned_agent_id = ").push_bind(*v);
        }
        if let Some(v) = &changes.notes {
            qb.push(", notes = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.status {
            qb.push(", status = ").push_bind(v.clone());
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING *");

        let client = qb
            .build_query_as::<Client>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    async fn delete_client(&self, id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    //  APÓLICES
    // =========================================================================

    async fn create_policy(&self, data: &CreatePolicyPayload) -> Result<Policy, AppError> {
        let policy = sqlx::query_as::<_, Policy>(
            r#"
            INSERT INTO policies (
                policy_number, carrier, policy_type, status,
                face_amount, premium, premium_frequency,
                application_date, issue_date, expiry_date,
                agent_id, client_id, lead_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(&data.policy_number)
        .bind(&data.carrier)
        .bind(&data.policy_type)
        .bind(data.status.unwrap_or(PolicyStatus::Pending))
        .bind(data.face_amount)
        .bind(data.premium)
        .bind(data.premium_frequency)
        .bind(data.application_date)
        .bind(data.issue_date)
        .bind(data.expiry_date)
        .bind(data.agent_id)
        .bind(data.client_id)
        .bind(data.lead_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(policy)
    }

    async fn get_policy(&self, id: Uuid) -> Result<Option<Policy>, AppError> {
        let policy = sqlx::query_as::<_, Policy>("SELECT * FROM policies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(policy)
    }

    async fn get_policies(&self) -> Result<Vec<Policy>, AppError> {
        let policies =
            sqlx::query_as::<_, Policy>("SELECT * FROM policies ORDER BY created_at ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(policies)
    }

    async fn get_policies_by_lead_id(&self, lead_id: Uuid) -> Result<Vec<Policy>, AppError> {
        let policies = sqlx::query_as::<_, Policy>(
            "SELECT * FROM policies WHERE lead_id = $1 ORDER BY created_at ASC",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(policies)
    }

    async fn get_policies_by_client_id(&self, client_id: Uuid) -> Result<Vec<Policy>, AppError> {
        let policies = sqlx::query_as::<_, Policy>(
            "SELECT * FROM policies WHERE client_id = $1 ORDER BY created_at ASC",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(policies)
    }

    async fn update_policy(
        &self,
        id: Uuid,
        changes: &PolicyChanges,
    ) -> Result<Option<Policy>, AppError> {
        if changes.is_empty() {
            return self.get_policy(id).await;
        }

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE policies SET updated_at = NOW()");

        if let Some(v) = &changes.policy_number {
            qb.push(", policy_number = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.carrier {
            qb.push(", carrier = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.policy_type {
            qb.push(", policy_type = ").push_bind(v.clone());
        }
        if let Some(v) = &changes.status {
            qb.push(", status = ").push_bind(*v);
        }
        if let Some(v) = &changes.face_amount {
            qb.push(", face_amount = ").push_bind(*v);
        }
        if let Some(v) = &changes.premium {
            qb.push(", premium = ").push_bind(*v);
        }
        if let Some(v) = &changes.premium_frequency {
            qb.push(", premium_frequency = ").push_bind(*v);
        }
        if let Some(v) = &changes.application_date {
            qb.push(", application_date = ").push_bind(*v);
        }
        if let Some(v) = &changes.issue_date {
            qb.push(", issue_date = ").push_bind(*v);
        }
        if let Some(v) = &changes.expiry_date {
            qb.push(", expiry_date = ").push_bind(*v);
        }
        if let Some(v) = &changes.agent_id {
            qb.push(", agent_id = ").push_bind(*v);
        }
        if let Some(v) = &changes.client_id {
            qb.push(", client_id = ").push_bind(*v);
        }
        if let Some(v) = &changes.lead_id {
            qb.push(", lead_id = ").push_bind(*v);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING *");

        let policy = qb
            .build_query_as::<Policy>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(policy)
    }

    async fn delete_policy(&self, id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM policies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
