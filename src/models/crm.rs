// src/models/crm.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::db_utils::double_option;

// --- ENUMS ---

// Mapeia o CREATE TYPE lead_status do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "lead_status", rename_all = "snake_case")]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Unqualified,
    Converted,
    Lost,
}

impl LeadStatus {
    // O status do cliente é texto livre (default "active"), então o
    // repasse lead -> cliente grava o valor literal do enum.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Unqualified => "unqualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "policy_status", rename_all = "snake_case")]
#[serde(rename_all = "lowercase")]
pub enum PolicyStatus {
    Pending,
    Active,
    Lapsed,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "premium_frequency", rename_all = "snake_case")]
#[serde(rename_all = "lowercase")]
pub enum PremiumFrequency {
    Monthly,
    Quarterly,
    Semiannual,
    Annual,
}

// --- LEAD (O Prospecto) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,

    #[schema(example = "Maria")]
    pub first_name: String,
    #[schema(example = "Silva")]
    pub last_name: String,

    #[schema(example = "maria@email.com")]
    pub email: Option<String>,
    pub phone_number: Option<String>,

    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,

    // Dados de subscrição, texto livre vindo da captação
    #[schema(value_type = Option<String>, format = Date, example = "1985-03-10")]
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub smoker_status: Option<String>,
    pub medical_conditions: Option<String>,
    pub family_history: Option<String>,

    // Dados comerciais
    pub income_range: Option<String>,
    pub existing_coverage: Option<String>,
    pub coverage_needs: Option<String>,
    #[schema(example = "vida inteira")]
    pub insurance_type_interest: Option<String>,
    pub lead_source: Option<String>,

    // Fluxo de trabalho
    pub assigned_agent_id: Option<Uuid>,
    pub status: LeadStatus,
    pub notes: Option<String>,
    pub last_contacted_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- CLIENTE (O Convertido) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,

    // Nome de exibição derivado: "PRIMEIRO ÚLTIMO" em caixa alta
    #[schema(example = "MARIA SILVA")]
    pub name: String,

    // NOT NULL no banco: quando o lead de origem não tem e-mail,
    // gravamos o placeholder sintético lead{id}@placeholder.com
    pub email: String,
    pub phone: Option<String>,

    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,

    pub sex: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub date_of_birth: Option<NaiveDate>,

    pub insurance_info: Option<String>,
    pub insurance_type: Option<String>,

    pub assigned_agent_id: Option<Uuid>,
    pub notes: Option<String>,

    #[schema(example = "active")]
    pub status: String,

    // Acesso ao portal (domínio de autenticação separado)
    pub username: Option<String>,
    #[serde(skip_serializing, default)]
    #[schema(ignore)]
    pub portal_password_hash: Option<String>,
    pub has_portal_access: bool,

    // Soft FK para o lead de origem. Sem REFERENCES no banco; o uso
    // pretendido é no máximo um cliente por lead.
    pub lead_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- APÓLICE ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: Uuid,

    #[schema(example = "VID-2024-00123")]
    pub policy_number: String,
    #[schema(example = "Seguradora Atlântica")]
    pub carrier: String,
    #[schema(example = "vida_inteira")]
    pub policy_type: String,
    pub status: PolicyStatus,

    #[schema(value_type = Option<String>, example = "250000.00")]
    pub face_amount: Option<Decimal>,
    #[schema(value_type = Option<String>, example = "180.50")]
    pub premium: Option<Decimal>,
    pub premium_frequency: Option<PremiumFrequency>,

    #[schema(value_type = Option<String>, format = Date)]
    pub application_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Date)]
    pub issue_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Date)]
    pub expiry_date: Option<NaiveDate>,

    // Toda apólice tem um agente responsável
    pub agent_id: Uuid,

    // Ambos opcionais e independentes. O vinculador tenta garantir que
    // client_id acabe preenchido mesmo quando a apólice nasce só com lead_id.
    pub client_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
//  PAYLOADS DE CRIAÇÃO
// =============================================================================

fn validate_not_negative(val: &Decimal) -> Result<(), validator::ValidationError> {
    if val.is_sign_negative() {
        let mut err = validator::ValidationError::new("range");
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadPayload {
    #[validate(length(min = 1, message = "O primeiro nome é obrigatório."))]
    #[schema(example = "Maria")]
    pub first_name: String,

    #[validate(length(min = 1, message = "O sobrenome é obrigatório."))]
    #[schema(example = "Silva")]
    pub last_name: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    pub phone_number: Option<String>,

    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,

    #[schema(value_type = Option<String>, format = Date)]
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub smoker_status: Option<String>,
    pub medical_conditions: Option<String>,
    pub family_history: Option<String>,

    pub income_range: Option<String>,
    pub existing_coverage: Option<String>,
    pub coverage_needs: Option<String>,
    pub insurance_type_interest: Option<String>,
    #[schema(example = "landing-page")]
    pub lead_source: Option<String>,

    pub assigned_agent_id: Option<Uuid>,
    // Captação entra como "new" quando omitido
    pub status: Option<LeadStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "MARIA SILVA")]
    pub name: String,

    // O e-mail do cliente é NOT NULL; quem cria direto pela API precisa
    // informar um. O fluxo de conversão preenche o placeholder sozinho.
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    pub phone: Option<String>,

    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,

    pub sex: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub date_of_birth: Option<NaiveDate>,

    pub insurance_info: Option<String>,
    pub insurance_type: Option<String>,

    pub assigned_agent_id: Option<Uuid>,
    pub notes: Option<String>,

    #[schema(example = "active")]
    pub status: Option<String>,

    pub lead_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePolicyPayload {
    #[validate(length(min = 1, message = "O número da apólice é obrigatório."))]
    #[schema(example = "VID-2024-00123")]
    pub policy_number: String,

    #[validate(length(min = 1, message = "A seguradora é obrigatória."))]
    pub carrier: String,

    #[validate(length(min = 1, message = "O tipo de apólice é obrigatório."))]
    #[schema(example = "vida_inteira")]
    pub policy_type: String,

    pub status: Option<PolicyStatus>,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = Option<String>, example = "250000.00")]
    pub face_amount: Option<Decimal>,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = Option<String>, example = "180.50")]
    pub premium: Option<Decimal>,
    pub premium_frequency: Option<PremiumFrequency>,

    #[schema(value_type = Option<String>, format = Date)]
    pub application_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Date)]
    pub issue_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Date)]
    pub expiry_date: Option<NaiveDate>,

    pub agent_id: Uuid,

    // A apólice pode nascer vinculada a um cliente, a um lead, ou a nenhum
    pub client_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
}

// =============================================================================
//  CONJUNTOS DE CAMPOS ALTERADOS (updates parciais)
// =============================================================================
//
// Cada campo anulável usa Option<Option<T>> (ver common::db_utils): assim
// "ausente do JSON" e "enviado como null" não se confundem, e o motor de
// sincronização enxerga exatamente o conjunto de campos que o chamador
// tocou, inclusive limpezas explícitas.

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub phone_number: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub zip_code: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub sex: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub height: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub weight: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub smoker_status: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub medical_conditions: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub family_history: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub income_range: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub existing_coverage: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub coverage_needs: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub insurance_type_interest: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub lead_source: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub assigned_agent_id: Option<Option<Uuid>>,
    pub status: Option<LeadStatus>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub last_contacted_at: Option<Option<DateTime<Utc>>>,
}

impl LeadChanges {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.zip_code.is_none()
            && self.date_of_birth.is_none()
            && self.sex.is_none()
            && self.height.is_none()
            && self.weight.is_none()
            && self.smoker_status.is_none()
            && self.medical_conditions.is_none()
            && self.family_history.is_none()
            && self.income_range.is_none()
            && self.existing_coverage.is_none()
            && self.coverage_needs.is_none()
            && self.insurance_type_interest.is_none()
            && self.lead_source.is_none()
            && self.assigned_agent_id.is_none()
            && self.status.is_none()
            && self.notes.is_none()
            && self.last_contacted_at.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientChanges {
    pub name: Option<String>,
    // e-mail é NOT NULL, então aqui é Option simples: ou troca, ou não mexe
    pub email: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub zip_code: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub sex: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub date_of_birth: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub insurance_info: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub insurance_type: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub assigned_agent_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,

    pub status: Option<String>,
}

impl ClientChanges {
    // Projeção vazia = nenhum campo mapeado mudou = nem chamamos o update
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.zip_code.is_none()
            && self.sex.is_none()
            && self.date_of_birth.is_none()
            && self.insurance_info.is_none()
            && self.insurance_type.is_none()
            && self.assigned_agent_id.is_none()
            && self.notes.is_none()
            && self.status.is_none()
    }

    // Quantos campos este patch escreve (útil nos testes de mapeamento)
    pub fn field_count(&self) -> usize {
        [
            self.name.is_some(),
            self.email.is_some(),
            self.phone.is_some(),
            self.address.is_some(),
            self.city.is_some(),
            self.state.is_some(),
            self.zip_code.is_some(),
            self.sex.is_some(),
            self.date_of_birth.is_some(),
            self.insurance_info.is_some(),
            self.insurance_type.is_some(),
            self.assigned_agent_id.is_some(),
            self.notes.is_some(),
            self.status.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyChanges {
    pub policy_number: Option<String>,
    pub carrier: Option<String>,
    pub policy_type: Option<String>,
    pub status: Option<PolicyStatus>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub face_amount: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub premium: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub premium_frequency: Option<Option<PremiumFrequency>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub application_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub issue_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub expiry_date: Option<Option<NaiveDate>>,

    pub agent_id: Option<Uuid>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub client_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub lead_id: Option<Option<Uuid>>,
}

impl PolicyChanges {
    pub fn is_empty(&self) -> bool {
        self.policy_number.is_none()
            && self.carrier.is_none()
            && self.policy_type.is_none()
            && self.status.is_none()
            && self.face_amount.is_none()
            && self.premium.is_none()
            && self.premium_frequency.is_none()
            && self.application_date.is_none()
            && self.issue_date.is_none()
            && self.expiry_date.is_none()
            && self.agent_id.is_none()
            && self.client_id.is_none()
            && self.lead_id.is_none()
    }
}

// =============================================================================
//  RESPOSTAS COMPOSTAS
// =============================================================================

// Resposta da criação de lead quando a conversão ansiosa está ligada.
// Falha na criação do cliente NÃO derruba o 201: vira só o aviso
// `clientError` ao lado do lead criado.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadWithConversion {
    pub lead: Lead,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<Client>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_error: Option<String>,
}

// Resumo do job de backfill (criados / pulados / com erro)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct BackfillSummary {
    pub created: u64,
    pub skipped: u64,
    pub errors: u64,
}
