// src/services/sync_service.rs
//
// O motor de sincronização lead/cliente/apólice.
//
// Regras do jogo: a escrita primária (o create/update que o chamador fez)
// já foi commitada quando este serviço roda. Tudo aqui é melhor-esforço,
// síncrono e unidirecional: falha de sincronização é logada e engolida,
// NUNCA propaga para o chamador nem desfaz a escrita primária. O pior
// cenário é um cliente ficar defasado até o próximo update ou backfill.

use std::collections::HashSet;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CrmStore,
    models::crm::{
        BackfillSummary, Client, ClientChanges, CreateClientPayload, Lead, LeadChanges,
        LeadWithConversion, Policy, PolicyChanges,
    },
};

// ---
// Transformações de campo (lead -> cliente)
// ---

// Nome de exibição do cliente: "primeiro último", trim, caixa alta
pub(crate) fn display_name(first_name: &str, last_name: &str) -> String {
    format!("{} {}", first_name.trim(), last_name.trim())
        .trim()
        .to_uppercase()
}

// clients.email é NOT NULL; lead sem e-mail vira placeholder sintético
pub(crate) fn placeholder_email(lead_id: Uuid) -> String {
    format!("lead{}@placeholder.com", lead_id)
}

fn email_or_placeholder(email: Option<&str>, lead_id: Uuid) -> String {
    match email {
        Some(e) if !e.trim().is_empty() => e.to_string(),
        _ => placeholder_email(lead_id),
    }
}

// A tabela fixa de mapeamento lead -> cliente.
//
// A projeção parte do CONJUNTO DE CAMPOS ALTERADOS, não do registro
// inteiro: campo que o chamador não tocou não entra no patch, mesmo que
// esteja diferente do cliente. É last-write-wins por campo, restrito ao
// que o update realmente carregava.
fn project_lead_changes(lead: &Lead, changed: &LeadChanges) -> ClientChanges {
    let mut patch = ClientChanges::default();

    // firstName/lastName -> name (concatena, trim, caixa alta)
    if changed.first_name.is_some() || changed.last_name.is_some() {
        patch.name = Some(display_name(&lead.first_name, &lead.last_name));
    }
    // email limpo explicitamente também propaga, como placeholder
    if let Some(email) = &changed.email {
        patch.email = Some(email_or_placeholder(email.as_deref(), lead.id));
    }
    if let Some(v) = &changed.phone_number {
        patch.phone = Some(v.clone());
    }
    if let Some(v) = &changed.address {
        patch.address = Some(v.clone());
    }
    if let Some(v) = &changed.city {
        patch.city = Some(v.clone());
    }
    if let Some(v) = &changed.state {
        patch.state = Some(v.clone());
    }
    if let Some(v) = &changed.zip_code {
        patch.zip_code = Some(v.clone());
    }
    if let Some(v) = &changed.sex {
        patch.sex = Some(v.clone());
    }
    if let Some(v) = &changed.date_of_birth {
        patch.date_of_birth = Some(*v);
    }
    if let Some(v) = &changed.existing_coverage {
        patch.insurance_info = Some(v.clone());
    }
    if let Some(v) = &changed.insurance_type_interest {
        patch.insurance_type = Some(v.clone());
    }
    // Notas sobrescrevem por inteiro, sem merge/append
    if let Some(v) = &changed.notes {
        patch.notes = Some(v.clone());
    }
    if let Some(v) = &changed.assigned_agent_id {
        patch.assigned_agent_id = Some(*v);
    }
    if let Some(v) = &changed.status {
        patch.status = Some(v.as_str().to_string());
    }

    patch
}

// O mesmo mapeamento, aplicado na materialização de um cliente novo
// (conversão explícita, conversão ansiosa e backfill usam este)
pub(crate) fn client_from_lead(lead: &Lead) -> CreateClientPayload {
    CreateClientPayload {
        name: display_name(&lead.first_name, &lead.last_name),
        email: email_or_placeholder(lead.email.as_deref(), lead.id),
        phone: lead.phone_number.clone(),
        address: lead.address.clone(),
        city: lead.city.clone(),
        state: lead.state.clone(),
        zip_code: lead.zip_code.clone(),
        sex: lead.sex.clone(),
        date_of_birth: lead.date_of_birth,
        insurance_info: lead.existing_coverage.clone(),
        insurance_type: lead.insurance_type_interest.clone(),
        assigned_agent_id: lead.assigned_agent_id,
        notes: lead.notes.clone(),
        status: Some("active".to_string()),
        lead_id: Some(lead.id),
    }
}

// ---
// O serviço
// ---

#[derive(Clone)]
pub struct SyncService<S> {
    store: S,
}

impl<S: CrmStore> SyncService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    // =========================================================================
    //  RECONCILIADOR LEAD -> CLIENTE
    // =========================================================================

    // Chamado depois de cada update parcial de lead bem-sucedido (PATCH e
    // PUT chamam identicamente). Nunca retorna erro.
    pub async fn sync_lead_to_client(&self, lead_id: Uuid, lead: &Lead, changed: &LeadChanges) {
        let clients = match self.store.get_clients_by_lead_id(lead_id).await {
            Ok(clients) => clients,
            Err(e) => {
                tracing::error!("Sync lead->cliente: lookup falhou para o lead {}: {}", lead_id, e);
                return;
            }
        };

        // Lead que nunca converteu não tem cliente: estado normal, não erro.
        // Havendo mais de um (dados legados), opera no primeiro inserido.
        let Some(client) = clients.into_iter().next() else {
            tracing::warn!("Sync lead->cliente: lead {} não tem cliente vinculado.", lead_id);
            return;
        };

        let patch = project_lead_changes(lead, changed);
        if patch.is_empty() {
            // Nenhum campo mapeado mudou; não gasta um write à toa
            return;
        }

        if let Err(e) = self.store.update_client(client.id, &patch).await {
            // A escrita primária no lead já passou; aqui só registra
            tracing::error!(
                "Sync lead->cliente: update do cliente {} (lead {}) falhou: {}",
                client.id,
                lead_id,
                e
            );
        }
    }

    // =========================================================================
    //  VINCULADOR APÓLICE -> CLIENTE
    // =========================================================================

    // Resolução única usada pelos dois pontos de entrada do vinculador
    async fn find_client_id_for_lead(&self, lead_id: Uuid) -> Result<Option<Uuid>, AppError> {
        let clients = self.store.get_clients_by_lead_id(lead_id).await?;
        Ok(clients.first().map(|c| c.id))
    }

    // Chamado logo após o INSERT da apólice, antes da resposta de criação.
    // Devolve a apólice com o melhor client_id derivável no momento.
    // Idempotente: apólice já vinculada volta intocada.
    pub async fn associate_policy_with_client(&self, policy: Policy) -> Policy {
        if policy.client_id.is_some() {
            return policy;
        }
        let Some(lead_id) = policy.lead_id else {
            // Sem lead não tem por onde inferir
            return policy;
        };

        match self.find_client_id_for_lead(lead_id).await {
            Ok(Some(client_id)) => {
                let patch = PolicyChanges {
                    client_id: Some(Some(client_id)),
                    ..Default::default()
                };
                match self.store.update_policy(policy.id, &patch).await {
                    Ok(Some(updated)) => updated,
                    Ok(None) => policy,
                    Err(e) => {
                        tracing::error!(
                            "Vinculador: gravar client_id na apólice {} falhou: {}",
                            policy.id,
                            e
                        );
                        policy
                    }
                }
            }
            Ok(None) => policy,
            Err(e) => {
                tracing::error!(
                    "Vinculador: lookup de cliente pelo lead {} falhou: {}",
                    lead_id,
                    e
                );
                policy
            }
        }
    }

    // Passe de verificação rodado após create E update de apólice.
    // Não mexe no cliente: existe só para (re)garantir a associação.
    pub async fn sync_policy_to_client(&self, policy_id: Uuid, policy: &Policy) {
        if policy.client_id.is_some() {
            return;
        }
        let Some(lead_id) = policy.lead_id else {
            // Apólice só com agente e sem cliente é estado terminal aceito
            tracing::info!("Apólice {} sem cliente e sem lead de origem.", policy_id);
            return;
        };

        match self.find_client_id_for_lead(lead_id).await {
            Ok(Some(client_id)) => {
                let patch = PolicyChanges {
                    client_id: Some(Some(client_id)),
                    ..Default::default()
                };
                if let Err(e) = self.store.update_policy(policy_id, &patch).await {
                    tracing::error!(
                        "Vinculador: gravar client_id na apólice {} falhou: {}",
                        policy_id,
                        e
                    );
                }
            }
            Ok(None) => {
                tracing::info!(
                    "Apólice {}: nenhum cliente derivável pelo lead {}.",
                    policy_id,
                    lead_id
                );
            }
            Err(e) => {
                tracing::error!(
                    "Vinculador: lookup de cliente pelo lead {} falhou: {}",
                    lead_id,
                    e
                );
            }
        }
    }

    // =========================================================================
    //  CONVERSÃO LEAD -> CLIENTE
    // =========================================================================

    // Conversão explícita (a ação "converter" da API). Idempotente: lead
    // já convertido devolve o cliente existente em vez de duplicar.
    pub async fn convert_lead(&self, lead: &Lead) -> Result<Client, AppError> {
        if let Some(existing) = self
            .store
            .get_clients_by_lead_id(lead.id)
            .await?
            .into_iter()
            .next()
        {
            return Ok(existing);
        }

        self.store.create_client(&client_from_lead(lead)).await
    }

    // Conversão ansiosa (opt-in via EAGER_CLIENT_CONVERSION). A criação do
    // lead já passou; se a do cliente falhar, a resposta continua 201 e o
    // erro vira só o aviso clientError.
    pub async fn on_lead_created(&self, lead: Lead) -> LeadWithConversion {
        match self.convert_lead(&lead).await {
            Ok(client) => LeadWithConversion {
                lead,
                client: Some(client),
                client_error: None,
            },
            Err(e) => {
                tracing::error!("Conversão ansiosa falhou para o lead {}: {}", lead.id, e);
                LeadWithConversion {
                    lead,
                    client: None,
                    client_error: Some(e.to_string()),
                }
            }
        }
    }

    // Job de backfill (admin): materializa clientes para todos os leads
    // ainda sem vínculo. Falha por registro não interrompe a varredura nem
    // desfaz os já criados; rodar de novo converge (created = 0).
    pub async fn backfill_lead_client_links(&self) -> Result<BackfillSummary, AppError> {
        let leads = self.store.get_leads().await?;
        let clients = self.store.get_clients().await?;

        let linked: HashSet<Uuid> = clients.iter().filter_map(|c| c.lead_id).collect();

        let mut summary = BackfillSummary {
            created: 0,
            skipped: 0,
            errors: 0,
        };

        for lead in &leads {
            if linked.contains(&lead.id) {
                summary.skipped += 1;
                continue;
            }
            match self.store.create_client(&client_from_lead(lead)).await {
                Ok(_) => summary.created += 1,
                Err(e) => {
                    tracing::error!("Backfill: criar cliente para o lead {} falhou: {}", lead.id, e);
                    summary.errors += 1;
                }
            }
        }

        tracing::info!(
            "Backfill concluído: {} criados, {} pulados, {} erros.",
            summary.created,
            summary.skipped,
            summary.errors
        );

        Ok(summary)
    }
}

// =============================================================================
//  TESTES
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemStore;
    use crate::models::crm::{CreateLeadPayload, CreatePolicyPayload, LeadStatus};

    fn lead_payload(first: &str, last: &str, email: Option<&str>) -> CreateLeadPayload {
        CreateLeadPayload {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.map(|e| e.to_string()),
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

    fn policy_payload(
        agent_id: Uuid,
        lead_id: Option<Uuid>,
        client_id: Option<Uuid>,
    ) -> CreatePolicyPayload {
        CreatePolicyPayload {
            policy_number: "VID-2024-00001".to_string(),
            carrier: "Seguradora Atlântica".to_string(),
            policy_type: "vida_inteira".to_string(),
            status: None,
            face_amount: None,
            premium: None,
            premium_frequency: None,
            application_date: None,
            issue_date: None,
            expiry_date: None,
            agent_id,
            client_id,
            lead_id,
        }
    }

    fn count_ops(store: &MemStore, prefix: &str) -> usize {
        store
            .ops()
            .iter()
            .filter(|op| op.starts_with(prefix))
            .count()
    }

    // --- Vinculador ---

    #[tokio::test]
    async fn associate_policy_is_idempotent() {
        let store = MemStore::new();
        let svc = SyncService::new(store.clone());

        let lead = store
            .create_lead(&lead_payload("Ana", "Souza", Some("ana@example.com")))
            .await
            .unwrap();
        let client = svc.convert_lead(&lead).await.unwrap();
        let policy = store
            .create_policy(&policy_payload(Uuid::new_v4(), Some(lead.id), None))
            .await
            .unwrap();

        let once = svc.associate_policy_with_client(policy).await;
        assert_eq!(once.client_id, Some(client.id));

        let twice = svc.associate_policy_with_client(once.clone()).await;
        assert_eq!(twice.client_id, Some(client.id));

        // A segunda chamada curto-circuita: só um update de apólice no total
        assert_eq!(count_ops(&store, "update_policy"), 1);
    }

    #[tokio::test]
    async fn transitive_linking_resolves_client_through_lead() {
        let store = MemStore::new();
        let svc = SyncService::new(store.clone());

        let lead = store
            .create_lead(&lead_payload("Ana", "Souza", Some("a@example.com")))
            .await
            .unwrap();
        let client = svc.convert_lead(&lead).await.unwrap();
        let policy = store
            .create_policy(&policy_payload(Uuid::new_v4(), Some(lead.id), None))
            .await
            .unwrap();

        svc.sync_policy_to_client(policy.id, &policy).await;

        let stored = store.get_policy(policy.id).await.unwrap().unwrap();
        assert_eq!(stored.client_id, Some(client.id));
    }

    #[tokio::test]
    async fn policy_without_lead_or_client_is_left_alone() {
        let store = MemStore::new();
        let svc = SyncService::new(store.clone());

        let policy = store
            .create_policy(&policy_payload(Uuid::new_v4(), None, None))
            .await
            .unwrap();

        let result = svc.associate_policy_with_client(policy.clone()).await;
        assert_eq!(result.client_id, None);

        svc.sync_policy_to_client(policy.id, &policy).await;
        assert_eq!(count_ops(&store, "update_policy"), 0);
    }

    // --- Reconciliador ---

    #[tokio::test]
    async fn mapped_field_change_propagates_to_client() {
        let store = MemStore::new();
        let svc = SyncService::new(store.clone());

        let lead = store
            .create_lead(&lead_payload("Ana", "Souza", Some("ana@example.com")))
            .await
            .unwrap();
        let client = svc.convert_lead(&lead).await.unwrap();

        let changes = LeadChanges {
            city: Some(Some("Curitiba".to_string())),
            ..Default::default()
        };
        let lead = store.update_lead(lead.id, &changes).await.unwrap().unwrap();

        svc.sync_lead_to_client(lead.id, &lead, &changes).await;

        let stored = store.get_client(client.id).await.unwrap().unwrap();
        assert_eq!(stored.city.as_deref(), Some("Curitiba"));
        assert_eq!(count_ops(&store, "update_client"), 1);
    }

    #[tokio::test]
    async fn unmapped_field_change_never_writes_client() {
        let store = MemStore::new();
        let svc = SyncService::new(store.clone());

        let lead = store
            .create_lead(&lead_payload("Ana", "Souza", Some("ana@example.com")))
            .await
            .unwrap();
        svc.convert_lead(&lead).await.unwrap();

        // height não está na tabela de mapeamento
        let changes = LeadChanges {
            height: Some(Some("1,80m".to_string())),
            ..Default::default()
        };
        let lead = store.update_lead(lead.id, &changes).await.unwrap().unwrap();

        svc.sync_lead_to_client(lead.id, &lead, &changes).await;

        assert_eq!(count_ops(&store, "update_client"), 0);
    }

    #[tokio::test]
    async fn lead_without_client_is_a_quiet_no_op() {
        let store = MemStore::new();
        let svc = SyncService::new(store.clone());

        let lead = store
            .create_lead(&lead_payload("Ana", "Souza", None))
            .await
            .unwrap();

        let changes = LeadChanges {
            first_name: Some("Mariana".to_string()),
            ..Default::default()
        };
        let lead = store.update_lead(lead.id, &changes).await.unwrap().unwrap();

        // Não lança e, crucialmente, não cria cliente como efeito colateral
        svc.sync_lead_to_client(lead.id, &lead, &changes).await;

        assert_eq!(count_ops(&store, "create_client"), 0);
        assert_eq!(count_ops(&store, "update_client"), 0);
    }

    #[tokio::test]
    async fn cleared_email_becomes_placeholder_on_client() {
        let store = MemStore::new();
        let svc = SyncService::new(store.clone());

        let lead = store
            .create_lead(&lead_payload("Ana", "Souza", Some("ana@example.com")))
            .await
            .unwrap();
        let client = svc.convert_lead(&lead).await.unwrap();

        // E-mail explicitamente limpo no payload
        let changes = LeadChanges {
            email: Some(None),
            ..Default::default()
        };
        let lead = store.update_lead(lead.id, &changes).await.unwrap().unwrap();

        svc.sync_lead_to_client(lead.id, &lead, &changes).await;

        let stored = store.get_client(client.id).await.unwrap().unwrap();
        assert_eq!(stored.email, format!("lead{}@placeholder.com", lead.id));
        assert!(!stored.email.is_empty());
    }

    #[tokio::test]
    async fn repository_failure_is_swallowed() {
        let store = MemStore::new();
        let svc = SyncService::new(store.clone());

        let lead = store
            .create_lead(&lead_payload("Ana", "Souza", Some("ana@example.com")))
            .await
            .unwrap();
        let client = svc.convert_lead(&lead).await.unwrap();

        store.fail_client_updates();

        let changes = LeadChanges {
            city: Some(Some("Curitiba".to_string())),
            ..Default::default()
        };
        let lead = store.update_lead(lead.id, &changes).await.unwrap().unwrap();

        // Deve retornar normalmente apesar do repositório rejeitar o write
        svc.sync_lead_to_client(lead.id, &lead, &changes).await;

        let stored = store.get_client(client.id).await.unwrap().unwrap();
        assert_eq!(stored.city, None);
    }

    #[tokio::test]
    async fn duplicate_clients_tie_break_on_first_inserted() {
        let store = MemStore::new();
        let svc = SyncService::new(store.clone());

        let lead = store
            .create_lead(&lead_payload("Ana", "Souza", Some("ana@example.com")))
            .await
            .unwrap();

        // Dois clientes apontando pro mesmo lead (estado legado que o
        // banco novo já não permite, mas o código precisa tolerar)
        let first = store.create_client(&client_from_lead(&lead)).await.unwrap();
        let second = store.create_client(&client_from_lead(&lead)).await.unwrap();

        let changes = LeadChanges {
            city: Some(Some("Curitiba".to_string())),
            ..Default::default()
        };
        let lead = store.update_lead(lead.id, &changes).await.unwrap().unwrap();
        svc.sync_lead_to_client(lead.id, &lead, &changes).await;

        let first = store.get_client(first.id).await.unwrap().unwrap();
        let second = store.get_client(second.id).await.unwrap().unwrap();
        assert_eq!(first.city.as_deref(), Some("Curitiba"));
        assert_eq!(second.city, None);
    }

    // --- Tabela de mapeamento, campo a campo ---

    #[tokio::test]
    async fn mapping_table_writes_exactly_one_field_per_change() {
        let store = MemStore::new();
        let lead = store
            .create_lead(&lead_payload("João", "Silva", Some("joao@example.com")))
            .await
            .unwrap();

        // Nome: firstName OU lastName alterado escreve só `name`
        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                first_name: Some("João".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(patch.field_count(), 1);
        assert_eq!(patch.name.as_deref(), Some("JOÃO SILVA"));

        // Os dois juntos ainda escrevem um único campo no cliente
        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                first_name: Some("João".to_string()),
                last_name: Some("Silva".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(patch.field_count(), 1);

        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                email: Some(Some("novo@example.com".to_string())),
                ..Default::default()
            },
        );
        assert_eq!(patch.field_count(), 1);
        assert_eq!(patch.email.as_deref(), Some("novo@example.com"));

        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                phone_number: Some(Some("41999990000".to_string())),
                ..Default::default()
            },
        );
        assert_eq!(patch.field_count(), 1);
        assert_eq!(patch.phone, Some(Some("41999990000".to_string())));

        // Endereço: cada pedaço propaga independente
        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                address: Some(Some("Rua A, 10".to_string())),
                ..Default::default()
            },
        );
        assert_eq!(patch.field_count(), 1);
        assert_eq!(patch.address, Some(Some("Rua A, 10".to_string())));

        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                city: Some(Some("Curitiba".to_string())),
                ..Default::default()
            },
        );
        assert_eq!(patch.field_count(), 1);
        assert_eq!(patch.city, Some(Some("Curitiba".to_string())));

        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                state: Some(Some("PR".to_string())),
                ..Default::default()
            },
        );
        assert_eq!(patch.field_count(), 1);
        assert_eq!(patch.state, Some(Some("PR".to_string())));

        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                zip_code: Some(Some("80000-000".to_string())),
                ..Default::default()
            },
        );
        assert_eq!(patch.field_count(), 1);
        assert_eq!(patch.zip_code, Some(Some("80000-000".to_string())));

        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                sex: Some(Some("F".to_string())),
                ..Default::default()
            },
        );
        assert_eq!(patch.field_count(), 1);
        assert_eq!(patch.sex, Some(Some("F".to_string())));

        // Renomeações da tabela: existingCoverage -> insuranceInfo,
        // insuranceTypeInterest -> insuranceType
        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                existing_coverage: Some(Some("apólice antiga".to_string())),
                ..Default::default()
            },
        );
        assert_eq!(patch.field_count(), 1);
        assert_eq!(patch.insurance_info, Some(Some("apólice antiga".to_string())));

        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                insurance_type_interest: Some(Some("vida inteira".to_string())),
                ..Default::default()
            },
        );
        assert_eq!(patch.field_count(), 1);
        assert_eq!(patch.insurance_type, Some(Some("vida inteira".to_string())));

        // Notas: sobrescrita integral
        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                notes: Some(Some("ligou pedindo cotação".to_string())),
                ..Default::default()
            },
        );
        assert_eq!(patch.field_count(), 1);
        assert_eq!(patch.notes, Some(Some("ligou pedindo cotação".to_string())));

        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                date_of_birth: Some(chrono::NaiveDate::from_ymd_opt(1985, 3, 10)),
                ..Default::default()
            },
        );
        assert_eq!(patch.field_count(), 1);
        assert_eq!(
            patch.date_of_birth,
            Some(chrono::NaiveDate::from_ymd_opt(1985, 3, 10))
        );

        let agent = Uuid::new_v4();
        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                assigned_agent_id: Some(Some(agent)),
                ..Default::default()
            },
        );
        assert_eq!(patch.field_count(), 1);
        assert_eq!(patch.assigned_agent_id, Some(Some(agent)));

        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                status: Some(LeadStatus::Qualified),
                ..Default::default()
            },
        );
        assert_eq!(patch.field_count(), 1);
        assert_eq!(patch.status.as_deref(), Some("qualified"));

        // E o contra-exemplo: campo fora da tabela projeta vazio
        let patch = project_lead_changes(
            &lead,
            &LeadChanges {
                smoker_status: Some(Some("não fumante".to_string())),
                ..Default::default()
            },
        );
        assert!(patch.is_empty());
    }

    // --- Conversão e backfill ---

    #[tokio::test]
    async fn convert_lead_is_idempotent() {
        let store = MemStore::new();
        let svc = SyncService::new(store.clone());

        let lead = store
            .create_lead(&lead_payload("Ana", "Souza", None))
            .await
            .unwrap();

        let first = svc.convert_lead(&lead).await.unwrap();
        let second = svc.convert_lead(&lead).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.client_count(), 1);
        // Lead sem e-mail ganhou o placeholder na conversão
        assert_eq!(first.email, format!("lead{}@placeholder.com", lead.id));
        assert_eq!(first.name, "ANA SOUZA");
    }

    #[tokio::test]
    async fn eager_conversion_failure_is_only_advisory() {
        let store = MemStore::new();
        let svc = SyncService::new(store.clone());

        let lead = store
            .create_lead(&lead_payload("Ana", "Souza", Some("ana@example.com")))
            .await
            .unwrap();

        store.fail_client_creates();

        let outcome = svc.on_lead_created(lead.clone()).await;

        // O lead sobrevive; a falha vira aviso, não erro
        assert_eq!(outcome.lead.id, lead.id);
        assert!(outcome.client.is_none());
        assert!(outcome.client_error.is_some());
    }

    #[tokio::test]
    async fn backfill_converges_on_second_run() {
        let store = MemStore::new();
        let svc = SyncService::new(store.clone());

        let l1 = store
            .create_lead(&lead_payload("Ana", "Souza", Some("ana@example.com")))
            .await
            .unwrap();
        store
            .create_lead(&lead_payload("Bruno", "Lima", None))
            .await
            .unwrap();
        store
            .create_lead(&lead_payload("Carla", "Melo", Some("carla@example.com")))
            .await
            .unwrap();

        // Um dos três já tem cliente
        svc.convert_lead(&l1).await.unwrap();

        let first_run = svc.backfill_lead_client_links().await.unwrap();
        assert_eq!(first_run.created, 2);
        assert_eq!(first_run.skipped, 1);
        assert_eq!(first_run.errors, 0);

        let second_run = svc.backfill_lead_client_links().await.unwrap();
        assert_eq!(second_run.created, 0);
        assert_eq!(second_run.skipped, 3);
        assert_eq!(second_run.errors, 0);

        // Convergiu: um cliente por lead
        assert_eq!(store.client_count(), 3);
    }

    #[tokio::test]
    async fn backfill_keeps_scanning_past_per_record_failures() {
        let store = MemStore::new();
        let svc = SyncService::new(store.clone());

        store
            .create_lead(&lead_payload("Ana", "Souza", None))
            .await
            .unwrap();
        store
            .create_lead(&lead_payload("Bruno", "Lima", None))
            .await
            .unwrap();

        store.fail_client_creates();

        // Falha por registro não interrompe a varredura nem vira Err
        let summary = svc.backfill_lead_client_links().await.unwrap();
        assert_eq!(summary.created, 0);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.errors, 2);
    }
}
