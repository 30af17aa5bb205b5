// src/config.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    db::{CrmRepository, UserRepository},
    services::{AuthService, CrmService, SyncService},
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    // Conversão ansiosa (lead novo já vira cliente) é opt-in via env;
    // o padrão é a conversão preguiçosa (ação explícita ou backfill)
    pub eager_conversion: bool,
    pub auth_service: AuthService,
    pub crm_service: CrmService<CrmRepository>,
    pub sync_service: SyncService<CrmRepository>,
}

impl AppState {
    // A assinatura retorna um Result: se a configuração falhar, quem
    // decide o que fazer é o main
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");
        let eager_conversion = env::var("EAGER_CLIENT_CONVERSION")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let crm_repo = CrmRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo, jwt_secret);
        let crm_service = CrmService::new(crm_repo.clone());
        let sync_service = SyncService::new(crm_repo);

        Ok(Self {
            db_pool,
            eager_conversion,
            auth_service,
            crm_service,
            sync_service,
        })
    }
}
