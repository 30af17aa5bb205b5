//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

// Importações principais
use crate::config::AppState;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() {
    // Inicializa o logger
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    if app_state.eager_conversion {
        tracing::info!("⚡ Conversão ansiosa de leads LIGADA (EAGER_CLIENT_CONVERSION).");
    }

    // Define as rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Define as rotas de usuário (protegidas pelo middleware)
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let lead_routes = Router::new()
        .route("/"
               ,post(handlers::leads::create_lead)
               .get(handlers::leads::list_leads)
        )
        // PATCH e PUT caem no mesmo handler: os dois chamam o
        // reconciliador identicamente depois da escrita primária
        .route("/{id}"
               ,get(handlers::leads::get_lead)
               .patch(handlers::leads::update_lead)
               .put(handlers::leads::update_lead)
               .delete(handlers::leads::delete_lead)
        )
        .route("/{id}/convert"
               ,post(handlers::leads::convert_lead)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let client_routes = Router::new()
        .route("/"
               ,post(handlers::clients::create_client)
               .get(handlers::clients::list_clients)
        )
        .route("/{id}"
               ,get(handlers::clients::get_client)
               .patch(handlers::clients::update_client)
               .delete(handlers::clients::delete_client)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let policy_routes = Router::new()
        .route("/"
               ,post(handlers::policies::create_policy)
               .get(handlers::policies::list_policies)
        )
        .route("/{id}"
               ,get(handlers::policies::get_policy)
               .patch(handlers::policies::update_policy)
               .delete(handlers::policies::delete_policy)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let admin_routes = Router::new()
        .route("/backfill-clients"
               ,post(handlers::admin::backfill_clients)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/leads", lead_routes)
        .nest("/api/clients", client_routes)
        .nest("/api/policies", policy_routes)
        .nest("/api/admin", admin_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
