pub mod auth;
pub mod crm_service;
pub mod sync_service;

pub use auth::AuthService;
pub use crm_service::CrmService;
pub use sync_service::SyncService;
