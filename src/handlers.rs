pub mod admin;
pub mod auth;
pub mod clients;
pub mod leads;
pub mod policies;
