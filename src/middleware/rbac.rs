// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    models::auth::{User, UserRole},
};

/// 1. O Trait que define uma exigência de papel
pub trait RoleDef: Send + Sync + 'static {
    fn allows(role: UserRole) -> bool;
    fn describe() -> &'static str;
}

/// 2. O Extractor (Guardião)
///
/// Uso num handler: `_guard: RequireRole<AdminOnly>`. Depende do
/// auth_guard já ter colocado o User nos extensions da requisição.
pub struct RequireRole<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<User>().ok_or(AppError::InvalidToken)?;

        if !T::allows(user.role) {
            return Err(AppError::Forbidden(format!(
                "Você precisa de papel '{}' para realizar esta ação.",
                T::describe()
            )));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PAPÉIS EXIGIDOS (TIPOS)
// ---

pub struct AdminOnly;
impl RoleDef for AdminOnly {
    fn allows(role: UserRole) -> bool {
        role == UserRole::Admin
    }
    fn describe() -> &'static str {
        "admin"
    }
}

pub struct TeamLeaderOrAdmin;
impl RoleDef for TeamLeaderOrAdmin {
    fn allows(role: UserRole) -> bool {
        matches!(role, UserRole::Admin | UserRole::TeamLeader)
    }
    fn describe() -> &'static str {
        "admin ou líder de equipe"
    }
}
