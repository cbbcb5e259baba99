use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::{api::AppState, error::AppError, models::UserIdentity};

/// Caller identity on routes that require a bearer token
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserIdentity);

/// Caller identity on routes where authentication only personalizes the
/// response. A missing or invalid token yields `None`.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<UserIdentity>);

impl MaybeAuthUser {
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}

/// Token from an `Authorization: Bearer <token>` header
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Auth("Authentication required".to_string()))?;

        state.identity.verify(token).map(AuthUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = bearer_token(parts).and_then(|token| match state.identity.verify(token) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring invalid token on optional-auth route");
                None
            }
        });

        Ok(MaybeAuthUser(user))
    }
}
