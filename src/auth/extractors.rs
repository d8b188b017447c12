use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

/// Caller identity resolved from a bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

/// Extracts and validates the JWT, then resolves it to a stored user.
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let claims = state.jwt.verify(token.trim()).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Unauthorized("Invalid or expired token".into())
        })?;

        let user = state.users.find_by_id(claims.sub).await.map_err(|e| {
            error!(error = %e, user_id = %claims.sub, "identity lookup failed");
            AppError::from(e)
        })?;

        match user {
            Some(u) => Ok(AuthUser(Identity {
                id: u.id,
                email: u.email,
            })),
            None => {
                warn!(user_id = %claims.sub, "token subject no longer exists");
                Err(AppError::Unauthorized("Invalid or expired token".into()))
            }
        }
    }
}
