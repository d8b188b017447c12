use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{extractors::AuthUser, password::hash_password_blocking},
    error::{messages, AppError, RepoError},
    state::AppState,
    users::{
        dto::{MessageResponse, PublicUser, RegisterRequest},
        repo_types::NewUser,
    },
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/user", post(create_user).get(get_user).delete(delete_user))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let Json(mut payload) = payload.map_err(|e| {
        warn!(error = %e, "unreadable registration body");
        AppError::Validation(e.body_text())
    })?;
    payload.name = payload.name.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if payload.name.is_empty() {
        warn!("registration without name");
        return Err(AppError::Validation("Name is required.".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    if payload.password.is_empty() {
        warn!("registration without password");
        return Err(AppError::Validation("Password is required.".into()));
    }

    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict(messages::EMAIL_TAKEN.into()));
    }

    let password_hash = hash_password_blocking(payload.password).await?;

    let user = match state
        .users
        .create(NewUser {
            name: payload.name,
            email: payload.email,
            password_hash,
        })
        .await
    {
        Ok(u) => u,
        Err(RepoError::Constraint(e)) => {
            // lost a race with a concurrent registration
            warn!(error = %e, "create user hit a constraint");
            return Err(AppError::Conflict(messages::EMAIL_TAKEN.into()));
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(e.into());
        }
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state
        .users
        .find_by_id(identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound(messages::USER_NOT_FOUND.into()))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    let removed = state.users.delete(identity.id).await?;
    if removed == 0 {
        warn!(user_id = %identity.id, "delete for missing user");
        return Err(AppError::NotFound(messages::USER_NOT_FOUND.into()));
    }

    info!(user_id = %identity.id, "user deleted");
    Ok(Json(MessageResponse {
        message: messages::DELETE_USER_SUCCESS.into(),
    }))
}
