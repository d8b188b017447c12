use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{TokenRequest, TokenResponse},
        password::verify_password_blocking,
    },
    error::{messages, AppError},
    state::AppState,
};

pub fn token_routes() -> Router<AppState> {
    Router::new().route("/token", post(create_token))
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(mut payload) = payload.map_err(|e| {
        warn!(error = %e, "unreadable token request");
        AppError::Unauthorized(messages::INVALID_CREDENTIALS.into())
    })?;
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        warn!("token request missing credentials");
        return Err(AppError::Unauthorized(messages::INVALID_CREDENTIALS.into()));
    }

    let user = match state.users.find_by_email(&payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "token request for unknown email");
            return Err(AppError::Unauthorized(messages::INVALID_CREDENTIALS.into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(e.into());
        }
    };

    let ok = verify_password_blocking(payload.password, user.password_hash.clone()).await?;
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "token request with invalid password");
        return Err(AppError::Unauthorized(messages::INVALID_CREDENTIALS.into()));
    }

    let token = state.jwt.sign(user.id)?;

    info!(user_id = %user.id, "token issued");
    Ok(Json(TokenResponse { token }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::testing::{call, fake_app, seed_user};

    #[tokio::test]
    async fn issues_token_for_valid_credentials() {
        let (app, state) = fake_app();
        let user = seed_user(&state, "ash@example.com", "pikachu").await;

        let (status, body) = call(
            &app,
            "POST",
            "/token",
            None,
            Some(json!({"email": "ash@example.com", "password": "pikachu"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().expect("token");
        let claims = state.jwt.verify(token).expect("valid token");
        assert_eq!(claims.sub, user.id);
    }

    #[tokio::test]
    async fn rejects_wrong_password() {
        let (app, state) = fake_app();
        seed_user(&state, "ash@example.com", "pikachu").await;

        let (status, body) = call(
            &app,
            "POST",
            "/token",
            None,
            Some(json!({"email": "ash@example.com", "password": "raichu"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Invalid email or password");
        assert!(body.get("token").is_none());
    }

    #[tokio::test]
    async fn rejects_unknown_email_and_missing_fields() {
        let (app, _state) = fake_app();

        let (status, _) = call(
            &app,
            "POST",
            "/token",
            None,
            Some(json!({"email": "nobody@example.com", "password": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(&app, "POST", "/token", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Invalid email or password");
    }

    #[tokio::test]
    async fn unreadable_body_is_invalid_credentials() {
        let (app, _state) = fake_app();

        let (status, body) = call(&app, "POST", "/token", None, Some(json!("ash"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, body) = call(&app, "POST", "/token", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Invalid email or password");
    }
}
