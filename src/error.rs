use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::error::ErrorKind;
use tracing::error;

/// Client-facing messages shared by the handlers.
pub mod messages {
    pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
    pub const INVALID_LIMIT: &str =
        "The 'limit' parameter must be a positive integer and cannot exceed 100.";
    pub const INVALID_PAGE: &str = "The 'page' parameter must be a positive integer.";
    pub const USER_NOT_FOUND: &str = "User not found";
    pub const CARD_NOT_FOUND: &str = "Card not found";
    pub const CARD_ID_IS_REQUIRED: &str = "Card ID is required";
    pub const CARD_CONSTRAINT: &str =
        "Card violates a uniqueness or required-field constraint (name, number and image must be unique).";
    pub const EMAIL_TAKEN: &str = "Email already registered";
    pub const DELETE_USER_SUCCESS: &str = "User deleted successfully";
    pub const INTERNAL_SERVER_ERROR: &str = "Internal server error";
}

/// Failure reported by a repository implementation.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Uniqueness, not-null, check or foreign-key violation.
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            match db.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation
                | ErrorKind::ForeignKeyViolation => {
                    return RepoError::Constraint(db.message().to_string())
                }
                _ => {}
            }
        }
        RepoError::Other(e.into())
    }
}

/// Every handler error funnels through here before reaching the client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    InvalidParameter(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidParameter(_) => "INVALID_PARAMETER",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Constraint(msg) => AppError::Internal(anyhow::anyhow!(msg)),
            RepoError::Other(e) => AppError::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                messages::INTERNAL_SERVER_ERROR.to_string()
            }
            other => other.to_string(),
        };
        let body = json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::from(RepoError::Other(anyhow::anyhow!(
            "relation \"cards\" does not exist"
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn constraint_errors_surface_as_internal() {
        let err = AppError::from(RepoError::Constraint("duplicate key".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");
    }

    #[test]
    fn status_and_code_mapping() {
        let cases = [
            (AppError::Validation("x".into()), 400, "VALIDATION_ERROR"),
            (AppError::InvalidParameter("x".into()), 400, "INVALID_PARAMETER"),
            (AppError::NotFound("x".into()), 404, "NOT_FOUND"),
            (AppError::Unauthorized("x".into()), 401, "UNAUTHORIZED"),
            (AppError::Conflict("x".into()), 409, "CONFLICT"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status().as_u16(), status);
            assert_eq!(err.code(), code);
        }
    }
}
