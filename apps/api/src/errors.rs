use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Validation {
        code: &'static str,
        message: String,
    },

    #[error("Insufficient credits: balance {balance}, required {required}")]
    InsufficientCredits { balance: i64, required: i64 },

    #[error("Rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{message}")]
    Upstream {
        code: &'static str,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// A precondition failure with a stable, machine-readable code
    /// (e.g. `NO_SNAPSHOT`, `NO_REQUIREMENTS`, `NO_RESUME`).
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            code,
            message: message.into(),
        }
    }

    /// A completion-call failure (network, API, or unparseable output).
    /// Always surfaced as retryable; callers must run the refund path first.
    pub fn upstream(code: &'static str, message: impl Into<String>) -> Self {
        AppError::Upstream {
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation { code, message } => {
                (StatusCode::UNPROCESSABLE_ENTITY, *code, message.clone())
            }
            AppError::InsufficientCredits { balance, required } => {
                let body = Json(json!({
                    "error": {
                        "code": "INSUFFICIENT_CREDITS",
                        "message": format!(
                            "This action costs {required} credit(s) but your balance is {balance}. \
                             Top up to continue."
                        ),
                        "balance": balance,
                        "required": required,
                    }
                }));
                return (StatusCode::PAYMENT_REQUIRED, body).into_response();
            }
            AppError::RateLimited {
                retry_after_seconds,
            } => {
                let body = Json(json!({
                    "error": {
                        "code": "TOO_MANY_REQUESTS",
                        "message": format!("Rate limit exceeded. Retry in {retry_after_seconds}s."),
                        "retry_after_seconds": retry_after_seconds,
                    }
                }));
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_after_seconds.to_string())],
                    body,
                )
                    .into_response();
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Upstream { code, message } => {
                tracing::error!("Upstream error ({code}): {message}");
                (StatusCode::BAD_GATEWAY, *code, message.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_carries_code() {
        let err = AppError::validation("NO_SNAPSHOT", "No JD snapshot saved for this job card");
        match err {
            AppError::Validation { code, .. } => assert_eq!(code, "NO_SNAPSHOT"),
            _ => panic!("expected Validation"),
        }
    }

    #[test]
    fn test_rate_limited_display_includes_seconds() {
        let err = AppError::RateLimited {
            retry_after_seconds: 42,
        };
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_insufficient_credits_display() {
        let err = AppError::InsufficientCredits {
            balance: 0,
            required: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("balance 0"));
        assert!(msg.contains("required 5"));
    }
}
