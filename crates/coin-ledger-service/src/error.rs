//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use coin_ledger_core::WalletError;
use coin_ledger_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request - malformed or out-of-range input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing or invalid credentials.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Valid credentials but insufficient permissions.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Daily coin-earning cap reached.
    #[error("daily limit reached: remaining={remaining}")]
    DailyLimitReached {
        /// Coins still purchasable today.
        remaining: i64,
    },

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A purchase token is already bound to a different account.
    #[error("purchase already claimed by another account")]
    AlreadyClaimed,

    /// A business rule was violated (insufficient balance, expired invite,
    /// inactive product).
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// Insufficient coin balance.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// Invite code generation kept colliding until the attempt cap.
    #[error("invite code generation exhausted after {attempts} attempts")]
    CodeGenerationExhausted {
        /// Attempts made before giving up.
        attempts: usize,
    },

    /// External service error or missing wallet configuration.
    #[error("external service error: {0}")]
    ExternalService(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::InvalidArgument(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_argument",
                msg.clone(),
                None,
            ),
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                self.to_string(),
                None,
            ),
            Self::PermissionDenied(msg) => (
                StatusCode::FORBIDDEN,
                "permission_denied",
                msg.clone(),
                None,
            ),
            Self::DailyLimitReached { remaining } => (
                StatusCode::FORBIDDEN,
                "daily_limit_reached",
                self.to_string(),
                Some(serde_json::json!({ "remaining": remaining })),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::AlreadyClaimed => (
                StatusCode::CONFLICT,
                "already_claimed",
                self.to_string(),
                None,
            ),
            Self::FailedPrecondition(msg) => (
                StatusCode::PRECONDITION_FAILED,
                "failed_precondition",
                msg.clone(),
                None,
            ),
            Self::InsufficientBalance { balance, required } => (
                StatusCode::PRECONDITION_FAILED,
                "failed_precondition",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::CodeGenerationExhausted { attempts } => {
                tracing::error!(attempts = %attempts, "Invite code generation exhausted");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "code_generation_exhausted",
                    self.to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_unavailable",
                msg.clone(),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity}: {id}")),
            StoreError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            StoreError::InsufficientBalance { balance, required } => {
                Self::InsufficientBalance { balance, required }
            }
            StoreError::InviteExpired { code } => {
                Self::FailedPrecondition(format!("invite expired: {code}"))
            }
            StoreError::InviteExhausted { code } => {
                Self::FailedPrecondition(format!("invite has no uses left: {code}"))
            }
            StoreError::CodeCollision { .. }
            | StoreError::Database(_)
            | StoreError::Serialization(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            WalletError::InvalidId(e) => Self::InvalidArgument(e.to_string()),
            WalletError::Unauthenticated => Self::Unauthenticated,
            WalletError::PermissionDenied(msg) => Self::PermissionDenied(msg),
            WalletError::InsufficientBalance { balance, required } => {
                Self::InsufficientBalance { balance, required }
            }
            WalletError::FailedPrecondition(msg) => Self::FailedPrecondition(msg),
            WalletError::MisconfiguredProduct(msg) => {
                Self::FailedPrecondition(format!("misconfigured product: {msg}"))
            }
            WalletError::NotFound { entity, id } => Self::NotFound(format!("{entity}: {id}")),
            WalletError::AlreadyClaimed => Self::AlreadyClaimed,
            WalletError::DailyLimitReached { remaining } => Self::DailyLimitReached { remaining },
            WalletError::ConfigMissing => {
                Self::ExternalService("wallet configuration missing".into())
            }
            WalletError::ExternalService { service, message } => {
                Self::ExternalService(format!("{service}: {message}"))
            }
            WalletError::Internal(msg) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_404() {
        let err: ApiError = StoreError::NotFound {
            entity: "invite",
            id: "ABCD2345".into(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn daily_limit_carries_remaining() {
        let err: ApiError = WalletError::DailyLimitReached { remaining: 120 }.into();
        assert!(matches!(
            err,
            ApiError::DailyLimitReached { remaining: 120 }
        ));
    }

    #[tokio::test]
    async fn code_generation_exhaustion_names_itself() {
        let response = ApiError::CodeGenerationExhausted { attempts: 5 }.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "code_generation_exhausted");
        assert_eq!(
            body["error"]["message"],
            "invite code generation exhausted after 5 attempts"
        );
    }
}
