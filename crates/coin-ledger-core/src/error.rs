//! Error taxonomy for the coin ledger.

use crate::ids::IdError;

/// Result type for coin-ledger operations.
pub type Result<T> = std::result::Result<T, WalletError>;

/// Errors that can occur in wallet and fulfillment operations.
///
/// Every public operation maps its failure to exactly one of these variants;
/// validation never uses catch-and-ignore control flow.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// Malformed, missing, or out-of-range input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing or invalid credentials.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Valid credentials but the caller may not perform this operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The balance would go negative.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Current balance in coins.
        balance: i64,
        /// Coins required by the operation.
        required: i64,
    },

    /// A business rule was violated (inactive product, expired invite, ...).
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record that was not found.
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// A purchase token is already bound to a different account.
    #[error("purchase already claimed by another account")]
    AlreadyClaimed,

    /// The daily coin-earning cap would be exceeded.
    #[error("daily limit reached: remaining={remaining}")]
    DailyLimitReached {
        /// Coins still purchasable today.
        remaining: i64,
    },

    /// A catalog product cannot be fulfilled as configured.
    #[error("misconfigured product: {0}")]
    MisconfiguredProduct(String),

    /// The wallet configuration record is absent.
    #[error("wallet configuration missing")]
    ConfigMissing,

    /// An external collaborator failed or is unreachable.
    #[error("external service error: {service} - {message}")]
    ExternalService {
        /// The service that failed.
        service: String,
        /// Error message.
        message: String,
    },

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Unexpected internal failure (store, serialization).
    #[error("internal error: {0}")]
    Internal(String),
}
