//! Error types for coin-ledger storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
///
/// Business-rule failures detected inside compound transactions (insufficient
/// balance, expired invite) are variants here so the transaction can abort
/// with no partial writes.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record that was not found.
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// The mutation's arguments are out of range (zero delta, overflow).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The balance would go negative.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Current balance in coins.
        balance: i64,
        /// Coins required by the operation.
        required: i64,
    },

    /// The invite's expiry has passed.
    #[error("invite expired: {code}")]
    InviteExpired {
        /// The expired code.
        code: String,
    },

    /// The invite's use-count cap has been reached.
    #[error("invite maxed out: {code}")]
    InviteExhausted {
        /// The exhausted code.
        code: String,
    },

    /// An invite with this code already exists; the caller regenerates.
    #[error("invite code collision: {code}")]
    CodeCollision {
        /// The colliding code.
        code: String,
    },
}
