//! Ledger entry types.
//!
//! Every balance change appends an immutable `LedgerEntry`. Entries are never
//! updated or deleted; `balance_after` is a snapshot taken at commit time and
//! is not recomputed later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::VipTier;
use crate::error::{Result, WalletError};
use crate::{EntryId, UserId};

/// An immutable ledger entry recording one balance mutation.
///
/// Entries use ULIDs for time-ordered IDs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry ID (ULID for time-ordering).
    pub id: EntryId,

    /// The user whose balance was affected.
    pub user_id: UserId,

    /// Type of entry.
    pub entry_type: EntryType,

    /// Signed amount in coins. Positive = credit, negative = debit.
    pub amount: i64,

    /// Balance after this entry (snapshot, not recomputed).
    pub balance_after: i64,

    /// Human-readable note.
    pub note: String,

    /// Who initiated the mutation.
    pub actor: Actor,

    /// Additional metadata (payment id, provider, ...).
    pub metadata: serde_json::Value,

    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create a new entry of the given type.
    #[must_use]
    pub fn new(
        user_id: UserId,
        entry_type: EntryType,
        amount: i64,
        balance_after: i64,
        note: String,
        actor: Actor,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            user_id,
            entry_type,
            amount,
            balance_after,
            note,
            actor,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// Create a purchase entry with provider metadata attached.
    #[must_use]
    pub fn purchase(
        user_id: UserId,
        amount: i64,
        balance_after: i64,
        note: String,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            user_id,
            entry_type: EntryType::Purchase,
            amount,
            balance_after,
            note,
            actor: Actor::System,
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// Type of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Coins earned in-app.
    Earn,

    /// Coins spent in-app.
    Spend,

    /// Coins spent on a VIP tier upgrade.
    VipUpgrade,

    /// Promotional/bonus coins.
    Bonus,

    /// Coins or entitlements granted by a fulfilled payment.
    Purchase,
}

impl EntryType {
    /// Wire name of the entry type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Earn => "earn",
            Self::Spend => "spend",
            Self::VipUpgrade => "vip_upgrade",
            Self::Bonus => "bonus",
            Self::Purchase => "purchase",
        }
    }

    /// Parse an entry type from its wire name.
    ///
    /// Only the four caller-facing types are accepted; `purchase` entries are
    /// written exclusively by the fulfillment engine.
    #[must_use]
    pub fn parse_wallet_type(s: &str) -> Option<Self> {
        match s.trim() {
            "earn" => Some(Self::Earn),
            "spend" => Some(Self::Spend),
            "vip_upgrade" => Some(Self::VipUpgrade),
            "bonus" => Some(Self::Bonus),
            _ => None,
        }
    }
}

/// Who initiated a ledger mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// The account owner.
    User,

    /// An elevated caller or the fulfillment engine.
    System,
}

/// Validate a proposed wallet transaction against the per-type rules.
///
/// - `earn`/`bonus` require a positive delta.
/// - `spend` requires a negative delta.
/// - `vip_upgrade` requires a negative delta and a tier other than `none`.
///
/// # Errors
///
/// Returns `InvalidArgument` describing the first violated rule.
pub fn validate_wallet_txn(
    entry_type: EntryType,
    delta: i64,
    vip_tier: Option<VipTier>,
) -> Result<()> {
    if delta == 0 {
        return Err(WalletError::InvalidArgument("delta must not be zero".into()));
    }

    match entry_type {
        EntryType::Earn | EntryType::Bonus => {
            if delta <= 0 {
                return Err(WalletError::InvalidArgument(
                    "earn/bonus transactions require a positive delta".into(),
                ));
            }
        }
        EntryType::Spend => {
            if delta >= 0 {
                return Err(WalletError::InvalidArgument(
                    "spend transactions require a negative delta".into(),
                ));
            }
        }
        EntryType::VipUpgrade => {
            if delta >= 0 {
                return Err(WalletError::InvalidArgument(
                    "vip_upgrade transactions require a negative delta".into(),
                ));
            }
            match vip_tier {
                Some(tier) if tier != VipTier::None => {}
                _ => {
                    return Err(WalletError::InvalidArgument(
                        "vipTier must be one of bronze|silver|gold|platinum".into(),
                    ));
                }
            }
        }
        EntryType::Purchase => {
            return Err(WalletError::InvalidArgument(
                "purchase entries are written by the fulfillment engine".into(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earn_requires_positive_delta() {
        assert!(validate_wallet_txn(EntryType::Earn, 100, None).is_ok());
        assert!(validate_wallet_txn(EntryType::Earn, -100, None).is_err());
        assert!(validate_wallet_txn(EntryType::Bonus, -1, None).is_err());
    }

    #[test]
    fn spend_requires_negative_delta() {
        assert!(validate_wallet_txn(EntryType::Spend, -50, None).is_ok());
        assert!(validate_wallet_txn(EntryType::Spend, 50, None).is_err());
    }

    #[test]
    fn vip_upgrade_requires_tier_and_negative_delta() {
        assert!(validate_wallet_txn(EntryType::VipUpgrade, -500, Some(VipTier::Gold)).is_ok());
        assert!(validate_wallet_txn(EntryType::VipUpgrade, -500, Some(VipTier::None)).is_err());
        assert!(validate_wallet_txn(EntryType::VipUpgrade, -500, None).is_err());
        assert!(validate_wallet_txn(EntryType::VipUpgrade, 500, Some(VipTier::Gold)).is_err());
    }

    #[test]
    fn zero_delta_rejected() {
        assert!(validate_wallet_txn(EntryType::Earn, 0, None).is_err());
    }

    #[test]
    fn purchase_is_not_caller_facing() {
        assert!(validate_wallet_txn(EntryType::Purchase, 100, None).is_err());
        assert_eq!(EntryType::parse_wallet_type("purchase"), None);
        assert_eq!(EntryType::parse_wallet_type("earn"), Some(EntryType::Earn));
    }
}
