//! Account types for the coin ledger.
//!
//! This module defines the wallet account, the ordered VIP tier ladder, and
//! the typed patch structure used for partial account updates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};
use crate::UserId;

/// A wallet account for a user.
///
/// The account tracks the coin balance, the VIP tier, and purchased
/// entitlement flags. It is mutated only inside store transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// The user ID (from the identity provider).
    pub user_id: UserId,

    /// Current coin balance. Never negative.
    pub balance: i64,

    /// Current VIP tier. Only ever upgrades.
    pub vip_tier: VipTier,

    /// When the current VIP tier was granted.
    pub vip_since: Option<DateTime<Utc>>,

    /// Purchased entitlement flags, keyed by product ID.
    pub entitlements: BTreeMap<String, bool>,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with zero balance and no tier.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            balance: 0,
            vip_tier: VipTier::None,
            vip_since: None,
            entitlements: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether an entitlement flag is set.
    #[must_use]
    pub fn has_entitlement(&self, product_id: &str) -> bool {
        self.entitlements.get(product_id).copied().unwrap_or(false)
    }
}

/// Compute the next balance from the current balance and a signed delta.
///
/// This is the pure balance mutator: it must be evaluated inside the same
/// transaction that read `balance`, so concurrent mutations serialize.
///
/// # Errors
///
/// - `InvalidArgument` if `delta` is zero or the sum overflows `i64`.
/// - `InsufficientBalance` if the result would be negative.
pub fn next_balance(balance: i64, delta: i64) -> Result<i64> {
    if delta == 0 {
        return Err(WalletError::InvalidArgument("delta must not be zero".into()));
    }
    let next = balance
        .checked_add(delta)
        .ok_or_else(|| WalletError::InvalidArgument("balance overflow".into()))?;
    if next < 0 {
        return Err(WalletError::InsufficientBalance {
            balance,
            required: -delta,
        });
    }
    Ok(next)
}

/// VIP tiers, ordered. Upgrades are monotonic: the tier never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VipTier {
    /// No VIP status.
    None,
    /// Bronze tier.
    Bronze,
    /// Silver tier.
    Silver,
    /// Gold tier.
    Gold,
    /// Platinum tier.
    Platinum,
}

impl VipTier {
    /// Numeric rank used for monotonicity comparisons.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Bronze => 1,
            Self::Silver => 2,
            Self::Gold => 3,
            Self::Platinum => 4,
        }
    }

    /// Parse a tier from its wire name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "bronze" => Some(Self::Bronze),
            "silver" => Some(Self::Silver),
            "gold" => Some(Self::Gold),
            "platinum" => Some(Self::Platinum),
            _ => None,
        }
    }

    /// Wire name of the tier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
        }
    }
}

impl std::fmt::Display for VipTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed partial update applied to an account inside a transaction.
///
/// Entitlement flags are a named map rather than free-form key paths, so the
/// `Account` type stays closed and invariants stay checkable.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    /// New VIP tier, if the purchase upgrades it.
    pub vip_tier: Option<VipTier>,

    /// Entitlement flags to merge in.
    pub entitlements: BTreeMap<String, bool>,
}

impl AccountPatch {
    /// Whether the patch changes anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vip_tier.is_none() && self.entitlements.is_empty()
    }

    /// Apply the patch to an account.
    pub fn apply(&self, account: &mut Account, now: DateTime<Utc>) {
        if let Some(tier) = self.vip_tier {
            account.vip_tier = tier;
            account.vip_since = Some(now);
        }
        for (key, value) in &self.entitlements {
            account.entitlements.insert(key.clone(), *value);
        }
        account.updated_at = now;
    }
}
