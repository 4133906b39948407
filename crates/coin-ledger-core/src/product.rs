//! Catalog products and the entitlement resolver.
//!
//! Given a fulfilled purchase's product and the account's current state, the
//! resolver computes the single mutation to apply: a coin credit, a monotonic
//! VIP upgrade, an entitlement flag, or a recorded no-op.

use serde::{Deserialize, Serialize};

use crate::account::{Account, VipTier};
use crate::error::{Result, WalletError};

/// What a catalog product grants when fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// A coin pack.
    Coins,

    /// A VIP tier.
    Vip,

    /// A feature flag.
    Feature,

    /// A theme flag.
    Theme,
}

/// A purchasable catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Stable product ID (SKU).
    pub id: String,

    /// Display title.
    pub title: String,

    /// Price in fiat minor units (cents).
    pub price_cents: i64,

    /// ISO currency code.
    pub currency: String,

    /// What the product grants.
    pub kind: ProductKind,

    /// Tier granted, for `vip` products.
    pub vip_tier: Option<VipTier>,

    /// Coins granted, for `coins` products.
    pub coins_amount: i64,

    /// Whether the product can currently be purchased.
    pub active: bool,

    /// Sort order in the storefront.
    pub sort: i64,
}

/// The state mutation a fulfilled purchase implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseMutation {
    /// Increment the balance by this many coins.
    CreditCoins(i64),

    /// Upgrade the VIP tier.
    UpgradeVip(VipTier),

    /// Set an entitlement flag keyed by product ID.
    GrantEntitlement(String),

    /// No account change; the note distinguishes why.
    Noop {
        /// `already-at-tier` or `higher-tier-exists`.
        note: &'static str,
    },
}

/// Resolve the mutation a fulfilled product purchase implies.
///
/// VIP purchases apply only when the target rank exceeds the current rank;
/// equal or lower tiers resolve to a recorded no-op rather than an error.
///
/// # Errors
///
/// Returns `MisconfiguredProduct` for a non-positive coin amount or a vip
/// product without a concrete tier.
pub fn resolve_purchase(product: &Product, account: &Account) -> Result<PurchaseMutation> {
    match product.kind {
        ProductKind::Coins => {
            if product.coins_amount <= 0 {
                return Err(WalletError::MisconfiguredProduct(format!(
                    "coins product {} has non-positive amount",
                    product.id
                )));
            }
            Ok(PurchaseMutation::CreditCoins(product.coins_amount))
        }
        ProductKind::Vip => {
            let target = product.vip_tier.filter(|t| *t != VipTier::None).ok_or_else(|| {
                WalletError::MisconfiguredProduct(format!(
                    "vip product {} has no target tier",
                    product.id
                ))
            })?;
            if target.rank() > account.vip_tier.rank() {
                Ok(PurchaseMutation::UpgradeVip(target))
            } else if target == account.vip_tier {
                Ok(PurchaseMutation::Noop {
                    note: "already-at-tier",
                })
            } else {
                Ok(PurchaseMutation::Noop {
                    note: "higher-tier-exists",
                })
            }
        }
        ProductKind::Feature | ProductKind::Theme => {
            Ok(PurchaseMutation::GrantEntitlement(product.id.clone()))
        }
    }
}

/// Extract the coin amount from a mobile SKU (`coins_500` -> 500).
///
/// Returns 0 when the SKU carries no digits, which callers treat as an
/// unknown SKU.
#[must_use]
pub fn coins_from_sku(product_id: &str) -> i64 {
    let digits: String = product_id.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Estimate the fiat price in minor units for a coin amount at the
/// configured rate (coins per currency unit).
///
/// Returns 0 when the rate is not positive or the computation overflows.
#[must_use]
pub fn estimate_fiat_cents(rate: i64, coins: i64) -> i64 {
    if rate <= 0 {
        return 0;
    }
    // Round to the nearest cent.
    coins
        .checked_mul(100)
        .and_then(|n| n.checked_add(rate / 2))
        .map_or(0, |n| n / rate)
}
