//! Wallet configuration record.
//!
//! The wallet config is a store record, not an environment variable: any
//! operation that needs it fails with `ConfigMissing` when the record is
//! absent.

use serde::{Deserialize, Serialize};

/// The wallet configuration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Coins per currency unit (e.g. 100 coins per dollar).
    pub rate: i64,

    /// ISO currency code for checkout pricing.
    pub currency: String,

    /// Daily coin-earning cap. 0 disables the cap.
    pub daily_limit_coins: i64,

    /// Mobile SKUs accepted by the IAP rail.
    pub skus: Vec<String>,
}

impl WalletConfig {
    /// Whether a daily cap is configured.
    #[must_use]
    pub fn has_daily_limit(&self) -> bool {
        self.daily_limit_coins > 0
    }
}
