//! Default catalog and wallet-config seeding.
//!
//! Runs at startup: a fresh database gets a usable storefront and config so
//! the service is functional before any admin tooling touches it. Existing
//! records are never overwritten.

use coin_ledger_core::{Product, ProductKind, VipTier, WalletConfig};
use coin_ledger_store::{Result, Store};

/// Seed the wallet config and product catalog if absent.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub fn seed_defaults(store: &dyn Store) -> Result<()> {
    if store.get_wallet_config()?.is_none() {
        let config = WalletConfig {
            rate: 100,
            currency: "USD".into(),
            daily_limit_coins: 5000,
            skus: vec!["coins_100".into(), "coins_500".into(), "coins_1200".into()],
        };
        store.put_wallet_config(&config)?;
        tracing::info!("Seeded default wallet config");
    }

    if store.list_products()?.is_empty() {
        for product in default_catalog() {
            store.put_product(&product)?;
        }
        tracing::info!("Seeded default product catalog");
    }

    Ok(())
}

fn default_catalog() -> Vec<Product> {
    let coins = |id: &str, title: &str, price_cents: i64, amount: i64, sort: i64| Product {
        id: id.into(),
        title: title.into(),
        price_cents,
        currency: "USD".into(),
        kind: ProductKind::Coins,
        vip_tier: None,
        coins_amount: amount,
        active: true,
        sort,
    };

    let vip = |id: &str, title: &str, price_cents: i64, tier: VipTier, sort: i64| Product {
        id: id.into(),
        title: title.into(),
        price_cents,
        currency: "USD".into(),
        kind: ProductKind::Vip,
        vip_tier: Some(tier),
        coins_amount: 0,
        active: true,
        sort,
    };

    vec![
        coins("coins_100", "100 Coins", 99, 100, 10),
        coins("coins_500", "500 Coins", 499, 500, 20),
        coins("coins_1200", "1200 Coins", 999, 1200, 30),
        vip("vip_bronze", "Bronze VIP", 199, VipTier::Bronze, 40),
        vip("vip_silver", "Silver VIP", 499, VipTier::Silver, 50),
        vip("vip_gold", "Gold VIP", 999, VipTier::Gold, 60),
        Product {
            id: "theme_midnight".into(),
            title: "Midnight Theme".into(),
            price_cents: 299,
            currency: "USD".into(),
            kind: ProductKind::Theme,
            vip_tier: None,
            coins_amount: 0,
            active: true,
            sort: 70,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use coin_ledger_store::RocksStore;
    use tempfile::TempDir;

    #[test]
    fn seeding_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();

        seed_defaults(&store).unwrap();
        let first = store.list_products().unwrap();
        assert!(!first.is_empty());

        // Re-running changes nothing.
        seed_defaults(&store).unwrap();
        assert_eq!(store.list_products().unwrap().len(), first.len());
        assert!(store.get_wallet_config().unwrap().is_some());
    }
}
