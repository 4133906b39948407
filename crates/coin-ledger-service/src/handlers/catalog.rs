//! Wallet config and product catalog reads.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use coin_ledger_core::Product;
use coin_ledger_store::Store;

use crate::error::ApiError;
use crate::fulfillment;
use crate::state::AppState;

/// Wallet config response.
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    /// Coins per currency unit.
    pub rate: i64,
    /// ISO currency code.
    pub currency: String,
    /// Daily coin-earning cap (0 = unlimited).
    pub daily_limit_coins: i64,
    /// Mobile SKUs accepted by the IAP rail.
    pub skus: Vec<String>,
}

/// Get the wallet configuration.
pub async fn get_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConfigResponse>, ApiError> {
    let config = fulfillment::wallet_config(&state)?;

    Ok(Json(ConfigResponse {
        rate: config.rate,
        currency: config.currency,
        daily_limit_coins: config.daily_limit_coins,
        skus: config.skus,
    }))
}

/// Product response.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    /// Product ID (SKU).
    pub id: String,
    /// Display title.
    pub title: String,
    /// Price in fiat minor units.
    pub price_cents: i64,
    /// ISO currency code.
    pub currency: String,
    /// Product kind.
    pub kind: String,
    /// Tier granted, for vip products.
    pub vip_tier: Option<String>,
    /// Coins granted, for coin products.
    pub coins_amount: i64,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            title: product.title.clone(),
            price_cents: product.price_cents,
            currency: product.currency.clone(),
            kind: format!("{:?}", product.kind).to_lowercase(),
            vip_tier: product.vip_tier.map(|t| t.to_string()),
            coins_amount: product.coins_amount,
        }
    }
}

/// Product list response.
#[derive(Debug, Serialize)]
pub struct ListProductsResponse {
    /// Active products in storefront order.
    pub products: Vec<ProductResponse>,
}

/// List active catalog products.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListProductsResponse>, ApiError> {
    let products = state.store.list_products()?;

    let products = products
        .iter()
        .filter(|p| p.active)
        .map(ProductResponse::from)
        .collect();

    Ok(Json(ListProductsResponse { products }))
}
