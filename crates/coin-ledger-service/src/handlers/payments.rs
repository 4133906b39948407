//! Payment handlers: card checkout and mobile purchase verification.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use coin_ledger_core::{
    coins_from_sku, estimate_fiat_cents, play_event_id, PaymentProvider, PaymentRecord,
    ProductKind,
};
use coin_ledger_store::{FinalizeOutcome, Store};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::fulfillment;
use crate::state::AppState;

/// Checkout intent request: either a catalog product or a raw coin amount.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Catalog product to purchase.
    #[serde(default)]
    pub product_id: Option<String>,
    /// Raw coin amount to purchase at the configured rate.
    #[serde(default)]
    pub coins: Option<i64>,
}

/// Checkout intent response.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Hosted checkout URL to redirect the payer to.
    pub checkout_url: String,
    /// Checkout session ID.
    pub session_id: String,
    /// Our pending payment ID.
    pub payment_id: String,
}

/// Create a card checkout intent.
pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let stripe = state
        .stripe
        .as_ref()
        .ok_or_else(|| ApiError::ExternalService("card checkout not configured".into()))?;

    let config = fulfillment::wallet_config(&state)?;

    let (coins, fiat_cents, currency, item_name, product_id) = match (&body.product_id, body.coins)
    {
        (Some(product_id), _) => {
            let product = state
                .store
                .get_product(product_id)?
                .ok_or_else(|| ApiError::NotFound(format!("product: {product_id}")))?;

            if !product.active {
                return Err(ApiError::FailedPrecondition(format!(
                    "product is not active: {product_id}"
                )));
            }

            let coins = if product.kind == ProductKind::Coins {
                product.coins_amount
            } else {
                0
            };

            (
                coins,
                product.price_cents,
                product.currency.clone(),
                product.title.clone(),
                Some(product.id),
            )
        }
        (None, Some(coins)) => {
            if coins <= 0 {
                return Err(ApiError::InvalidArgument("coins must be positive".into()));
            }

            let fiat_cents = estimate_fiat_cents(config.rate, coins);
            if fiat_cents <= 0 {
                return Err(ApiError::FailedPrecondition(
                    "checkout rate not configured".into(),
                ));
            }

            (
                coins,
                fiat_cents,
                config.currency.clone(),
                format!("{coins} coins"),
                None,
            )
        }
        (None, None) => {
            return Err(ApiError::InvalidArgument(
                "product_id or coins is required".into(),
            ));
        }
    };

    // Cap check happens before the provider call.
    fulfillment::check_daily_cap(&state, &auth.user_id, coins, &config)?;

    let mut payment = PaymentRecord::pending(
        auth.user_id,
        PaymentProvider::Card,
        coins,
        fiat_cents,
        currency,
    );
    payment.product_id = product_id;
    state.store.put_payment(&payment)?;

    let success_url = format!(
        "{}/wallet/success?session_id={{CHECKOUT_SESSION_ID}}",
        state.config.frontend_url
    );
    let cancel_url = format!("{}/wallet/cancel", state.config.frontend_url);

    let session = stripe
        .create_checkout_session(
            &auth.user_id.to_string(),
            &payment.id.to_string(),
            &item_name,
            payment.fiat_cents,
            &payment.currency,
            payment.coins,
            payment.product_id.as_deref(),
            &success_url,
            &cancel_url,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create checkout session");
            ApiError::ExternalService(format!("failed to create checkout session: {e}"))
        })?;

    let checkout_url = session
        .url
        .clone()
        .ok_or_else(|| ApiError::ExternalService("checkout session has no URL".into()))?;

    payment.meta.checkout_session_id = Some(session.id.clone());
    state.store.put_payment(&payment)?;

    tracing::info!(
        user_id = %auth.user_id,
        payment_id = %payment.id,
        session_id = %session.id,
        "Checkout session created"
    );

    Ok(Json(CheckoutResponse {
        checkout_url,
        session_id: session.id,
        payment_id: payment.id.to_string(),
    }))
}

/// Mobile purchase verification request.
#[derive(Debug, Deserialize)]
pub struct VerifyPlayRequest {
    /// The store SKU, e.g. `coins_500`.
    pub product_id: String,
    /// The purchase token issued by the store.
    pub purchase_token: String,
}

/// Mobile purchase verification response.
#[derive(Debug, Serialize)]
pub struct VerifyPlayResponse {
    /// Balance after fulfillment.
    pub balance: i64,
    /// Coins this token grants.
    pub coins: i64,
    /// Whether the token had already been fulfilled for this user.
    pub already_fulfilled: bool,
}

/// Verify and fulfill a mobile in-app purchase.
pub async fn verify_play_purchase(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<VerifyPlayRequest>,
) -> Result<Json<VerifyPlayResponse>, ApiError> {
    let config = fulfillment::wallet_config(&state)?;

    if !config.skus.is_empty() && !config.skus.contains(&body.product_id) {
        return Err(ApiError::InvalidArgument(format!(
            "unknown SKU: {}",
            body.product_id
        )));
    }

    let coins = coins_from_sku(&body.product_id);
    if coins <= 0 {
        return Err(ApiError::InvalidArgument(format!(
            "SKU carries no coin amount: {}",
            body.product_id
        )));
    }

    // A token belongs to whoever claimed it first.
    if let Some(existing) = state.store.get_payment_by_token(&body.purchase_token)? {
        if existing.user_id != auth.user_id {
            return Err(ApiError::AlreadyClaimed);
        }
        if existing.is_completed() {
            let balance = state
                .store
                .get_account(&auth.user_id)?
                .map_or(0, |account| account.balance);
            return Ok(Json(VerifyPlayResponse {
                balance,
                coins: existing.coins,
                already_fulfilled: true,
            }));
        }
    }

    // Cap check happens before the verifier call.
    fulfillment::check_daily_cap(&state, &auth.user_id, coins, &config)?;

    let play = state
        .play
        .as_ref()
        .ok_or_else(|| ApiError::ExternalService("purchase verification not configured".into()))?;

    let purchase = play
        .get_product_purchase(&body.product_id, &body.purchase_token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Purchase verification failed");
            ApiError::ExternalService(format!("purchase verification failed: {e}"))
        })?;

    if !purchase.is_purchased() {
        return Err(ApiError::FailedPrecondition(
            "purchase is not in the purchased state".into(),
        ));
    }

    let mut payment = PaymentRecord::pending(
        auth.user_id,
        PaymentProvider::Play,
        coins,
        estimate_fiat_cents(config.rate, coins),
        config.currency.clone(),
    );
    payment.meta.purchase_token = Some(body.purchase_token.clone());
    payment.meta.order_id = purchase.order_id.clone();
    state.store.put_payment(&payment)?;

    let event_id = play_event_id(&body.purchase_token);
    let outcome = fulfillment::fulfill(&state, &event_id, &payment)?;

    let (balance, already_fulfilled) = match outcome {
        FinalizeOutcome::Applied { balance, .. } => (balance, false),
        FinalizeOutcome::AlreadyFulfilled => {
            let balance = state
                .store
                .get_account(&auth.user_id)?
                .map_or(0, |account| account.balance);
            (balance, true)
        }
    };

    // Post-commit, best-effort: failures never undo the credit.
    if let Err(e) = play.consume(&body.product_id, &body.purchase_token).await {
        tracing::warn!(error = %e, token = %body.purchase_token, "Consume failed");
    }
    if let Err(e) = play
        .acknowledge(&body.product_id, &body.purchase_token)
        .await
    {
        tracing::warn!(error = %e, token = %body.purchase_token, "Acknowledge failed");
    }

    Ok(Json(VerifyPlayResponse {
        balance,
        coins,
        already_fulfilled,
    }))
}
