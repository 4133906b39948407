//! Payment fulfillment orchestration.
//!
//! Shared by the card-webhook and mobile-verify paths. The flow is always:
//! advisory daily-cap pre-check, provider verification (outside the store),
//! mutation resolution, then the store's finalize transaction. Everything
//! after the finalize commit is best-effort.

use chrono::{NaiveTime, Utc};

use coin_ledger_core::{
    resolve_purchase, Account, PaymentRecord, PurchaseMutation, WalletConfig,
};
use coin_ledger_store::{FinalizeOutcome, Store};

use crate::error::ApiError;
use crate::state::AppState;

/// Load the wallet configuration record, failing when absent.
///
/// # Errors
///
/// Returns `ExternalService` (502) when the record is missing: the service
/// cannot price or cap purchases without it.
pub fn wallet_config(state: &AppState) -> Result<WalletConfig, ApiError> {
    state
        .store
        .get_wallet_config()?
        .ok_or_else(|| ApiError::ExternalService("wallet configuration missing".into()))
}

/// Advisory daily-cap pre-check for coin-earning purchases.
///
/// Sums the caller's completed purchase coins since the start of the current
/// UTC day and rejects the request before any provider call when `coins`
/// would exceed the cap. Advisory only: the finalize transaction does not
/// re-check.
///
/// # Errors
///
/// Returns `DailyLimitReached` with the remaining headroom.
pub fn check_daily_cap(
    state: &AppState,
    user_id: &coin_ledger_core::UserId,
    coins: i64,
    config: &WalletConfig,
) -> Result<(), ApiError> {
    if !config.has_daily_limit() || coins <= 0 {
        return Ok(());
    }

    // The cap resets at UTC midnight.
    let since = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
    let earned = state.store.completed_coins_since(user_id, since)?;
    let remaining = (config.daily_limit_coins - earned).max(0);

    if coins > remaining {
        tracing::info!(
            user_id = %user_id,
            coins = %coins,
            remaining = %remaining,
            "Daily coin cap would be exceeded"
        );
        return Err(ApiError::DailyLimitReached { remaining });
    }

    Ok(())
}

/// Resolve the mutation and ledger note a payment implies.
///
/// Product-typed payments go through the entitlement resolver against the
/// account's current state; raw coin payments credit their coin amount.
///
/// # Errors
///
/// Propagates resolver failures (misconfigured product) as
/// `FailedPrecondition`.
pub fn resolve_payment_mutation(
    state: &AppState,
    payment: &PaymentRecord,
) -> Result<(PurchaseMutation, String), ApiError> {
    let account = state
        .store
        .get_account(&payment.user_id)?
        .unwrap_or_else(|| Account::new(payment.user_id));

    if let Some(product_id) = &payment.product_id {
        let product = state.store.get_product(product_id)?.ok_or_else(|| {
            ApiError::FailedPrecondition(format!("unknown product: {product_id}"))
        })?;

        let mutation = resolve_purchase(&product, &account).map_err(ApiError::from)?;
        let note = match &mutation {
            PurchaseMutation::Noop { note } => format!("{} ({note})", product.title),
            _ => product.title.clone(),
        };
        return Ok((mutation, note));
    }

    Ok((
        PurchaseMutation::CreditCoins(payment.coins),
        format!("{} coins", payment.coins),
    ))
}

/// Finalize a payment exactly once.
///
/// Resolves the mutation against current account state and runs the store's
/// finalize transaction keyed by `event_id`. Replays return
/// [`FinalizeOutcome::AlreadyFulfilled`] without touching any balance.
///
/// # Errors
///
/// Propagates resolution and store failures.
pub fn fulfill(
    state: &AppState,
    event_id: &str,
    payment: &PaymentRecord,
) -> Result<FinalizeOutcome, ApiError> {
    let (mutation, note) = resolve_payment_mutation(state, payment)?;

    let outcome = state
        .store
        .finalize_purchase(event_id, payment, &mutation, &note)?;

    match &outcome {
        FinalizeOutcome::Applied { balance, entry_id } => {
            tracing::info!(
                event_id = %event_id,
                payment_id = %payment.id,
                user_id = %payment.user_id,
                balance = %balance,
                entry_id = %entry_id,
                "Payment fulfilled"
            );
        }
        FinalizeOutcome::AlreadyFulfilled => {
            tracing::info!(
                event_id = %event_id,
                payment_id = %payment.id,
                "Duplicate fulfillment event ignored"
            );
        }
    }

    Ok(outcome)
}
