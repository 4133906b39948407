//! Card-rail webhook handler.
//!
//! Once a payload passes signature verification and parses, the endpoint
//! always answers 200: fulfillment failures are logged and retried by the
//! provider's redelivery, which the fulfillment guard makes safe.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use coin_ledger_core::{card_event_id, PaymentId};
use coin_ledger_store::Store;

use crate::error::ApiError;
use crate::fulfillment;
use crate::state::AppState;

/// Webhook event envelope (the provider's fields we act on).
#[derive(Debug, Deserialize)]
pub struct StripeWebhook {
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event ID.
    pub id: String,
    /// Event data.
    pub data: StripeEventData,
}

/// Event data container.
#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    /// Event object.
    pub object: serde_json::Value,
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was accepted.
    pub received: bool,
}

/// Handle card-rail webhooks.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok());

    // Verify signature if a webhook secret is configured.
    if state.config.stripe_webhook_secret.is_some() {
        let sig = signature
            .ok_or_else(|| ApiError::InvalidArgument("missing webhook signature".into()))?;

        let stripe = state
            .stripe
            .as_ref()
            .ok_or_else(|| ApiError::ExternalService("card checkout not configured".into()))?;

        stripe.verify_webhook_signature(&body, sig).map_err(|e| {
            tracing::warn!(error = %e, "Invalid webhook signature");
            ApiError::InvalidArgument("invalid webhook signature".into())
        })?;
    } else {
        // Development mode.
        tracing::warn!("Webhook secret not configured - skipping signature verification");
    }

    let webhook: StripeWebhook =
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidArgument(e.to_string()))?;

    tracing::info!(
        event_type = %webhook.event_type,
        event_id = %webhook.id,
        "Received payment webhook"
    );

    // Structurally accepted from here on: failures are logged, never bounced,
    // and redelivery is safe behind the fulfillment guard.
    match webhook.event_type.as_str() {
        "checkout.session.completed" => {
            if let Err(e) = handle_checkout_completed(&state, &webhook.data.object) {
                tracing::error!(event_id = %webhook.id, error = %e, "Checkout fulfillment failed");
            }
        }
        "payment_intent.succeeded" => {
            if let Err(e) = handle_payment_intent_succeeded(&state, &webhook.data.object) {
                tracing::error!(event_id = %webhook.id, error = %e, "Intent fulfillment failed");
            }
        }
        _ => {
            tracing::debug!(event_type = %webhook.event_type, "Unhandled webhook event");
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}

fn handle_checkout_completed(state: &AppState, data: &serde_json::Value) -> Result<(), ApiError> {
    let payment_status = data
        .get("payment_status")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");

    if payment_status != "paid" {
        tracing::info!(payment_status = %payment_status, "Checkout session not paid, skipping");
        return Ok(());
    }

    let Some(payment_id) = metadata_payment_id(data) else {
        tracing::warn!("Checkout session carries no payment_id metadata, skipping");
        return Ok(());
    };

    let mut payment = state
        .store
        .get_payment(&payment_id)?
        .ok_or_else(|| ApiError::NotFound(format!("payment: {payment_id}")))?;

    // Record provider back-references before finalizing.
    if let Some(session_id) = data.get("id").and_then(|v| v.as_str()) {
        payment.meta.checkout_session_id = Some(session_id.to_string());
    }
    if let Some(intent) = data.get("payment_intent").and_then(|v| v.as_str()) {
        payment.meta.payment_intent = Some(intent.to_string());
    }

    fulfillment::fulfill(state, &card_event_id(payment.id), &payment)?;
    Ok(())
}

fn handle_payment_intent_succeeded(
    state: &AppState,
    data: &serde_json::Value,
) -> Result<(), ApiError> {
    // Intents carry the same payment_id metadata as their session; both event
    // types converge on one fulfillment guard per payment.
    let Some(payment_id) = metadata_payment_id(data) else {
        tracing::debug!("Payment intent carries no payment_id metadata, skipping");
        return Ok(());
    };

    let mut payment = state
        .store
        .get_payment(&payment_id)?
        .ok_or_else(|| ApiError::NotFound(format!("payment: {payment_id}")))?;

    if let Some(intent_id) = data.get("id").and_then(|v| v.as_str()) {
        payment.meta.payment_intent = Some(intent_id.to_string());
    }

    fulfillment::fulfill(state, &card_event_id(payment.id), &payment)?;
    Ok(())
}

fn metadata_payment_id(data: &serde_json::Value) -> Option<PaymentId> {
    data.get("metadata")
        .and_then(|m| m.get("payment_id"))
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<PaymentId>().ok())
}
