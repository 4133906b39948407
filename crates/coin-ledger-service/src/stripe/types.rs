//! Stripe API wire types.

use std::collections::HashMap;

use serde::Deserialize;

/// A Checkout session, as returned by the sessions API.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Session ID (`cs_...`).
    pub id: String,

    /// Hosted checkout URL to redirect the payer to.
    pub url: Option<String>,

    /// Payment status (`paid`, `unpaid`, `no_payment_required`).
    pub payment_status: Option<String>,

    /// Payment intent attached once payment begins.
    pub payment_intent: Option<String>,

    /// Session metadata we attached at creation.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Stripe error response envelope.
#[derive(Debug, Deserialize)]
pub struct StripeErrorResponse {
    /// The error payload.
    pub error: StripeErrorBody,
}

/// Stripe error payload.
#[derive(Debug, Deserialize)]
pub struct StripeErrorBody {
    /// Error type.
    #[serde(rename = "type")]
    pub error_type: String,

    /// Human-readable message.
    #[serde(default)]
    pub message: String,

    /// Error code.
    pub code: Option<String>,
}
