//! Stripe API client implementation.

use reqwest::Client;
use std::time::Duration;

use crate::crypto::{constant_time_eq, hmac_sha256_hex};

use super::types::{CheckoutSession, StripeErrorResponse};

/// Error type for Stripe operations.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe API returned an error.
    #[error("Stripe API error: {error_type} - {message}")]
    Api {
        /// Error type.
        error_type: String,
        /// Error message.
        message: String,
        /// Error code.
        code: Option<String>,
    },

    /// Invalid webhook signature.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Stripe API client.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_key: String,
    webhook_secret: Option<String>,
}

impl StripeClient {
    /// Stripe API base URL.
    const BASE_URL: &'static str = "https://api.stripe.com/v1";

    /// Create a new Stripe client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Stripe secret API key (`sk_test_...` or `sk_live_...`)
    /// * `webhook_secret` - Optional webhook signing secret (`whsec_...`)
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, webhook_secret: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.into(),
            webhook_secret,
        }
    }

    /// Create a Checkout session for a pending payment.
    ///
    /// The payment ID, user ID, coin amount, and product ID ride along as
    /// session metadata so the webhook can finalize without guessing.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_checkout_session(
        &self,
        user_id: &str,
        payment_id: &str,
        item_name: &str,
        amount_cents: i64,
        currency: &str,
        coins: i64,
        product_id: Option<&str>,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let mut params = vec![
            ("mode", "payment".to_string()),
            ("success_url", success_url.to_string()),
            ("cancel_url", cancel_url.to_string()),
            ("client_reference_id", user_id.to_string()),
            (
                "line_items[0][price_data][currency]",
                currency.to_lowercase(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                item_name.to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                amount_cents.to_string(),
            ),
            ("line_items[0][quantity]", "1".to_string()),
            ("metadata[payment_id]", payment_id.to_string()),
            ("metadata[uid]", user_id.to_string()),
            ("metadata[coins]", coins.to_string()),
        ];

        if let Some(product_id) = product_id {
            params.push(("metadata[product_id]", product_id.to_string()));
        }

        tracing::debug!(
            user_id = %user_id,
            payment_id = %payment_id,
            amount_cents = %amount_cents,
            "Creating Stripe checkout session"
        );

        let response = self
            .client
            .post(format!("{}/checkout/sessions", Self::BASE_URL))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .form(&params)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Retrieve a Checkout session by ID.
    pub async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let response = self
            .client
            .get(format!("{}/checkout/sessions/{session_id}", Self::BASE_URL))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Verify a webhook signature.
    ///
    /// The `Stripe-Signature` header has the form `t=timestamp,v1=sig[,...]`;
    /// the expected signature is HMAC-SHA256 of `"{timestamp}.{payload}"`.
    ///
    /// # Errors
    ///
    /// - `Configuration` if no webhook secret is set or the header lacks a
    ///   timestamp.
    /// - `InvalidSignature` if no candidate signature matches.
    pub fn verify_webhook_signature(
        &self,
        payload: &str,
        signature: &str,
    ) -> Result<(), StripeError> {
        let secret = self
            .webhook_secret
            .as_ref()
            .ok_or_else(|| StripeError::Configuration("Webhook secret not configured".into()))?;

        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            let mut kv = part.splitn(2, '=');
            match (kv.next(), kv.next()) {
                (Some("t"), Some(ts)) => timestamp = Some(ts),
                (Some("v1"), Some(sig)) => signatures.push(sig),
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| StripeError::Configuration("Missing timestamp".into()))?;

        if signatures.is_empty() {
            return Err(StripeError::InvalidSignature);
        }

        let signed_payload = format!("{timestamp}.{payload}");
        let expected = hmac_sha256_hex(secret, &signed_payload);

        let valid = signatures.iter().any(|sig| constant_time_eq(&expected, sig));

        if valid {
            Ok(())
        } else {
            Err(StripeError::InvalidSignature)
        }
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<StripeErrorResponse, _> = response.json().await;

        match error_body {
            Ok(stripe_error) => Err(StripeError::Api {
                error_type: stripe_error.error.error_type,
                message: stripe_error.error.message,
                code: stripe_error.error.code,
            }),
            Err(_) => Err(StripeError::Api {
                error_type: "unknown".to_string(),
                message: format!("HTTP {status}"),
                code: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_header(secret: &str, payload: &str, timestamp: &str) -> String {
        let sig = hmac_sha256_hex(secret, &format!("{timestamp}.{payload}"));
        format!("t={timestamp},v1={sig}")
    }

    #[test]
    fn valid_signature_accepted() {
        let client = StripeClient::new("sk_test_xxx", Some("whsec_xxx".to_string()));
        let payload = r#"{"type":"checkout.session.completed"}"#;
        let header = signed_header("whsec_xxx", payload, "1700000000");

        assert!(client.verify_webhook_signature(payload, &header).is_ok());
    }

    #[test]
    fn tampered_payload_rejected() {
        let client = StripeClient::new("sk_test_xxx", Some("whsec_xxx".to_string()));
        let header = signed_header("whsec_xxx", "original", "1700000000");

        assert!(matches!(
            client.verify_webhook_signature("tampered", &header),
            Err(StripeError::InvalidSignature)
        ));
    }

    #[test]
    fn missing_secret_is_configuration_error() {
        let client = StripeClient::new("sk_test_xxx", None);
        assert!(matches!(
            client.verify_webhook_signature("body", "t=1,v1=aa"),
            Err(StripeError::Configuration(_))
        ));
    }

    #[test]
    fn header_without_timestamp_rejected() {
        let client = StripeClient::new("sk_test_xxx", Some("whsec_xxx".to_string()));
        assert!(matches!(
            client.verify_webhook_signature("body", "v1=aa"),
            Err(StripeError::Configuration(_))
        ));
    }
}
