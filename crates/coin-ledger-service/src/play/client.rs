//! Play Developer API client.
//!
//! Talks to the androidpublisher v3 product-purchase endpoints. The base URL
//! is configurable so tests can point it at a mock server.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Purchase state: the purchase went through.
pub const PURCHASE_STATE_PURCHASED: i64 = 0;

/// Error type for Play operations.
#[derive(Debug, thiserror::Error)]
pub enum PlayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The verifier rejected the token.
    #[error("Play API error: HTTP {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },
}

/// A product purchase, as returned by the purchases.products endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPurchase {
    /// 0 = purchased, 1 = canceled, 2 = pending.
    pub purchase_state: i64,

    /// 0 = yet to be consumed, 1 = consumed.
    #[serde(default)]
    pub consumption_state: i64,

    /// 0 = yet to be acknowledged, 1 = acknowledged.
    #[serde(default)]
    pub acknowledgement_state: i64,

    /// Store order ID.
    pub order_id: Option<String>,

    /// Purchase time in millis since epoch, as a string.
    pub purchase_time_millis: Option<String>,
}

impl ProductPurchase {
    /// Whether the purchase is in the purchased state.
    #[must_use]
    pub fn is_purchased(&self) -> bool {
        self.purchase_state == PURCHASE_STATE_PURCHASED
    }
}

/// Play Developer API client.
#[derive(Debug, Clone)]
pub struct PlayClient {
    client: Client,
    base_url: String,
    package_name: String,
    access_token: String,
}

impl PlayClient {
    /// Create a new Play client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        package_name: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            package_name: package_name.into(),
            access_token: access_token.into(),
        }
    }

    fn purchase_url(&self, product_id: &str, token: &str) -> String {
        format!(
            "{}/applications/{}/purchases/products/{}/tokens/{}",
            self.base_url, self.package_name, product_id, token
        )
    }

    /// Fetch and verify a product purchase by token.
    pub async fn get_product_purchase(
        &self,
        product_id: &str,
        token: &str,
    ) -> Result<ProductPurchase, PlayError> {
        let response = self
            .client
            .get(self.purchase_url(product_id, token))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Mark a consumable purchase as consumed.
    ///
    /// Idempotent on the Play side; callers treat failures as best-effort.
    pub async fn consume(&self, product_id: &str, token: &str) -> Result<(), PlayError> {
        let url = format!("{}:consume", self.purchase_url(product_id, token));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Acknowledge a purchase.
    ///
    /// Idempotent on the Play side; callers treat failures as best-effort.
    pub async fn acknowledge(&self, product_id: &str, token: &str) -> Result<(), PlayError> {
        let url = format!("{}:acknowledge", self.purchase_url(product_id, token));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PlayError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response.text().await.unwrap_or_default();
        Err(PlayError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn check_status(response: reqwest::Response) -> Result<(), PlayError> {
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(PlayError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
