//! Application state.

use std::sync::Arc;

use coin_ledger_store::RocksStore;

use crate::config::ServiceConfig;
use crate::play::PlayClient;
use crate::stripe::StripeClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Stripe client for card checkout (optional).
    pub stripe: Option<Arc<StripeClient>>,

    /// Play client for mobile purchase verification (optional).
    pub play: Option<Arc<PlayClient>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Provider clients are built once at startup from config; unconfigured
    /// rails stay `None` and their endpoints return 502.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        let stripe = config.stripe_api_key.as_ref().map(|key| {
            tracing::info!("Stripe integration enabled");
            Arc::new(StripeClient::new(key, config.stripe_webhook_secret.clone()))
        });

        if stripe.is_none() {
            tracing::warn!("Stripe not configured - card checkout will not be available");
        }

        let play = config
            .play_package_name
            .as_ref()
            .zip(config.play_access_token.as_ref())
            .map(|(package, token)| {
                tracing::info!(package_name = %package, "Play integration enabled");
                Arc::new(PlayClient::new(&config.play_base_url, package, token))
            });

        if play.is_none() {
            tracing::warn!("Play not configured - mobile purchase verification will not be available");
        }

        Self {
            store,
            config,
            stripe,
            play,
        }
    }

    /// Check if Stripe is configured.
    #[must_use]
    pub fn has_stripe(&self) -> bool {
        self.stripe.is_some()
    }

    /// Check if Play is configured.
    #[must_use]
    pub fn has_play(&self) -> bool {
        self.play.is_some()
    }
}
