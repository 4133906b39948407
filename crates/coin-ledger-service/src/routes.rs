//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{catalog, health, invites, payments, wallet, webhooks};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for payment endpoints. Each of these holds an
/// outbound provider call open, so the cap is tighter than the general API.
const PAYMENT_MAX_CONCURRENT_REQUESTS: usize = 25;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/config` - Wallet configuration
/// - `GET /v1/products` - Product catalog
///
/// ## Wallet (bearer auth)
/// - `POST /v1/wallet/transactions` - Apply a wallet transaction
/// - `GET /v1/wallet/transactions` - Ledger history
///
/// ## Payments (bearer auth, concurrency limited)
/// - `POST /v1/payments/checkout` - Create a card checkout intent
/// - `POST /v1/payments/play/verify` - Verify a mobile purchase
///
/// ## Rooms & invites (bearer auth)
/// - `POST /v1/rooms` - Create a room
/// - `POST /v1/rooms/{room_id}/invites` - Issue an invite
/// - `GET /v1/rooms/{room_id}/invites` - List a room's invites
/// - `POST /v1/invites/redeem` - Redeem an invite code
///
/// ## Webhooks (signature verification)
/// - `POST /webhooks/stripe` - Card-rail payment events
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Payment routes carry their own, tighter concurrency limit: each request
    // can hold a Stripe or Play call open for the provider's full latency.
    let payment_routes = Router::new()
        .route("/checkout", post(payments::create_checkout))
        .route("/play/verify", post(payments::verify_play_purchase))
        .layer(ConcurrencyLimitLayer::new(PAYMENT_MAX_CONCURRENT_REQUESTS));

    // Create concurrency-limited API routes
    let api_routes = Router::new()
        // Wallet
        .route("/wallet/transactions", post(wallet::apply_transaction))
        .route("/wallet/transactions", get(wallet::list_entries))
        // Rooms & invites
        .route("/rooms", post(invites::create_room))
        .route("/rooms/:room_id/invites", post(invites::issue_invite))
        .route("/rooms/:room_id/invites", get(invites::list_invites))
        .route("/invites/redeem", post(invites::redeem_invite))
        // Config & catalog
        .route("/config", get(catalog::get_config))
        .route("/products", get(catalog::list_products))
        // Payment routes (with their own concurrency limit)
        .nest("/payments", payment_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Webhooks (no rate limit - controlled by external services)
        .route("/webhooks/stripe", post(webhooks::stripe_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
