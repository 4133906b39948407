//! HTTP API service for the coin-ledger wallet.
//!
//! Exposes the wallet ledger, card checkout and mobile IAP fulfillment
//! rails, the product catalog, and room invites over an Axum router.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod fulfillment;
pub mod handlers;
pub mod play;
pub mod routes;
pub mod seed;
pub mod state;
pub mod stripe;

pub use auth::{AuthUser, Claims};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use seed::seed_defaults;
pub use state::AppState;
