//! Stripe integration for the card checkout rail.

mod client;
mod types;

pub use client::{StripeClient, StripeError};
pub use types::{CheckoutSession, StripeErrorResponse};
