//! Google Play integration for the mobile IAP rail.

mod client;

pub use client::{PlayClient, PlayError, ProductPurchase};
