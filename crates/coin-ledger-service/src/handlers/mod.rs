//! HTTP request handlers.

pub mod catalog;
pub mod health;
pub mod invites;
pub mod payments;
pub mod wallet;
pub mod webhooks;
