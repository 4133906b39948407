//! Core types and utilities for the coin-ledger wallet service.
//!
//! This crate provides the foundational types used throughout the platform:
//!
//! - **Identifiers**: `UserId`, `RoomId`, `PaymentId`, `EntryId`
//! - **Accounts**: `Account`, `VipTier`, `AccountPatch`
//! - **Ledger**: `LedgerEntry`, `EntryType`, `Actor`
//! - **Payments**: `PaymentRecord`, `FulfillmentRecord`
//! - **Products**: `Product`, `PurchaseMutation` and the entitlement resolver
//! - **Invites**: `Invite`, `Membership`, `Room`, invite code generation
//!
//! # Coin Unit
//!
//! Balances are whole coins stored as `i64` and are never allowed to go
//! negative. Fiat amounts are integer minor units (cents) to avoid floating
//! point precision issues.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod config;
pub mod error;
pub mod ids;
pub mod invite;
pub mod ledger;
pub mod payment;
pub mod product;

pub use account::{next_balance, Account, AccountPatch, VipTier};
pub use config::WalletConfig;
pub use error::{Result, WalletError};
pub use ids::{EntryId, IdError, PaymentId, RoomId, UserId};
pub use invite::{
    generate_code, Invite, Membership, Room, CODE_ALPHABET, CODE_LEN, MAX_CODE_ATTEMPTS,
};
pub use ledger::{validate_wallet_txn, Actor, EntryType, LedgerEntry};
pub use payment::{
    card_event_id, play_event_id, FulfillmentRecord, PaymentMeta, PaymentProvider, PaymentRecord,
    PaymentStatus,
};
pub use product::{
    coins_from_sku, estimate_fiat_cents, resolve_purchase, Product, ProductKind, PurchaseMutation,
};
