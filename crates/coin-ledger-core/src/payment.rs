//! Payment and fulfillment record types.
//!
//! A `PaymentRecord` is created per payment attempt and transitions
//! pending -> completed exactly once. The `FulfillmentRecord` is the durable
//! idempotency anchor: it is keyed by the external event identity of its rail
//! and re-checked inside the finalize transaction, so redelivered events are
//! no-ops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EntryId, PaymentId, UserId};

/// The external payment rail that produced a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    /// Card checkout rail (webhook driven).
    Card,

    /// Mobile in-app-purchase rail (verification-call driven).
    Play,
}

impl PaymentProvider {
    /// Wire name of the provider.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Play => "play",
        }
    }
}

/// Lifecycle status of a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created at checkout/verification initiation; not yet credited.
    Pending,

    /// Finalized by the fulfillment engine. Never re-credited.
    Completed,
}

/// Provider-specific metadata attached to a payment.
///
/// Typed fields rather than a free-form map, so the record stays closed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentMeta {
    /// Card rail checkout session ID.
    pub checkout_session_id: Option<String>,

    /// Card rail payment intent ID.
    pub payment_intent: Option<String>,

    /// Mobile rail purchase token.
    pub purchase_token: Option<String>,

    /// Mobile rail order ID.
    pub order_id: Option<String>,
}

/// One payment attempt (card or in-app).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Unique payment ID (ULID for time-ordering).
    pub id: PaymentId,

    /// The user who owns this payment.
    pub user_id: UserId,

    /// The rail that produced it.
    pub provider: PaymentProvider,

    /// Coins requested. Zero for non-coin (vip/feature) products.
    pub coins: i64,

    /// Fiat amount in minor units (cents).
    pub fiat_cents: i64,

    /// ISO currency code.
    pub currency: String,

    /// Lifecycle status.
    pub status: PaymentStatus,

    /// Catalog product ID, if this payment is product-typed.
    pub product_id: Option<String>,

    /// Provider-specific metadata.
    pub meta: PaymentMeta,

    /// When the payment was created.
    pub created_at: DateTime<Utc>,

    /// When the payment completed, if it has.
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    /// Create a new pending payment record.
    #[must_use]
    pub fn pending(
        user_id: UserId,
        provider: PaymentProvider,
        coins: i64,
        fiat_cents: i64,
        currency: String,
    ) -> Self {
        Self {
            id: PaymentId::generate(),
            user_id,
            provider,
            coins,
            fiat_cents,
            currency,
            status: PaymentStatus::Pending,
            product_id: None,
            meta: PaymentMeta::default(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Whether the payment has already been finalized.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}

/// The durable dedup guard, keyed by external event identity.
///
/// One guard per rail: the card rail keys by payment identity
/// (`card:<payment_id>`, shared by all webhook event types that reference the
/// payment), the mobile rail keys by purchase token (`play:<token>`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentRecord {
    /// External event identity this guard covers.
    pub event_id: String,

    /// Whether the event has been applied. Once true, replays are no-ops.
    pub fulfilled: bool,

    /// The payment this event finalized.
    pub payment_id: PaymentId,

    /// Ledger entry written by the finalize transaction.
    pub entry_id: Option<EntryId>,

    /// Product fulfilled, if product-typed.
    pub product_id: Option<String>,

    /// When the guard was created.
    pub created_at: DateTime<Utc>,

    /// When the event was applied.
    pub fulfilled_at: Option<DateTime<Utc>>,
}

/// Build the card-rail fulfillment event identity for a payment.
#[must_use]
pub fn card_event_id(payment_id: PaymentId) -> String {
    format!("card:{payment_id}")
}

/// Build the mobile-rail fulfillment event identity for a purchase token.
#[must_use]
pub fn play_event_id(purchase_token: &str) -> String {
    format!("play:{purchase_token}")
}
