//! `RocksDB` storage layer for the coin-ledger wallet service.
//!
//! This crate provides persistent storage for accounts, ledger entries,
//! payments, fulfillment guards, the product catalog, and invites, using
//! `RocksDB` with column families for indexing.
//!
//! # Transaction discipline
//!
//! Every multi-record read-modify-write is a single compound operation: the
//! reads, the business checks, and one atomic `WriteBatch` commit, serialized
//! behind an internal write lock. No external call ever happens inside a
//! compound operation, so provider latency never blocks other mutations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};

use coin_ledger_core::{
    Account, Actor, EntryId, EntryType, FulfillmentRecord, Invite, LedgerEntry, PaymentId,
    PaymentRecord, Product, PurchaseMutation, Room, RoomId, UserId, VipTier, WalletConfig,
};

/// Outcome of a finalize-purchase transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The event was applied: payment completed, mutation committed.
    Applied {
        /// Balance after the mutation.
        balance: i64,
        /// The ledger entry written by this transaction.
        entry_id: EntryId,
    },

    /// The dedup guard was already fulfilled; nothing was written.
    AlreadyFulfilled,
}

/// Outcome of an invite redemption transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// The redeemer joined the room.
    Joined {
        /// The room that was joined.
        room_id: RoomId,
        /// Invite uses after this redemption.
        uses: u32,
    },

    /// The redeemer was already a member; nothing was counted.
    AlreadyMember {
        /// The room the redeemer already belongs to.
        room_id: RoomId,
    },
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations.
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert or update an account record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &Account) -> Result<()>;

    /// Get an account by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>>;

    // =========================================================================
    // Wallet Transactions
    // =========================================================================

    /// Apply a validated wallet transaction atomically.
    ///
    /// Merge-creates the account if absent, computes the next balance, writes
    /// the ledger entry and the account update in one batch. On a
    /// `vip_upgrade` the tier and `vip_since` are set in the same batch.
    ///
    /// Returns the resulting balance and the new entry's ID.
    ///
    /// # Errors
    ///
    /// - `StoreError::InsufficientBalance` if the balance would go negative;
    ///   no writes occur.
    fn apply_wallet_txn(
        &self,
        user_id: &UserId,
        entry_type: EntryType,
        delta: i64,
        note: &str,
        actor: Actor,
        vip_tier: Option<VipTier>,
    ) -> Result<(i64, EntryId)>;

    /// List ledger entries for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_entries_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>>;

    // =========================================================================
    // Payments
    // =========================================================================

    /// Insert or update a payment record, maintaining the user index and the
    /// purchase-token index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_payment(&self, payment: &PaymentRecord) -> Result<()>;

    /// Get a payment by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_payment(&self, payment_id: &PaymentId) -> Result<Option<PaymentRecord>>;

    /// Look up a payment by mobile purchase token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_payment_by_token(&self, purchase_token: &str) -> Result<Option<PaymentRecord>>;

    /// Sum the coins of a user's completed payments since `since`.
    ///
    /// Used by the advisory daily-cap pre-check.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn completed_coins_since(&self, user_id: &UserId, since: DateTime<Utc>) -> Result<i64>;

    // =========================================================================
    // Fulfillment
    // =========================================================================

    /// Get a fulfillment guard by external event ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_fulfillment(&self, event_id: &str) -> Result<Option<FulfillmentRecord>>;

    /// Finalize a payment exactly once.
    ///
    /// Inside one serialized transaction: re-check the guard (replays return
    /// [`FinalizeOutcome::AlreadyFulfilled`] with no writes), mark the payment
    /// completed, apply the purchase mutation to the account, append the
    /// `purchase` ledger entry, and write the guard with back-references —
    /// all in one atomic batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; the transaction
    /// aborts with no partial writes.
    fn finalize_purchase(
        &self,
        event_id: &str,
        payment: &PaymentRecord,
        mutation: &PurchaseMutation,
        note: &str,
    ) -> Result<FinalizeOutcome>;

    // =========================================================================
    // Catalog & Config
    // =========================================================================

    /// Insert or update a catalog product.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_product(&self, product: &Product) -> Result<()>;

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_product(&self, product_id: &str) -> Result<Option<Product>>;

    /// List all products, sorted by their storefront order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_products(&self) -> Result<Vec<Product>>;

    /// Store the wallet configuration record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_wallet_config(&self, config: &WalletConfig) -> Result<()>;

    /// Get the wallet configuration record, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_wallet_config(&self) -> Result<Option<WalletConfig>>;

    // =========================================================================
    // Rooms & Memberships
    // =========================================================================

    /// Create a room with its creator as the sole member, atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn create_room(&self, room: &Room) -> Result<()>;

    /// Get a room by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>>;

    /// Check whether a user is a member of a room.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn is_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool>;

    // =========================================================================
    // Invites
    // =========================================================================

    /// Persist a new invite, failing on code collision so the caller can
    /// regenerate.
    ///
    /// # Errors
    ///
    /// - `StoreError::CodeCollision` if the code already exists.
    fn create_invite(&self, invite: &Invite) -> Result<()>;

    /// Look up an invite by code (codes are globally unique).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_invite(&self, code: &str) -> Result<Option<Invite>>;

    /// List invites issued for a room.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_invites_by_room(&self, room_id: &RoomId) -> Result<Vec<Invite>>;

    /// Redeem an invite exactly once per distinct member.
    ///
    /// Inside one serialized transaction: re-read the invite, check expiry
    /// and exhaustion, and either report the redeemer as an existing member
    /// (no counters change) or create the membership, bump the room's member
    /// count, and bump the invite's `uses` — all in one atomic batch.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` for an unknown code.
    /// - `StoreError::InviteExpired` / `StoreError::InviteExhausted`.
    fn redeem_invite(
        &self,
        code: &str,
        user_id: &UserId,
        display_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome>;
}
