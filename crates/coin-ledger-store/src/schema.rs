//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary account records, keyed by `user_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Immutable ledger entries, keyed by `entry_id` (ULID).
    pub const LEDGER: &str = "ledger";

    /// Index: ledger entries by user, keyed by `user_id || entry_id`.
    /// Value is empty (index only).
    pub const LEDGER_BY_USER: &str = "ledger_by_user";

    /// Payment records, keyed by `payment_id` (ULID).
    pub const PAYMENTS: &str = "payments";

    /// Index: payments by user, keyed by `user_id || payment_id`.
    pub const PAYMENTS_BY_USER: &str = "payments_by_user";

    /// Index: mobile purchase token -> `payment_id`.
    pub const PAYMENTS_BY_TOKEN: &str = "payments_by_token";

    /// Fulfillment dedup guards, keyed by external `event_id`.
    pub const FULFILLMENTS: &str = "fulfillments";

    /// Catalog products, keyed by product ID.
    pub const PRODUCTS: &str = "products";

    /// Invites, keyed by code (globally unique).
    pub const INVITES: &str = "invites";

    /// Index: invites by room, keyed by `room_id || code`.
    pub const INVITES_BY_ROOM: &str = "invites_by_room";

    /// Memberships, keyed by `room_id || user_id`.
    pub const MEMBERSHIPS: &str = "memberships";

    /// Rooms, keyed by `room_id`.
    pub const ROOMS: &str = "rooms";

    /// Singleton configuration records.
    pub const CONFIG: &str = "config";
}

/// Key of the wallet configuration record in the `config` column family.
pub const WALLET_CONFIG_KEY: &[u8] = b"wallet";

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::LEDGER,
        cf::LEDGER_BY_USER,
        cf::PAYMENTS,
        cf::PAYMENTS_BY_USER,
        cf::PAYMENTS_BY_TOKEN,
        cf::FULFILLMENTS,
        cf::PRODUCTS,
        cf::INVITES,
        cf::INVITES_BY_ROOM,
        cf::MEMBERSHIPS,
        cf::ROOMS,
        cf::CONFIG,
    ]
}
