//! Key encoding utilities for `RocksDB`.
//!
//! This module provides functions for encoding and decoding keys used in
//! column families.

use coin_ledger_core::{EntryId, PaymentId, RoomId, UserId};

/// Create an account key from a user ID.
#[must_use]
pub fn account_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a ledger entry key from an entry ID.
#[must_use]
pub fn entry_key(entry_id: &EntryId) -> Vec<u8> {
    entry_id.to_bytes().to_vec()
}

/// Create a user-entry index key.
///
/// Format: `user_id (16 bytes) || entry_id (16 bytes)`
///
/// Since ULIDs are time-ordered, a user's entries sort chronologically.
#[must_use]
pub fn user_entry_key(user_id: &UserId, entry_id: &EntryId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&entry_id.to_bytes());
    key
}

/// Create a prefix for iterating all ledger entries for a user.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Extract the entry ID from a user-entry index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_entry_id_from_user_key(key: &[u8]) -> EntryId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    EntryId::from_bytes(bytes).expect("valid ULID bytes")
}

/// Create a payment key from a payment ID.
#[must_use]
pub fn payment_key(payment_id: &PaymentId) -> Vec<u8> {
    payment_id.to_bytes().to_vec()
}

/// Create a user-payment index key.
///
/// Format: `user_id (16 bytes) || payment_id (16 bytes)`
#[must_use]
pub fn user_payment_key(user_id: &UserId, payment_id: &PaymentId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&payment_id.to_bytes());
    key
}

/// Extract the payment ID from a user-payment index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_payment_id_from_user_key(key: &[u8]) -> PaymentId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    PaymentId::from_bytes(bytes).expect("valid ULID bytes")
}

/// Create a purchase-token index key.
#[must_use]
pub fn token_key(purchase_token: &str) -> Vec<u8> {
    purchase_token.as_bytes().to_vec()
}

/// Create a fulfillment guard key from an external event ID.
#[must_use]
pub fn fulfillment_key(event_id: &str) -> Vec<u8> {
    event_id.as_bytes().to_vec()
}

/// Create a product key from a product ID.
#[must_use]
pub fn product_key(product_id: &str) -> Vec<u8> {
    product_id.as_bytes().to_vec()
}

/// Create an invite key from a code.
#[must_use]
pub fn invite_key(code: &str) -> Vec<u8> {
    code.as_bytes().to_vec()
}

/// Create a room-invite index key.
///
/// Format: `room_id (16 bytes) || code (ASCII)`
#[must_use]
pub fn room_invite_key(room_id: &RoomId, code: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + code.len());
    key.extend_from_slice(room_id.as_bytes());
    key.extend_from_slice(code.as_bytes());
    key
}

/// Extract the invite code from a room-invite index key.
///
/// # Panics
///
/// Panics if the key suffix is not valid UTF-8.
#[must_use]
pub fn extract_code_from_room_key(key: &[u8]) -> String {
    String::from_utf8(key[16..].to_vec()).expect("codes are ASCII")
}

/// Create a membership key.
///
/// Format: `room_id (16 bytes) || user_id (16 bytes)`
#[must_use]
pub fn membership_key(room_id: &RoomId, user_id: &UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(room_id.as_bytes());
    key.extend_from_slice(user_id.as_bytes());
    key
}

/// Create a room key from a room ID.
#[must_use]
pub fn room_key(room_id: &RoomId) -> Vec<u8> {
    room_id.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_key_length() {
        let user_id = UserId::generate();
        assert_eq!(account_key(&user_id).len(), 16);
    }

    #[test]
    fn user_entry_key_format() {
        let user_id = UserId::generate();
        let entry_id = EntryId::generate();
        let key = user_entry_key(&user_id, &entry_id);

        assert_eq!(key.len(), 32);
        assert_eq!(&key[..16], user_id.as_bytes());
        assert_eq!(&key[16..], entry_id.to_bytes());
    }

    #[test]
    fn extract_entry_id_roundtrip() {
        let user_id = UserId::generate();
        let entry_id = EntryId::generate();
        let key = user_entry_key(&user_id, &entry_id);

        assert_eq!(extract_entry_id_from_user_key(&key), entry_id);
    }

    #[test]
    fn extract_payment_id_roundtrip() {
        let user_id = UserId::generate();
        let payment_id = PaymentId::generate();
        let key = user_payment_key(&user_id, &payment_id);

        assert_eq!(extract_payment_id_from_user_key(&key), payment_id);
    }

    #[test]
    fn room_invite_key_roundtrip() {
        let room_id = RoomId::generate();
        let key = room_invite_key(&room_id, "ABCD2345");

        assert_eq!(&key[..16], room_id.as_bytes());
        assert_eq!(extract_code_from_room_key(&key), "ABCD2345");
    }

    #[test]
    fn membership_key_format() {
        let room_id = RoomId::generate();
        let user_id = UserId::generate();
        let key = membership_key(&room_id, &user_id);

        assert_eq!(key.len(), 32);
        assert_eq!(&key[..16], room_id.as_bytes());
        assert_eq!(&key[16..], user_id.as_bytes());
    }
}
