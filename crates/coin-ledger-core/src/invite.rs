//! Invite codes, memberships, and rooms.
//!
//! Invite codes are generated from a fixed alphabet that excludes visually
//! confusable characters. The keyspace (30^8) makes collisions astronomically
//! unlikely, but issuance still checks and regenerates on collision, bounded
//! to `MAX_CODE_ATTEMPTS`.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{RoomId, UserId};

/// Unambiguous code alphabet: no `0`, `O`, `1`, `I`, `L`.
pub const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

/// Fixed invite code length.
pub const CODE_LEN: usize = 8;

/// Bounded regeneration attempts on code collision.
pub const MAX_CODE_ATTEMPTS: usize = 5;

/// Generate a random invite code.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// A single-use or bounded-use invite scoped to a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    /// The generated code. Globally unique in practice.
    pub code: String,

    /// The room this invite joins.
    pub room_id: RoomId,

    /// Who issued the invite.
    pub created_by: UserId,

    /// When it was issued.
    pub created_at: DateTime<Utc>,

    /// How many distinct members have joined via this code.
    pub uses: u32,

    /// Use-count cap, if any.
    pub max_uses: Option<u32>,

    /// Expiry, if any.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Invite {
    /// Whether the invite has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Whether the use-count cap has been reached.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.max_uses.is_some_and(|cap| self.uses >= cap)
    }
}

/// A (user, room) membership created by redeeming an invite.
///
/// Membership existence is what makes redemption idempotent: a member
/// re-redeeming never increments `uses` or the room counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// The member.
    pub user_id: UserId,

    /// The room joined.
    pub room_id: RoomId,

    /// Display name recorded at join time.
    pub display_name: Option<String>,

    /// When the membership was created.
    pub joined_at: DateTime<Utc>,
}

/// A room: the parent resource invites are scoped to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Room ID.
    pub id: RoomId,

    /// Display name.
    pub name: String,

    /// The creator (first member).
    pub created_by: UserId,

    /// Current member count, maintained by redemption transactions.
    pub member_count: i64,

    /// When the room was created.
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Create a new room owned by `created_by`, with them as sole member.
    #[must_use]
    pub fn new(name: String, created_by: UserId) -> Self {
        Self {
            id: RoomId::generate(),
            name,
            created_by,
            member_count: 1,
            created_at: Utc::now(),
        }
    }
}
