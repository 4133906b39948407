//! Wallet transaction handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use coin_ledger_core::{validate_wallet_txn, Actor, EntryType, LedgerEntry, UserId, VipTier};
use coin_ledger_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Wallet transaction request.
#[derive(Debug, Deserialize)]
pub struct WalletTxnRequest {
    /// Target user; defaults to the caller. Admin-only otherwise.
    pub user_id: Option<String>,
    /// Entry type: `earn`, `spend`, `vip_upgrade`, or `bonus`.
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Signed coin delta.
    pub delta: i64,
    /// Optional note recorded on the ledger entry.
    #[serde(default)]
    pub note: Option<String>,
    /// Target tier, required for `vip_upgrade`.
    #[serde(default)]
    pub vip_tier: Option<String>,
}

/// Wallet transaction response.
#[derive(Debug, Serialize)]
pub struct WalletTxnResponse {
    /// Balance after the transaction.
    pub balance: i64,
    /// The ledger entry written.
    pub entry_id: String,
}

/// Apply a wallet transaction.
pub async fn apply_transaction(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<WalletTxnRequest>,
) -> Result<Json<WalletTxnResponse>, ApiError> {
    let entry_type = EntryType::parse_wallet_type(&body.entry_type).ok_or_else(|| {
        ApiError::InvalidArgument("type must be one of earn|spend|vip_upgrade|bonus".into())
    })?;

    let vip_tier = match &body.vip_tier {
        Some(raw) => Some(VipTier::parse(raw).ok_or_else(|| {
            ApiError::InvalidArgument("vipTier must be one of bronze|silver|gold|platinum".into())
        })?),
        None => None,
    };

    let target = match &body.user_id {
        Some(raw) => raw
            .parse::<UserId>()
            .map_err(|_| ApiError::InvalidArgument(format!("invalid user_id: {raw}")))?,
        None => auth.user_id,
    };
    auth.authorize_for(&target)?;

    validate_wallet_txn(entry_type, body.delta, vip_tier)?;

    let actor = if target == auth.user_id {
        Actor::User
    } else {
        Actor::System
    };
    let note = body.note.unwrap_or_default();

    let (balance, entry_id) =
        state
            .store
            .apply_wallet_txn(&target, entry_type, body.delta, &note, actor, vip_tier)?;

    tracing::info!(
        user_id = %target,
        entry_type = ?entry_type,
        delta = %body.delta,
        balance = %balance,
        "Wallet transaction applied"
    );

    Ok(Json(WalletTxnResponse {
        balance,
        entry_id: entry_id.to_string(),
    }))
}

/// Transaction history query parameters.
#[derive(Debug, Deserialize)]
pub struct ListEntriesQuery {
    /// Maximum number of entries to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Ledger entry response.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    /// Entry ID.
    pub id: String,
    /// Entry type.
    pub entry_type: String,
    /// Signed coin delta.
    pub amount: i64,
    /// Balance after this entry.
    pub balance_after: i64,
    /// Note.
    pub note: String,
    /// Timestamp.
    pub created_at: String,
}

impl From<&LedgerEntry> for EntryResponse {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            entry_type: entry.entry_type.as_str().to_string(),
            amount: entry.amount,
            balance_after: entry.balance_after,
            note: entry.note.clone(),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Transaction history response.
#[derive(Debug, Serialize)]
pub struct ListEntriesResponse {
    /// Current balance.
    pub balance: i64,
    /// Entries (newest first).
    pub entries: Vec<EntryResponse>,
    /// Whether there are more entries.
    pub has_more: bool,
}

/// List the caller's ledger history, newest first.
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListEntriesQuery>,
) -> Result<Json<ListEntriesResponse>, ApiError> {
    let balance = state
        .store
        .get_account(&auth.user_id)?
        .map_or(0, |account| account.balance);

    // Fetch one more than requested to determine has_more.
    let limit = query.limit.min(100);
    let entries = state
        .store
        .list_entries_by_user(&auth.user_id, limit + 1, query.offset)?;

    let has_more = entries.len() > limit;
    let entries: Vec<_> = entries.iter().take(limit).map(EntryResponse::from).collect();

    Ok(Json(ListEntriesResponse {
        balance,
        entries,
        has_more,
    }))
}
