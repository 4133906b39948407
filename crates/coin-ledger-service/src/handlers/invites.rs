//! Room and invite handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use coin_ledger_core::{generate_code, Invite, Room, RoomId, MAX_CODE_ATTEMPTS};
use coin_ledger_store::{RedeemOutcome, Store, StoreError};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Room creation request.
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    /// Display name for the room.
    pub name: String,
}

/// Room response.
#[derive(Debug, Serialize)]
pub struct RoomResponse {
    /// Room ID.
    pub room_id: String,
    /// Display name.
    pub name: String,
    /// Current member count.
    pub member_count: i64,
}

/// Create a room with the caller as its first member.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateRoomRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::InvalidArgument("name must not be empty".into()));
    }

    let room = Room::new(name.to_string(), auth.user_id);
    state.store.create_room(&room)?;

    tracing::info!(room_id = %room.id, created_by = %auth.user_id, "Room created");

    Ok(Json(RoomResponse {
        room_id: room.id.to_string(),
        name: room.name,
        member_count: room.member_count,
    }))
}

/// Invite issuance request.
#[derive(Debug, Default, Deserialize)]
pub struct IssueInviteRequest {
    /// Use-count cap, if any.
    #[serde(default)]
    pub max_uses: Option<u32>,
    /// Minutes until expiry, if any.
    #[serde(default)]
    pub expires_in_minutes: Option<i64>,
}

/// Invite response.
#[derive(Debug, Serialize)]
pub struct InviteResponse {
    /// The invite code.
    pub code: String,
    /// The room it joins.
    pub room_id: String,
    /// Distinct members joined via this code.
    pub uses: u32,
    /// Use-count cap, if any.
    pub max_uses: Option<u32>,
    /// Expiry, if any.
    pub expires_at: Option<String>,
}

impl From<&Invite> for InviteResponse {
    fn from(invite: &Invite) -> Self {
        Self {
            code: invite.code.clone(),
            room_id: invite.room_id.to_string(),
            uses: invite.uses,
            max_uses: invite.max_uses,
            expires_at: invite.expires_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// Issue an invite for a room.
///
/// Code generation retries on the (astronomically unlikely) collision, up to
/// a bounded attempt count.
pub async fn issue_invite(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(room_id): Path<String>,
    Json(body): Json<IssueInviteRequest>,
) -> Result<Json<InviteResponse>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    require_member(&state, &room_id, &auth)?;

    if body.max_uses == Some(0) {
        return Err(ApiError::InvalidArgument("max_uses must be positive".into()));
    }

    let expires_at = match body.expires_in_minutes {
        Some(minutes) if minutes <= 0 => {
            return Err(ApiError::InvalidArgument(
                "expires_in_minutes must be positive".into(),
            ));
        }
        Some(minutes) => Some(Utc::now() + Duration::minutes(minutes)),
        None => None,
    };

    let mut last_code = String::new();
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generate_code(&mut rand::rng());
        last_code.clone_from(&code);

        let invite = Invite {
            code,
            room_id,
            created_by: auth.user_id,
            created_at: Utc::now(),
            uses: 0,
            max_uses: body.max_uses,
            expires_at,
        };

        match state.store.create_invite(&invite) {
            Ok(()) => {
                tracing::info!(code = %invite.code, room_id = %room_id, "Invite issued");
                return Ok(Json(InviteResponse::from(&invite)));
            }
            Err(StoreError::CodeCollision { .. }) => {
                tracing::warn!(code = %invite.code, "Invite code collision, regenerating");
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::error!(last_code = %last_code, "Exhausted invite code attempts");
    Err(ApiError::CodeGenerationExhausted {
        attempts: MAX_CODE_ATTEMPTS,
    })
}

/// Invite list response.
#[derive(Debug, Serialize)]
pub struct ListInvitesResponse {
    /// Invites issued for the room.
    pub invites: Vec<InviteResponse>,
}

/// List a room's invites.
pub async fn list_invites(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<ListInvitesResponse>, ApiError> {
    let room_id = parse_room_id(&room_id)?;
    require_member(&state, &room_id, &auth)?;

    let invites = state.store.list_invites_by_room(&room_id)?;
    let invites = invites.iter().map(InviteResponse::from).collect();

    Ok(Json(ListInvitesResponse { invites }))
}

/// Redemption request.
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    /// The invite code.
    pub code: String,
    /// Display name recorded on the membership.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Redemption response.
#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    /// The room joined (or already belonged to).
    pub room_id: String,
    /// Whether this call created the membership.
    pub joined: bool,
}

/// Redeem an invite code.
pub async fn redeem_invite(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<RedeemRequest>,
) -> Result<Json<RedeemResponse>, ApiError> {
    let code = body.code.trim().to_ascii_uppercase();
    if code.is_empty() {
        return Err(ApiError::InvalidArgument("code must not be empty".into()));
    }

    let outcome = state
        .store
        .redeem_invite(&code, &auth.user_id, body.display_name, Utc::now())?;

    let (room_id, joined) = match outcome {
        RedeemOutcome::Joined { room_id, uses } => {
            tracing::info!(code = %code, room_id = %room_id, uses = %uses, user_id = %auth.user_id, "Invite redeemed");
            (room_id, true)
        }
        RedeemOutcome::AlreadyMember { room_id } => {
            tracing::info!(code = %code, room_id = %room_id, user_id = %auth.user_id, "Redeemer already a member");
            (room_id, false)
        }
    };

    Ok(Json(RedeemResponse {
        room_id: room_id.to_string(),
        joined,
    }))
}

fn parse_room_id(raw: &str) -> Result<RoomId, ApiError> {
    raw.parse::<RoomId>()
        .map_err(|_| ApiError::InvalidArgument(format!("invalid room_id: {raw}")))
}

fn require_member(state: &AppState, room_id: &RoomId, auth: &AuthUser) -> Result<(), ApiError> {
    if state.store.get_room(room_id)?.is_none() {
        return Err(ApiError::NotFound(format!("room: {room_id}")));
    }

    if auth.admin || state.store.is_member(room_id, &auth.user_id)? {
        Ok(())
    } else {
        Err(ApiError::PermissionDenied(
            "caller is not a member of this room".into(),
        ))
    }
}
