//! Room and invite integration tests.

mod common;

use chrono::{Duration, Utc};
use common::{bearer_token, TestHarness};
use serde_json::json;

use coin_ledger_core::{Invite, Room, UserId};
use coin_ledger_store::Store;

async fn create_room(harness: &TestHarness, name: &str) -> String {
    let response = harness
        .server
        .post("/v1/rooms")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "name": name }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    body["room_id"].as_str().unwrap().to_string()
}

// ============================================================================
// Rooms
// ============================================================================

#[tokio::test]
async fn create_room_makes_creator_a_member() {
    let harness = TestHarness::new();
    let room_id = create_room(&harness, "Poker Night").await;

    // The creator can immediately issue invites.
    let response = harness
        .server
        .post(&format!("/v1/rooms/{room_id}/invites"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({}))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn blank_room_name_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/rooms")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "name": "   " }))
        .await;

    response.assert_status_bad_request();
}

// ============================================================================
// Invite issuance
// ============================================================================

#[tokio::test]
async fn non_member_cannot_issue_invites() {
    let harness = TestHarness::new();
    let room_id = create_room(&harness, "Members Only").await;

    let outsider = UserId::generate();
    let response = harness
        .server
        .post(&format!("/v1/rooms/{room_id}/invites"))
        .add_header("authorization", bearer_token(&outsider, false))
        .json(&json!({}))
        .await;

    response.assert_status_forbidden();
}

#[tokio::test]
async fn unknown_room_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post(&format!(
            "/v1/rooms/{}/invites",
            coin_ledger_core::RoomId::generate()
        ))
        .add_header("authorization", harness.auth_header())
        .json(&json!({}))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn malformed_room_id_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/rooms/not-a-uuid/invites")
        .add_header("authorization", harness.auth_header())
        .json(&json!({}))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn zero_max_uses_rejected() {
    let harness = TestHarness::new();
    let room_id = create_room(&harness, "Capped").await;

    let response = harness
        .server
        .post(&format!("/v1/rooms/{room_id}/invites"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "max_uses": 0 }))
        .await;

    response.assert_status_bad_request();
}

// ============================================================================
// Redemption
// ============================================================================

#[tokio::test]
async fn single_use_invite_admits_exactly_one_member() {
    let harness = TestHarness::new();
    let room_id = create_room(&harness, "One Seat").await;

    let response = harness
        .server
        .post(&format!("/v1/rooms/{room_id}/invites"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "max_uses": 1 }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let code = body["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 8);

    // First redeemer joins.
    let guest = UserId::generate();
    let response = harness
        .server
        .post("/v1/invites/redeem")
        .add_header("authorization", bearer_token(&guest, false))
        .json(&json!({ "code": code, "display_name": "Guest" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["room_id"], room_id);
    assert_eq!(body["joined"], true);

    // Re-redeeming is a no-op for an existing member.
    let response = harness
        .server
        .post("/v1/invites/redeem")
        .add_header("authorization", bearer_token(&guest, false))
        .json(&json!({ "code": code }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["joined"], false);

    // A second distinct user finds the invite exhausted.
    let another = UserId::generate();
    let response = harness
        .server
        .post("/v1/invites/redeem")
        .add_header("authorization", bearer_token(&another, false))
        .json(&json!({ "code": code }))
        .await;

    response.assert_status(axum::http::StatusCode::PRECONDITION_FAILED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "failed_precondition");

    // The invite list reflects the single use.
    let response = harness
        .server
        .get(&format!("/v1/rooms/{room_id}/invites"))
        .add_header("authorization", harness.auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let invites = body["invites"].as_array().unwrap();
    assert_eq!(invites.len(), 1);
    assert_eq!(invites[0]["uses"], 1);
}

#[tokio::test]
async fn codes_are_matched_case_insensitively() {
    let harness = TestHarness::new();
    let room_id = create_room(&harness, "Lowercase").await;

    let response = harness
        .server
        .post(&format!("/v1/rooms/{room_id}/invites"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({}))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let code = body["code"].as_str().unwrap().to_lowercase();

    let guest = UserId::generate();
    let response = harness
        .server
        .post("/v1/invites/redeem")
        .add_header("authorization", bearer_token(&guest, false))
        .json(&json!({ "code": format!("  {code}  ") }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["joined"], true);
}

#[tokio::test]
async fn expired_invite_rejected() {
    let harness = TestHarness::new();

    // Seed an already-expired invite directly.
    let room = Room::new("Stale".into(), harness.user_id);
    harness.store.create_room(&room).unwrap();
    harness
        .store
        .create_invite(&Invite {
            code: "EXPIRED2".into(),
            room_id: room.id,
            created_by: harness.user_id,
            created_at: Utc::now() - Duration::hours(2),
            uses: 0,
            max_uses: None,
            expires_at: Some(Utc::now() - Duration::hours(1)),
        })
        .unwrap();

    let guest = UserId::generate();
    let response = harness
        .server
        .post("/v1/invites/redeem")
        .add_header("authorization", bearer_token(&guest, false))
        .json(&json!({ "code": "EXPIRED2" }))
        .await;

    response.assert_status(axum::http::StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn unknown_code_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/invites/redeem")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "code": "NOSUCHCO" }))
        .await;

    response.assert_status_not_found();
}
