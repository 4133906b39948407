//! Config and catalog endpoint tests.

mod common;

use common::TestHarness;

#[tokio::test]
async fn health_reports_ok() {
    let harness = TestHarness::new();

    let response = harness.server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "coin-ledger");
}

#[tokio::test]
async fn config_is_public() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/config").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["rate"], 100);
    assert_eq!(body["currency"], "USD");
    assert!(body["skus"]
        .as_array()
        .unwrap()
        .iter()
        .any(|s| s == "coins_500"));
}

#[tokio::test]
async fn products_list_only_active_items() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/products").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let products = body["products"].as_array().unwrap();
    assert!(!products.is_empty());

    let coins_500 = products
        .iter()
        .find(|p| p["id"] == "coins_500")
        .expect("seeded product present");
    assert_eq!(coins_500["coins_amount"], 500);
    assert_eq!(coins_500["kind"], "coins");
}
