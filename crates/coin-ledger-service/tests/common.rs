//! Common test utilities for coin-ledger integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use tempfile::TempDir;

use coin_ledger_core::{UserId, WalletConfig};
use coin_ledger_service::{create_router, seed_defaults, AppState, Claims, ServiceConfig};
use coin_ledger_store::{RocksStore, Store};

/// HS256 secret shared by harness and tokens.
pub const TEST_AUTH_SECRET: &str = "test-secret";

/// Knobs for harness construction.
pub struct HarnessOptions {
    /// Daily coin-earning cap (0 = unlimited).
    pub daily_limit_coins: i64,
    /// Base URL for the mobile purchase verifier (points at a mock server).
    pub play_base_url: Option<String>,
    /// Webhook signing secret; unset runs the webhook in dev mode.
    pub stripe_webhook_secret: Option<String>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            daily_limit_coins: 0,
            play_base_url: None,
            stripe_webhook_secret: None,
        }
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct store handle for seeding and assertions.
    pub store: Arc<RocksStore>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test user ID for authenticated requests.
    pub user_id: UserId,
}

impl TestHarness {
    /// Create a new test harness with a fresh database and default options.
    pub fn new() -> Self {
        Self::with_options(HarnessOptions::default())
    }

    /// Create a new test harness with the given options.
    pub fn with_options(options: HarnessOptions) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        seed_defaults(store.as_ref()).expect("Failed to seed defaults");
        store
            .put_wallet_config(&WalletConfig {
                rate: 100,
                currency: "USD".into(),
                daily_limit_coins: options.daily_limit_coins,
                skus: vec!["coins_100".into(), "coins_500".into()],
            })
            .expect("Failed to seed wallet config");

        let (play_package_name, play_access_token) = if options.play_base_url.is_some() {
            (Some("com.example.app".to_string()), Some("test-token".to_string()))
        } else {
            (None, None)
        };

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            auth_secret: TEST_AUTH_SECRET.into(),
            stripe_api_key: options.stripe_webhook_secret.as_ref().map(|_| "sk_test_xxx".into()),
            stripe_webhook_secret: options.stripe_webhook_secret,
            play_base_url: options
                .play_base_url
                .unwrap_or_else(|| "http://localhost:1".into()),
            play_package_name,
            play_access_token,
            frontend_url: "http://localhost:3000".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        };

        let state = AppState::new(Arc::clone(&store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");
        let user_id = UserId::generate();

        Self {
            server,
            store,
            _temp_dir: temp_dir,
            user_id,
        }
    }

    /// Get the authorization header for the harness user.
    pub fn auth_header(&self) -> String {
        bearer_token(&self.user_id, false)
    }

    /// Get an admin authorization header for an arbitrary user.
    pub fn admin_auth_header(&self, user_id: &UserId) -> String {
        bearer_token(user_id, true)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Mint a bearer token for a user.
pub fn bearer_token(user_id: &UserId, admin: bool) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        admin,
        exp: now + 3600,
        iat: now,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_AUTH_SECRET.as_bytes()),
    )
    .expect("Failed to encode token");

    format!("Bearer {token}")
}
