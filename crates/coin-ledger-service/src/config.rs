//! Service configuration.

use serde::Deserialize;
use std::path::Path;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/coin-ledger").
    pub data_dir: String,

    /// HS256 secret for bearer-token verification.
    pub auth_secret: String,

    /// Stripe API key (optional).
    pub stripe_api_key: Option<String>,

    /// Stripe webhook secret (optional; unset skips signature verification).
    pub stripe_webhook_secret: Option<String>,

    /// Play Developer API base URL (overridable for tests).
    pub play_base_url: String,

    /// Android package name for purchase verification.
    pub play_package_name: Option<String>,

    /// Play Developer API access token (optional).
    pub play_access_token: Option<String>,

    /// Frontend URL for checkout redirects.
    pub frontend_url: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Default Play Developer API base URL.
const PLAY_BASE_URL: &str = "https://androidpublisher.googleapis.com/androidpublisher/v3";

/// Stripe secrets file structure.
#[derive(Debug, Deserialize)]
struct StripeSecrets {
    api_key: String,
    #[serde(default)]
    webhook_secret: Option<String>,
}

/// Play secrets file structure.
#[derive(Debug, Deserialize)]
struct PlaySecrets {
    package_name: String,
    access_token: String,
    #[serde(default)]
    base_url: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let (stripe_api_key, stripe_webhook_secret) = load_stripe_secrets();
        let (play_package_name, play_access_token, play_base_url) = load_play_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/coin-ledger".into()),
            auth_secret: std::env::var("AUTH_SECRET").unwrap_or_else(|_| "dev-secret".into()),
            stripe_api_key,
            stripe_webhook_secret,
            play_base_url: play_base_url.unwrap_or_else(|| PLAY_BASE_URL.into()),
            play_package_name,
            play_access_token,
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

/// Load Stripe secrets from file or environment.
fn load_stripe_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/stripe.json",
        "coin-ledger/.secrets/stripe.json",
        "../.secrets/stripe.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<StripeSecrets>(path) {
            tracing::info!(path = %path, "Loaded Stripe secrets from file");
            return (Some(secrets.api_key), secrets.webhook_secret);
        }
    }

    tracing::debug!("Stripe secrets file not found, using environment variables");
    (
        std::env::var("STRIPE_API_KEY").ok(),
        std::env::var("STRIPE_WEBHOOK_SECRET").ok(),
    )
}

/// Load Play secrets from file or environment.
fn load_play_secrets() -> (Option<String>, Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/play.json",
        "coin-ledger/.secrets/play.json",
        "../.secrets/play.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<PlaySecrets>(path) {
            tracing::info!(path = %path, "Loaded Play secrets from file");
            return (
                Some(secrets.package_name),
                Some(secrets.access_token),
                secrets.base_url,
            );
        }
    }

    tracing::debug!("Play secrets file not found, using environment variables");
    (
        std::env::var("PLAY_PACKAGE_NAME").ok(),
        std::env::var("PLAY_ACCESS_TOKEN").ok(),
        std::env::var("PLAY_BASE_URL").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/coin-ledger".into(),
            auth_secret: "dev-secret".into(),
            stripe_api_key: None,
            stripe_webhook_secret: None,
            play_base_url: PLAY_BASE_URL.into(),
            play_package_name: None,
            play_access_token: None,
            frontend_url: "http://localhost:3000".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
