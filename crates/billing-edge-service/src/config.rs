//! Service configuration.

use serde::Deserialize;
use std::path::Path;

/// Default header a trusted scheduler sets on cron invocations.
pub const DEFAULT_CRON_SCHEDULER_HEADER: &str = "x-vercel-cron";

/// Default Stripe signature timestamp tolerance, matching Stripe's libraries.
pub const DEFAULT_WEBHOOK_TOLERANCE_SECONDS: u64 = 300;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL connection string for the subscriptions database.
    pub database_url: Option<String>,

    /// Maximum pooled database connections (default: 5).
    pub database_max_connections: u32,

    /// Apply bundled migrations at startup (default: false).
    pub run_migrations: bool,

    /// Stripe webhook signing secret (`whsec_...`).
    pub stripe_webhook_secret: Option<String>,

    /// Allowed age of a Stripe signature timestamp in seconds; 0 disables the check.
    pub stripe_webhook_tolerance_seconds: u64,

    /// Shared secret accepted as `Authorization: Bearer <secret>` on cron routes.
    pub cron_secret: Option<String>,

    /// Header whose presence marks a scheduler-originated request.
    pub cron_scheduler_header: String,

    /// Whether the scheduler header alone authorizes a cron request.
    pub cron_trust_scheduler_header: bool,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Stripe secrets file structure.
#[derive(Debug, Deserialize)]
struct StripeSecrets {
    #[serde(default)]
    webhook_secret: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            database_url: env_non_empty("DATABASE_URL"),
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS").unwrap_or(5),
            run_migrations: env_flag("RUN_MIGRATIONS").unwrap_or(false),
            stripe_webhook_secret: load_stripe_webhook_secret(),
            stripe_webhook_tolerance_seconds: env_parse("STRIPE_WEBHOOK_TOLERANCE_SECONDS")
                .unwrap_or(DEFAULT_WEBHOOK_TOLERANCE_SECONDS),
            cron_secret: env_non_empty("CRON_SECRET"),
            cron_scheduler_header: std::env::var("CRON_SCHEDULER_HEADER")
                .map(|h| h.trim().to_ascii_lowercase())
                .unwrap_or_else(|_| DEFAULT_CRON_SCHEDULER_HEADER.into()),
            cron_trust_scheduler_header: env_flag("CRON_TRUST_SCHEDULER_HEADER").unwrap_or(true),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS").unwrap_or(30),
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

/// Load the Stripe webhook secret from file or environment.
fn load_stripe_webhook_secret() -> Option<String> {
    let secret_paths = [
        ".secrets/stripe.json",
        "billing-edge/.secrets/stripe.json",
        "../.secrets/stripe.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<StripeSecrets>(path) {
            if let Some(secret) = secrets.webhook_secret.filter(|s| !s.is_empty()) {
                tracing::info!(path = %path, "Loaded Stripe webhook secret from file");
                return Some(secret);
            }
        }
    }

    tracing::debug!("Stripe secrets file not found, using environment variables");
    env_non_empty("STRIPE_WEBHOOK_SECRET")
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
            database_url: None,
            database_max_connections: 5,
            run_migrations: false,
            stripe_webhook_secret: None,
            stripe_webhook_tolerance_seconds: DEFAULT_WEBHOOK_TOLERANCE_SECONDS,
            cron_secret: None,
            cron_scheduler_header: DEFAULT_CRON_SCHEDULER_HEADER.into(),
            cron_trust_scheduler_header: true,
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
