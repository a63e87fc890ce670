//! # Storefront Configuration
//!
//! Endpoints, credentials and tuning for every service the storefront talks
//! to. Credentials are handed to the gateway and clients at construction;
//! nothing reads them from globals afterwards.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOREFRONT_BACKEND_URL=https://abc.supabase.co/rest/v1             │
//! │     STOREFRONT_BACKEND_KEY=eyJhbGciOi...                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/storefront/storefront.toml (Linux)                       │
//! │     ~/Library/Application Support/com.storefront.storefront/... (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     Native upserts, 30s reconcile interval, public provider URLs       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # storefront.toml
//! [backend]
//! rest_url = "https://abc.supabase.co/rest/v1"
//! api_key = "eyJhbGciOi..."
//!
//! [shipping]
//! api_url = "https://api.shipbubble.com/v1"
//! api_key = "sb_sandbox_..."
//!
//! [payment]
//! public_key = "pk_test_..."
//! secret_key = "sk_test_..."
//!
//! [cart]
//! upsert_strategy = "native"  # native | serialized
//!
//! [reconciler]
//! poll_interval_secs = 30
//! batch_size = 50
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use storefront_data::{GatewayConfig, UpsertStrategy};

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read or written.
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A setting has an unusable value.
    ///
    /// ## When This Occurs
    /// - Backend URL missing or not http(s)
    /// - Zero batch size or poll interval
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// A credential required for the requested operation is absent.
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Backend Settings
// =============================================================================

/// The hosted REST backend.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct BackendSettings {
    /// REST root, e.g. `https://<project>.supabase.co/rest/v1`.
    #[serde(default)]
    pub rest_url: String,

    /// Anonymous (row-level-security) key.
    #[serde(default)]
    pub api_key: String,
}

impl fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("rest_url", &self.rest_url)
            .field("api_key", &redact(Some(&self.api_key)))
            .finish()
    }
}

// =============================================================================
// Shipping Settings
// =============================================================================

/// The courier-rate provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct ShippingSettings {
    #[serde(default = "default_shipping_url")]
    pub api_url: String,

    /// Without a key every quote comes from the flat-rate table.
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_shipping_url() -> String {
    "https://api.shipbubble.com/v1".to_string()
}

impl Default for ShippingSettings {
    fn default() -> Self {
        ShippingSettings {
            api_url: default_shipping_url(),
            api_key: None,
        }
    }
}

impl fmt::Debug for ShippingSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShippingSettings")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(self.api_key.as_deref()))
            .finish()
    }
}

// =============================================================================
// Payment Settings
// =============================================================================

/// The payment popup and its verification API.
#[derive(Clone, Serialize, Deserialize)]
pub struct PaymentSettings {
    /// Public key given to the popup.
    #[serde(default)]
    pub public_key: Option<String>,

    /// Secret key for server-side verification.
    #[serde(default)]
    pub secret_key: Option<String>,

    #[serde(default = "default_payment_url")]
    pub api_url: String,

    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_payment_url() -> String {
    "https://api.paystack.co".to_string()
}

fn default_currency() -> String {
    "NGN".to_string()
}

impl Default for PaymentSettings {
    fn default() -> Self {
        PaymentSettings {
            public_key: None,
            secret_key: None,
            api_url: default_payment_url(),
            currency: default_currency(),
        }
    }
}

impl fmt::Debug for PaymentSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentSettings")
            .field("public_key", &self.public_key)
            .field("secret_key", &redact(self.secret_key.as_deref()))
            .field("api_url", &self.api_url)
            .field("currency", &self.currency)
            .finish()
    }
}

fn redact(secret: Option<&str>) -> &'static str {
    match secret {
        Some(s) if !s.is_empty() => "<redacted>",
        _ => "<unset>",
    }
}

// =============================================================================
// Cart Settings
// =============================================================================

/// Cart and wishlist write behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartSettings {
    /// `native` needs the backend's `add_to_cart` function;
    /// `serialized` works against plain tables from a single process.
    #[serde(default)]
    pub upsert_strategy: UpsertStrategy,
}

// =============================================================================
// Reconciler Settings
// =============================================================================

/// Stock reconciler tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerSettings {
    /// Interval between queue polls (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Adjustments applied per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Attempts after which an adjustment is skipped and left for an operator.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,

    /// Initial backoff after a failed poll (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff after repeated failed polls (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_poll_interval() -> u64 {
    30
}
fn default_batch_size() -> u32 {
    50
}
fn default_max_attempts() -> i64 {
    10
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    300
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        ReconcilerSettings {
            poll_interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete storefront configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub shipping: ShippingSettings,

    #[serde(default)]
    pub payment: PaymentSettings,

    #[serde(default)]
    pub cart: CartSettings,

    #[serde(default)]
    pub reconciler: ReconcilerSettings,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (storefront.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading storefront config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load storefront config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Storefront config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let url = self.backend.rest_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid(
                "backend.rest_url is required (or set STOREFRONT_BACKEND_URL)".into(),
            ));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "backend.rest_url must start with http:// or https://, got: {}",
                url
            )));
        }
        if self.backend.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("backend.api_key".into()));
        }

        if self.reconciler.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "reconciler.batch_size must be greater than 0".into(),
            ));
        }
        if self.reconciler.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "reconciler.poll_interval_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup.
    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(url) = lookup("STOREFRONT_BACKEND_URL") {
            debug!(url = %url, "Overriding backend URL from environment");
            self.backend.rest_url = url;
        }
        if let Some(key) = lookup("STOREFRONT_BACKEND_KEY") {
            self.backend.api_key = key;
        }

        if let Some(strategy) = lookup("STOREFRONT_UPSERT_STRATEGY") {
            match strategy.parse() {
                Ok(parsed) => self.cart.upsert_strategy = parsed,
                Err(e) => warn!(strategy = %strategy, "{}", e),
            }
        }

        if let Some(url) = lookup("SHIPBUBBLE_API_URL") {
            self.shipping.api_url = url;
        }
        if let Some(key) = lookup("SHIPBUBBLE_API_KEY") {
            self.shipping.api_key = Some(key);
        }

        if let Some(key) = lookup("PAYSTACK_PUBLIC_KEY") {
            self.payment.public_key = Some(key);
        }
        if let Some(key) = lookup("PAYSTACK_SECRET_KEY") {
            self.payment.secret_key = Some(key);
        }
        if let Some(url) = lookup("PAYSTACK_API_URL") {
            self.payment.api_url = url;
        }

        if let Some(secs) = lookup("STOREFRONT_RECONCILE_INTERVAL_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.reconciler.poll_interval_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid reconcile interval"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "storefront", "storefront")
            .map(|dirs| dirs.config_dir().join("storefront.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Connection settings for the REST gateway.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new(self.backend.rest_url.clone(), self.backend.api_key.clone())
    }

    pub fn upsert_strategy(&self) -> UpsertStrategy {
        self.cart.upsert_strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid() -> StoreConfig {
        let mut config = StoreConfig::default();
        config.backend.rest_url = "https://abc.supabase.co/rest/v1".to_string();
        config.backend.api_key = "anon".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.cart.upsert_strategy, UpsertStrategy::Native);
        assert_eq!(config.reconciler.poll_interval_secs, 30);
        assert_eq!(config.reconciler.max_attempts, 10);
        assert_eq!(config.payment.currency, "NGN");
        assert!(config.shipping.api_key.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = StoreConfig::default();
        assert!(config.validate().is_err());

        config = valid();
        assert!(config.validate().is_ok());

        config.backend.rest_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config = valid();
        config.backend.api_key = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingCredential(_))));

        config = valid();
        config.reconciler.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("STOREFRONT_BACKEND_URL", "https://xyz.supabase.co/rest/v1"),
            ("STOREFRONT_BACKEND_KEY", "key-from-env"),
            ("STOREFRONT_UPSERT_STRATEGY", "serialized"),
            ("SHIPBUBBLE_API_KEY", "sb_live"),
            ("STOREFRONT_RECONCILE_INTERVAL_SECS", "not-a-number"),
        ]);

        let mut config = StoreConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend.rest_url, "https://xyz.supabase.co/rest/v1");
        assert_eq!(config.upsert_strategy(), UpsertStrategy::Serialized);
        assert_eq!(config.shipping.api_key.as_deref(), Some("sb_live"));
        assert_eq!(config.reconciler.poll_interval_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: StoreConfig = toml::from_str(
            r#"
            [backend]
            rest_url = "https://abc.supabase.co/rest/v1"
            api_key = "anon"

            [cart]
            upsert_strategy = "serialized"
            "#,
        )
        .unwrap();

        assert_eq!(config.upsert_strategy(), UpsertStrategy::Serialized);
        assert_eq!(config.shipping.api_url, "https://api.shipbubble.com/v1");
        assert_eq!(config.reconciler.batch_size, 50);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = valid();
        config.payment.secret_key = Some("sk_live_secret".to_string());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk_live_secret"));
        assert!(!debug.contains("\"anon\""));
    }

    #[test]
    fn test_toml_serialization() {
        let config = valid();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[backend]"));
        assert!(toml_str.contains("[reconciler]"));
    }
}
