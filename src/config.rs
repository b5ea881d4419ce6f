use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::adapters::amazon::{self, AmazonSettings};
use crate::adapters::ebay;
use crate::coordinator::{DEFAULT_ADAPTER_TIMEOUT, DEFAULT_SEARCH_TIMEOUT, SearchSettings};
use crate::credentials::{CredentialStore, PlatformCredentials};
use crate::data_models::Platform;
use crate::http::DEFAULT_MAX_RESPONSE_BYTES;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config::from_env()
});

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: CredentialStore,
    pub amazon: AmazonSettings,
    pub ebay_endpoint: String,
    pub ebay_app_id: Option<String>,
    pub ebay_enabled: bool,
    pub amazon_enabled: bool,
    pub mock_fallback: bool,
    pub adapter_timeout: Duration,
    pub search_timeout: Duration,
    pub max_response_bytes: usize,
    pub bind_addr: String,
    pub log_level: tracing::Level,
    /// Values that were ignored while loading. Loading happens before the
    /// subscriber exists, so the caller logs these once logging is up.
    pub warnings: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Missing or unparseable
    /// values fall back to their defaults and are noted in `warnings`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = Env {
            lookup: &lookup,
            warnings: RefCell::default(),
        };

        let amazon_credentials = PlatformCredentials::new()
            .with_secret("access_key", env.get_or_default("AMAZON_ACCESS_KEY", ""))
            .with_secret("secret_key", env.get_or_default("AMAZON_SECRET_KEY", ""))
            .with_secret("partner_tag", env.get_or_default("AMAZON_PARTNER_TAG", ""));

        let amazon_host = env.get_or_default("AMAZON_HOST", amazon::DEFAULT_HOST);
        let amazon = AmazonSettings {
            endpoint: env.get_or_default("AMAZON_ENDPOINT", &format!("https://{amazon_host}")),
            region: env.get_or_default("AMAZON_REGION", amazon::DEFAULT_REGION),
            marketplace: env.get_or_default("AMAZON_MARKETPLACE", amazon::DEFAULT_MARKETPLACE),
        };

        Config {
            credentials: CredentialStore::new().with_platform(Platform::Amazon, amazon_credentials),
            amazon,
            ebay_endpoint: env.get_or_default("EBAY_ENDPOINT", ebay::DEFAULT_ENDPOINT),
            ebay_app_id: env.get("EBAY_APP_ID"),
            ebay_enabled: env.flag_or_default("EBAY_ENABLED", true),
            amazon_enabled: env.flag_or_default("AMAZON_ENABLED", true),
            mock_fallback: env.flag_or_default("MOCK_FALLBACK", true),
            adapter_timeout: env.millis_or_default("ADAPTER_TIMEOUT_MS", DEFAULT_ADAPTER_TIMEOUT),
            search_timeout: env.millis_or_default("SEARCH_TIMEOUT_MS", DEFAULT_SEARCH_TIMEOUT),
            max_response_bytes: env.parse_or_default("MAX_RESPONSE_BYTES", DEFAULT_MAX_RESPONSE_BYTES),
            bind_addr: env.get_or_default("BIND_ADDR", DEFAULT_BIND_ADDR),
            log_level: env.parse_or_default("LOG_LEVEL", tracing::Level::INFO),
            warnings: env.warnings.take(),
        }
    }

    pub fn is_enabled(&self, platform: Platform) -> bool {
        match platform {
            Platform::Ebay => self.ebay_enabled,
            Platform::Amazon => self.amazon_enabled,
        }
    }

    pub fn search_settings(&self) -> SearchSettings {
        let disabled: HashSet<Platform> = Platform::ALL
            .into_iter()
            .filter(|p| !self.is_enabled(*p))
            .collect();

        SearchSettings {
            mock_fallback: self.mock_fallback,
            adapter_timeout: self.adapter_timeout,
            search_timeout: self.search_timeout,
            disabled,
        }
    }
}

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
    warnings: RefCell<Vec<String>>,
}

impl Env<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn warn(&self, message: String) {
        self.warnings.borrow_mut().push(message);
    }

    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or_default<T: FromStr>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                self.warn(format!("ignoring invalid {key}={raw}, using default"));
                default
            }),
            None => default,
        }
    }

    fn millis_or_default(&self, key: &str, default: Duration) -> Duration {
        let millis: u64 = self.parse_or_default(key, default.as_millis() as u64);
        if millis == 0 {
            self.warn(format!("{key} must be positive, using default"));
            return default;
        }
        Duration::from_millis(millis)
    }

    fn flag_or_default(&self, key: &str, default: bool) -> bool {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                self.warn(format!("ignoring invalid {key}={raw}, using default"));
                default
            }
        }
    }
}
