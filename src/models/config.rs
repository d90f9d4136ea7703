//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable overriding `backend.url`.
pub const ENV_BACKEND_URL: &str = "LIBDESK_BACKEND_URL";

/// Environment variable overriding `backend.anon_key`.
pub const ENV_ANON_KEY: &str = "LIBDESK_ANON_KEY";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Hosted backend connection settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Circulation and listing behavior
    #[serde(default)]
    pub library: LibraryConfig,

    /// Local read-through cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Session safety timers
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply `LIBDESK_*` environment overrides on top of the file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_BACKEND_URL) {
            self.backend.url = url;
        }
        if let Ok(key) = std::env::var(ENV_ANON_KEY) {
            self.backend.anon_key = key;
        }
        self
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.backend.user_agent.trim().is_empty() {
            return Err(AppError::validation("backend.user_agent is empty"));
        }
        if self.backend.timeout_secs == 0 {
            return Err(AppError::validation("backend.timeout_secs must be > 0"));
        }
        if !self.backend.url.is_empty() {
            url::Url::parse(&self.backend.url)?;
        }
        if !(1..=365).contains(&self.library.default_return_days) {
            return Err(AppError::validation(
                "library.default_return_days must be between 1 and 365",
            ));
        }
        if !PAGE_SIZE_CHOICES.contains(&self.library.page_size) {
            return Err(AppError::validation(format!(
                "library.page_size must be one of {PAGE_SIZE_CHOICES:?}"
            )));
        }
        if self.library.lookup_limit == 0 {
            return Err(AppError::validation("library.lookup_limit must be > 0"));
        }
        if self.session.max_login_attempts == 0 {
            return Err(AppError::validation(
                "session.max_login_attempts must be > 0",
            ));
        }
        if self.session.idle_timeout_secs == 0 {
            return Err(AppError::validation("session.idle_timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Page sizes offered by the catalog listings.
pub const PAGE_SIZE_CHOICES: [usize; 4] = [9, 18, 27, 36];

/// Connection settings for the hosted REST backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`. Empty selects the local backend.
    #[serde(default)]
    pub url: String,

    /// Public (anon) API key sent as `apikey` and bearer token
    #[serde(default)]
    pub anon_key: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Directory holding the JSON tables of the local backend
    #[serde(default = "defaults::local_dir")]
    pub local_dir: PathBuf,
}

impl BackendConfig {
    pub fn is_remote(&self) -> bool {
        !self.url.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
            local_dir: defaults::local_dir(),
        }
    }
}

/// Circulation and listing behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Return period used when the backend has no settings row
    #[serde(default = "defaults::return_days")]
    pub default_return_days: u32,

    /// Items per page in listings
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Country calling code prefixed to reminder phone numbers
    #[serde(default = "defaults::country_code")]
    pub country_code: String,

    /// Window for "due soon" reminders, in days
    #[serde(default = "defaults::upcoming_window_days")]
    pub upcoming_window_days: i64,

    /// Window for the upcoming-returns panel, in hours
    #[serde(default = "defaults::upcoming_returns_hours")]
    pub upcoming_returns_hours: i64,

    /// Maximum answers returned by the lookup widget
    #[serde(default = "defaults::lookup_limit")]
    pub lookup_limit: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            default_return_days: defaults::return_days(),
            page_size: defaults::page_size(),
            country_code: defaults::country_code(),
            upcoming_window_days: defaults::upcoming_window_days(),
            upcoming_returns_hours: defaults::upcoming_returns_hours(),
            lookup_limit: defaults::lookup_limit(),
        }
    }
}

/// Local read-through cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "defaults::cache_enabled")]
    pub enabled: bool,

    /// Directory for cached collection snapshots
    #[serde(default = "defaults::cache_dir")]
    pub dir: PathBuf,

    /// Age after which a cached collection is refetched
    #[serde(default = "defaults::staleness")]
    pub staleness_secs: u64,
}

impl CacheConfig {
    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.staleness_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::cache_enabled(),
            dir: defaults::cache_dir(),
            staleness_secs: defaults::staleness(),
        }
    }
}

/// Session safety timers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inactivity window before forced sign-out
    #[serde(default = "defaults::idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Failed sign-ins before the lockout starts
    #[serde(default = "defaults::max_login_attempts")]
    pub max_login_attempts: u32,

    /// Lockout length after too many failures
    #[serde(default = "defaults::lockout")]
    pub lockout_secs: u64,

    /// Delay before a typed search query fires
    #[serde(default = "defaults::search_debounce")]
    pub search_debounce_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: defaults::idle_timeout(),
            max_login_attempts: defaults::max_login_attempts(),
            lockout_secs: defaults::lockout(),
            search_debounce_ms: defaults::search_debounce(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Backend defaults
    pub fn user_agent() -> String {
        "libdesk/0.1".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn local_dir() -> PathBuf {
        PathBuf::from("data")
    }

    // Library defaults
    pub fn return_days() -> u32 {
        crate::models::DEFAULT_RETURN_DAYS
    }
    pub fn page_size() -> usize {
        9
    }
    pub fn country_code() -> String {
        "91".into()
    }
    pub fn upcoming_window_days() -> i64 {
        5
    }
    pub fn upcoming_returns_hours() -> i64 {
        48
    }
    pub fn lookup_limit() -> usize {
        5
    }

    // Cache defaults
    pub fn cache_enabled() -> bool {
        true
    }
    pub fn cache_dir() -> PathBuf {
        PathBuf::from(".cache")
    }
    pub fn staleness() -> u64 {
        5 * 60
    }

    // Session defaults
    pub fn idle_timeout() -> u64 {
        15 * 60
    }
    pub fn max_login_attempts() -> u32 {
        5
    }
    pub fn lockout() -> u64 {
        5 * 60
    }
    pub fn search_debounce() -> u64 {
        300
    }
}
