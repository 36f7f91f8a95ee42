//! Configuration types for the offline cache.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Policy applied when resolving an intercepted request.
///
/// Exactly one policy is active at a time; there is no way to register
/// both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    /// Serve from the store when possible; fetch and store on a miss.
    #[default]
    CacheFirst,
    /// Always fetch live and store a copy; the store is only a write target.
    NetworkFirst,
}

impl FromStr for FetchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cache-first" => Ok(Self::CacheFirst),
            "network-first" => Ok(Self::NetworkFirst),
            other => Err(Error::Config(format!(
                "unknown fetch policy: {other} (expected cache-first or network-first)"
            ))),
        }
    }
}

impl std::fmt::Display for FetchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CacheFirst => write!(f, "cache-first"),
            Self::NetworkFirst => write!(f, "network-first"),
        }
    }
}

/// Configuration for the cache manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Name of the cache store. Doubles as its version: there is no
    /// migration of stored snapshots, so bump this string whenever the
    /// cached content's schema or layout changes. Superseded stores are
    /// not deleted automatically.
    pub cache_name: String,
    /// Resource served when neither the store nor the network can answer.
    pub offline_url: String,
    /// Origin prepended to root-relative entries at fetch time.
    pub origin: String,
    /// Resolution policy for intercepted requests.
    pub policy: FetchPolicy,
    /// Whether `install` also precaches `offline_url`. The fallback is
    /// useless on a cold store unless it is cached up front.
    pub precache_offline: bool,
    /// Number of concurrent resource fetches during `install`.
    pub concurrent_fetches: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_name: "site-cache-v1".to_string(),
            offline_url: "/offline".to_string(),
            origin: "http://localhost:4000".to_string(),
            policy: FetchPolicy::CacheFirst,
            precache_offline: true,
            concurrent_fetches: 4,
        }
    }
}

impl CacheConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache store name/version string.
    #[must_use]
    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    /// Sets the offline fallback resource.
    #[must_use]
    pub fn with_offline_url(mut self, url: impl Into<String>) -> Self {
        self.offline_url = url.into();
        self
    }

    /// Sets the origin for root-relative entries.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Sets the resolution policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets whether the offline fallback is precached during install.
    #[must_use]
    pub const fn with_precache_offline(mut self, precache: bool) -> Self {
        self.precache_offline = precache;
        self
    }

    /// Sets the install fetch concurrency.
    #[must_use]
    pub const fn with_concurrent_fetches(mut self, concurrent: usize) -> Self {
        self.concurrent_fetches = concurrent;
        self
    }
}

/// Path configuration for the on-disk store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Root directory under which named stores are created.
    pub store_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            store_dir: data_dir.join("precache").join("stores"),
        }
    }
}

/// Complete application configuration for the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cache manager configuration.
    pub cache: CacheConfig,
    /// Path configuration.
    pub paths: PathConfig,
    /// Resources to precache, as raw list entries.
    pub urls: Vec<String>,
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location of the config file, if a config dir exists.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("precache").join("precache.toml"))
    }

    /// Loads configuration from the default path, falling back to
    /// defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be read or parsed.
    pub fn load() -> crate::Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Loads configuration from a specific TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &std::path::Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cache_config() {
        let config = CacheConfig::default();
        assert_eq!(config.cache_name, "site-cache-v1");
        assert_eq!(config.offline_url, "/offline");
        assert_eq!(config.policy, FetchPolicy::CacheFirst);
        assert!(config.precache_offline);
        assert_eq!(config.concurrent_fetches, 4);
    }

    #[test]
    fn cache_config_builder_pattern() {
        let config = CacheConfig::new()
            .with_cache_name("blog-cache-v3")
            .with_offline_url("/offline.html")
            .with_origin("https://blog.example.com")
            .with_policy(FetchPolicy::NetworkFirst)
            .with_precache_offline(false)
            .with_concurrent_fetches(8);

        assert_eq!(config.cache_name, "blog-cache-v3");
        assert_eq!(config.offline_url, "/offline.html");
        assert_eq!(config.origin, "https://blog.example.com");
        assert_eq!(config.policy, FetchPolicy::NetworkFirst);
        assert!(!config.precache_offline);
        assert_eq!(config.concurrent_fetches, 8);
    }

    #[test]
    fn cache_config_serializes_to_toml() {
        let config = CacheConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: CacheConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.cache_name, config.cache_name);
        assert_eq!(deserialized.policy, config.policy);
        assert_eq!(deserialized.concurrent_fetches, config.concurrent_fetches);
    }

    #[test]
    fn fetch_policy_round_trips_kebab_case() {
        assert_eq!(
            "cache-first".parse::<FetchPolicy>().unwrap(),
            FetchPolicy::CacheFirst
        );
        assert_eq!(
            "network-first".parse::<FetchPolicy>().unwrap(),
            FetchPolicy::NetworkFirst
        );
        assert!("cache_first".parse::<FetchPolicy>().is_err());
        assert_eq!(FetchPolicy::NetworkFirst.to_string(), "network-first");
    }

    #[test]
    fn app_config_accepts_partial_toml() {
        let parsed: AppConfig = toml::from_str(
            r#"
urls = ["/", "/blog/first-post", "/assets/app.js"]

[cache]
cache_name = "blog-cache-v2"
policy = "network-first"
"#,
        )
        .unwrap();
        assert_eq!(parsed.cache.cache_name, "blog-cache-v2");
        assert_eq!(parsed.cache.policy, FetchPolicy::NetworkFirst);
        // Unspecified fields keep their defaults.
        assert_eq!(parsed.cache.offline_url, "/offline");
        assert_eq!(parsed.urls.len(), 3);
    }

    #[test]
    fn default_path_config_is_under_data_dir() {
        let config = PathConfig::default();
        assert!(config.store_dir.to_string_lossy().contains("precache"));
        assert!(config.store_dir.to_string_lossy().contains("stores"));
    }

    #[test]
    fn load_missing_default_file_falls_back_to_defaults() {
        // No config file is written in the test environment.
        let config = AppConfig::load().unwrap();
        assert_eq!(config.cache.cache_name, "site-cache-v1");
    }
}
