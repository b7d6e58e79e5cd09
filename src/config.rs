//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Longest TTL, sweep interval or fill timeout the cache accepts (ten years).
pub const MAX_DURATION: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

// == Cache Configuration ==
/// Sizing and timing parameters for the cache, supplied once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries across all domains combined
    pub max_entries: usize,
    /// TTL for storefront page views
    pub storefront_ttl: Duration,
    /// TTL for pack detail views
    pub pack_detail_ttl: Duration,
    /// TTL for share token to listing id mappings
    pub share_token_ttl: Duration,
    /// TTL for per-user purchased sets
    pub user_purchased_ttl: Duration,
    /// TTL for the homepage aggregate
    pub homepage_ttl: Duration,
    /// Interval between background sweeps of expired entries
    pub cleanup_interval: Duration,
    /// Upper bound on how long a caller waits for a coalesced fill, None = wait forever
    pub fill_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            storefront_ttl: Duration::from_secs(5 * 60),
            pack_detail_ttl: Duration::from_secs(3 * 60),
            share_token_ttl: Duration::from_secs(10 * 60),
            user_purchased_ttl: Duration::from_secs(60),
            homepage_ttl: Duration::from_secs(2 * 60),
            cleanup_interval: Duration::from_secs(10 * 60),
            fill_timeout: None,
        }
    }
}

impl CacheConfig {
    /// Creates a CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// All durations are in seconds. Missing, unparsable or zero values keep the default.
    /// - `CACHE_MAX_ENTRIES` (default: 1000)
    /// - `CACHE_STOREFRONT_TTL` (default: 300)
    /// - `CACHE_PACK_DETAIL_TTL` (default: 180)
    /// - `CACHE_SHARE_TOKEN_TTL` (default: 600)
    /// - `CACHE_USER_PURCHASED_TTL` (default: 60)
    /// - `CACHE_HOMEPAGE_TTL` (default: 120)
    /// - `CACHE_CLEANUP_INTERVAL` (default: 600)
    /// - `CACHE_FILL_TIMEOUT` (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_positive("CACHE_MAX_ENTRIES")
                .map(|v| v as usize)
                .unwrap_or(defaults.max_entries),
            storefront_ttl: env_secs("CACHE_STOREFRONT_TTL").unwrap_or(defaults.storefront_ttl),
            pack_detail_ttl: env_secs("CACHE_PACK_DETAIL_TTL").unwrap_or(defaults.pack_detail_ttl),
            share_token_ttl: env_secs("CACHE_SHARE_TOKEN_TTL").unwrap_or(defaults.share_token_ttl),
            user_purchased_ttl: env_secs("CACHE_USER_PURCHASED_TTL")
                .unwrap_or(defaults.user_purchased_ttl),
            homepage_ttl: env_secs("CACHE_HOMEPAGE_TTL").unwrap_or(defaults.homepage_ttl),
            cleanup_interval: env_secs("CACHE_CLEANUP_INTERVAL")
                .unwrap_or(defaults.cleanup_interval),
            fill_timeout: env_secs("CACHE_FILL_TIMEOUT"),
        }
    }

    // == Validate ==
    /// Rejects configurations the cache cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::InvalidConfig(
                "max_entries must be positive".to_string(),
            ));
        }

        let durations = [
            ("storefront_ttl", self.storefront_ttl),
            ("pack_detail_ttl", self.pack_detail_ttl),
            ("share_token_ttl", self.share_token_ttl),
            ("user_purchased_ttl", self.user_purchased_ttl),
            ("homepage_ttl", self.homepage_ttl),
            ("cleanup_interval", self.cleanup_interval),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(CacheError::InvalidConfig(format!("{} must be positive", name)));
            }
            if value > MAX_DURATION {
                return Err(CacheError::InvalidConfig(format!(
                    "{} must not exceed {}s",
                    name,
                    MAX_DURATION.as_secs()
                )));
            }
        }

        if let Some(timeout) = self.fill_timeout {
            if timeout.is_zero() || timeout > MAX_DURATION {
                return Err(CacheError::InvalidConfig(format!(
                    "fill_timeout must be between 1s and {}s when set",
                    MAX_DURATION.as_secs()
                )));
            }
        }

        Ok(())
    }
}

// == Server Configuration ==
/// Process configuration for the admin server binary.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache sizing and timing
    pub cache: CacheConfig,
    /// HTTP port for the admin surface
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// `SERVER_PORT` defaults to 3000; cache settings come from [`CacheConfig::from_env`].
    pub fn from_env() -> Self {
        Self {
            cache: CacheConfig::from_env(),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
        }
    }
}

fn env_positive(name: &str) -> Option<u64> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}

fn env_secs(name: &str) -> Option<Duration> {
    env_positive(name).map(Duration::from_secs)
}
