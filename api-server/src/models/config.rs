use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use getset::{CopyGetters, Getters};
use log::LevelFilter;
use request_coordinator::{CacheConfig, RateLimitConfig};
use serde::Deserialize;
use serde_inline_default::serde_inline_default;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const CONFIG_PATH_VAR: &str = "APP_CONFIG";

const DEFAULT_CACHE_CAPACITY: usize = 100;
const DEFAULT_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5;

const DEFAULT_MAX_REQUESTS: u32 = 10;
const DEFAULT_WINDOW_MS: u64 = 60_000;
const DEFAULT_BURST_CAPACITY: u32 = 5;
const DEFAULT_BURST_WINDOW_MS: u64 = 10_000;
const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 60_000;

const DEFAULT_BACKEND_LATENCY_MS: u64 = 200;

#[serde_inline_default]
#[derive(Debug, Clone, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct CacheSettings {
    #[serde_inline_default(DEFAULT_CACHE_CAPACITY)]
    capacity: usize,
    #[serde_inline_default(DEFAULT_CACHE_TTL_SECS)]
    ttl_secs: u64,
    #[serde_inline_default(DEFAULT_SWEEP_INTERVAL_SECS)]
    sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        CacheConfig::new(
            Duration::from_secs(settings.ttl_secs),
            settings.capacity,
            Duration::from_secs(settings.sweep_interval_secs),
        )
    }
}

#[serde_inline_default]
#[derive(Debug, Clone, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct RateLimitSettings {
    #[serde_inline_default(DEFAULT_MAX_REQUESTS)]
    max_requests: u32,
    #[serde_inline_default(DEFAULT_WINDOW_MS)]
    window_ms: u64,
    #[serde_inline_default(DEFAULT_BURST_CAPACITY)]
    burst_capacity: u32,
    #[serde_inline_default(DEFAULT_BURST_WINDOW_MS)]
    burst_window_ms: u64,
    #[serde_inline_default(DEFAULT_CLEANUP_INTERVAL_MS)]
    cleanup_interval_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_ms: DEFAULT_WINDOW_MS,
            burst_capacity: DEFAULT_BURST_CAPACITY,
            burst_window_ms: DEFAULT_BURST_WINDOW_MS,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        RateLimitConfig {
            max_requests: settings.max_requests,
            window: Duration::from_millis(settings.window_ms),
            burst_capacity: settings.burst_capacity,
            burst_window: Duration::from_millis(settings.burst_window_ms),
            cleanup_interval: Duration::from_millis(settings.cleanup_interval_ms),
        }
    }
}

#[serde_inline_default]
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    #[serde_inline_default(DEFAULT_BACKEND_LATENCY_MS)]
    latency_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            latency_ms: DEFAULT_BACKEND_LATENCY_MS,
        }
    }
}

impl BackendSettings {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

#[serde_inline_default]
#[derive(Debug, Clone, Deserialize, Getters)]
#[get = "pub"]
pub struct Config {
    #[serde(default)]
    cache: CacheSettings,
    #[serde(default)]
    rate_limit: RateLimitSettings,
    #[serde(default)]
    backend: BackendSettings,
    #[serde_inline_default("info".to_string())]
    log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            rate_limit: RateLimitSettings::default(),
            backend: BackendSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load `config.yaml` (or the file named by `APP_CONFIG`), overridden by
    /// `APP_`-prefixed environment variables such as `APP_CACHE__CAPACITY`.
    pub fn load() -> Result<Self, figment::Error> {
        let path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::figment(&path).extract()
    }

    pub fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("APP_").split("__"))
    }

    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}
