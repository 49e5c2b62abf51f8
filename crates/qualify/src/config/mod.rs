use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::cache::CacheSettings;
use crate::rubric::WeightPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scoring: ScoringConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Score cache sizing and rubric validation policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    pub sweep_interval: Duration,
    pub weight_policy: WeightPolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            cache_max_entries: 10_000,
            sweep_interval: Duration::from_secs(60),
            weight_policy: WeightPolicy::default(),
        }
    }
}

impl ScoringConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cache_ttl = Duration::from_secs(read_number(
            "SCORE_CACHE_TTL_SECS",
            defaults.cache_ttl.as_secs(),
        )?);
        let cache_max_entries = read_number(
            "SCORE_CACHE_MAX_ENTRIES",
            defaults.cache_max_entries as u64,
        )? as usize;
        let sweep_interval = Duration::from_secs(read_number(
            "SCORE_CACHE_SWEEP_SECS",
            defaults.sweep_interval.as_secs(),
        )?);

        if cache_max_entries == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "SCORE_CACHE_MAX_ENTRIES",
            });
        }
        if sweep_interval.is_zero() {
            return Err(ConfigError::InvalidNumber {
                key: "SCORE_CACHE_SWEEP_SECS",
            });
        }

        let weight_total = match env::var("RUBRIC_WEIGHT_TOTAL") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|total| total.is_finite() && *total > 0.0)
                .ok_or(ConfigError::InvalidNumber {
                    key: "RUBRIC_WEIGHT_TOTAL",
                })?,
            Err(_) => 100.0,
        };

        let weight_policy = match env::var("RUBRIC_WEIGHT_POLICY")
            .unwrap_or_else(|_| "strict".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "strict" => WeightPolicy::Strict {
                total: weight_total,
            },
            "draft" | "draft-allowed" | "draft_allowed" => WeightPolicy::DraftAllowed,
            other => {
                return Err(ConfigError::InvalidWeightPolicy {
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            cache_ttl,
            cache_max_entries,
            sweep_interval,
            weight_policy,
        })
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            ttl: self.cache_ttl,
            max_entries: self.cache_max_entries,
        }
    }
}

fn read_number(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidWeightPolicy { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a positive number")
            }
            ConfigError::InvalidWeightPolicy { value } => write!(
                f,
                "RUBRIC_WEIGHT_POLICY must be 'strict' or 'draft', got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidWeightPolicy { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "SCORE_CACHE_TTL_SECS",
            "SCORE_CACHE_MAX_ENTRIES",
            "SCORE_CACHE_SWEEP_SECS",
            "RUBRIC_WEIGHT_POLICY",
            "RUBRIC_WEIGHT_TOTAL",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.scoring, ScoringConfig::default());
        assert_eq!(
            config.scoring.weight_policy,
            WeightPolicy::Strict { total: 100.0 }
        );
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_cache_and_policy_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SCORE_CACHE_TTL_SECS", "30");
        env::set_var("SCORE_CACHE_MAX_ENTRIES", "64");
        env::set_var("RUBRIC_WEIGHT_POLICY", "draft");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.scoring.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.scoring.cache_settings().max_entries, 64);
        assert_eq!(config.scoring.weight_policy, WeightPolicy::DraftAllowed);
        reset_env();
    }

    #[test]
    fn rejects_unknown_weight_policy() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RUBRIC_WEIGHT_POLICY", "lenient");
        match AppConfig::load() {
            Err(ConfigError::InvalidWeightPolicy { value }) => assert_eq!(value, "lenient"),
            other => panic!("expected weight policy error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_zero_cache_capacity() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SCORE_CACHE_MAX_ENTRIES", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                key: "SCORE_CACHE_MAX_ENTRIES"
            })
        ));
        reset_env();
    }
}
