//! Worker configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `RELAY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `SHOPIFY_API_VERSION` - Admin API version (default: 2025-01)
//! - `MIGRATE_BUNDLE_WORKER_INTERVAL_MS` - Replication tick interval (default: 60000)
//! - `SYNC_BUNDLE_WORKER_INTERVAL_MS` - Product sync tick interval (default: 300000)
//! - `PRODUCT_SYNC_PAGE_SIZE` - Products per page, 1..=250 (default: 250)
//! - `PRODUCT_SYNC_PAGE_ATTEMPTS` - Attempts per page on transient errors (default: 3)
//! - `PRODUCT_SYNC_RETRY_DELAY_MS` - Delay between page attempts (default: 2000)
//! - `CLAIM_BACKEND` - `postgres` or `memory` (default: postgres)
//! - `CLAIM_LEASE_SECS` - Lease length of durable claims (default: 900)
//! - `DEFAULT_LOCATION_NAME` - Preferred fulfillment location (default: Shop location)
//! - `RELAY_HOST` - Health endpoint bind address (default: 127.0.0.1)
//! - `RELAY_PORT` - Health endpoint port (default: 3002)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_API_VERSION: &str = "2025-01";
const DEFAULT_LOCATION_NAME: &str = "Shop location";
/// Largest page the Admin API accepts for `products(first:)`.
pub const MAX_PAGE_SIZE: u32 = 250;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where claims are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimBackend {
    /// Lease rows in the `claims` table, shared by every worker instance.
    Postgres,
    /// Process-local set; only safe with a single worker instance.
    Memory,
}

impl FromStr for ClaimBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'postgres' or 'memory', got '{other}'")),
        }
    }
}

/// Worker application configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the health server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shopify Admin API version used for every storefront
    pub api_version: String,
    /// Tick intervals
    pub schedule: ScheduleConfig,
    /// Catalog ingestion settings
    pub sync: SyncConfig,
    pub claims: ClaimConfig,
    /// Location name preferred when stocking variants
    pub default_location_name: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Intervals of the two recurring jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub replication_interval: Duration,
    pub product_sync_interval: Duration,
}

/// Pagination settings of the product sync job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub page_size: u32,
    pub page_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            page_attempts: 3,
            retry_delay: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimConfig {
    pub backend: ClaimBackend,
    pub lease: Duration,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("RELAY_DATABASE_URL")?;
        let host = parse_env_or_default::<IpAddr>("RELAY_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("RELAY_PORT", "3002")?;
        let api_version = get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION);
        let schedule = ScheduleConfig::from_env()?;
        let sync = SyncConfig::from_env()?;
        let claims = ClaimConfig::from_env()?;
        let default_location_name =
            get_env_or_default("DEFAULT_LOCATION_NAME", DEFAULT_LOCATION_NAME);
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            api_version,
            schedule,
            sync,
            claims,
            default_location_name,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the health server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ScheduleConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            replication_interval: get_interval_ms("MIGRATE_BUNDLE_WORKER_INTERVAL_MS", 60_000)?,
            product_sync_interval: get_interval_ms("SYNC_BUNDLE_WORKER_INTERVAL_MS", 300_000)?,
        })
    }
}

impl SyncConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let page_size = parse_env_or_default::<u32>("PRODUCT_SYNC_PAGE_SIZE", "250")?;
        validate_page_size(page_size)?;

        let page_attempts = parse_env_or_default::<u32>("PRODUCT_SYNC_PAGE_ATTEMPTS", "3")?;
        if page_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "PRODUCT_SYNC_PAGE_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let retry_delay_ms = parse_env_or_default::<u64>("PRODUCT_SYNC_RETRY_DELAY_MS", "2000")?;

        Ok(Self {
            page_size,
            page_attempts,
            retry_delay: Duration::from_millis(retry_delay_ms),
        })
    }
}

impl ClaimConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend = get_env_or_default("CLAIM_BACKEND", "postgres")
            .parse::<ClaimBackend>()
            .map_err(|e| ConfigError::InvalidEnvVar("CLAIM_BACKEND".to_string(), e))?;
        let lease_secs = parse_env_or_default::<u64>("CLAIM_LEASE_SECS", "900")?;
        if lease_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CLAIM_LEASE_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            backend,
            lease: Duration::from_secs(lease_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Read a non-zero millisecond interval.
fn get_interval_ms(key: &str, default_ms: u64) -> Result<Duration, ConfigError> {
    let ms = parse_env_or_default::<u64>(key, &default_ms.to_string())?;
    if ms == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "interval must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_millis(ms))
}

fn validate_page_size(page_size: u32) -> Result<(), ConfigError> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::InvalidEnvVar(
            "PRODUCT_SYNC_PAGE_SIZE".to_string(),
            format!("must be between 1 and {MAX_PAGE_SIZE} (got {page_size})"),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_backend_parsing() {
        assert_eq!("postgres".parse::<ClaimBackend>().unwrap(), ClaimBackend::Postgres);
        assert_eq!("MEMORY".parse::<ClaimBackend>().unwrap(), ClaimBackend::Memory);
        assert!("redis".parse::<ClaimBackend>().is_err());
    }

    #[test]
    fn test_page_size_bounds() {
        assert!(validate_page_size(1).is_ok());
        assert!(validate_page_size(250).is_ok());
        assert!(matches!(
            validate_page_size(0),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(validate_page_size(251).is_err());
    }

    #[test]
    fn test_sync_defaults() {
        let sync = SyncConfig::default();
        assert_eq!(sync.page_size, 250);
        assert_eq!(sync.page_attempts, 3);
        assert_eq!(sync.retry_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_socket_addr() {
        let config = WorkerConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3002,
            api_version: DEFAULT_API_VERSION.to_string(),
            schedule: ScheduleConfig {
                replication_interval: Duration::from_secs(60),
                product_sync_interval: Duration::from_secs(300),
            },
            sync: SyncConfig::default(),
            claims: ClaimConfig {
                backend: ClaimBackend::Memory,
                lease: Duration::from_secs(900),
            },
            default_location_name: DEFAULT_LOCATION_NAME.to_string(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3002);
    }

    #[test]
    fn test_config_debug_redacts_database_url() {
        let url = SecretString::from("postgres://relay:hunter2@db/relay");
        let debug_output = format!("{url:?}");
        assert!(!debug_output.contains("hunter2"));
    }
}
