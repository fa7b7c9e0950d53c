use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::survey::service::{
    ServiceSettings, DEFAULT_CACHE_TTL, DEFAULT_EXPORT_UTC_OFFSET_HOURS,
};

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
    pub survey: SurveyConfig,
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
            survey: SurveyConfig::from_env()?,
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

/// Reference cache lifetime, export clock offset and the optional seed file
/// loaded into the in-memory repository at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyConfig {
    pub cache_ttl: Duration,
    pub export_utc_offset_hours: i32,
    pub seed_path: Option<PathBuf>,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            export_utc_offset_hours: DEFAULT_EXPORT_UTC_OFFSET_HOURS,
            seed_path: None,
        }
    }
}

impl SurveyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cache_ttl = match env::var("APP_CACHE_TTL_MINUTES") {
            Ok(value) => {
                let seconds = value
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .and_then(|minutes| minutes.checked_mul(60))
                    .ok_or(ConfigError::InvalidCacheTtl { value })?;
                Duration::from_secs(seconds)
            }
            Err(_) => defaults.cache_ttl,
        };

        let export_utc_offset_hours = match env::var("APP_EXPORT_UTC_OFFSET_HOURS") {
            Ok(value) => value
                .trim()
                .parse::<i32>()
                .ok()
                .filter(|hours| (-12..=14).contains(hours))
                .ok_or(ConfigError::InvalidUtcOffset { value })?,
            Err(_) => defaults.export_utc_offset_hours,
        };

        let seed_path = env::var("APP_SEED_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            cache_ttl,
            export_utc_offset_hours,
            seed_path,
        })
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            cache_ttl: self.cache_ttl,
            export_utc_offset_hours: self.export_utc_offset_hours,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCacheTtl { value: String },
    InvalidUtcOffset { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCacheTtl { value } => write!(
                f,
                "APP_CACHE_TTL_MINUTES must be a whole number of minutes, got '{}'",
                value
            ),
            ConfigError::InvalidUtcOffset { value } => write!(
                f,
                "APP_EXPORT_UTC_OFFSET_HOURS must be between -12 and 14, got '{}'",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidCacheTtl { .. }
            | ConfigError::InvalidUtcOffset { .. } => None,
        }
    }
}
