use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::admissions::EnumPolicy;
use crate::reporting::IncomeRates;

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
    pub storage: StorageConfig,
    pub enum_policy: EnumPolicy,
    pub income_rates: IncomeRates,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "5001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let upload_dir = env::var("APP_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));
        let data_file = env::var("APP_DATA_FILE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let enum_policy = match env::var("APP_ENUM_POLICY") {
            Ok(raw) => EnumPolicy::parse(&raw).ok_or(ConfigError::InvalidEnumPolicy(raw))?,
            Err(_) => EnumPolicy::default(),
        };

        let defaults = IncomeRates::default();
        let income_rates = IncomeRates {
            new_student: rate_from_env("APP_NEW_STUDENT_INCOME", defaults.new_student)?,
            coe_applied: rate_from_env("APP_COE_APPLIED_INCOME", defaults.coe_applied)?,
            coe_received: rate_from_env("APP_COE_RECEIVED_INCOME", defaults.coe_received)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage: StorageConfig {
                upload_dir,
                data_file,
            },
            enum_policy,
            income_rates,
        })
    }
}

fn rate_from_env(name: &'static str, default: i64) -> Result<i64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidRate { name }),
        Err(_) => Ok(default),
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where uploads and the optional store snapshot live on disk.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub data_file: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidEnumPolicy(String),
    InvalidRate { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidEnumPolicy(value) => write!(
                f,
                "APP_ENUM_POLICY must be 'substitute' or 'strict', got '{value}'"
            ),
            ConfigError::InvalidRate { name } => write!(f, "{name} must be a whole number"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidEnumPolicy(_)
            | ConfigError::InvalidRate { .. } => None,
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
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_UPLOAD_DIR",
            "APP_DATA_FILE",
            "APP_ENUM_POLICY",
            "APP_NEW_STUDENT_INCOME",
            "APP_COE_APPLIED_INCOME",
            "APP_COE_RECEIVED_INCOME",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.storage.upload_dir, PathBuf::from("uploads"));
        assert!(config.storage.data_file.is_none());
        assert_eq!(config.enum_policy, EnumPolicy::Substitute);
        assert_eq!(config.income_rates, IncomeRates::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 5001));
        reset_env();
    }

    #[test]
    fn reads_policy_and_rate_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENUM_POLICY", "strict");
        env::set_var("APP_COE_RECEIVED_INCOME", "12000");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.enum_policy, EnumPolicy::Strict);
        assert_eq!(config.income_rates.coe_received, 12000);
        assert_eq!(config.income_rates.new_student, 2000);
        reset_env();
    }

    #[test]
    fn rejects_malformed_rate() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_NEW_STUDENT_INCOME", "lots");
        match AppConfig::load() {
            Err(ConfigError::InvalidRate { name }) => assert_eq!(name, "APP_NEW_STUDENT_INCOME"),
            other => panic!("expected invalid rate, got {other:?}"),
        }
        reset_env();
    }
}
