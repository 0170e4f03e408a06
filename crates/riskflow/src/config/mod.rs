use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::scoring::RiskPolicy;

const DEFAULT_MODEL_PATH: &str = "models/credit_model.json";
const DEFAULT_MAX_CONCURRENT_SCORES: usize = 8;
const DEFAULT_SCORE_TIMEOUT_MS: u64 = 2_000;

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

/// Model location, active risk policy and the bounds placed on inference work.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub model_path: PathBuf,
    pub policy: RiskPolicy,
    pub max_concurrent_scores: usize,
    pub score_timeout: Duration,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            policy: RiskPolicy::default(),
            max_concurrent_scores: DEFAULT_MAX_CONCURRENT_SCORES,
            score_timeout: Duration::from_millis(DEFAULT_SCORE_TIMEOUT_MS),
        }
    }
}

impl ScoringConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let model_path = env::var("RISKFLOW_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);

        let policy = match env::var("RISKFLOW_RISK_POLICY") {
            Ok(raw) => raw
                .parse::<RiskPolicy>()
                .map_err(|_| ConfigError::InvalidRiskPolicy { value: raw })?,
            Err(_) => defaults.policy,
        };

        let max_concurrent_scores = match env::var("RISKFLOW_MAX_CONCURRENT_SCORES") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|limit| (1..=Semaphore::MAX_PERMITS).contains(limit))
                .ok_or(ConfigError::InvalidConcurrency)?,
            Err(_) => defaults.max_concurrent_scores,
        };

        let score_timeout = match env::var("RISKFLOW_SCORE_TIMEOUT_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|millis| *millis > 0)
                .map(Duration::from_millis)
                .ok_or(ConfigError::InvalidTimeout)?,
            Err(_) => defaults.score_timeout,
        };

        Ok(Self {
            model_path,
            policy,
            max_concurrent_scores,
            score_timeout,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRiskPolicy { value: String },
    InvalidConcurrency,
    InvalidTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRiskPolicy { value } => write!(
                f,
                "RISKFLOW_RISK_POLICY must be 'score_table' or 'probability_bands', found '{value}'"
            ),
            ConfigError::InvalidConcurrency => {
                write!(
                    f,
                    "RISKFLOW_MAX_CONCURRENT_SCORES must be between 1 and {}",
                    Semaphore::MAX_PERMITS
                )
            }
            ConfigError::InvalidTimeout => {
                write!(f, "RISKFLOW_SCORE_TIMEOUT_MS must be a positive number of milliseconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidRiskPolicy { .. }
            | ConfigError::InvalidConcurrency
            | ConfigError::InvalidTimeout => None,
        }
    }
}
