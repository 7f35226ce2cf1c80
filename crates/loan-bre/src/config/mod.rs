use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::workflows::eligibility::{
    BatchPolicy, EligibilityPolicy, InsightThresholds, TriggerPolicy,
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
    pub engine: EngineConfig,
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
            engine: EngineConfig::load()?,
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

/// Deployment policy values for the eligibility engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub eligibility: EligibilityPolicy,
    pub insights: InsightThresholds,
    pub trigger: TriggerPolicy,
    pub batch: BatchPolicy,
}

impl EngineConfig {
    fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let eligibility = EligibilityPolicy {
            minimum_score: parse_var(
                "BRE_MIN_ELIGIBILITY_SCORE",
                defaults.eligibility.minimum_score,
            )?,
            conditional_band: parse_var(
                "BRE_CONDITIONAL_BAND",
                defaults.eligibility.conditional_band,
            )?,
        };
        if eligibility.minimum_score > 100 {
            return Err(ConfigError::OutOfRange {
                key: "BRE_MIN_ELIGIBILITY_SCORE",
            });
        }

        let insights = InsightThresholds {
            excellent: parse_var("BRE_INSIGHT_EXCELLENT", defaults.insights.excellent)?,
            strong: parse_var("BRE_INSIGHT_STRONG", defaults.insights.strong)?,
            good: parse_var("BRE_INSIGHT_GOOD", defaults.insights.good)?,
        };
        if !(insights.excellent > insights.strong && insights.strong > insights.good) {
            return Err(ConfigError::UnorderedInsightThresholds);
        }

        let debounce_ms = parse_var(
            "BRE_DEBOUNCE_MS",
            defaults.trigger.debounce.as_millis() as u64,
        )?;
        let delay_ms = parse_var(
            "BRE_BATCH_DELAY_MS",
            defaults.batch.inter_lead_delay.as_millis() as u64,
        )?;

        let batch = BatchPolicy {
            inter_lead_delay: Duration::from_millis(delay_ms),
            default_limit: parse_var("BRE_BATCH_DEFAULT_LIMIT", defaults.batch.default_limit)?,
            max_limit: parse_var("BRE_BATCH_MAX_LIMIT", defaults.batch.max_limit)?,
        };

        Ok(Self {
            eligibility,
            insights,
            trigger: TriggerPolicy {
                debounce: Duration::from_millis(debounce_ms),
                ..defaults.trigger
            },
            batch,
        })
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    OutOfRange { key: &'static str },
    UnorderedInsightThresholds,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
            ConfigError::OutOfRange { key } => write!(f, "{key} must be between 0 and 100"),
            ConfigError::UnorderedInsightThresholds => write!(
                f,
                "BRE_INSIGHT_EXCELLENT > BRE_INSIGHT_STRONG > BRE_INSIGHT_GOOD must hold"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
