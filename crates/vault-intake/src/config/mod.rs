use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use url::Url;

const DEFAULT_UPSTREAM_BASE: &str = "https://sandbox.alloy.co";
const DEFAULT_RELAY_BASE: &str = "http://localhost:3001";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 15;

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

/// How the relay produces outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationMode {
    /// Outcomes are synthesized locally; the upstream service is never contacted.
    Simulated,
    /// Applications are forwarded to the upstream evaluation service.
    Live,
}

impl EvaluationMode {
    fn from_flag(value: Option<&str>) -> Self {
        match value.map(|raw| raw.trim().to_ascii_lowercase()) {
            Some(flag) if matches!(flag.as_str(), "1" | "true" | "yes" | "on") => Self::Simulated,
            _ => Self::Live,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EvaluationMode::Simulated => "simulated",
            EvaluationMode::Live => "live",
        }
    }
}

/// Top-level configuration for the relay process. Built once at startup and
/// shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub mode: EvaluationMode,
    pub upstream: UpstreamConfig,
}

impl AppConfig {
    /// Read the environment and check credentials for the selected mode.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::from_env()?;
        config.ensure_credentials()?;
        Ok(config)
    }

    /// Read the environment without checking credentials, so callers can
    /// apply overrides (e.g. a `--simulate` flag) first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let mode = EvaluationMode::from_flag(env::var("SIMULATE").ok().as_deref());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            mode,
            upstream: UpstreamConfig::from_env()?,
        })
    }

    /// Live mode cannot run without both credential halves. Simulated mode
    /// never reads them.
    pub fn ensure_credentials(&self) -> Result<(), ConfigError> {
        if self.mode == EvaluationMode::Simulated {
            return Ok(());
        }
        if self.upstream.token.is_empty() {
            return Err(ConfigError::MissingCredential { name: "ALLOY_TOKEN" });
        }
        if self.upstream.secret.is_empty() {
            return Err(ConfigError::MissingCredential {
                name: "ALLOY_SECRET",
            });
        }
        Ok(())
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

/// Connection details for the upstream evaluation service.
///
/// `Debug` redacts the secret so the config can be logged safely.
#[derive(Clone)]
pub struct UpstreamConfig {
    pub base_url: Url,
    pub token: String,
    pub secret: String,
    pub timeout: Duration,
}

impl UpstreamConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env_url("ALLOY_BASE", DEFAULT_UPSTREAM_BASE)?;
        let timeout_secs = match env::var("ALLOY_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout)?,
            Err(_) => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url,
            token: env::var("ALLOY_TOKEN").unwrap_or_default(),
            secret: env::var("ALLOY_SECRET").unwrap_or_default(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Full URL of the upstream evaluation operation.
    pub fn evaluations_url(&self) -> String {
        format!(
            "{}/v1/evaluations",
            self.base_url.as_str().trim_end_matches('/')
        )
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token)
            .field("secret", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Where the form client sends submissions.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub relay_base: Url,
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Ok(Self {
            relay_base: env_url("RELAY_BASE", DEFAULT_RELAY_BASE)?,
        })
    }
}

fn env_url(name: &'static str, default: &str) -> Result<Url, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { name, source })
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidUrl {
        name: &'static str,
        source: url::ParseError,
    },
    InvalidTimeout,
    MissingCredential {
        name: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidUrl { name, .. } => write!(f, "{name} must be an absolute URL"),
            ConfigError::InvalidTimeout => {
                write!(f, "ALLOY_TIMEOUT_SECS must be a positive number of seconds")
            }
            ConfigError::MissingCredential { name } => {
                write!(f, "{name} is required unless SIMULATE is enabled")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidUrl { source, .. } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::MissingCredential { .. } => None,
        }
    }
}
