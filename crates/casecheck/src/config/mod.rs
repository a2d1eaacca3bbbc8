use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Deployment stage read from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnvironment {
    #[default]
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    /// Unknown labels fall back to development.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a port number, got {value:?}")]
    InvalidPort { value: String },
    #[error("APP_HOST must be localhost or an IP address, got {value:?}")]
    InvalidHost {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("{variable} must be a positive number of seconds")]
    InvalidTimeout { variable: &'static str },
    #[error("CASECHECK_API_URL must not be empty")]
    MissingApiUrl,
}

/// Trimmed value of `name`, or `None` when unset or blank.
fn read_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn seconds_var(variable: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    let Some(raw) = read_var(variable) else {
        return Ok(Duration::from_secs(default_secs));
    };
    raw.parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .ok_or(ConfigError::InvalidTimeout { variable })
}

/// Everything the binary needs at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub backend: BackendConfig,
}

impl AppConfig {
    /// Reads `.env` when present, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            environment: read_var("APP_ENV")
                .map(|label| AppEnvironment::parse(&label))
                .unwrap_or_default(),
            server: ServerConfig::from_env()?,
            telemetry: TelemetryConfig {
                log_level: read_var("APP_LOG_LEVEL")
                    .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            },
            backend: BackendConfig::from_env()?,
        })
    }
}

/// Listen address of the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let port = match read_var("APP_PORT") {
            None => DEFAULT_PORT,
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidPort { value })?,
        };
        Ok(Self {
            host: read_var("APP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse()
                .map_err(|source| ConfigError::InvalidHost {
                    value: self.host.clone(),
                    source,
                })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub log_level: String,
}

/// Where the case-management backend lives and how long calls may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    /// Create-and-send-link calls wait on e-mail delivery.
    pub link_timeout: Duration,
    pub report_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(15),
            link_timeout: Duration::from_secs(30),
            report_timeout: Duration::from_secs(120),
        }
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let api_base_url = match env::var("CASECHECK_API_URL") {
            Err(_) => defaults.api_base_url,
            Ok(url) => {
                let url = url.trim().trim_end_matches('/').to_string();
                if url.is_empty() {
                    return Err(ConfigError::MissingApiUrl);
                }
                url
            }
        };
        Ok(Self {
            api_base_url,
            request_timeout: seconds_var("CASECHECK_REQUEST_TIMEOUT_SECS", 15)?,
            link_timeout: seconds_var("CASECHECK_LINK_TIMEOUT_SECS", 30)?,
            report_timeout: seconds_var("CASECHECK_REPORT_TIMEOUT_SECS", 120)?,
        })
    }
}
