//! Proxy configuration with validation.
//!
//! Every value has a default and can be overridden by a `DPP_` prefixed
//! environment variable.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "DPP_";

/// Main proxy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub server: ServerConfig,
    pub deployment: DeploymentConfig,
    pub logging: LoggingConfig,
    pub wallet: WalletConfig,
    pub payd: PayDConfig,
    pub socket: SocketConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    pub port: u16,
    /// Public host:port used when building payment urls
    pub fqdn: String,
    /// The proxy is reached over TLS
    pub secure: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8445,
            fqdn: "localhost:8445".to_string(),
            secure: false,
        }
    }
}

impl ServerConfig {
    /// Scheme and host payers use to reach this proxy.
    pub fn public_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}", scheme, self.fqdn)
    }
}

/// Where this instance runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    pub environment: String,
    pub region: String,
    pub version: String,
    pub commit: String,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            environment: "dev".to_string(),
            region: "local".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: "test".to_string(),
        }
    }
}

impl DeploymentConfig {
    pub fn is_dev(&self) -> bool {
        self.environment == "dev"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Which wallet the proxy forwards to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletBackend {
    /// Payee wallets connected over the socket channel.
    #[default]
    Socket,
    /// A PayD wallet reached over HTTP.
    PayD,
}

impl FromStr for WalletBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "socket" | "sockets" => Ok(Self::Socket),
            "payd" | "http" => Ok(Self::PayD),
            other => Err(ConfigError::InvalidValue {
                key: "WALLET_BACKEND".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub backend: WalletBackend,
}

/// PayD wallet connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PayDConfig {
    /// Answer with canned responses instead of calling PayD
    pub noop: bool,
    pub host: String,
    /// Port with leading colon, e.g. `:8443`
    pub port: String,
    /// Use https
    pub secure: bool,
}

impl Default for PayDConfig {
    fn default() -> Self {
        Self {
            noop: false,
            host: "payd".to_string(),
            port: ":8443".to_string(),
            secure: false,
        }
    }
}

impl PayDConfig {
    /// Base url, e.g. `http://payd:8443`.
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}{}", scheme, self.host, self.port)
    }
}

/// Socket channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Upper bound on a single await for a wallet reply
    pub call_timeout_seconds: u64,
    /// How long an idle wallet connection stays joined
    pub channel_timeout_seconds: u64,
    pub max_message_bytes: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            call_timeout_seconds: 10,
            channel_timeout_seconds: 7200,
            max_message_bytes: channel_bus::DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl SocketConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_seconds)
    }

    pub fn channel_timeout(&self) -> Duration {
        Duration::from_secs(self.channel_timeout_seconds)
    }
}

impl ProxyConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using `lookup` to resolve `DPP_` prefixed keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(&format!("{ENV_PREFIX}{key}"));
        let mut config = Self::default();

        if let Some(v) = get("SERVER_HOST") {
            config.server.host = v;
        }
        if let Some(v) = get("SERVER_PORT") {
            config.server.port = parse("SERVER_PORT", v.trim_start_matches(':'))?;
        }
        if let Some(v) = get("SERVER_FQDN") {
            config.server.fqdn = v;
        }
        if let Some(v) = get("SERVER_SECURE") {
            config.server.secure = parse_bool(&v);
        }

        if let Some(v) = get("ENVIRONMENT") {
            config.deployment.environment = v;
        }
        if let Some(v) = get("REGION") {
            config.deployment.region = v;
        }
        if let Some(v) = get("VERSION") {
            config.deployment.version = v;
        }
        if let Some(v) = get("COMMIT") {
            config.deployment.commit = v;
        }

        if let Some(v) = get("LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Some(v) = get("JSON_LOGS") {
            config.logging.json = parse_bool(&v);
        }

        if let Some(v) = get("WALLET_BACKEND") {
            config.wallet.backend = v.parse()?;
        }

        if let Some(v) = get("PAYD_NOOP") {
            config.payd.noop = parse_bool(&v);
        }
        if let Some(v) = get("PAYD_HOST") {
            config.payd.host = v;
        }
        if let Some(v) = get("PAYD_PORT") {
            config.payd.port = if v.starts_with(':') { v } else { format!(":{v}") };
        }
        if let Some(v) = get("PAYD_SECURE") {
            config.payd.secure = parse_bool(&v);
        }

        if let Some(v) = get("SOCKET_CALL_TIMEOUT_SECONDS") {
            config.socket.call_timeout_seconds = parse("SOCKET_CALL_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = get("SOCKET_CHANNEL_TIMEOUT_SECONDS") {
            config.socket.channel_timeout_seconds = parse("SOCKET_CHANNEL_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = get("SOCKET_MAX_MESSAGE_BYTES") {
            config.socket.max_message_bytes = parse("SOCKET_MAX_MESSAGE_BYTES", &v)?;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.http_addr()?;

        if self.socket.call_timeout_seconds == 0 {
            return Err(ConfigError::InvalidTimeout(
                "socket call timeout cannot be 0".into(),
            ));
        }

        if self.socket.channel_timeout_seconds == 0 {
            return Err(ConfigError::InvalidTimeout(
                "socket channel timeout cannot be 0".into(),
            ));
        }

        if self.socket.max_message_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_message_bytes cannot be 0".into(),
            ));
        }

        if self.wallet.backend == WalletBackend::PayD && !self.payd.noop && self.payd.host.is_empty()
        {
            return Err(ConfigError::Invalid("payd host cannot be empty".into()));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.server.host.clone()))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid bind address: {0}")]
    InvalidAddress(String),
    #[error("invalid value for DPP_{key}: '{value}'")]
    InvalidValue { key: String, value: String },
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
