//! Process configuration.
//!
//! Built once at startup from environment variables and handed to every
//! component that needs it. There is no global configuration instance.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub const ENV_VAR: &str = "KEYSTONE_ENV";
pub const HTTP_PORT_VAR: &str = "KEYSTONE_HTTP_PORT";
pub const HTTPS_PORT_VAR: &str = "KEYSTONE_HTTPS_PORT";
pub const HASHING_SECRET_VAR: &str = "KEYSTONE_HASHING_SECRET";
pub const DATA_DIR_VAR: &str = "KEYSTONE_DATA_DIR";
pub const TLS_CERT_VAR: &str = "KEYSTONE_TLS_CERT";
pub const TLS_KEY_VAR: &str = "KEYSTONE_TLS_KEY";

/// Deployment environment. Anything unrecognised runs as staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Staging,
    Production,
}

impl Environment {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "production" => Self::Production,
            _ => Self::Staging,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    fn default_ports(&self) -> (u16, u16) {
        match self {
            Self::Staging => (3000, 3001),
            Self::Production => (5000, 5001),
        }
    }

    fn default_hashing_secret(&self) -> &'static str {
        match self {
            Self::Staging => "thisIsAStagingSecret",
            Self::Production => "thisIsAProductionSecret",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PEM files for the HTTPS listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl TlsPaths {
    pub fn exist(&self) -> bool {
        self.cert.is_file() && self.key.is_file()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a port number, got {value:?}")]
    InvalidPort { var: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub environment: Environment,
    pub http_port: u16,
    pub https_port: u16,
    pub hashing_secret: String,
    pub data_dir: PathBuf,
    pub tls: TlsPaths,
}

impl Config {
    /// Defaults for `environment`, with no overrides applied.
    pub fn for_environment(environment: Environment) -> Self {
        let (http_port, https_port) = environment.default_ports();
        Self {
            environment,
            http_port,
            https_port,
            hashing_secret: environment.default_hashing_secret().to_string(),
            data_dir: PathBuf::from(".data"),
            tls: TlsPaths {
                cert: PathBuf::from("https/cert.pem"),
                key: PathBuf::from("https/key.pem"),
            },
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup` (variable name -> value).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = lookup(ENV_VAR)
            .map(|raw| Environment::parse(&raw))
            .unwrap_or_default();
        let mut config = Self::for_environment(environment);

        if let Some(port) = parse_port(&lookup, HTTP_PORT_VAR)? {
            config.http_port = port;
        }
        if let Some(port) = parse_port(&lookup, HTTPS_PORT_VAR)? {
            config.https_port = port;
        }

        match lookup(HASHING_SECRET_VAR).filter(|s| !s.is_empty()) {
            Some(secret) => config.hashing_secret = secret,
            None => tracing::warn!(
                environment = %environment,
                "{HASHING_SECRET_VAR} not set; using built-in secret"
            ),
        }

        if let Some(dir) = lookup(DATA_DIR_VAR).filter(|s| !s.is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(cert) = lookup(TLS_CERT_VAR).filter(|s| !s.is_empty()) {
            config.tls.cert = PathBuf::from(cert);
        }
        if let Some(key) = lookup(TLS_KEY_VAR).filter(|s| !s.is_empty()) {
            config.tls.key = PathBuf::from(key);
        }

        Ok(config)
    }
}

fn parse_port(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u16>, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u16>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidPort { var, value: raw })
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("http_port", &self.http_port)
            .field("https_port", &self.https_port)
            .field("hashing_secret", &"<redacted>")
            .field("data_dir", &self.data_dir)
            .field("tls", &self.tls)
            .finish()
    }
}
