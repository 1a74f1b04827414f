//! Environment-based configuration types for the authorization server runtime.

use anyhow::Result;
use std::time::Duration;
use url::Url;

use crate::errors::ConfigError;

/// HTTP server port configuration
#[derive(Clone)]
pub struct HttpPort(u16);

/// Pending authorization request lifetime
#[derive(Clone)]
pub struct AuthRequestTtl(Duration);

/// Authorization code lifetime
#[derive(Clone)]
pub struct AuthCodeTtl(Duration);

/// Whether the session cookie carries the Secure attribute
#[derive(Clone)]
pub struct CookieSecure(bool);

/// Main application configuration
#[derive(Clone)]
pub struct Config {
    pub version: String,
    pub http_port: HttpPort,
    /// Public base URL of this server; identity for client assertion audiences
    pub external_base: Url,
    pub storage_backend: String,
    pub auth_request_ttl: AuthRequestTtl,
    pub auth_code_ttl: AuthCodeTtl,
    pub cookie_secure: CookieSecure,
    /// Optional path to a JSON file of client records loaded at startup
    pub client_seed_path: Option<String>,
}

impl Config {
    /// Create a new configuration from environment variables
    pub fn new() -> Result<Self> {
        let external_base_raw = require_env("EXTERNAL_BASE")?;
        let external_base = Url::parse(&external_base_raw)
            .map_err(|e| ConfigError::ExternalBaseParsingFailed(external_base_raw, e))?;
        let http_port: HttpPort = default_env("HTTP_PORT", "8080").try_into()?;
        let storage_backend = default_env("STORAGE_BACKEND", "memory");
        let auth_request_ttl: AuthRequestTtl = default_env("AUTH_REQUEST_TTL", "1h").try_into()?;
        let auth_code_ttl: AuthCodeTtl = default_env("AUTH_CODE_TTL", "60s").try_into()?;
        let cookie_secure: CookieSecure = default_env("COOKIE_SECURE", "true").try_into()?;
        let client_seed_path = optional_env("CLIENT_SEED_PATH");

        Ok(Self {
            version: version()?,
            http_port,
            external_base,
            storage_backend,
            auth_request_ttl,
            auth_code_ttl,
            cookie_secure,
            client_seed_path,
        })
    }
}

/// Get application version from build environment
pub fn version() -> Result<String> {
    option_env!("GIT_HASH")
        .or(option_env!("CARGO_PKG_VERSION"))
        .map(|val| val.to_string())
        .ok_or(ConfigError::VersionNotSet.into())
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| ConfigError::EnvVarRequired(name.to_string()).into())
}

pub(crate) fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn default_env(name: &str, default_value: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default_value.to_string())
}

impl TryFrom<String> for HttpPort {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Ok(Self(8080))
        } else {
            value
                .parse::<u16>()
                .map(Self)
                .map_err(|err| ConfigError::PortParsingFailed(err).into())
        }
    }
}

impl AsRef<u16> for HttpPort {
    fn as_ref(&self) -> &u16 {
        &self.0
    }
}

impl TryFrom<String> for AuthRequestTtl {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let duration = duration_str::parse(&value)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))?;
        Ok(Self(duration))
    }
}

impl AsRef<Duration> for AuthRequestTtl {
    fn as_ref(&self) -> &Duration {
        &self.0
    }
}

impl TryFrom<String> for AuthCodeTtl {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let duration = duration_str::parse(&value)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))?;
        Ok(Self(duration))
    }
}

impl AsRef<Duration> for AuthCodeTtl {
    fn as_ref(&self) -> &Duration {
        &self.0
    }
}

impl TryFrom<String> for CookieSecure {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Self(true)),
            "false" | "0" | "no" | "off" => Ok(Self(false)),
            _ => Err(ConfigError::BoolParsingFailed(value).into()),
        }
    }
}

impl AsRef<bool> for CookieSecure {
    fn as_ref(&self) -> &bool {
        &self.0
    }
}
