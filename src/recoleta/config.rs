//! Process-wide session configuration.
//!
//! Built once from CLI/env input at startup and shared by `Arc`; nothing reads
//! the environment after this value exists.

use anyhow::{Result, anyhow};
use std::{fmt, str::FromStr, time::Duration};
use url::Url;

pub const DEFAULT_COOKIE_NAME: &str = "recoleta_access_token";
pub const DEFAULT_API_URL: &str = "http://localhost:3004";
const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
pub const DEFAULT_VALIDATE_TIMEOUT_SECONDS: u64 = 5;

/// Deployment environment; only `Production` marks cookies `Secure`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(anyhow!("unknown environment: {other}")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// How the validator hands the token to the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transport {
    /// `GET /api/auth/validate` with `Authorization: Bearer <token>`.
    #[default]
    Header,
    /// `POST /api/auth/validate-token` with `{"token": "<token>"}`.
    Body,
}

impl FromStr for Transport {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "header" => Ok(Self::Header),
            "body" => Ok(Self::Body),
            other => Err(anyhow!("unknown validate transport: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    api_url: Url,
    cookie_name: String,
    session_ttl_seconds: i64,
    environment: Environment,
    transport: Transport,
    validate_timeout: Duration,
}

impl SessionConfig {
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            environment: Environment::default(),
            transport: Transport::default(),
            validate_timeout: Duration::from_secs(DEFAULT_VALIDATE_TIMEOUT_SECONDS),
        }
    }

    /// Parse the backend base URL and build a config with defaults.
    ///
    /// # Errors
    /// Returns an error if the URL is not an absolute `http(s)` URL.
    pub fn parse(api_url: &str) -> Result<Self> {
        let url = Url::parse(api_url.trim()).map_err(|e| anyhow!("invalid API URL {api_url}: {e}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("API URL must be http or https: {api_url}"));
        }
        Ok(Self::new(url))
    }

    /// # Errors
    /// Returns an error if the cookie name is empty or contains separators.
    pub fn with_cookie_name(mut self, name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() || name.contains(['=', ';', ',', ' ']) {
            return Err(anyhow!("invalid cookie name: {name:?}"));
        }
        self.cookie_name = name.to_string();
        Ok(self)
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn with_validate_timeout(mut self, timeout: Duration) -> Self {
        self.validate_timeout = timeout;
        self
    }

    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn transport(&self) -> Transport {
        self.transport
    }

    #[must_use]
    pub fn validate_timeout(&self) -> Duration {
        self.validate_timeout
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.environment == Environment::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() -> Result<()> {
        let config = SessionConfig::parse(DEFAULT_API_URL)?;
        assert_eq!(config.cookie_name(), "recoleta_access_token");
        assert_eq!(config.session_ttl_seconds(), 604_800);
        assert_eq!(config.transport(), Transport::Header);
        assert!(!config.secure_cookies());
        Ok(())
    }

    #[test]
    fn production_marks_cookies_secure() -> Result<()> {
        let config =
            SessionConfig::parse(DEFAULT_API_URL)?.with_environment("production".parse()?);
        assert!(config.secure_cookies());
        Ok(())
    }

    #[test]
    fn rejects_bad_api_url() {
        assert!(SessionConfig::parse("not a url").is_err());
        assert!(SessionConfig::parse("ftp://backend.local").is_err());
    }

    #[test]
    fn rejects_bad_cookie_name() -> Result<()> {
        let config = SessionConfig::parse(DEFAULT_API_URL)?;
        assert!(config.clone().with_cookie_name("").is_err());
        assert!(config.clone().with_cookie_name("a=b").is_err());
        assert_eq!(
            config.with_cookie_name(" custom_token ")?.cookie_name(),
            "custom_token"
        );
        Ok(())
    }

    #[test]
    fn parses_enums() {
        assert_eq!("BODY".parse::<Transport>().ok(), Some(Transport::Body));
        assert_eq!("prod".parse::<Environment>().ok(), Some(Environment::Production));
        assert!("udp".parse::<Transport>().is_err());
        assert!("staging".parse::<Environment>().is_err());
    }
}
