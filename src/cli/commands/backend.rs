use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

use crate::recoleta::config::{DEFAULT_API_URL, DEFAULT_COOKIE_NAME, Environment, Transport};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_AUTH_COOKIE: &str = "auth-cookie";
pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_VALIDATE_TRANSPORT: &str = "validate-transport";
pub const ARG_VALIDATE_TIMEOUT_SECONDS: &str = "validate-timeout-seconds";

/// Backend and session cookie options.
#[derive(Debug)]
pub struct Options {
    pub api_url: String,
    pub auth_cookie: String,
    pub environment: Environment,
    pub session_ttl_seconds: i64,
    pub validate_transport: Transport,
    pub validate_timeout_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a value is missing or cannot be parsed.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let api_url = matches
            .get_one::<String>(ARG_API_URL)
            .cloned()
            .context("missing required argument: --api-url")?;
        let auth_cookie = matches
            .get_one::<String>(ARG_AUTH_COOKIE)
            .cloned()
            .context("missing required argument: --auth-cookie")?;
        let environment = matches
            .get_one::<String>(ARG_ENVIRONMENT)
            .map_or(Ok(Environment::default()), |value| value.parse())?;
        let session_ttl_seconds = matches
            .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .context("missing required argument: --session-ttl-seconds")?;
        let validate_transport = matches
            .get_one::<String>(ARG_VALIDATE_TRANSPORT)
            .map_or(Ok(Transport::default()), |value| value.parse())?;
        let validate_timeout_seconds = matches
            .get_one::<u64>(ARG_VALIDATE_TIMEOUT_SECONDS)
            .copied()
            .context("missing required argument: --validate-timeout-seconds")?;

        Ok(Self {
            api_url,
            auth_cookie,
            environment,
            session_ttl_seconds,
            validate_transport,
            validate_timeout_seconds,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("ReColeta backend base URL")
                .env("RECOLETA_API_URL")
                .default_value(DEFAULT_API_URL),
        )
        .arg(
            Arg::new(ARG_AUTH_COOKIE)
                .long(ARG_AUTH_COOKIE)
                .help("Name of the session cookie")
                .env("RECOLETA_AUTH_COOKIE")
                .default_value(DEFAULT_COOKIE_NAME)
                .global(true),
        )
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long(ARG_ENVIRONMENT)
                .help("Deployment environment; production marks cookies Secure")
                .env("RECOLETA_ENV")
                .default_value("development")
                .value_parser(["development", "production"]),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("RECOLETA_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_VALIDATE_TRANSPORT)
                .long(ARG_VALIDATE_TRANSPORT)
                .help("How tokens reach the backend: header (GET + Bearer) or body (POST + JSON)")
                .env("RECOLETA_VALIDATE_TRANSPORT")
                .default_value("header")
                .value_parser(["header", "body"]),
        )
        .arg(
            Arg::new(ARG_VALIDATE_TIMEOUT_SECONDS)
                .long(ARG_VALIDATE_TIMEOUT_SECONDS)
                .help("Timeout in seconds for each backend call")
                .env("RECOLETA_VALIDATE_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
