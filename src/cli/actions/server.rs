use crate::{
    cli::telemetry,
    recoleta::{
        self, AppState,
        config::{Environment, SessionConfig, Transport},
        guard::RoutePolicy,
    },
};
use anyhow::{Context, Result};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub api_url: String,
    pub auth_cookie: String,
    pub environment: Environment,
    pub session_ttl_seconds: i64,
    pub validate_transport: Transport,
    pub validate_timeout_seconds: u64,
    pub private_routes: Vec<String>,
    pub static_dir: Option<PathBuf>,
    pub frontend_origin: Option<String>,
}

impl Args {
    /// Build the one session configuration shared by every request.
    ///
    /// # Errors
    /// Returns an error if the backend URL or cookie name is invalid.
    pub fn session_config(&self) -> Result<SessionConfig> {
        Ok(SessionConfig::parse(&self.api_url)
            .context("Invalid backend URL")?
            .with_cookie_name(&self.auth_cookie)
            .context("Invalid session cookie name")?
            .with_environment(self.environment)
            .with_session_ttl_seconds(self.session_ttl_seconds)
            .with_transport(self.validate_transport)
            .with_validate_timeout(Duration::from_secs(self.validate_timeout_seconds)))
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.session_config()?;
    let policy = RoutePolicy::new(&args.private_routes).context("Invalid private routes")?;

    info!(
        port = args.port,
        api_url = %config.api_url(),
        cookie = config.cookie_name(),
        environment = %config.environment(),
        transport = ?config.transport(),
        private_routes = ?args.private_routes,
        static_dir = ?args.static_dir,
        "Starting session gateway"
    );

    let state = Arc::new(AppState::new(config, policy)?);
    let result = recoleta::new(
        args.port,
        state,
        args.static_dir,
        args.frontend_origin.as_deref(),
    )
    .await;

    telemetry::shutdown_tracer();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args {
            port: 8080,
            api_url: "http://localhost:3004".to_string(),
            auth_cookie: "recoleta_access_token".to_string(),
            environment: Environment::Production,
            session_ttl_seconds: 3600,
            validate_transport: Transport::Body,
            validate_timeout_seconds: 2,
            private_routes: vec!["/dashboard".to_string()],
            static_dir: None,
            frontend_origin: None,
        }
    }

    #[test]
    fn session_config_from_args() -> Result<()> {
        let config = args().session_config()?;
        assert!(config.secure_cookies());
        assert_eq!(config.session_ttl_seconds(), 3600);
        assert_eq!(config.transport(), Transport::Body);
        assert_eq!(config.validate_timeout(), Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn session_config_rejects_bad_input() {
        let mut bad_url = args();
        bad_url.api_url = "ftp://backend".to_string();
        assert!(bad_url.session_config().is_err());

        let mut bad_cookie = args();
        bad_cookie.auth_cookie = "a b".to_string();
        assert!(bad_cookie.session_config().is_err());
    }

    #[tokio::test]
    async fn execute_rejects_relative_private_route() {
        let mut args = args();
        args.private_routes = vec!["dashboard".to_string()];
        assert!(execute(args).await.is_err());
    }
}
