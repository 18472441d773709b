use crate::recoleta::{
    guard::LOGIN_PATH,
    session::{
        bootstrap::{BootstrapState, SessionBootstrap},
        probe::IdentityProbe,
    },
};
use anyhow::{Context, Result, bail};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub server_url: String,
    pub token: SecretString,
    pub auth_cookie: String,
}

/// Mount a session bootstrap against the gateway and report where it settles.
/// # Errors
/// Returns an error if the gateway URL is invalid or the session is not authenticated.
pub async fn execute(args: Args) -> Result<()> {
    let probe = IdentityProbe::new(&args.server_url, &args.auth_cookie)
        .with_context(|| format!("Invalid gateway URL: {}", args.server_url))?;

    let mut bootstrap = SessionBootstrap::mount(
        Arc::new(probe),
        Some(args.token.expose_secret().to_string()),
        LOGIN_PATH,
    );
    let state = bootstrap.settled().await;
    debug!(?state, outcome = ?bootstrap.outcome(), "Session bootstrap settled");

    println!("{state}");

    if state != BootstrapState::Authenticated {
        bail!("session is not authenticated");
    }
    Ok(())
}
