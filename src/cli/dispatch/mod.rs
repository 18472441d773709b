//! Map parsed CLI matches to the action the binary executes.

use crate::cli::actions::{Action, check, server};
use crate::cli::commands::{ARG_PORT, backend, pages, session};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing or cannot be parsed.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if let Some(sub) = matches.subcommand_matches(session::CMD_CHECK_SESSION) {
        return check_session(sub);
    }

    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let backend_opts = backend::Options::parse(matches)?;
    let pages_opts = pages::Options::parse(matches);

    Ok(Action::Server(server::Args {
        port,
        api_url: backend_opts.api_url,
        auth_cookie: backend_opts.auth_cookie,
        environment: backend_opts.environment,
        session_ttl_seconds: backend_opts.session_ttl_seconds,
        validate_transport: backend_opts.validate_transport,
        validate_timeout_seconds: backend_opts.validate_timeout_seconds,
        private_routes: pages_opts.private_routes,
        static_dir: pages_opts.static_dir,
        frontend_origin: pages_opts.frontend_origin,
    }))
}

fn check_session(matches: &clap::ArgMatches) -> Result<Action> {
    let server_url = matches
        .get_one::<String>(session::ARG_SERVER_URL)
        .cloned()
        .context("missing required argument: --server-url")?;
    let token = matches
        .get_one::<String>(session::ARG_TOKEN)
        .cloned()
        .context("missing required argument: --token")?;
    let auth_cookie = matches
        .get_one::<String>(backend::ARG_AUTH_COOKIE)
        .cloned()
        .context("missing required argument: --auth-cookie")?;

    Ok(Action::CheckSession(check::Args {
        server_url,
        token: SecretString::from(token),
        auth_cookie,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use crate::recoleta::config::{Environment, Transport};

    #[test]
    fn server_action_from_args() -> Result<()> {
        temp_env::with_vars(
            [
                ("RECOLETA_ENV", None::<&str>),
                ("RECOLETA_VALIDATE_TRANSPORT", None),
                ("RECOLETA_PRIVATE_ROUTES", None),
            ],
            || {
                let matches = commands::new().get_matches_from([
                    "recoleta",
                    "--port",
                    "9000",
                    "--environment",
                    "production",
                    "--validate-transport",
                    "body",
                    "--private-routes",
                    "/dashboard,/wastes/*",
                ]);
                let Action::Server(args) = handler(&matches)? else {
                    anyhow::bail!("expected server action");
                };
                assert_eq!(args.port, 9000);
                assert_eq!(args.environment, Environment::Production);
                assert_eq!(args.validate_transport, Transport::Body);
                assert_eq!(args.private_routes, ["/dashboard", "/wastes/*"]);
                Ok(())
            },
        )
    }

    #[test]
    fn check_session_action_from_args() -> Result<()> {
        temp_env::with_vars([("RECOLETA_AUTH_COOKIE", None::<&str>)], || {
            let matches = commands::new().get_matches_from([
                "recoleta",
                "check-session",
                "--token",
                "tok",
            ]);
            let Action::CheckSession(args) = handler(&matches)? else {
                anyhow::bail!("expected check-session action");
            };
            assert_eq!(args.auth_cookie, "recoleta_access_token");
            Ok(())
        })
    }
}
