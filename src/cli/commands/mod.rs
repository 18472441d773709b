pub mod backend;
pub mod logging;
pub mod pages;
pub mod session;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("recoleta")
        .about("Session gateway for the ReColeta web app")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("RECOLETA_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .subcommand(session::command());

    let command = backend::with_args(command);
    let command = pages::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const ENV_VARS: [&str; 12] = [
        "RECOLETA_PORT",
        "RECOLETA_API_URL",
        "RECOLETA_AUTH_COOKIE",
        "RECOLETA_ENV",
        "RECOLETA_SESSION_TTL_SECONDS",
        "RECOLETA_VALIDATE_TRANSPORT",
        "RECOLETA_VALIDATE_TIMEOUT_SECONDS",
        "RECOLETA_PRIVATE_ROUTES",
        "RECOLETA_STATIC_DIR",
        "RECOLETA_FRONTEND_ORIGIN",
        "RECOLETA_LOG_LEVEL",
        "RECOLETA_SESSION_TOKEN",
    ];

    fn clean_env<F: FnOnce()>(f: F) {
        temp_env::with_vars(ENV_VARS.map(|name| (name, None::<&str>)), f);
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "recoleta");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Session gateway for the ReColeta web app".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_defaults() {
        clean_env(|| {
            let matches = new().get_matches_from(["recoleta"]);
            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(8080));
            assert_eq!(
                matches.get_one::<String>(backend::ARG_API_URL).cloned(),
                Some("http://localhost:3004".to_string())
            );
            assert_eq!(
                matches.get_one::<String>(backend::ARG_AUTH_COOKIE).cloned(),
                Some("recoleta_access_token".to_string())
            );
            assert_eq!(
                matches
                    .get_one::<i64>(backend::ARG_SESSION_TTL_SECONDS)
                    .copied(),
                Some(604_800)
            );
            let routes: Vec<String> = matches
                .get_many::<String>(pages::ARG_PRIVATE_ROUTES)
                .map(|routes| routes.cloned().collect())
                .unwrap_or_default();
            assert_eq!(routes, ["/dashboard", "/discard", "/wastes"]);
            assert!(matches.get_one::<PathBuf>(pages::ARG_STATIC_DIR).is_none());
        });
    }

    #[test]
    fn test_check_env() {
        clean_env(|| {
            temp_env::with_vars(
                [
                    ("RECOLETA_PORT", Some("443")),
                    ("RECOLETA_API_URL", Some("https://api.recoleta.dev")),
                    ("RECOLETA_AUTH_COOKIE", Some("rc_session")),
                    ("RECOLETA_ENV", Some("production")),
                    ("RECOLETA_VALIDATE_TRANSPORT", Some("body")),
                    ("RECOLETA_PRIVATE_ROUTES", Some("/dashboard,/admin/*")),
                    ("RECOLETA_STATIC_DIR", Some("/srv/recoleta")),
                    ("RECOLETA_LOG_LEVEL", Some("info")),
                ],
                || {
                    let matches = new().get_matches_from(["recoleta"]);
                    assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(443));
                    assert_eq!(
                        matches.get_one::<String>(backend::ARG_API_URL).cloned(),
                        Some("https://api.recoleta.dev".to_string())
                    );
                    assert_eq!(
                        matches.get_one::<String>(backend::ARG_ENVIRONMENT).cloned(),
                        Some("production".to_string())
                    );
                    assert_eq!(
                        matches
                            .get_one::<String>(backend::ARG_VALIDATE_TRANSPORT)
                            .cloned(),
                        Some("body".to_string())
                    );
                    let routes: Vec<String> = matches
                        .get_many::<String>(pages::ARG_PRIVATE_ROUTES)
                        .map(|routes| routes.cloned().collect())
                        .unwrap_or_default();
                    assert_eq!(routes, ["/dashboard", "/admin/*"]);
                    assert_eq!(
                        matches.get_one::<PathBuf>(pages::ARG_STATIC_DIR).cloned(),
                        Some(PathBuf::from("/srv/recoleta"))
                    );
                    assert_eq!(
                        matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                        Some(2)
                    );
                },
            );
        });
    }

    #[test]
    fn test_rejects_unknown_transport() {
        clean_env(|| {
            let result = new().try_get_matches_from(["recoleta", "--validate-transport", "query"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_check_session_subcommand() {
        clean_env(|| {
            let matches = new().get_matches_from([
                "recoleta",
                "check-session",
                "--server-url",
                "http://gateway.local:8080",
                "--token",
                "abc",
            ]);
            let sub = matches.subcommand_matches(session::CMD_CHECK_SESSION);
            assert!(sub.is_some());
            if let Some(sub) = sub {
                assert_eq!(
                    sub.get_one::<String>(session::ARG_TOKEN).cloned(),
                    Some("abc".to_string())
                );
                assert_eq!(
                    sub.get_one::<String>(backend::ARG_AUTH_COOKIE).cloned(),
                    Some("recoleta_access_token".to_string())
                );
            }
        });
    }

    #[test]
    fn test_check_session_requires_token() {
        clean_env(|| {
            let result = new().try_get_matches_from(["recoleta", "check-session"]);
            assert!(result.is_err());
        });
    }
}
