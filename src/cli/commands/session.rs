use clap::{Arg, Command};

pub const CMD_CHECK_SESSION: &str = "check-session";
pub const ARG_SERVER_URL: &str = "server-url";
pub const ARG_TOKEN: &str = "token";

/// `check-session`: run the client session bootstrap against a gateway.
#[must_use]
pub fn command() -> Command {
    Command::new(CMD_CHECK_SESSION)
        .about("Check a session token against a running gateway's identity endpoint")
        .arg(
            Arg::new(ARG_SERVER_URL)
                .long(ARG_SERVER_URL)
                .help("Base URL of the gateway")
                .env("RECOLETA_SERVER_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new(ARG_TOKEN)
                .long(ARG_TOKEN)
                .help("Session token to check")
                .env("RECOLETA_SESSION_TOKEN")
                .hide_env_values(true)
                .required(true),
        )
}
