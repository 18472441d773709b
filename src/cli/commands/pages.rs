use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

use crate::recoleta::guard::DEFAULT_PRIVATE_ROUTES;

pub const ARG_PRIVATE_ROUTES: &str = "private-routes";
pub const ARG_STATIC_DIR: &str = "static-dir";
pub const ARG_FRONTEND_ORIGIN: &str = "frontend-origin";

/// Guarded page options.
#[derive(Debug)]
pub struct Options {
    pub private_routes: Vec<String>,
    pub static_dir: Option<PathBuf>,
    pub frontend_origin: Option<String>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let private_routes = matches
            .get_many::<String>(ARG_PRIVATE_ROUTES)
            .map(|routes| routes.cloned().collect())
            .unwrap_or_default();

        Self {
            private_routes,
            static_dir: matches.get_one::<PathBuf>(ARG_STATIC_DIR).cloned(),
            frontend_origin: matches.get_one::<String>(ARG_FRONTEND_ORIGIN).cloned(),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PRIVATE_ROUTES)
                .long(ARG_PRIVATE_ROUTES)
                .help("Comma separated private routes; `/route/*` matches any path with that prefix")
                .env("RECOLETA_PRIVATE_ROUTES")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .default_values(DEFAULT_PRIVATE_ROUTES),
        )
        .arg(
            Arg::new(ARG_STATIC_DIR)
                .long(ARG_STATIC_DIR)
                .help("Frontend build directory served behind the route guard")
                .env("RECOLETA_STATIC_DIR")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_FRONTEND_ORIGIN)
                .long(ARG_FRONTEND_ORIGIN)
                .help("Allow CORS requests with credentials from this origin")
                .env("RECOLETA_FRONTEND_ORIGIN"),
        )
}
