//! # ReColeta session gateway
//!
//! `recoleta` fronts the ReColeta web frontend and decides, per request,
//! whether a visitor may see a page. Sessions are opaque bearer tokens held in
//! an `HttpOnly` cookie; the remote ReColeta backend is the only authority on
//! whether a token is valid.
//!
//! ## Request flow
//!
//! 1. The route guard skips static assets and everything under `/api/`.
//! 2. Private routes (and `/login`) extract the session cookie and ask the
//!    [`SessionCheck`](recoleta::session::SessionCheck) implementation
//!    whether it is valid.
//! 3. Anonymous visitors to private routes are redirected to
//!    `/login?callbackUrl=<path>`; signed-in visitors to `/login` are sent to
//!    their callback or `/dashboard`.
//! 4. Every failure (missing cookie, rejected token, backend outage) is
//!    treated as "not signed in". The guard fails closed.
//!
//! The same `SessionCheck` contract backs the identity endpoint
//! (`/api/auth/me`) and the client-side [`SessionBootstrap`](recoleta::session::bootstrap::SessionBootstrap),
//! so server and client agree on what a valid session is.

pub mod cli;
pub mod recoleta;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
