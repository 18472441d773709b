//! Client-side session bootstrap.
//!
//! Mounted when the authenticated application shell appears. It runs exactly
//! one [`SessionCheck`] and moves from `Loading` to `Authenticated` or
//! `Unauthenticated`. The route guard already ran for the navigation, but
//! client-side transitions do not pass through it, so this check is repeated
//! here. When the two disagree the bootstrap wins for rendering.
//!
//! Tearing the bootstrap down cancels the in-flight check and discards its
//! result; the state then stays at `Loading` forever.

use std::{fmt, sync::Arc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::SessionCheck;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapState {
    Loading,
    Authenticated,
    Unauthenticated,
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => f.write_str("loading"),
            Self::Authenticated => f.write_str("authenticated"),
            Self::Unauthenticated => f.write_str("unauthenticated"),
        }
    }
}

/// What the shell should do once the check has settled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Render the protected children.
    Render,
    /// Render nothing and navigate to this path.
    Redirect(String),
}

pub struct SessionBootstrap {
    state: watch::Receiver<BootstrapState>,
    cancel: CancellationToken,
    login_path: String,
}

impl SessionBootstrap {
    /// Start the session check on the current Tokio runtime.
    ///
    /// A missing token is checked like an empty one, so it settles as
    /// `Unauthenticated` without touching the network.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn mount(
        checker: Arc<dyn SessionCheck>,
        token: Option<String>,
        login_path: impl Into<String>,
    ) -> Self {
        let (tx, rx) = watch::channel(BootstrapState::Loading);
        let cancel = CancellationToken::new();
        let lifetime = cancel.clone();

        tokio::spawn(async move {
            let token = token.unwrap_or_default();
            tokio::select! {
                biased;
                () = lifetime.cancelled() => {
                    debug!("Session bootstrap cancelled before the check finished");
                }
                status = checker.check_session(&token) => {
                    let next = if status.is_authenticated() {
                        BootstrapState::Authenticated
                    } else {
                        BootstrapState::Unauthenticated
                    };
                    tx.send_replace(next);
                }
            }
        });

        Self {
            state: rx,
            cancel,
            login_path: login_path.into(),
        }
    }

    #[must_use]
    pub fn state(&self) -> BootstrapState {
        *self.state.borrow()
    }

    /// Subscribe to state changes, e.g. to re-render on settle.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<BootstrapState> {
        self.state.clone()
    }

    /// Wait until the check settles.
    ///
    /// Returns `Loading` only if the check was cancelled.
    pub async fn settled(&mut self) -> BootstrapState {
        let settled = self
            .state
            .wait_for(|state| *state != BootstrapState::Loading)
            .await
            .map(|state| *state);
        settled.unwrap_or_else(|_| *self.state.borrow())
    }

    /// `None` while loading.
    #[must_use]
    pub fn outcome(&self) -> Option<BootstrapOutcome> {
        match self.state() {
            BootstrapState::Loading => None,
            BootstrapState::Authenticated => Some(BootstrapOutcome::Render),
            BootstrapState::Unauthenticated => {
                Some(BootstrapOutcome::Redirect(self.login_path.clone()))
            }
        }
    }

    /// Tear down; an in-flight check is aborted and its result dropped.
    pub fn unmount(self) {
        self.cancel.cancel();
    }
}

impl Drop for SessionBootstrap {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recoleta::session::{SessionStatus, TokenPayload};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{Duration, timeout};

    struct FixedCheck {
        status: SessionStatus,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SessionCheck for FixedCheck {
        async fn check_session(&self, token: &str) -> SessionStatus {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if token.is_empty() {
                SessionStatus::Unauthenticated
            } else {
                self.status.clone()
            }
        }
    }

    struct NeverCheck;

    #[async_trait]
    impl SessionCheck for NeverCheck {
        async fn check_session(&self, _token: &str) -> SessionStatus {
            std::future::pending::<()>().await;
            SessionStatus::Unauthenticated
        }
    }

    fn fixed(status: SessionStatus) -> Arc<FixedCheck> {
        Arc::new(FixedCheck {
            status,
            calls: AtomicUsize::new(0),
        })
    }

    fn payload() -> TokenPayload {
        TokenPayload {
            subject: "u-1".to_string(),
            name: "Ana".to_string(),
            email: "ana@recoleta.dev".to_string(),
            issued_at: 1,
            expires_at: 2,
        }
    }

    #[tokio::test]
    async fn settles_authenticated_and_renders() {
        let checker = fixed(SessionStatus::Authenticated(Some(payload())));
        let mut bootstrap = SessionBootstrap::mount(checker.clone(), Some("tok".into()), "/login");

        assert_eq!(bootstrap.settled().await, BootstrapState::Authenticated);
        assert_eq!(bootstrap.outcome(), Some(BootstrapOutcome::Render));
        assert_eq!(checker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn settles_unauthenticated_and_redirects() {
        let checker = fixed(SessionStatus::Unauthenticated);
        let mut bootstrap = SessionBootstrap::mount(checker, Some("tok".into()), "/login");

        assert_eq!(bootstrap.settled().await, BootstrapState::Unauthenticated);
        assert_eq!(
            bootstrap.outcome(),
            Some(BootstrapOutcome::Redirect("/login".to_string()))
        );
    }

    #[tokio::test]
    async fn missing_token_is_unauthenticated() {
        let checker = fixed(SessionStatus::Authenticated(None));
        let mut bootstrap = SessionBootstrap::mount(checker, None, "/login");
        assert_eq!(bootstrap.settled().await, BootstrapState::Unauthenticated);
    }

    #[tokio::test]
    async fn starts_loading_without_outcome() {
        let bootstrap = SessionBootstrap::mount(Arc::new(NeverCheck), Some("tok".into()), "/login");
        assert_eq!(bootstrap.state(), BootstrapState::Loading);
        assert_eq!(bootstrap.outcome(), None);
    }

    #[tokio::test]
    async fn unmount_cancels_in_flight_check() {
        let bootstrap = SessionBootstrap::mount(Arc::new(NeverCheck), Some("tok".into()), "/login");
        let mut rx = bootstrap.watch();
        bootstrap.unmount();

        // The task exits without publishing, so the sender is dropped.
        let changed = timeout(Duration::from_secs(1), rx.changed()).await;
        assert!(matches!(changed, Ok(Err(_))));
        assert_eq!(*rx.borrow(), BootstrapState::Loading);
    }
}
