//! Session store, start-up bootstrapper, and auth action handlers.
//!
//! [`SessionManager`] is the only writer of session state. It is constructed
//! once per process and passed by reference; there is no ambient global.
//!
//! The safety-critical branch lives in the bootstrapper: a validation
//! failure must be split into "infrastructure is flaky" (keep the persisted
//! session, raise `server_unavailable`) and "credential is bad" (destroy the
//! session). Collapsing the split either way breaks availability or
//! security.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use serde_json::{json, Value};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::{AuthResponse, LoginOutcome, RegisterRequest, UserSummary, ValidateResponse};

/// In-memory session record.
///
/// Mutated only by the bootstrapper (once, at start) and the action
/// handlers; everything else reads snapshots.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Current user, present iff a currently trusted credential exists
    pub user: Option<UserSummary>,
    /// True only while the start-up validation call is in flight
    pub loading: bool,
    /// True when the backend looked down during validation; the persisted
    /// session is kept and the UI may surface a banner
    pub server_unavailable: bool,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn role(&self) -> Option<&str> {
        self.user.as_ref()?.role.as_deref()
    }
}

/// Settled result of the start-up bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// No persisted token — nothing to resume
    NoToken,
    /// Persisted token validated; session resumed with a fresh snapshot
    Authenticated,
    /// Credential rejected (or response unusable); session destroyed
    AuthInvalid,
    /// Backend unreachable or 5xx; session preserved and flagged
    ServerUnavailable,
}

/// Owner of the session: bootstraps it at start-up and applies auth actions.
pub struct SessionManager {
    transport: Transport,
    store: Arc<dyn CredentialStore>,
    state: StdMutex<SessionState>,
    /// Single-flight guard: the validation call runs at most once per load
    bootstrap: OnceCell<BootstrapOutcome>,
    /// Single-writer guard held by each async handler for its full duration
    write_lock: Mutex<()>,
    /// Bumped by logout; in-flight handlers re-check it before applying
    /// their settle-time writes so a stale result cannot resurrect a
    /// cleared session
    epoch: AtomicU64,
}

impl SessionManager {
    /// Create a manager over the given backend config and credential store.
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            transport: Transport::new(config, store.clone()),
            store,
            state: StdMutex::new(SessionState::default()),
            bootstrap: OnceCell::new(),
            write_lock: Mutex::new(()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> SessionState {
        self.state.lock().expect("session lock poisoned").clone()
    }

    /// Validate any persisted credential and settle the session.
    ///
    /// Runs the validation call at most once per manager; concurrent and
    /// repeated callers await the same in-flight bootstrap and receive the
    /// same outcome.
    pub async fn init(&self) -> BootstrapOutcome {
        *self
            .bootstrap
            .get_or_init(|| self.run_bootstrap())
            .await
    }

    async fn run_bootstrap(&self) -> BootstrapOutcome {
        let _guard = self.write_lock.lock().await;

        let Some(token) = self.store.token() else {
            debug!("No persisted token, starting signed out");
            self.with_state(|s| {
                s.user = None;
                s.loading = false;
            });
            return BootstrapOutcome::NoToken;
        };

        let epoch = self.epoch.load(Ordering::SeqCst);
        self.with_state(|s| s.loading = true);

        let result = self
            .transport
            .post_empty::<ValidateResponse>("/auth/validate-token", None)
            .await;

        self.with_state(|s| s.loading = false);

        if self.epoch.load(Ordering::SeqCst) != epoch {
            // Logged out while the validation was in flight — the cleared
            // session wins.
            debug!("Bootstrap result discarded after logout");
            return BootstrapOutcome::NoToken;
        }

        match result {
            Ok(ValidateResponse {
                valid: true,
                user: Some(user),
            }) => {
                if let Err(e) = self.store.save(&token, &user) {
                    warn!(error = %e, "Could not refresh persisted snapshot");
                }
                self.with_state(|s| {
                    s.user = Some(user);
                    s.server_unavailable = false;
                });
                info!("Persisted session validated");
                BootstrapOutcome::Authenticated
            }
            Ok(_) => {
                // Server answered and did not vouch for the credential
                // (valid=false, or a valid response missing the snapshot).
                info!("Persisted credential rejected, clearing session");
                self.destroy_session();
                BootstrapOutcome::AuthInvalid
            }
            Err(e) if e.is_network_error => {
                // Backend down or unreachable: keep the credential, flag the
                // outage, and show the last-known snapshot if one exists.
                warn!(code = %e.code, "Backend unavailable during bootstrap, keeping session");
                let cached = self.store.user();
                self.with_state(|s| {
                    s.user = cached;
                    s.server_unavailable = true;
                });
                BootstrapOutcome::ServerUnavailable
            }
            Err(e) => {
                // 401 and every unclassified failure destroy the session —
                // the security-leaning default.
                info!(code = %e.code, "Validation failed, clearing session");
                self.destroy_session();
                BootstrapOutcome::AuthInvalid
            }
        }
    }

    /// Authenticate with username and password.
    ///
    /// Resolves on every path; a failed login is a normal outcome with a
    /// display-ready message, never an error.
    pub async fn login(&self, username: &str, password: &str) -> LoginOutcome {
        let _guard = self.write_lock.lock().await;
        let epoch = self.epoch.load(Ordering::SeqCst);

        let result = self
            .transport
            .post::<_, AuthResponse>(
                "/auth/login",
                &json!({ "username": username, "password": password }),
            )
            .await;

        match result {
            Ok(resp) if resp.success => {
                let (Some(token), Some(user)) = (resp.access_token, resp.user) else {
                    warn!("Login reported success without token or user");
                    return LoginOutcome::failed("Login failed. Please try again.", false);
                };
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    debug!("Login result discarded after logout");
                    return LoginOutcome::failed("Signed out before login completed.", false);
                }
                self.establish_session(&token, user.clone());
                info!(username, "Login succeeded");
                LoginOutcome::succeeded(user)
            }
            Ok(resp) => {
                let message = resp
                    .message
                    .unwrap_or_else(|| "Login failed. Please try again.".to_string());
                debug!(username, %message, "Login rejected");
                LoginOutcome::failed(message, false)
            }
            Err(e) => {
                debug!(username, code = %e.code, "Login request failed");
                LoginOutcome::failed(e.message.clone(), e.is_network_error)
            }
        }
    }

    /// Create an account, then log in with the same credentials.
    ///
    /// Signup itself does not touch session state; the session transition is
    /// the delegated login.
    pub async fn register(&self, request: RegisterRequest) -> LoginOutcome {
        let result = self
            .transport
            .post::<_, AuthResponse>("/auth/signup", &request)
            .await;

        match result {
            Ok(resp) if resp.success => {
                debug!(username = %request.username, "Signup accepted, logging in");
                self.login(&request.username, &request.password).await
            }
            Ok(resp) => {
                let message = resp
                    .message
                    .unwrap_or_else(|| "Registration failed. Please try again.".to_string());
                LoginOutcome::failed(message, false)
            }
            Err(e) => LoginOutcome::failed(e.message.clone(), e.is_network_error),
        }
    }

    /// Validate a one-off portal token (magic link) and, on success, promote
    /// it to the persisted session — same effects as a fresh login.
    pub async fn validate_portal_token(&self, token: &str) -> LoginOutcome {
        let _guard = self.write_lock.lock().await;
        let epoch = self.epoch.load(Ordering::SeqCst);

        let result = self
            .transport
            .post_empty::<ValidateResponse>("/auth/validate-token", Some(token))
            .await;

        match result {
            Ok(ValidateResponse {
                valid: true,
                user: Some(user),
            }) => {
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    debug!("Portal token result discarded after logout");
                    return LoginOutcome::failed("Signed out before validation completed.", false);
                }
                self.establish_session(token, user.clone());
                info!("Portal token promoted to session");
                LoginOutcome::succeeded(user)
            }
            Ok(_) => LoginOutcome::failed("This sign-in link is invalid or has expired.", false),
            Err(e) => LoginOutcome::failed(e.message.clone(), e.is_network_error),
        }
    }

    /// Clear the session unconditionally. No network call, always succeeds,
    /// idempotent.
    pub fn logout(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.destroy_session();
        info!("Logged out");
    }

    /// Drop in-memory session state without touching the persisted
    /// credential. For orderly shutdown; the next load resumes via `init`.
    pub fn teardown(&self) {
        self.with_state(|s| {
            s.user = None;
            s.loading = false;
            s.server_unavailable = false;
        });
    }

    /// Authenticated pass-through: PUT /auth/profile.
    ///
    /// Not a session transition; the session snapshot is only replaced by
    /// login or validation.
    pub async fn update_profile(&self, body: &Value) -> Result<Value, ApiError> {
        self.transport.put("/auth/profile", body).await
    }

    /// Authenticated pass-through: PUT /auth/change-password.
    pub async fn change_password(&self, body: &Value) -> Result<Value, ApiError> {
        self.transport.put("/auth/change-password", body).await
    }

    /// Persist the pair and settle the session as authenticated.
    fn establish_session(&self, token: &str, user: UserSummary) {
        if let Err(e) = self.store.save(token, &user) {
            warn!(error = %e, "Could not persist credentials");
        }
        self.with_state(|s| {
            s.user = Some(user);
            s.server_unavailable = false;
            s.loading = false;
        });
    }

    /// Clear both persisted keys and reset the session.
    fn destroy_session(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Could not clear persisted credentials");
        }
        self.with_state(|s| {
            s.user = None;
            s.server_unavailable = false;
            s.loading = false;
        });
    }

    fn with_state(&self, f: impl FnOnce(&mut SessionState)) {
        let mut state = self.state.lock().expect("session lock poisoned");
        f(&mut state);
    }
}
