//! Authenticated session state.
//!
//! The session is derived: it exists only while the token store holds a
//! non-expired access token and the backend has confirmed the identity
//! behind it. [`SessionManager`] owns that derived state and is the only
//! component that transitions it.
//!
//! ```text
//! Unknown ──bootstrap──▶ Anonymous ◀──logout / invalidated──┐
//!    │                       │                                │
//!    └──────bootstrap────────┴──────login──▶ Authenticated ───┘
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::{OnceCell, RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use shopfront_core::Email;

use crate::backend::BackendClient;
use crate::backend::types::{Credentials, ProfileUpdate, RegisterData, User};
use crate::error::ClientError;
use crate::events::{EventBus, Route, StoreEvent};
use crate::token::TokenStore;

const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
const REGISTRATION_FAILED: &str = "Registration failed. Please try again.";

/// Field errors surfaced from a rejected registration, highest priority first.
const REGISTRATION_FIELDS: [&str; 3] = ["username", "email", "password"];

/// Where the session currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Not yet bootstrapped.
    #[default]
    Unknown,
    /// No confirmed identity.
    Anonymous,
    /// The backend confirmed this user.
    Authenticated(User),
}

impl SessionState {
    /// The confirmed user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// A failed login or registration, with the message to show the user.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SessionError {
    pub message: String,
    #[source]
    pub source: ClientError,
}

/// Raw registration form input.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl RegistrationForm {
    /// Validate the form into a backend payload.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for an empty username or password,
    /// or a malformed email.
    pub fn validate(self) -> Result<RegisterData, ClientError> {
        let username = self.username.trim().to_string();
        if username.is_empty() {
            return Err(ClientError::Validation("Username is required.".to_string()));
        }
        if self.password.is_empty() {
            return Err(ClientError::Validation("Password is required.".to_string()));
        }
        let email = Email::parse(&self.email)
            .map_err(|e| ClientError::Validation(format!("Enter a valid email address: {e}.")))?;

        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Ok(RegisterData {
            username,
            email,
            password: self.password.into(),
            first_name: non_empty(self.first_name),
            last_name: non_empty(self.last_name),
        })
    }
}

/// Owner of the session state.
///
/// Cheap to clone; clones share state. `login` and `register` are not meant
/// to be called concurrently; callers serialize them.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    backend: BackendClient,
    tokens: TokenStore,
    events: EventBus,
    state: RwLock<SessionState>,
    error: RwLock<Option<String>>,
    loading: AtomicBool,
    bootstrapped: OnceCell<()>,
}

impl SessionManager {
    /// Create a manager in the `Unknown` state.
    #[must_use]
    pub fn new(backend: BackendClient, tokens: TokenStore, events: EventBus) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                backend,
                tokens,
                events,
                state: RwLock::new(SessionState::Unknown),
                error: RwLock::new(None),
                loading: AtomicBool::new(false),
                bootstrapped: OnceCell::new(),
            }),
        }
    }

    // =========================================================================
    // Readers
    // =========================================================================

    /// Current state.
    pub async fn state(&self) -> SessionState {
        self.inner.state.read().await.clone()
    }

    /// The confirmed user, if any.
    pub async fn current_user(&self) -> Option<User> {
        self.inner.state.read().await.user().cloned()
    }

    /// Whether a non-expired access token is stored.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.tokens.is_authenticated()
    }

    /// Whether a bootstrap, login or registration is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::Acquire)
    }

    /// Last surfaced error message.
    pub async fn error(&self) -> Option<String> {
        self.inner.error.read().await.clone()
    }

    /// Forget the last error message.
    pub async fn clear_error(&self) {
        *self.inner.error.write().await = None;
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Settle the initial state from stored credentials.
    ///
    /// Runs once; later calls return the current state without side effects.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> SessionState {
        self.inner
            .bootstrapped
            .get_or_init(|| async {
                let _loading = LoadingGuard::start(&self.inner.loading);
                let next = if self.inner.tokens.is_authenticated() {
                    match self.inner.backend.current_user().await {
                        Ok(user) => {
                            info!(user_id = %user.id, "Session restored");
                            SessionState::Authenticated(user)
                        }
                        Err(e) => {
                            warn!(error = %e, "Stored credentials rejected, clearing");
                            self.clear_tokens();
                            SessionState::Anonymous
                        }
                    }
                } else {
                    debug!("No valid stored credentials");
                    SessionState::Anonymous
                };
                *self.inner.state.write().await = next;
            })
            .await;

        self.state().await
    }

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] whose message comes from the backend's
    /// `detail` field when present. The state is left unchanged.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<User, SessionError> {
        let _loading = LoadingGuard::start(&self.inner.loading);
        self.clear_error().await;

        let credentials = Credentials::new(username, password);
        match self.authenticate(&credentials).await {
            Ok(user) => Ok(user),
            Err(source) => {
                let message = detail_message(&source).unwrap_or_else(|| LOGIN_FAILED.to_string());
                Err(self.fail(message, source).await)
            }
        }
    }

    /// Create an account, then log into it.
    ///
    /// The form is validated before any request is made.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] carrying the first field error reported by
    /// the backend (`username`, then `email`, then `password`), the
    /// validation message, or a generic message.
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn register(&self, form: RegistrationForm) -> Result<User, SessionError> {
        let _loading = LoadingGuard::start(&self.inner.loading);
        self.clear_error().await;

        let data = match form.validate() {
            Ok(data) => data,
            Err(source) => {
                let message = match &source {
                    ClientError::Validation(msg) => msg.clone(),
                    _ => REGISTRATION_FAILED.to_string(),
                };
                return Err(self.fail(message, source).await);
            }
        };

        if let Err(source) = self.inner.backend.register_user(&data).await {
            let message =
                field_error_message(&source).unwrap_or_else(|| REGISTRATION_FAILED.to_string());
            return Err(self.fail(message, source).await);
        }
        info!("Account registered");

        match self.authenticate(&data.credentials()).await {
            Ok(user) => Ok(user),
            Err(source) => {
                let message = detail_message(&source).unwrap_or_else(|| LOGIN_FAILED.to_string());
                Err(self.fail(message, source).await)
            }
        }
    }

    /// End the session locally. No backend call; idempotent.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.clear_tokens();
        *self.inner.state.write().await = SessionState::Anonymous;
        self.clear_error().await;
        info!("Logged out");
        self.inner.events.navigate(Route::Login);
    }

    /// Update the current user's profile and replace the held user.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ClientError> {
        let user = self.inner.backend.update_current_user(update).await?;
        let mut state = self.inner.state.write().await;
        if matches!(*state, SessionState::Authenticated(_)) {
            *state = SessionState::Authenticated(user.clone());
        }
        Ok(user)
    }

    /// Drop the user after the gateway saw an authorization failure.
    pub async fn handle_invalidated(&self, status: u16) {
        let previous = std::mem::replace(
            &mut *self.inner.state.write().await,
            SessionState::Anonymous,
        );
        if let SessionState::Authenticated(user) = previous {
            warn!(user_id = %user.id, status, "Session invalidated by backend");
        } else {
            debug!(status, "Authorization failure without a session");
        }
        self.inner.events.navigate(Route::Login);
    }

    /// Listen for session-invalidated events until `cancel` fires.
    ///
    /// The subscription is taken before this returns, so no event published
    /// afterwards is missed.
    #[must_use]
    pub fn spawn_invalidation_listener(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.inner.events.subscribe();
        let session = self.clone();

        tokio::spawn(async move {
            debug!("Session invalidation listener started");
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("Session invalidation listener stopped");
                        break;
                    }
                    received = rx.recv() => match received {
                        Ok(StoreEvent::SessionInvalidated { status }) => {
                            session.handle_invalidated(status).await;
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Session listener lagged behind event bus");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Create tokens, confirm identity, and enter `Authenticated`.
    async fn authenticate(&self, credentials: &Credentials) -> Result<User, ClientError> {
        let pair = self.inner.backend.create_token(credentials).await?;
        self.inner.tokens.save(&pair.access, &pair.refresh)?;

        let user = match self.inner.backend.current_user().await {
            Ok(user) => user,
            Err(e) => {
                self.clear_tokens();
                *self.inner.state.write().await = SessionState::Anonymous;
                return Err(e);
            }
        };

        *self.inner.state.write().await = SessionState::Authenticated(user.clone());
        info!(user_id = %user.id, "Logged in");
        self.inner.events.navigate(Route::Landing);
        Ok(user)
    }

    async fn fail(&self, message: String, source: ClientError) -> SessionError {
        warn!(error = %source, reason = %message, "Session request failed");
        *self.inner.error.write().await = Some(message.clone());
        SessionError { message, source }
    }

    fn clear_tokens(&self) {
        if let Err(e) = self.inner.tokens.clear() {
            error!(error = %e, "Failed to clear stored tokens");
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("loading", &self.is_loading())
            .field("bootstrapped", &self.inner.bootstrapped.initialized())
            .finish_non_exhaustive()
    }
}

/// Marks an operation in flight for as long as it is alive.
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// `detail` string from a backend error body.
fn detail_message(err: &ClientError) -> Option<String> {
    err.json_body()?
        .get("detail")?
        .as_str()
        .map(str::to_string)
}

/// First field error from a registration rejection, in priority order.
fn field_error_message(err: &ClientError) -> Option<String> {
    let body = err.json_body()?;
    REGISTRATION_FIELDS.iter().find_map(|field| {
        match body.get(*field)? {
            serde_json::Value::String(msg) => Some(msg.clone()),
            serde_json::Value::Array(msgs) => msgs.first()?.as_str().map(str::to_string),
            _ => None,
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn server_error(body: serde_json::Value) -> ClientError {
        ClientError::Server {
            status: 400,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_field_error_priority() {
        let err = server_error(serde_json::json!({
            "password": ["This password is too common."],
            "email": ["Enter a valid email address."],
        }));
        assert_eq!(
            field_error_message(&err).as_deref(),
            Some("Enter a valid email address.")
        );

        let err = server_error(serde_json::json!({
            "password": ["Too short."],
            "username": ["A user with that username already exists."],
        }));
        assert_eq!(
            field_error_message(&err).as_deref(),
            Some("A user with that username already exists.")
        );

        assert!(field_error_message(&server_error(serde_json::json!({ "other": ["x"] }))).is_none());
        assert!(field_error_message(&ClientError::Timeout).is_none());
    }

    #[test]
    fn test_detail_message() {
        let err = ClientError::Unauthorized {
            status: 401,
            body: r#"{"detail":"No active account found with the given credentials"}"#.into(),
        };
        assert_eq!(
            detail_message(&err).as_deref(),
            Some("No active account found with the given credentials")
        );
        assert!(detail_message(&server_error(serde_json::json!({}))).is_none());
    }

    #[test]
    fn test_registration_form_validation() {
        let valid = RegistrationForm {
            username: " ada ".into(),
            email: "ada@example.com".into(),
            password: "correct horse".into(),
            first_name: Some(String::new()),
            last_name: Some("Lovelace".into()),
        };
        let data = valid.clone().validate().unwrap();
        assert_eq!(data.username, "ada");
        assert!(data.first_name.is_none());
        assert_eq!(data.last_name.as_deref(), Some("Lovelace"));

        for form in [
            RegistrationForm {
                username: "  ".into(),
                ..valid.clone()
            },
            RegistrationForm {
                password: String::new(),
                ..valid.clone()
            },
            RegistrationForm {
                email: "not-an-email".into(),
                ..valid
            },
        ] {
            assert!(matches!(form.validate(), Err(ClientError::Validation(_))));
        }
    }

    #[test]
    fn test_loading_guard_resets_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _guard = LoadingGuard::start(&flag);
            assert!(flag.load(Ordering::Acquire));
        }
        assert!(!flag.load(Ordering::Acquire));
    }
}
