//! Session manager — restore, sign-in, sign-out.
//!
//! DESIGN
//! ======
//! Every mutation builds a complete new [`AuthSnapshot`] and publishes it
//! with a single `send_replace`, so `user` and `session` are always seen
//! together. Gateway failures are absorbed here; callers only ever see
//! [`SignInError`].
//!
//! TRADE-OFFS
//! ==========
//! Operations are serialized by one in-flight guard. A second `sign_in`
//! while anything is pending is rejected with [`SignInError::Busy`] rather
//! than queued, so a double-tapped submit cannot race itself. `restore` and
//! `sign_out` wait their turn instead, since dropping a logout is never
//! acceptable.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{MutexGuard, watch};

use crate::gateway::{IdentityGateway, SessionPayload};
use crate::types::{AuthSnapshot, Role, User};

const LOGIN_FAILED: &str = "Login failed";

// =============================================================================
// ERRORS / OPERATIONS
// =============================================================================

/// Why a sign-in did not take effect. `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignInError {
    /// The server refused the credentials; carries its message verbatim.
    #[error("{0}")]
    Rejected(String),

    /// The server accepted but did not return both a session and a user.
    #[error("Invalid response from server")]
    InvalidResponse,

    /// The server could not be reached or answered garbage.
    #[error("Network error occurred")]
    Network,

    /// Another session operation is still in flight.
    #[error("Another session operation is in progress")]
    Busy,
}

/// Session-mutating operation currently holding the in-flight guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Restore,
    SignIn,
    SignOut,
}

// =============================================================================
// MANAGER
// =============================================================================

pub struct SessionManager {
    gateway: Arc<dyn IdentityGateway>,
    state: watch::Sender<AuthSnapshot>,
    in_flight: tokio::sync::Mutex<()>,
    pending: Mutex<Option<Operation>>,
}

impl SessionManager {
    /// Create the manager in its startup state (loading, signed out).
    #[must_use]
    pub fn new(gateway: Arc<dyn IdentityGateway>) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::initial());
        Self { gateway, state, in_flight: tokio::sync::Mutex::new(()), pending: Mutex::new(None) }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.state.borrow().role()
    }

    /// Subscribe to snapshot changes. Dropping the receiver unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    /// The operation currently in flight, if any.
    #[must_use]
    pub fn pending(&self) -> Option<Operation> {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Restore the session left by a previous run. Called once at startup.
    ///
    /// Never fails: anything short of a complete session ends signed out.
    /// `is_loading` is cleared on every path, including cancellation.
    pub async fn restore(&self) {
        let _op = self.begin(Operation::Restore).await;
        let mut finalize = SignOutOnDrop::new(self);

        // Not broadcast: subscribers get exactly one snapshot, at the end.
        self.state.send_if_modified(|s| {
            s.is_loading = true;
            false
        });

        let next = match self.gateway.get_session().await {
            Ok(Some(payload)) => match payload.into_complete() {
                Some((user, session)) => {
                    tracing::info!(user_id = %user.id, role = %user.role, "session restored");
                    AuthSnapshot::signed_in(user, session)
                }
                None => {
                    tracing::info!("restored session incomplete; signed out");
                    AuthSnapshot::signed_out()
                }
            },
            Ok(None) => {
                tracing::info!("no session to restore");
                AuthSnapshot::signed_out()
            }
            Err(e) => {
                tracing::warn!(error = %e, "session restore failed; signed out");
                AuthSnapshot::signed_out()
            }
        };

        finalize.disarm();
        self.publish(next);
    }

    /// Exchange credentials for a session.
    ///
    /// State changes only on success, and then `user` and `session` are set
    /// together.
    ///
    /// # Errors
    ///
    /// - [`SignInError::Rejected`] with the server's message for bad credentials
    /// - [`SignInError::InvalidResponse`] if the server omitted session or user
    /// - [`SignInError::Network`] for any transport failure
    /// - [`SignInError::Busy`] if another operation is in flight
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), SignInError> {
        let Some(_op) = self.try_begin(Operation::SignIn) else {
            tracing::warn!(pending = ?self.pending(), "sign-in rejected; operation in flight");
            return Err(SignInError::Busy);
        };

        let response = match self.gateway.sign_in_with_credentials(email, password).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "sign-in transport failure");
                return Err(SignInError::Network);
            }
        };

        if let Some(error) = response.error {
            let message = error.message.filter(|m| !m.is_empty()).unwrap_or_else(|| LOGIN_FAILED.to_owned());
            tracing::info!(code = ?error.code, "sign-in rejected by server");
            return Err(SignInError::Rejected(message));
        }

        let Some((user, session)) = response.data.and_then(SessionPayload::into_complete) else {
            tracing::warn!("sign-in response missing session or user");
            return Err(SignInError::InvalidResponse);
        };

        tracing::info!(user_id = %user.id, role = %user.role, "signed in");
        self.publish(AuthSnapshot::signed_in(user, session));
        Ok(())
    }

    /// Sign out. Local state is cleared whether or not the server hears
    /// about it.
    pub async fn sign_out(&self) {
        let _op = self.begin(Operation::SignOut).await;
        let mut finalize = SignOutOnDrop::new(self);

        if let Err(e) = self.gateway.sign_out().await {
            tracing::warn!(error = %e, "server sign-out failed; clearing local session anyway");
        }

        finalize.disarm();
        self.publish(AuthSnapshot::signed_out());
        tracing::info!("signed out");
    }

    fn publish(&self, next: AuthSnapshot) {
        tracing::debug!(authenticated = next.is_authenticated(), loading = next.is_loading, "auth state published");
        self.state.send_replace(next);
    }

    async fn begin(&self, op: Operation) -> InFlight<'_> {
        let guard = self.in_flight.lock().await;
        InFlight::new(self, guard, op)
    }

    fn try_begin(&self, op: Operation) -> Option<InFlight<'_>> {
        let guard = self.in_flight.try_lock().ok()?;
        Some(InFlight::new(self, guard, op))
    }
}

// =============================================================================
// GUARDS
// =============================================================================

/// Holds the in-flight lock and exposes the operation through `pending()`.
struct InFlight<'a> {
    manager: &'a SessionManager,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> InFlight<'a> {
    fn new(manager: &'a SessionManager, guard: MutexGuard<'a, ()>, op: Operation) -> Self {
        *manager.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(op);
        Self { manager, _guard: guard }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.manager.pending.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Publishes a settled signed-out snapshot if the operation is abandoned
/// before it finishes (future dropped or gateway panic).
struct SignOutOnDrop<'a> {
    manager: &'a SessionManager,
    armed: bool,
}

impl<'a> SignOutOnDrop<'a> {
    fn new(manager: &'a SessionManager) -> Self {
        Self { manager, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for SignOutOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!("session operation abandoned; clearing local session");
            self.manager.publish(AuthSnapshot::signed_out());
        }
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
