//! Identity gateway — the contract the session manager needs from the
//! remote authentication service.
//!
//! DESIGN
//! ======
//! The manager only depends on [`IdentityGateway`]. `HttpGateway` is the
//! production implementation; tests script their own.

pub mod http;

use serde::{Deserialize, Serialize};

use crate::types::{Session, User};

pub use http::HttpGateway;

// =============================================================================
// ERROR
// =============================================================================

/// Transport-level failures. Domain rejections are not errors; they come
/// back inside [`SignInResponse::error`].
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request never produced a response (DNS, connect, timeout).
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with an unexpected status.
    #[error("unexpected response status {status}")]
    Status { status: u16, body: String },

    /// The response body could not be parsed.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// Session data as handed back by the gateway. Either half may be missing;
/// deciding what that means is the manager's job.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub session: Option<Session>,
    pub user: Option<User>,
}

impl SessionPayload {
    #[must_use]
    pub fn new(session: Session, user: User) -> Self {
        Self { session: Some(session), user: Some(user) }
    }

    /// Both halves, or `None` if either is missing.
    #[must_use]
    pub fn into_complete(self) -> Option<(User, Session)> {
        match (self.user, self.session) {
            (Some(user), Some(session)) => Some((user, session)),
            _ => None,
        }
    }
}

/// Server-provided rejection message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub message: Option<String>,
    pub code: Option<String>,
}

/// Result of a credential exchange that reached the server.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SignInResponse {
    pub data: Option<SessionPayload>,
    pub error: Option<GatewayMessage>,
}

impl SignInResponse {
    #[must_use]
    pub fn accepted(payload: SessionPayload) -> Self {
        Self { data: Some(payload), error: None }
    }

    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self { data: None, error: Some(GatewayMessage { message: Some(message.into()), code: None }) }
    }
}

// =============================================================================
// GATEWAY TRAIT
// =============================================================================

/// Remote authentication service. Enables mocking in tests.
#[async_trait::async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Fetch the current session, `Ok(None)` when there is none.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] on transport or parse failure.
    async fn get_session(&self) -> Result<Option<SessionPayload>, GatewayError>;

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] on transport or parse failure. Bad
    /// credentials are reported through [`SignInResponse::error`].
    async fn sign_in_with_credentials(&self, email: &str, password: &str) -> Result<SignInResponse, GatewayError>;

    /// Terminate the current session on the server. Best effort.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the server could not be told.
    async fn sign_out(&self) -> Result<(), GatewayError>;
}
