//! Session data model shared by the gateway, the manager, and navigation.
//!
//! DESIGN
//! ======
//! `AuthSnapshot` is the only shape consumers ever see. It is replaced as a
//! whole on every mutation, so `user` and `session` can never be observed
//! out of step, and `is_authenticated` is always derived from them.

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// ROLE
// =============================================================================

/// Account role. Fixed by the server at account creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Freelancer,
    Organization,
    Admin,
    Maintainer,
}

impl Role {
    /// Wire name, e.g. `"ORGANIZATION"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Freelancer => "FREELANCER",
            Self::Organization => "ORGANIZATION",
            Self::Admin => "ADMIN",
            Self::Maintainer => "MAINTAINER",
        }
    }

    /// Lowercase label used in headings ("organization panel").
    #[must_use]
    pub fn label(self) -> String {
        self.as_str().to_ascii_lowercase().replace('_', " ")
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "FREELANCER" => Ok(Self::Freelancer),
            "ORGANIZATION" => Ok(Self::Organization),
            "ADMIN" => Ok(Self::Admin),
            "MAINTAINER" => Ok(Self::Maintainer),
            _ => Err(UnknownRole(raw.to_owned())),
        }
    }
}

// =============================================================================
// USER / SESSION
// =============================================================================

/// The authenticated principal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque identifier, stable for the session's lifetime.
    pub id: String,
    pub email: String,
    /// Display name, absent when the server has none (or an empty one).
    pub name: Option<String>,
    pub role: Role,
}

impl User {
    /// Name to greet the user with, falling back to `fallback`.
    #[must_use]
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(fallback)
    }
}

/// Server-issued authentication grant.
///
/// Opaque to this client beyond presence; the known fields are carried so
/// the gateway can re-present the token, everything else rides in `extra`.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// Tokens stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Immutable view of the session state published to subscribers.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub session: Option<Session>,
    /// True only while the startup restoration check runs.
    pub is_loading: bool,
}

impl AuthSnapshot {
    /// State at process start: loading, nobody signed in.
    #[must_use]
    pub fn initial() -> Self {
        Self { user: None, session: None, is_loading: true }
    }

    /// Settled, signed-out state.
    #[must_use]
    pub fn signed_out() -> Self {
        Self { user: None, session: None, is_loading: false }
    }

    /// Settled, signed-in state.
    #[must_use]
    pub fn signed_in(user: User, session: Session) -> Self {
        Self { user: Some(user), session: Some(session), is_loading: false }
    }

    /// True iff both a user and a session are present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.session.is_some()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}
