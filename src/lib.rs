//! Atom Connect session client.
//!
//! ARCHITECTURE
//! ============
//! `gateway` talks to the identity server, `session` owns the auth state and
//! is the only thing that mutates it, `navigation` derives which screens are
//! reachable from a snapshot. [`start`] wires the three together the way the
//! app does at launch.

pub mod config;
pub mod gateway;
pub mod navigation;
pub mod session;
pub mod store;
pub mod types;

use std::sync::Arc;

pub use config::ClientConfig;
pub use gateway::{GatewayError, HttpGateway, IdentityGateway};
pub use session::{SessionManager, SignInError};
pub use types::{AuthSnapshot, Role, Session, User};

/// Build the HTTP gateway and session manager, then restore any saved
/// session. The returned handle is the one shared by every consumer.
///
/// # Errors
///
/// Returns [`GatewayError::HttpClientBuild`] if the HTTP client cannot be
/// built. Restore failures are not errors; they leave the user signed out.
pub async fn start(config: ClientConfig) -> Result<Arc<SessionManager>, GatewayError> {
    let gateway = HttpGateway::from_config(config).await?;
    let manager = Arc::new(SessionManager::new(Arc::new(gateway)));
    manager.restore().await;
    Ok(manager)
}
