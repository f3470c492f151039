//! Session state — the single authoritative holder of [`AuthSnapshot`].
//!
//! ARCHITECTURE
//! ============
//! One [`SessionManager`] is built at startup and shared by handle
//! (`Arc<SessionManager>`). Consumers never mutate state; they read
//! snapshots or hold a `watch::Receiver` that is notified after each
//! completed mutation.
//!
//! [`AuthSnapshot`]: crate::types::AuthSnapshot

pub mod manager;

pub use manager::{Operation, SessionManager, SignInError};
