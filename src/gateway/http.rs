//! HTTP identity gateway for a better-auth style server.
//!
//! Thin `reqwest` wrapper over three endpoints. Body parsing lives in pure
//! functions (`parse_session_body`, `parse_sign_in_body`, ...) for
//! testability.
//!
//! SESSION TOKEN
//! =============
//! The token is held in memory and re-sent both as a bearer token and as the
//! session cookie. When a [`TokenFile`] is attached it is persisted on
//! sign-in and removed on sign-out or when the server no longer knows it.

use std::sync::{Mutex, PoisonError};

use reqwest::StatusCode;
use reqwest::header::{COOKIE, HeaderMap, SET_COOKIE};
use uuid::Uuid;

use super::{GatewayError, GatewayMessage, IdentityGateway, SessionPayload, SignInResponse};
use crate::config::ClientConfig;
use crate::store::TokenFile;
use crate::types::{Role, Session, User};

pub const SESSION_PATH: &str = "/api/auth/get-session";
pub const SIGN_IN_PATH: &str = "/api/auth/sign-in/email";
pub const SIGN_OUT_PATH: &str = "/api/auth/sign-out";

const SESSION_COOKIE: &str = "better-auth.session_token";
const SECURE_SESSION_COOKIE: &str = "__Secure-better-auth.session_token";
const REQUEST_ID_HEADER: &str = "x-request-id";

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpGateway {
    http: reqwest::Client,
    config: ClientConfig,
    token: Mutex<Option<String>>,
    store: Option<TokenFile>,
}

impl HttpGateway {
    /// Build a gateway with an empty in-memory token.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::HttpClientBuild`] if the client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeouts.request())
            .connect_timeout(config.timeouts.connect())
            .build()
            .map_err(|e| GatewayError::HttpClientBuild(e.to_string()))?;
        let store = config.session_file.clone().map(TokenFile::new);
        Ok(Self { http, config, token: Mutex::new(None), store })
    }

    /// Build a gateway and pick up any token persisted by a previous run.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::HttpClientBuild`] if the client cannot be built.
    /// An unreadable token file is logged and treated as empty.
    pub async fn from_config(config: ClientConfig) -> Result<Self, GatewayError> {
        let gateway = Self::new(config)?;
        if let Some(store) = &gateway.store {
            match store.load().await {
                Ok(token) => gateway.set_token(token),
                Err(e) => tracing::warn!(error = %e, "stored session token unreadable"),
            }
        }
        Ok(gateway)
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    fn token(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }

    async fn remember_token(&self, token: String) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&token).await {
                tracing::warn!(error = %e, "failed to persist session token");
            }
        }
        self.set_token(Some(token));
    }

    async fn forget_token(&self) {
        self.set_token(None);
        if let Some(store) = &self.store {
            if let Err(e) = store.clear().await {
                tracing::warn!(error = %e, "failed to clear persisted session token");
            }
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> (reqwest::RequestBuilder, Uuid) {
        let request_id = Uuid::new_v4();
        let mut builder = self
            .http
            .request(method, self.config.endpoint(path))
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(token) = self.token() {
            builder = builder
                .bearer_auth(&token)
                .header(COOKIE, format!("{SESSION_COOKIE}={token}"));
        }
        (builder, request_id)
    }
}

#[async_trait::async_trait]
impl IdentityGateway for HttpGateway {
    async fn get_session(&self) -> Result<Option<SessionPayload>, GatewayError> {
        if !self.has_token() {
            tracing::debug!("no session token; skipping session lookup");
            return Ok(None);
        }

        let (builder, request_id) = self.request(reqwest::Method::GET, SESSION_PATH);
        tracing::debug!(%request_id, path = SESSION_PATH, "fetching session");
        let response = builder.send().await.map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            tracing::debug!(%request_id, %status, "session token no longer valid");
            self.forget_token().await;
            return Ok(None);
        }

        let text = response.text().await.map_err(|e| GatewayError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(GatewayError::Status { status: status.as_u16(), body: text });
        }

        let payload = parse_session_body(&text)?;
        if payload.is_none() {
            self.forget_token().await;
        }
        Ok(payload)
    }

    async fn sign_in_with_credentials(&self, email: &str, password: &str) -> Result<SignInResponse, GatewayError> {
        let (builder, request_id) = self.request(reqwest::Method::POST, SIGN_IN_PATH);
        tracing::debug!(%request_id, path = SIGN_IN_PATH, "signing in");
        let response = builder
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = response.status();
        let cookie_token = session_cookie_token(response.headers());
        let text = response.text().await.map_err(|e| GatewayError::Request(e.to_string()))?;

        if status.is_client_error() {
            tracing::debug!(%request_id, %status, "credentials rejected");
            return Ok(SignInResponse { data: None, error: Some(parse_error_body(&text)) });
        }
        if !status.is_success() {
            return Err(GatewayError::Status { status: status.as_u16(), body: text });
        }

        let (payload, token) = parse_sign_in_body(&text, cookie_token)?;
        let complete = payload.session.is_some() && payload.user.is_some();
        match (complete, token) {
            (true, Some(token)) => self.remember_token(token).await,
            // A new account without a token must not keep presenting the old one.
            (true, None) => {
                tracing::warn!(%request_id, "sign-in response carried no session token");
                self.forget_token().await;
            }
            (false, _) => {}
        }
        Ok(SignInResponse::accepted(payload))
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        let (builder, request_id) = self.request(reqwest::Method::POST, SIGN_OUT_PATH);
        tracing::debug!(%request_id, path = SIGN_OUT_PATH, "signing out");
        let result = builder.json(&serde_json::json!({})).send().await;

        // The local token goes regardless of what the server says.
        self.forget_token().await;

        let response = result.map_err(|e| GatewayError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status: status.as_u16(), body });
        }
        Ok(())
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Deserialize)]
struct WireUser {
    id: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

#[derive(serde::Deserialize)]
struct WireSessionBody {
    #[serde(default)]
    session: Option<serde_json::Value>,
    #[serde(default)]
    user: Option<serde_json::Value>,
}

#[derive(serde::Deserialize)]
struct WireSignInBody {
    #[serde(default)]
    session: Option<serde_json::Value>,
    #[serde(default)]
    user: Option<serde_json::Value>,
    #[serde(default)]
    token: Option<String>,
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse a `get-session` body. `null` or an empty body means no session.
fn parse_session_body(text: &str) -> Result<Option<SessionPayload>, GatewayError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let body: Option<WireSessionBody> =
        serde_json::from_str(text).map_err(|e| GatewayError::Parse(e.to_string()))?;
    let Some(body) = body else {
        return Ok(None);
    };

    let payload = SessionPayload {
        session: body.session.and_then(parse_session),
        user: body.user.and_then(parse_user),
    };
    if payload.session.is_none() && payload.user.is_none() {
        return Ok(None);
    }
    Ok(Some(payload))
}

/// Parse a successful sign-in body, returning the payload and the token to
/// remember. A bare top-level `token` stands in for a missing session object.
fn parse_sign_in_body(
    text: &str,
    cookie_token: Option<String>,
) -> Result<(SessionPayload, Option<String>), GatewayError> {
    let body: WireSignInBody = serde_json::from_str(text).map_err(|e| GatewayError::Parse(e.to_string()))?;

    let mut session = body.session.and_then(parse_session);
    let token = body
        .token
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| session.as_ref().and_then(|s| s.token.clone()))
        .or(cookie_token);

    if session.is_none() {
        session = body
            .token
            .filter(|t| !t.is_empty())
            .map(|t| Session { token: Some(t), ..Session::default() });
    }

    let payload = SessionPayload { session, user: body.user.and_then(parse_user) };
    Ok((payload, token))
}

/// Parse a rejection body. Non-JSON bodies become the message verbatim.
fn parse_error_body(text: &str) -> GatewayMessage {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return GatewayMessage::default();
    }
    serde_json::from_str::<GatewayMessage>(trimmed)
        .unwrap_or_else(|_| GatewayMessage { message: Some(trimmed.to_owned()), code: None })
}

fn parse_session(value: serde_json::Value) -> Option<Session> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Convert a wire user. Users without a recognised role are dropped, which
/// the manager treats as an incomplete payload.
fn parse_user(value: serde_json::Value) -> Option<User> {
    let wire: WireUser = match serde_json::from_value(value) {
        Ok(wire) => wire,
        Err(e) => {
            tracing::warn!(error = %e, "user payload malformed");
            return None;
        }
    };
    let role = match wire.role.as_deref().map(str::parse::<Role>) {
        Some(Ok(role)) => role,
        Some(Err(e)) => {
            tracing::warn!(error = %e, user_id = %wire.id, "user role not recognised");
            return None;
        }
        None => {
            tracing::warn!(user_id = %wire.id, "user payload has no role");
            return None;
        }
    };
    Some(User { id: wire.id, email: wire.email, name: wire.name.filter(|n| !n.is_empty()), role })
}

/// Pull the session token out of `Set-Cookie` headers, if present.
fn session_cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(cookie_value)
}

fn cookie_value(set_cookie: &str) -> Option<String> {
    let pair = set_cookie.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    if name != SESSION_COOKIE && name != SECURE_SESSION_COOKIE {
        return None;
    }
    (!value.is_empty()).then(|| value.to_owned())
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
