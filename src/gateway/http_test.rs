use super::*;
use axum::Json;
use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use reqwest::header::HeaderValue;

fn user_json(role: &str) -> serde_json::Value {
    serde_json::json!({ "id": "u1", "email": "a@b.com", "name": "Ada", "role": role })
}

// =============================================================================
// parse_session_body
// =============================================================================

#[test]
fn session_body_null_is_none() {
    assert!(parse_session_body("null").unwrap().is_none());
    assert!(parse_session_body("").unwrap().is_none());
}

#[test]
fn session_body_complete() {
    let json = serde_json::json!({
        "session": { "id": "s1", "token": "tok", "expiresAt": "2030-01-01T00:00:00Z" },
        "user": user_json("ORGANIZATION"),
    })
    .to_string();
    let payload = parse_session_body(&json).unwrap().unwrap();
    let (user, session) = payload.into_complete().unwrap();
    assert_eq!(user.role, Role::Organization);
    assert_eq!(user.name.as_deref(), Some("Ada"));
    assert_eq!(session.token.as_deref(), Some("tok"));
}

#[test]
fn session_body_missing_user_keeps_session() {
    let json = serde_json::json!({ "session": { "id": "s1" } }).to_string();
    let payload = parse_session_body(&json).unwrap().unwrap();
    assert!(payload.session.is_some());
    assert!(payload.user.is_none());
}

#[test]
fn session_body_unknown_role_drops_user() {
    let json = serde_json::json!({ "session": { "id": "s1" }, "user": user_json("SUPERUSER") }).to_string();
    let payload = parse_session_body(&json).unwrap().unwrap();
    assert!(payload.user.is_none());
}

#[test]
fn session_body_invalid_json() {
    let err = parse_session_body("<html>").unwrap_err();
    assert!(matches!(err, GatewayError::Parse(_)));
}

// =============================================================================
// parse_sign_in_body
// =============================================================================

#[test]
fn sign_in_body_with_top_level_token_synthesizes_session() {
    let json = serde_json::json!({ "redirect": false, "token": "tok_1", "user": user_json("FREELANCER") }).to_string();
    let (payload, token) = parse_sign_in_body(&json, None).unwrap();
    assert_eq!(token.as_deref(), Some("tok_1"));
    assert_eq!(payload.session.as_ref().and_then(|s| s.token.as_deref()), Some("tok_1"));
    assert_eq!(payload.user.as_ref().map(|u| u.role), Some(Role::Freelancer));
}

#[test]
fn sign_in_body_prefers_session_token_over_cookie() {
    let json = serde_json::json!({ "session": { "token": "from_session" }, "user": user_json("ADMIN") }).to_string();
    let (_, token) = parse_sign_in_body(&json, Some("from_cookie".to_owned())).unwrap();
    assert_eq!(token.as_deref(), Some("from_session"));
}

#[test]
fn sign_in_body_falls_back_to_cookie_token() {
    let json = serde_json::json!({ "session": { "id": "s1" }, "user": user_json("ADMIN") }).to_string();
    let (_, token) = parse_sign_in_body(&json, Some("from_cookie".to_owned())).unwrap();
    assert_eq!(token.as_deref(), Some("from_cookie"));
}

#[test]
fn sign_in_body_without_user() {
    let json = serde_json::json!({ "session": { "id": "s1" } }).to_string();
    let (payload, _) = parse_sign_in_body(&json, None).unwrap();
    assert!(payload.session.is_some());
    assert!(payload.user.is_none());
}

#[test]
fn empty_user_name_becomes_none() {
    let user = parse_user(serde_json::json!({ "id": "u1", "email": "a@b.com", "name": "", "role": "admin" })).unwrap();
    assert!(user.name.is_none());
    assert_eq!(user.role, Role::Admin);
}

// =============================================================================
// parse_error_body / cookies
// =============================================================================

#[test]
fn error_body_json_message() {
    let msg = parse_error_body(r#"{"message":"Invalid password","code":"INVALID_EMAIL_OR_PASSWORD"}"#);
    assert_eq!(msg.message.as_deref(), Some("Invalid password"));
    assert_eq!(msg.code.as_deref(), Some("INVALID_EMAIL_OR_PASSWORD"));
}

#[test]
fn error_body_plain_text_and_empty() {
    assert_eq!(parse_error_body("Too many attempts").message.as_deref(), Some("Too many attempts"));
    assert_eq!(parse_error_body("  "), GatewayMessage::default());
}

#[test]
fn cookie_value_matches_session_cookie_only() {
    assert_eq!(
        cookie_value("better-auth.session_token=abc.sig; Path=/; HttpOnly").as_deref(),
        Some("abc.sig")
    );
    assert_eq!(cookie_value("__Secure-better-auth.session_token=xyz; Secure").as_deref(), Some("xyz"));
    assert!(cookie_value("other=1; Path=/").is_none());
    assert!(cookie_value("better-auth.session_token=; Max-Age=0").is_none());
}

#[test]
fn session_cookie_token_scans_all_headers() {
    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, HeaderValue::from_static("theme=dark"));
    headers.append(SET_COOKIE, HeaderValue::from_static("better-auth.session_token=tok_c; Path=/"));
    assert_eq!(session_cookie_token(&headers).as_deref(), Some("tok_c"));
}

// =============================================================================
// HttpGateway against an in-process server
// =============================================================================

async fn fake_get_session(headers: AxumHeaders) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer tok_1");
    if !authorized {
        return AxumStatus::UNAUTHORIZED.into_response();
    }
    Json(serde_json::json!({
        "session": { "id": "s1", "token": "tok_1" },
        "user": { "id": "u1", "email": "a@b.com", "name": "Ada", "role": "ORGANIZATION" },
    }))
    .into_response()
}

async fn fake_sign_in(Json(body): Json<serde_json::Value>) -> Response {
    if body["password"] == "pw" {
        Json(serde_json::json!({
            "redirect": false,
            "token": "tok_1",
            "user": { "id": "u1", "email": "a@b.com", "name": "Ada", "role": "ORGANIZATION" },
        }))
        .into_response()
    } else {
        (
            AxumStatus::UNAUTHORIZED,
            Json(serde_json::json!({ "message": "Invalid password", "code": "INVALID_EMAIL_OR_PASSWORD" })),
        )
            .into_response()
    }
}

async fn fake_sign_out() -> Response {
    Json(serde_json::json!({ "success": true })).into_response()
}

async fn spawn_fake_server() -> String {
    let app = axum::Router::new()
        .route(SESSION_PATH, get(fake_get_session))
        .route(SIGN_IN_PATH, post(fake_sign_in))
        .route(SIGN_OUT_PATH, post(fake_sign_out));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn round_trip_against_fake_server() {
    let base = spawn_fake_server().await;
    let gateway = HttpGateway::new(ClientConfig::new(&base).unwrap()).unwrap();

    // No token yet: nothing to look up.
    assert!(gateway.get_session().await.unwrap().is_none());

    let rejected = gateway.sign_in_with_credentials("a@b.com", "nope").await.unwrap();
    assert!(rejected.data.is_none());
    assert_eq!(rejected.error.unwrap().message.as_deref(), Some("Invalid password"));
    assert!(!gateway.has_token());

    let accepted = gateway.sign_in_with_credentials("a@b.com", "pw").await.unwrap();
    assert!(accepted.error.is_none());
    assert!(gateway.has_token());

    let restored = gateway.get_session().await.unwrap().unwrap();
    let (user, _) = restored.into_complete().unwrap();
    assert_eq!(user.role, Role::Organization);

    gateway.sign_out().await.unwrap();
    assert!(!gateway.has_token());
}

#[tokio::test]
async fn token_persists_across_gateways() {
    let base = spawn_fake_server().await;
    let mut config = ClientConfig::new(&base).unwrap();
    let path = std::env::temp_dir().join(format!("atom-connect-gw-{}", Uuid::new_v4())).join("session");
    config.session_file = Some(path.clone());

    let first = HttpGateway::from_config(config.clone()).await.unwrap();
    first.sign_in_with_credentials("a@b.com", "pw").await.unwrap();

    let second = HttpGateway::from_config(config.clone()).await.unwrap();
    assert!(second.has_token());
    assert!(second.get_session().await.unwrap().is_some());

    second.sign_out().await.unwrap();
    let third = HttpGateway::from_config(config).await.unwrap();
    assert!(!third.has_token());
    assert!(!path.exists());
}

#[tokio::test]
async fn stale_token_is_forgotten_on_unauthorized() {
    let base = spawn_fake_server().await;
    let gateway = HttpGateway::new(ClientConfig::new(&base).unwrap()).unwrap();
    gateway.set_token(Some("expired".to_owned()));

    assert!(gateway.get_session().await.unwrap().is_none());
    assert!(!gateway.has_token());
}

#[tokio::test]
async fn unreachable_server_is_request_error() {
    // Port 9 (discard) on localhost is not expected to serve HTTP.
    let gateway = HttpGateway::new(ClientConfig::new("http://127.0.0.1:9").unwrap()).unwrap();
    let err = gateway.sign_in_with_credentials("a@b.com", "pw").await.unwrap_err();
    assert!(matches!(err, GatewayError::Request(_)));

    gateway.set_token(Some("tok".to_owned()));
    assert!(gateway.sign_out().await.is_err());
    assert!(!gateway.has_token());
}

async fn fake_sign_in_without_token() -> Response {
    Json(serde_json::json!({
        "session": { "id": "s2" },
        "user": { "id": "u2", "email": "b@c.com", "name": "Bea", "role": "FREELANCER" },
    }))
    .into_response()
}

#[tokio::test]
async fn tokenless_sign_in_forgets_previous_token() {
    let app = axum::Router::new()
        .route(SESSION_PATH, get(fake_get_session))
        .route(SIGN_IN_PATH, post(fake_sign_in_without_token));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut config = ClientConfig::new(&format!("http://{addr}")).unwrap();
    let path = std::env::temp_dir().join(format!("atom-connect-gw-{}", Uuid::new_v4())).join("session");
    config.session_file = Some(path.clone());
    TokenFile::new(&path).save("tok_of_user_a").await.unwrap();

    let gateway = HttpGateway::from_config(config.clone()).await.unwrap();
    assert!(gateway.has_token());

    let response = gateway.sign_in_with_credentials("b@c.com", "pw").await.unwrap();
    let (user, _) = response.data.and_then(SessionPayload::into_complete).unwrap();
    assert_eq!(user.id, "u2");

    assert!(!gateway.has_token());
    assert!(!path.exists());
    let reloaded = HttpGateway::from_config(config).await.unwrap();
    assert!(!reloaded.has_token());
}
