use std::net::SocketAddr;

use axum::Extension;
use axum::Router;
use axum::body::Body;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::COOKIE;
use axum::http::header::RETRY_AFTER;
use axum::http::header::SET_COOKIE;
use http_body_util::BodyExt;
use serde_json::Map;
use serde_json::Value;
use tower::Service;

use crate::database::DatabaseConfig;
use crate::setup_app;

/// The PIN every test app is configured with
pub const TEST_PIN: &str = "271828";

/// Header carrying the PIN credential
const AUTH_PIN_HEADER: &str = "X-Auth-Pin";

/// Test helper version of Note struct
#[derive(Debug, PartialEq, Eq)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub pinned: u64,
    pub hidden: u64,
    pub created_at: String,
    pub updated_at: String,
}

/// Test helper version of a batch delete result
#[derive(Debug, PartialEq, Eq)]
pub struct BatchDelete {
    pub deleted: u64,
    pub ids: Vec<i64>,
}

/// Error response
#[derive(Debug, PartialEq, Eq)]
pub struct Error {
    pub error: String,
    pub description: Option<String>,
}

/// Setup the Pinboard app
///
/// Inject some environment variables to match our tests; the fixed peer
/// address gives the rate limiter an IP address to key on
pub async fn setup_test_app(pool: sqlx::SqlitePool) -> Router {
    #[allow(unsafe_code)]
    unsafe {
        std::env::set_var("HIDDEN_NOTES_PIN", TEST_PIN);
    }

    let app = setup_app(DatabaseConfig::ExistingConnection(pool))
        .await
        .unwrap();

    app.layer(Extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 3001)))))
}

pub async fn root(app: &mut Router, path: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/{path}"))
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8_lossy(&body[..]).to_string();

    (status_code, body)
}

pub async fn maybe_login(
    app: &mut Router,
    pin: &str,
) -> (StatusCode, Option<String>, Option<String>) {
    let mut payload = Map::new();
    payload.insert("pin".to_string(), Value::String(pin.to_string()));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth")
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .map(|header| header.to_str().unwrap().to_string());

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        set_cookie,
        if status_code.is_success() {
            None
        } else {
            Some(get_error_message(&body))
        },
    )
}

/// Login and take the credential cookie along
pub async fn login(app: &mut Router) -> String {
    let (status_code, cookie, _) = maybe_login(app, TEST_PIN).await;

    assert_eq!(StatusCode::OK, status_code);

    cookie.unwrap()
}

pub async fn login_retry_after(app: &mut Router, pin: &str) -> (StatusCode, Option<u64>) {
    let mut payload = Map::new();
    payload.insert("pin".to_string(), Value::String(pin.to_string()));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth")
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.parse::<u64>().ok());

    (status_code, retry_after)
}

pub async fn auth_status(app: &mut Router, credential: Option<&str>) -> (StatusCode, bool) {
    let mut builder = Request::builder().method(Method::GET).uri("/api/auth/status");

    if let Some(credential) = credential {
        builder = builder.header(AUTH_PIN_HEADER, credential);
    }

    let request = builder.body(Body::empty()).unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (status_code, get_logged_in(&body))
}

pub async fn auth_status_with_cookie(app: &mut Router, cookie: &str) -> (StatusCode, bool) {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/auth/status")
        .header(COOKIE, cookie_pair(cookie))
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (status_code, get_logged_in(&body))
}

pub async fn logout(app: &mut Router) -> (StatusCode, Option<String>, bool) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/logout")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .map(|header| header.to_str().unwrap().to_string());

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (status_code, set_cookie, get_logged_in(&body))
}

pub async fn list_notes(app: &mut Router) -> (StatusCode, Option<Vec<Note>>) {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/notes")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_notes(&body))
        } else {
            None
        },
    )
}

pub async fn list_hidden_notes(
    app: &mut Router,
    credential: Option<&str>,
) -> (StatusCode, Option<Vec<Note>>) {
    let mut builder = Request::builder().method(Method::GET).uri("/api/notes/hidden");

    if let Some(credential) = credential {
        builder = builder.header(AUTH_PIN_HEADER, credential);
    }

    let request = builder.body(Body::empty()).unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_notes(&body))
        } else {
            None
        },
    )
}

pub async fn list_hidden_notes_with_cookie(
    app: &mut Router,
    cookie: &str,
) -> (StatusCode, Option<Vec<Note>>) {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/notes/hidden")
        .header(COOKIE, cookie_pair(cookie))
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_notes(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_create_note_with_flags(
    app: &mut Router,
    title: Option<&str>,
    content: Option<&str>,
    pinned: Option<bool>,
    hidden: Option<bool>,
) -> (StatusCode, Option<Note>, Option<String>) {
    let mut payload = Map::new();

    if let Some(title) = title {
        payload.insert("title".to_string(), Value::String(title.to_string()));
    }

    if let Some(content) = content {
        payload.insert("content".to_string(), Value::String(content.to_string()));
    }

    if let Some(pinned) = pinned {
        payload.insert("pinned".to_string(), Value::Bool(pinned));
    }

    if let Some(hidden) = hidden {
        payload.insert("hidden".to_string(), Value::Bool(hidden));
    }

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/notes")
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::CREATED {
            Some(get_note(&body))
        } else {
            None
        },
        if status_code.is_success() {
            None
        } else {
            Some(get_error_message(&body))
        },
    )
}

pub async fn maybe_create_note(
    app: &mut Router,
    title: &str,
    content: &str,
) -> (StatusCode, Option<Note>, Option<String>) {
    maybe_create_note_with_flags(app, Some(title), Some(content), None, None).await
}

pub async fn maybe_create_note_with_raw_body(
    app: &mut Router,
    body: &'static str,
    include_content_type: bool,
) -> (StatusCode, Option<Note>, Option<Error>) {
    let mut builder = Request::builder().method(Method::POST).uri("/api/notes");

    if include_content_type {
        builder = builder.header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
    }

    let request = builder.body(Body::from(body.as_bytes())).unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::CREATED {
            Some(get_note(&body))
        } else {
            None
        },
        if status_code == StatusCode::BAD_REQUEST {
            Some(get_error(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_update_note_with_flags(
    app: &mut Router,
    credential: Option<&str>,
    note_id: i64,
    title: Option<&str>,
    content: Option<&str>,
    pinned: Option<bool>,
    hidden: Option<bool>,
) -> (StatusCode, Option<Note>, Option<String>) {
    let mut payload = Map::new();

    if let Some(title) = title {
        payload.insert("title".to_string(), Value::String(title.to_string()));
    }

    if let Some(content) = content {
        payload.insert("content".to_string(), Value::String(content.to_string()));
    }

    if let Some(pinned) = pinned {
        payload.insert("pinned".to_string(), Value::Bool(pinned));
    }

    if let Some(hidden) = hidden {
        payload.insert("hidden".to_string(), Value::Bool(hidden));
    }

    let mut builder = Request::builder()
        .method(Method::PUT)
        .uri(format!("/api/notes/{note_id}"))
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());

    if let Some(credential) = credential {
        builder = builder.header(AUTH_PIN_HEADER, credential);
    }

    let request = builder
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_note(&body))
        } else {
            None
        },
        if status_code.is_success() {
            None
        } else {
            Some(get_error_message(&body))
        },
    )
}

pub async fn maybe_update_note(
    app: &mut Router,
    credential: Option<&str>,
    note_id: i64,
    title: &str,
    content: &str,
) -> (StatusCode, Option<Note>, Option<String>) {
    maybe_update_note_with_flags(
        app,
        credential,
        note_id,
        Some(title),
        Some(content),
        None,
        None,
    )
    .await
}

pub async fn maybe_update_note_with_str_id(
    app: &mut Router,
    note_id: &str,
    title: &str,
) -> (StatusCode, Option<String>) {
    let mut payload = Map::new();
    payload.insert("title".to_string(), Value::String(title.to_string()));

    let request = Request::builder()
        .method(Method::PUT)
        .uri(format!("/api/notes/{note_id}"))
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code.is_success() {
            None
        } else {
            Some(get_error_message(&body))
        },
    )
}

pub async fn maybe_unhide_note(
    app: &mut Router,
    credential: Option<&str>,
    note_id: i64,
) -> (StatusCode, Option<Note>, Option<String>) {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/notes/{note_id}/unhide"));

    if let Some(credential) = credential {
        builder = builder.header(AUTH_PIN_HEADER, credential);
    }

    let request = builder.body(Body::empty()).unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_note(&body))
        } else {
            None
        },
        if status_code.is_success() {
            None
        } else {
            Some(get_error_message(&body))
        },
    )
}

pub async fn maybe_delete_note(
    app: &mut Router,
    credential: Option<&str>,
    note_id: i64,
) -> (StatusCode, Option<String>) {
    let mut builder = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/notes/{note_id}"));

    if let Some(credential) = credential {
        builder = builder.header(AUTH_PIN_HEADER, credential);
    }

    let request = builder.body(Body::empty()).unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code.is_success() {
            None
        } else {
            Some(get_error_message(&body))
        },
    )
}

pub async fn maybe_delete_batch(
    app: &mut Router,
    credential: Option<&str>,
    ids: &[i64],
) -> (StatusCode, Option<BatchDelete>, Option<Error>) {
    let mut payload = Map::new();
    payload.insert(
        "ids".to_string(),
        Value::Array(ids.iter().map(|id| Value::from(*id)).collect()),
    );

    maybe_delete_batch_with_payload(app, credential, &payload).await
}

pub async fn maybe_delete_batch_without_ids(
    app: &mut Router,
) -> (StatusCode, Option<BatchDelete>, Option<Error>) {
    maybe_delete_batch_with_payload(app, None, &Map::new()).await
}

async fn maybe_delete_batch_with_payload(
    app: &mut Router,
    credential: Option<&str>,
    payload: &Map<String, Value>,
) -> (StatusCode, Option<BatchDelete>, Option<Error>) {
    let mut builder = Request::builder()
        .method(Method::DELETE)
        .uri("/api/notes/batch")
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());

    if let Some(credential) = credential {
        builder = builder.header(AUTH_PIN_HEADER, credential);
    }

    let request = builder
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_batch_delete(&body))
        } else {
            None
        },
        if status_code.is_success() {
            None
        } else {
            Some(get_error(&body))
        },
    )
}

/// Strip a `Set-Cookie` header down to the part a client would send back
fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap_or_default().to_string()
}

fn value_to_note(note: &Map<String, Value>) -> Note {
    Note {
        id: note["id"].as_i64().unwrap(),
        title: note["title"].as_str().map(ToString::to_string).unwrap(),
        content: note
            .get("content")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        pinned: note["pinned"].as_u64().unwrap(),
        hidden: note["hidden"].as_u64().unwrap(),
        created_at: note["createdAt"].as_str().map(ToString::to_string).unwrap(),
        updated_at: note["updatedAt"].as_str().map(ToString::to_string).unwrap(),
    }
}

fn get_note(body: &Bytes) -> Note {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_object()
        .map(value_to_note)
        .unwrap()
}

fn get_notes(body: &Bytes) -> Vec<Note> {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_object().unwrap())
        .map(value_to_note)
        .collect()
}

fn get_batch_delete(body: &Bytes) -> BatchDelete {
    let data = serde_json::from_slice::<Value>(&body[..]).unwrap();
    let data = data["data"].as_object().unwrap();

    BatchDelete {
        deleted: data["deleted"].as_u64().unwrap(),
        ids: data["ids"]
            .as_array()
            .unwrap()
            .iter()
            .map(|id| id.as_i64().unwrap())
            .collect(),
    }
}

fn value_to_error(error: &Map<String, Value>) -> Error {
    Error {
        error: error["error"].as_str().map(ToString::to_string).unwrap(),
        description: error
            .get("description")
            .and_then(Value::as_str)
            .map(ToString::to_string),
    }
}

fn get_error(body: &Bytes) -> Error {
    serde_json::from_slice::<Value>(&body[..])
        .unwrap()
        .as_object()
        .map(value_to_error)
        .unwrap()
}

fn get_error_message(body: &Bytes) -> String {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["error"]
        .as_str()
        .map(ToString::to_string)
        .unwrap()
}

fn get_logged_in(body: &Bytes) -> bool {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]["loggedIn"]
        .as_bool()
        .unwrap()
}
