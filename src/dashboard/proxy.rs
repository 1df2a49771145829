use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use bytes::Bytes;
use serde_json::json;

use super::client::Upstream;
use super::DashboardState;
use crate::error::AppError;
use crate::routes::auth::ACCESS_COOKIE;

/// Token from the session cookie, or the caller's own bearer header.
fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(ACCESS_COOKIE).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_string());
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Backend path for a dashboard `/api/...` URI, query string included.
fn backend_path(uri: &Uri) -> String {
    let path = uri.path().strip_prefix("/api").unwrap_or(uri.path());
    match uri.query() {
        Some(q) => format!("{path}?{q}"),
        None => path.to_string(),
    }
}

/// Replaces a few backend errors with wording meant for clinic staff.
pub fn friendly_rewrite(method: &Method, path: &str, status: StatusCode) -> Option<&'static str> {
    if *method == Method::DELETE && path.starts_with("/pasiens/") && status == StatusCode::CONFLICT {
        return Some("Patient cannot be deleted while reservations exist");
    }
    None
}

fn relay(upstream: Upstream, rewrite: Option<&'static str>) -> Response {
    if let Some(message) = rewrite {
        return (upstream.status, axum::Json(json!({ "error": message }))).into_response();
    }

    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = upstream.status;
    if let Some(content_type) = upstream.content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    for cookie in upstream.set_cookies {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

fn body_of(method: &Method, body: Bytes) -> Option<Bytes> {
    let has_body = *method == Method::POST || *method == Method::PUT;
    (has_body && !body.is_empty()).then_some(body)
}

async fn forward(
    state: &DashboardState,
    method: Method,
    uri: &Uri,
    jar: &CookieJar,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let Some(token) = session_token(jar, headers) else {
        return Ok((StatusCode::UNAUTHORIZED, axum::Json(json!({ "error": "Unauthorized" })))
            .into_response());
    };

    let path = backend_path(uri);
    let payload = body_of(&method, body);
    let upstream = state
        .backend
        .send(method.clone(), &path, Some(&token), payload)
        .await?;

    let rewrite = friendly_rewrite(&method, &path, upstream.status);
    Ok(relay(upstream, rewrite))
}

/// `/api/pasiens`, `/api/reservasi`.
pub async fn collection(
    State(state): State<DashboardState>,
    method: Method,
    uri: Uri,
    jar: CookieJar,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    forward(&state, method, &uri, &jar, &headers, body).await
}

/// `/api/pasiens/{id}`, `/api/reservasi/{id}`.
pub async fn item(
    State(state): State<DashboardState>,
    Path(_id): Path<i64>,
    method: Method,
    uri: Uri,
    jar: CookieJar,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    forward(&state, method, &uri, &jar, &headers, body).await
}

/// Relays the login call, including the backend's `Set-Cookie`.
pub async fn login(State(state): State<DashboardState>, body: Bytes) -> Result<Response, AppError> {
    let upstream = state
        .backend
        .send(Method::POST, "/auth/login", None, Some(body))
        .await?;
    Ok(relay(upstream, None))
}

pub async fn logout(State(state): State<DashboardState>) -> Result<Response, AppError> {
    let upstream = state
        .backend
        .send(Method::POST, "/auth/logout", None, None)
        .await?;
    Ok(relay(upstream, None))
}
