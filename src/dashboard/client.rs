use std::time::Duration;

use axum::http::{HeaderValue, Method, StatusCode};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

/// A backend response, kept raw so it can be relayed unchanged.
#[derive(Debug)]
pub struct Upstream {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub set_cookies: Vec<HeaderValue>,
    pub body: Bytes,
}

impl Upstream {
    /// The backend's `error` message, with field errors appended.
    pub fn error_message(&self) -> String {
        let Ok(json) = serde_json::from_slice::<Value>(&self.body) else {
            return format!("Request failed ({})", self.status.as_u16());
        };

        let base = json
            .get("error")
            .or_else(|| json.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("Request failed")
            .to_string();

        let fields: Vec<String> = json
            .get("fields")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|f| {
                        Some(format!(
                            "{} {}",
                            f.get("field")?.as_str()?,
                            f.get("message")?.as_str()?
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default();

        if fields.is_empty() {
            base
        } else {
            format!("{base}: {}", fields.join("; "))
        }
    }
}

/// Failure of a typed backend call made by a dashboard page.
#[derive(Debug)]
pub enum BackendError {
    /// Token missing, expired or rejected.
    Unauthorized,
    NotFound(String),
    /// The backend refused the request; the message is fit for the user.
    Rejected(String),
    Unavailable(String),
}

impl From<AppError> for BackendError {
    fn from(err: AppError) -> Self {
        BackendError::Unavailable(err.to_string())
    }
}

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends one request and returns the raw response. Only transport failures are errors.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Bytes>,
    ) -> Result<Upstream, AppError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url);

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().await.map_err(|e| {
            AppError::BadGateway(format!("{method} {url} failed: {e}"))
        })?;

        let status = response.status();
        let content_type = response.headers().get(reqwest::header::CONTENT_TYPE).cloned();
        let set_cookies = response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .cloned()
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::BadGateway(format!("Reading {url} failed: {e}")))?;

        tracing::debug!(%method, path, status = status.as_u16(), "Backend call");

        Ok(Upstream {
            status,
            content_type,
            set_cookies,
            body,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, BackendError> {
        let upstream = self.send(Method::GET, path, Some(token), None).await?;
        decode(upstream)
    }

    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)
            .map_err(|e| BackendError::Unavailable(format!("Encoding request failed: {e}")))?;
        let upstream = self
            .send(method, path, token, Some(Bytes::from(payload)))
            .await?;
        decode(upstream)
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(), BackendError> {
        let upstream = self.send(Method::DELETE, path, Some(token), None).await?;
        decode::<Value>(upstream).map(|_| ())
    }
}

fn decode<T: DeserializeOwned>(upstream: Upstream) -> Result<T, BackendError> {
    match upstream.status {
        s if s.is_success() => serde_json::from_slice(&upstream.body).map_err(|e| {
            BackendError::Unavailable(format!("Unexpected backend payload: {e}"))
        }),
        StatusCode::UNAUTHORIZED => Err(BackendError::Unauthorized),
        StatusCode::NOT_FOUND => Err(BackendError::NotFound(upstream.error_message())),
        s if s.is_server_error() => Err(BackendError::Unavailable(upstream.error_message())),
        _ => Err(BackendError::Rejected(upstream.error_message())),
    }
}
