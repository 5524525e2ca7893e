//! HTTP pipeline shared by every API call.
//!
//! Each request gets the bearer token of the current session. Each response
//! goes through the same checks: HTTP failures are mapped to a notice and an
//! [`ApiError`], and a 200 whose envelope carries a non-zero `code` is
//! treated as a failure too unless the caller asked for the raw envelope.
//! A 401 additionally ends the session and sends the user to the login page.
//!
//! Nothing is retried.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use talent_ops_core::route::LOGIN_PATH;
use talent_ops_core::{ApiResponse, Notice};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::ClientConfig;
use crate::notify::{Navigator, Notifier};
use crate::session::SessionStore;

const REQUEST_FAILED: &str = "Request failed";
const UNAUTHORIZED: &str = "Unauthorized, please sign in";
const FORBIDDEN: &str = "You do not have permission to access this resource";
const NOT_FOUND: &str = "The requested resource does not exist";
const SERVER_ERROR: &str = "Server error";
const NETWORK_ERROR: &str = "Network error, please check your connection";

/// API errors. Every variant has already been shown to the user as a notice
/// by the time the caller sees it, except `Transport`, `Json` and `Url`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 200 with a non-zero envelope code.
    #[error("{message}")]
    Application { code: i64, message: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Server error ({0})")]
    Server(StatusCode),

    #[error("HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// No response: connection refused, DNS failure, timeout.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("HTTP client error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A body that is not the expected JSON, in either direction.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// HTTP status behind the error, if there was a response.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            Self::Forbidden => Some(StatusCode::FORBIDDEN),
            Self::NotFound => Some(StatusCode::NOT_FOUND),
            Self::Server(status) | Self::Status { status, .. } => Some(*status),
            Self::Application { .. } => Some(StatusCode::OK),
            Self::Network(_) | Self::Transport(_) | Self::Json(_) | Self::Url(_) => None,
        }
    }
}

/// Request body.
#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    /// File uploads. The transport sets the boundary-aware `Content-Type`.
    Multipart(reqwest::multipart::Form),
}

/// One API call, relative to the configured base URL.
#[derive(Debug)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: RequestBody,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Json` if `body` cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    #[must_use]
    pub fn multipart(mut self, form: reqwest::multipart::Form) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }
}

/// API client.
///
/// Cheap to clone; clones share the connection pool and the session.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<SessionStore>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for `config.api_url`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the HTTP client cannot be built.
    pub fn new(
        config: &ClientConfig,
        session: Arc<SessionStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("talent-ops-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.api_url.clone(),
                session,
                notifier,
                navigator,
            }),
        })
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Send a request and require envelope `code == 0`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Application` for a non-zero code, after showing a
    /// notice with the envelope message. See [`Self::send_envelope`] for the
    /// HTTP-level errors.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<ApiResponse<T>, ApiError> {
        let body = self.execute(request).await?;

        let code = body.get("code").and_then(Value::as_i64).unwrap_or(0);
        if code != 0 {
            let message = payload_message(Some(&body)).unwrap_or(REQUEST_FAILED).to_owned();
            tracing::debug!(code, %message, "API returned failure code");
            self.notify_error(&message);
            return Err(ApiError::Application { code, message });
        }

        Ok(serde_json::from_value(body)?)
    }

    /// Send a request and hand back the envelope whatever its `code`.
    ///
    /// # Errors
    ///
    /// - `ApiError::Unauthorized` on 401, after ending the session and
    ///   navigating to the login page
    /// - `ApiError::Forbidden`, `NotFound`, `Server` on 403, 404, 500
    /// - `ApiError::Status` on any other non-success status
    /// - `ApiError::Network` when no response arrived
    /// - `ApiError::Json` when the body is not an envelope
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<ApiResponse<T>, ApiError> {
        let body = self.execute(request).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// `GET` with the code check.
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    /// `POST` a JSON body with the code check.
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::post(path).json(body)?).await
    }

    /// `PUT` a JSON body with the code check.
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::put(path).json(body)?).await
    }

    /// `DELETE` with the code check.
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(ApiRequest::delete(path)).await
    }

    /// `POST` a multipart form with the code check.
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.send(ApiRequest::post(path).multipart(form)).await
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Run the request and return the JSON body of a success response.
    async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = self.url(&request.path)?;
        let mut builder = self.inner.http.request(request.method, url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = self.inner.session.token() {
            builder = builder.bearer_auth(token.expose_secret());
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart(form) => builder.multipart(form),
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => return Err(ApiError::Transport(e)),
            Err(e) => return Err(self.network_failure(e)),
        };

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.network_failure(e))?;

        if status.is_success() {
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let payload = serde_json::from_slice::<Value>(&bytes).ok();
        Err(self.status_failure(status, payload.as_ref()))
    }

    fn network_failure(&self, error: reqwest::Error) -> ApiError {
        tracing::warn!(error = %error, "No response from API");
        self.notify_error(NETWORK_ERROR);
        ApiError::Network(error)
    }

    fn status_failure(&self, status: StatusCode, payload: Option<&Value>) -> ApiError {
        tracing::warn!(status = status.as_u16(), "API request failed");
        match status {
            StatusCode::UNAUTHORIZED => {
                self.notify_error(UNAUTHORIZED);
                self.inner.session.expire();
                self.inner.navigator.navigate(LOGIN_PATH);
                ApiError::Unauthorized
            }
            StatusCode::FORBIDDEN => {
                self.notify_error(FORBIDDEN);
                ApiError::Forbidden
            }
            StatusCode::NOT_FOUND => {
                self.notify_error(NOT_FOUND);
                ApiError::NotFound
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                self.notify_error(SERVER_ERROR);
                ApiError::Server(status)
            }
            _ => {
                let message = payload_message(payload).unwrap_or(REQUEST_FAILED).to_owned();
                self.notify_error(&message);
                ApiError::Status { status, message }
            }
        }
    }

    fn notify_error(&self, message: &str) {
        self.inner.notifier.notify(Notice::error(message));
    }
}

/// `message` of an envelope, or the `error` field some endpoints use instead.
fn payload_message(payload: Option<&Value>) -> Option<&str> {
    let payload = payload?;
    ["message", "error"]
        .into_iter()
        .filter_map(|field| payload.get(field).and_then(Value::as_str))
        .find(|message| !message.is_empty())
}
