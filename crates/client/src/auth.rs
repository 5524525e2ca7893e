//! Account endpoints and the session transitions they drive.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use talent_ops_core::{ApiResponse, ProfileUpdate, User, UserPage, UserQuery};
use thiserror::Error;
use tracing::instrument;

use crate::http::{ApiClient, ApiError, ApiRequest};
use crate::session::SessionStore;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Failed to persist session: {0}")]
    Storage(#[from] StorageError),
}

/// Credentials for `POST /login`. The username may also be an email.
pub struct LoginRequest {
    pub username: String,
    pub password: SecretString,
}

impl Serialize for LoginRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("LoginRequest", 2)?;
        state.serialize_field("username", &self.username)?;
        state.serialize_field("password", self.password.expose_secret())?;
        state.end()
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Account type a new user may sign up as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterRole {
    Hr,
    Candidate,
}

/// Body of `POST /register`.
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    /// Defaults to candidate on the server when absent.
    pub role: Option<RegisterRole>,
    pub real_name: Option<String>,
    pub phone: Option<String>,
}

impl Serialize for RegisterRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RegisterRequest", 6)?;
        state.serialize_field("username", &self.username)?;
        state.serialize_field("email", &self.email)?;
        state.serialize_field("password", self.password.expose_secret())?;
        if let Some(role) = &self.role {
            state.serialize_field("role", role)?;
        } else {
            state.skip_field("role")?;
        }
        if let Some(real_name) = &self.real_name {
            state.serialize_field("real_name", real_name)?;
        } else {
            state.skip_field("real_name")?;
        }
        if let Some(phone) = &self.phone {
            state.serialize_field("phone", phone)?;
        } else {
            state.skip_field("phone")?;
        }
        state.end()
    }
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .field("real_name", &self.real_name)
            .field("phone", &self.phone)
            .finish()
    }
}

/// Payload of a successful login.
#[derive(Clone, Deserialize)]
pub struct LoginData {
    #[serde(deserialize_with = "secret_string")]
    pub token: SecretString,
    pub user: User,
}

fn secret_string<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

impl std::fmt::Debug for LoginData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginData")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Account API bound to a session.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn session(&self) -> &Arc<SessionStore> {
        self.client.session()
    }

    /// Sign in. On `code == 0` with a payload the token and user are
    /// persisted and become the current session; otherwise the session is
    /// untouched. The envelope is returned either way.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Api` for HTTP-level failures and
    /// `SessionError::Storage` if the new session cannot be persisted.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: SecretString,
    ) -> Result<ApiResponse<LoginData>, SessionError> {
        let request = LoginRequest {
            username: username.to_owned(),
            password,
        };
        let response: ApiResponse<LoginData> = self
            .client
            .send_envelope(ApiRequest::post("/login").json(&request)?)
            .await?;

        if let Some(data) = response.success_data() {
            if data.token.expose_secret().is_empty() {
                tracing::warn!(user = %data.user.username, "Login succeeded without a token, session unchanged");
            } else {
                self.session()
                    .establish(data.token.clone(), data.user.clone())?;
                tracing::info!(user = %data.user.username, "Logged in");
            }
        } else {
            tracing::info!(code = response.code, message = %response.message, "Login rejected");
        }
        Ok(response)
    }

    /// Create an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for HTTP failures or a non-zero code.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<ApiResponse<User>, ApiError> {
        self.client.post("/register", request).await
    }

    /// Sign out locally. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the stored keys cannot be removed; the
    /// in-memory session is cleared regardless.
    pub fn logout(&self) -> Result<(), StorageError> {
        tracing::info!("Logging out");
        self.session().clear()
    }

    /// Reload the current user. A successful payload replaces the stored user.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Api` for HTTP-level failures and
    /// `SessionError::Storage` if the user cannot be persisted.
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Result<ApiResponse<User>, SessionError> {
        let response: ApiResponse<User> = self
            .client
            .send_envelope(ApiRequest::get("/profile"))
            .await?;
        self.store_user(&response)?;
        Ok(response)
    }

    /// Update the current user's profile. A successful payload replaces the
    /// stored user.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_profile`].
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> Result<ApiResponse<User>, SessionError> {
        let response: ApiResponse<User> = self
            .client
            .send_envelope(ApiRequest::put("/profile").json(update)?)
            .await?;
        self.store_user(&response)?;
        Ok(response)
    }

    /// One page of users. Requires an admin session on the server.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for HTTP failures or a non-zero code.
    #[instrument(skip(self))]
    pub async fn list_users(&self, query: UserQuery) -> Result<ApiResponse<UserPage>, ApiError> {
        self.client
            .send(
                ApiRequest::get("/users")
                    .query("page", query.page)
                    .query("page_size", query.page_size),
            )
            .await
    }

    fn store_user(&self, response: &ApiResponse<User>) -> Result<(), StorageError> {
        match response.success_data() {
            Some(user) => self.session().set_user(user.clone()),
            None => Ok(()),
        }
    }
}
