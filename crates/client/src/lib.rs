//! Talent Ops Client - the stateful half of the Talent Ops front-end.
//!
//! Built on `talent-ops-core`, this crate adds everything that needs I/O:
//!
//! - [`config`] - Environment-driven configuration
//! - [`storage`] - Durable key/value storage
//! - [`http`] - The shared HTTP pipeline and its error mapping
//! - [`auth`] - Account endpoints and session transitions
//! - [`session`] - Signed-in user and bearer token
//! - [`permission`] - Permission registry with the active role persisted
//! - [`realtime`] - WebSocket notification channel
//! - [`theme`] - Persisted theme preference
//! - [`context`] - [`AppContext`], which owns all of the above
//!
//! User-visible effects go through the [`Notifier`] and [`Navigator`] traits.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod notify;
pub mod permission;
pub mod realtime;
pub mod session;
pub mod storage;
pub mod theme;

pub use auth::{AuthApi, LoginData, RegisterRequest, RegisterRole, SessionError};
pub use config::{ClientConfig, ConfigError, ReconnectConfig};
pub use context::AppContext;
pub use error::{ClientError, Result};
pub use http::{ApiClient, ApiError, ApiRequest};
pub use notify::{Navigator, Notifier, TracingNavigator, TracingNotifier};
pub use permission::PermissionStore;
pub use realtime::{ChannelStatus, RealtimeChannel};
pub use session::SessionStore;
pub use storage::{ClientStorage, FileStorage, MemoryStorage, StorageError};
pub use theme::ThemeStore;
