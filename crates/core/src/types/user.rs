//! Authenticated user records as returned by the user service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Account-level role carried on the user record.
///
/// This is distinct from the permission [`Role`](super::role::Role): it only
/// drives the session-level `is_admin` / `is_hr` / `is_candidate` flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountRole {
    Admin,
    Hr,
    Candidate,
    /// Any value the backend sends that this client does not know.
    Other(String),
}

impl AccountRole {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Hr => "hr",
            Self::Candidate => "candidate",
            Self::Other(value) => value,
        }
    }
}

impl From<String> for AccountRole {
    fn from(value: String) -> Self {
        match value.as_str() {
            "admin" => Self::Admin,
            "hr" => Self::Hr,
            "candidate" => Self::Candidate,
            _ => Self::Other(value),
        }
    }
}

impl From<AccountRole> for String {
    fn from(role: AccountRole) -> Self {
        match role {
            AccountRole::Other(value) => value,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: AccountRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Real name when set, username otherwise.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.real_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.username)
    }
}

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Pagination query for the user list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserQuery {
    pub page: u32,
    pub page_size: u32,
}

impl UserQuery {
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Clamp to the ranges the user service accepts (page >= 1, size 1..=100).
    #[must_use]
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, Self::MAX_PAGE_SIZE),
        }
    }
}

impl Default for UserQuery {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// One page of users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPage {
    #[serde(default)]
    pub users: Vec<User>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}
