//! Permission identifiers and the static permission catalog.
//!
//! A permission is an opaque `resource:action` string. Checks compare whole
//! strings for equality; [`Permission::resource`] and [`Permission::action`]
//! exist for grouping in configuration screens and never take part in a
//! check.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// A single `resource:action` capability.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const DASHBOARD_VIEW: Self = Self::from_static("dashboard:view");

    pub const TALENT_VIEW: Self = Self::from_static("talent:view");
    pub const TALENT_CREATE: Self = Self::from_static("talent:create");
    pub const TALENT_EDIT: Self = Self::from_static("talent:edit");
    pub const TALENT_DELETE: Self = Self::from_static("talent:delete");
    pub const TALENT_EXPORT: Self = Self::from_static("talent:export");

    pub const JOB_VIEW: Self = Self::from_static("job:view");
    pub const JOB_CREATE: Self = Self::from_static("job:create");
    pub const JOB_EDIT: Self = Self::from_static("job:edit");
    pub const JOB_DELETE: Self = Self::from_static("job:delete");
    pub const JOB_EXPORT: Self = Self::from_static("job:export");

    pub const RESUME_VIEW: Self = Self::from_static("resume:view");
    pub const RESUME_CREATE: Self = Self::from_static("resume:create");
    pub const RESUME_EDIT: Self = Self::from_static("resume:edit");
    pub const RESUME_DELETE: Self = Self::from_static("resume:delete");
    pub const RESUME_EXPORT: Self = Self::from_static("resume:export");

    pub const KANBAN_VIEW: Self = Self::from_static("kanban:view");
    pub const KANBAN_EDIT: Self = Self::from_static("kanban:edit");

    pub const CALENDAR_VIEW: Self = Self::from_static("calendar:view");
    pub const CALENDAR_CREATE: Self = Self::from_static("calendar:create");
    pub const CALENDAR_EDIT: Self = Self::from_static("calendar:edit");
    pub const CALENDAR_DELETE: Self = Self::from_static("calendar:delete");

    pub const MESSAGE_VIEW: Self = Self::from_static("message:view");
    pub const MESSAGE_SEND: Self = Self::from_static("message:send");

    pub const RECOMMEND_VIEW: Self = Self::from_static("recommend:view");
    pub const RECOMMEND_USE: Self = Self::from_static("recommend:use");

    pub const USER_VIEW: Self = Self::from_static("user:view");
    pub const USER_CREATE: Self = Self::from_static("user:create");
    pub const USER_EDIT: Self = Self::from_static("user:edit");
    pub const USER_DELETE: Self = Self::from_static("user:delete");

    pub const ROLE_VIEW: Self = Self::from_static("role:view");
    pub const ROLE_CREATE: Self = Self::from_static("role:create");
    pub const ROLE_EDIT: Self = Self::from_static("role:edit");
    pub const ROLE_DELETE: Self = Self::from_static("role:delete");

    pub const SYSTEM_SETTINGS: Self = Self::from_static("system:settings");

    /// Create a permission from a string known at compile time.
    #[must_use]
    pub const fn from_static(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }

    /// Create a permission from any string.
    ///
    /// No validation happens here: an undeclared permission is still a
    /// permission, it simply never matches a non-admin role.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(Cow::Owned(value.into()))
    }

    /// The permission string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part before the first `:`, or the whole string when there is none.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.0.split_once(':').map_or(&self.0, |(resource, _)| resource)
    }

    /// Part after the first `:`, if any.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.0.split_once(':').map(|(_, action)| action)
    }

    /// Whether this permission appears in the catalog.
    #[must_use]
    pub fn is_declared(&self) -> bool {
        PERMISSION_GROUPS
            .iter()
            .flat_map(|group| group.permissions)
            .any(|entry| entry.permission == *self)
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Permission {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Permission {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// A permission with its display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionEntry {
    pub permission: Permission,
    pub label: &'static str,
}

/// Permissions of one resource, as shown in the role configuration screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGroup {
    pub name: &'static str,
    pub permissions: &'static [PermissionEntry],
}

const fn entry(permission: Permission, label: &'static str) -> PermissionEntry {
    PermissionEntry { permission, label }
}

/// Every declared permission, grouped by resource.
pub static PERMISSION_GROUPS: &[PermissionGroup] = &[
    PermissionGroup {
        name: "Dashboard",
        permissions: &[entry(Permission::DASHBOARD_VIEW, "View dashboard")],
    },
    PermissionGroup {
        name: "Talent management",
        permissions: &[
            entry(Permission::TALENT_VIEW, "View talents"),
            entry(Permission::TALENT_CREATE, "Create talents"),
            entry(Permission::TALENT_EDIT, "Edit talents"),
            entry(Permission::TALENT_DELETE, "Delete talents"),
            entry(Permission::TALENT_EXPORT, "Export talents"),
        ],
    },
    PermissionGroup {
        name: "Job management",
        permissions: &[
            entry(Permission::JOB_VIEW, "View jobs"),
            entry(Permission::JOB_CREATE, "Publish jobs"),
            entry(Permission::JOB_EDIT, "Edit jobs"),
            entry(Permission::JOB_DELETE, "Delete jobs"),
            entry(Permission::JOB_EXPORT, "Export jobs"),
        ],
    },
    PermissionGroup {
        name: "Resume management",
        permissions: &[
            entry(Permission::RESUME_VIEW, "View resumes"),
            entry(Permission::RESUME_CREATE, "Upload resumes"),
            entry(Permission::RESUME_EDIT, "Edit resumes"),
            entry(Permission::RESUME_DELETE, "Delete resumes"),
            entry(Permission::RESUME_EXPORT, "Export resumes"),
        ],
    },
    PermissionGroup {
        name: "Recruitment board",
        permissions: &[
            entry(Permission::KANBAN_VIEW, "View board"),
            entry(Permission::KANBAN_EDIT, "Edit board"),
        ],
    },
    PermissionGroup {
        name: "Interview calendar",
        permissions: &[
            entry(Permission::CALENDAR_VIEW, "View calendar"),
            entry(Permission::CALENDAR_CREATE, "Schedule interviews"),
            entry(Permission::CALENDAR_EDIT, "Edit interviews"),
            entry(Permission::CALENDAR_DELETE, "Delete interviews"),
        ],
    },
    PermissionGroup {
        name: "Message center",
        permissions: &[
            entry(Permission::MESSAGE_VIEW, "View messages"),
            entry(Permission::MESSAGE_SEND, "Send messages"),
        ],
    },
    PermissionGroup {
        name: "Recommendations",
        permissions: &[
            entry(Permission::RECOMMEND_VIEW, "View recommendations"),
            entry(Permission::RECOMMEND_USE, "Use recommendations"),
        ],
    },
    PermissionGroup {
        name: "User management",
        permissions: &[
            entry(Permission::USER_VIEW, "View users"),
            entry(Permission::USER_CREATE, "Create users"),
            entry(Permission::USER_EDIT, "Edit users"),
            entry(Permission::USER_DELETE, "Delete users"),
        ],
    },
    PermissionGroup {
        name: "Role management",
        permissions: &[
            entry(Permission::ROLE_VIEW, "View roles"),
            entry(Permission::ROLE_CREATE, "Create roles"),
            entry(Permission::ROLE_EDIT, "Edit roles"),
            entry(Permission::ROLE_DELETE, "Delete roles"),
        ],
    },
    PermissionGroup {
        name: "System settings",
        permissions: &[entry(Permission::SYSTEM_SETTINGS, "System settings")],
    },
];

/// Iterate over every declared permission in catalog order.
pub fn all_permissions() -> impl Iterator<Item = &'static Permission> {
    PERMISSION_GROUPS
        .iter()
        .flat_map(|group| group.permissions)
        .map(|entry| &entry.permission)
}
