//! Roles: named permission sets, plus the five built-in roles.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::RoleId;
use super::permission::Permission;

/// Stable unique key of a role (`admin`, `hr_manager`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleCode(String);

impl RoleCode {
    pub const ADMIN: &'static str = "admin";
    pub const HR_MANAGER: &'static str = "hr_manager";
    pub const RECRUITER: &'static str = "recruiter";
    pub const INTERVIEWER: &'static str = "interviewer";
    pub const VIEWER: &'static str = "viewer";

    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoleCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl PartialEq<str> for RoleCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for RoleCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A named set of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub code: RoleCode,
    pub description: String,
    pub permissions: BTreeSet<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// The `admin` role passes every permission check, declared or not.
    ///
    /// This is the only place the super-admin bypass is decided.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.code == *RoleCode::ADMIN
    }

    /// Whether the role is one of the five built-ins.
    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        self.id.is_reserved()
    }

    /// Plain set membership, without the super-admin bypass.
    #[must_use]
    pub fn grants(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }

    /// Build a role from a draft, stamping both timestamps with `at`.
    #[must_use]
    pub fn create(id: RoleId, draft: RoleDraft, at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            code: draft.code,
            description: draft.description,
            permissions: draft.permissions,
            created_at: at,
            updated_at: at,
        }
    }

    /// Merge the present fields of `update` and stamp `updated_at`.
    pub fn apply(&mut self, update: RoleUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(code) = update.code {
            self.code = code;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(permissions) = update.permissions {
            self.permissions = permissions;
        }
        self.updated_at = now;
    }
}

/// A role that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDraft {
    pub name: String,
    pub code: RoleCode,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}

/// Partial update of a role. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<RoleCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BTreeSet<Permission>>,
}

/// 2024-01-01T00:00:00Z, the creation stamp of every built-in role.
const BUILTIN_CREATED_AT: i64 = 1_704_067_200;

fn builtin(id: i64, name: &str, code: &str, description: &str, permissions: &[Permission]) -> Role {
    let at = DateTime::from_timestamp(BUILTIN_CREATED_AT, 0).unwrap_or_default();
    Role::create(
        RoleId::new(id),
        RoleDraft {
            name: name.to_owned(),
            code: RoleCode::new(code),
            description: description.to_owned(),
            permissions: permissions.iter().cloned().collect(),
        },
        at,
    )
}

/// The five built-in roles in id order.
#[must_use]
pub fn builtin_roles() -> Vec<Role> {
    use Permission as P;

    vec![
        builtin(
            1,
            "Super administrator",
            RoleCode::ADMIN,
            "Holds every permission in the system",
            &super::permission::all_permissions().cloned().collect::<Vec<_>>(),
        ),
        builtin(
            2,
            "HR manager",
            RoleCode::HR_MANAGER,
            "Runs the recruitment process and the talent pool",
            &[
                P::DASHBOARD_VIEW,
                P::TALENT_VIEW,
                P::TALENT_CREATE,
                P::TALENT_EDIT,
                P::TALENT_DELETE,
                P::TALENT_EXPORT,
                P::JOB_VIEW,
                P::JOB_CREATE,
                P::JOB_EDIT,
                P::JOB_DELETE,
                P::JOB_EXPORT,
                P::RESUME_VIEW,
                P::RESUME_CREATE,
                P::RESUME_EDIT,
                P::RESUME_DELETE,
                P::RESUME_EXPORT,
                P::KANBAN_VIEW,
                P::KANBAN_EDIT,
                P::CALENDAR_VIEW,
                P::CALENDAR_CREATE,
                P::CALENDAR_EDIT,
                P::CALENDAR_DELETE,
                P::MESSAGE_VIEW,
                P::MESSAGE_SEND,
                P::RECOMMEND_VIEW,
                P::RECOMMEND_USE,
                P::USER_VIEW,
            ],
        ),
        builtin(
            3,
            "Recruiter",
            RoleCode::RECRUITER,
            "Handles day-to-day recruiting",
            &[
                P::DASHBOARD_VIEW,
                P::TALENT_VIEW,
                P::TALENT_CREATE,
                P::TALENT_EDIT,
                P::JOB_VIEW,
                P::RESUME_VIEW,
                P::RESUME_CREATE,
                P::RESUME_EDIT,
                P::KANBAN_VIEW,
                P::KANBAN_EDIT,
                P::CALENDAR_VIEW,
                P::CALENDAR_CREATE,
                P::CALENDAR_EDIT,
                P::MESSAGE_VIEW,
                P::MESSAGE_SEND,
                P::RECOMMEND_VIEW,
                P::RECOMMEND_USE,
            ],
        ),
        builtin(
            4,
            "Interviewer",
            RoleCode::INTERVIEWER,
            "Takes part in interview evaluation",
            &[
                P::DASHBOARD_VIEW,
                P::TALENT_VIEW,
                P::JOB_VIEW,
                P::RESUME_VIEW,
                P::KANBAN_VIEW,
                P::CALENDAR_VIEW,
                P::MESSAGE_VIEW,
                P::MESSAGE_SEND,
            ],
        ),
        builtin(
            5,
            "Read-only user",
            RoleCode::VIEWER,
            "Can only view data",
            &[
                P::DASHBOARD_VIEW,
                P::TALENT_VIEW,
                P::JOB_VIEW,
                P::RESUME_VIEW,
                P::KANBAN_VIEW,
                P::CALENDAR_VIEW,
                P::MESSAGE_VIEW,
            ],
        ),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn by_code(code: &str) -> Role {
        builtin_roles()
            .into_iter()
            .find(|role| role.code == *code)
            .unwrap()
    }

    #[test]
    fn test_builtin_ids_are_reserved() {
        let roles = builtin_roles();
        let ids: Vec<i64> = roles.iter().map(|role| role.id.as_i64()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert!(roles.iter().all(Role::is_builtin));
    }

    #[test]
    fn test_only_admin_is_super_admin() {
        for role in builtin_roles() {
            assert_eq!(role.is_super_admin(), role.code == *RoleCode::ADMIN);
        }
    }

    #[test]
    fn test_viewer_only_views() {
        let viewer = by_code(RoleCode::VIEWER);
        assert!(
            viewer
                .permissions
                .iter()
                .all(|perm| perm.action() == Some("view"))
        );
        assert!(!viewer.grants(&Permission::TALENT_CREATE));
    }

    #[test]
    fn test_hr_manager_cannot_manage_roles() {
        let hr = by_code(RoleCode::HR_MANAGER);
        assert!(hr.grants(&Permission::USER_VIEW));
        assert!(!hr.grants(&Permission::USER_CREATE));
        assert!(!hr.grants(&Permission::ROLE_VIEW));
        assert!(!hr.grants(&Permission::SYSTEM_SETTINGS));
    }

    #[test]
    fn test_apply_merges_only_present_fields() {
        let mut role = by_code(RoleCode::RECRUITER);
        let before = role.clone();
        let now = Utc::now();
        role.apply(
            RoleUpdate {
                name: Some("Senior recruiter".into()),
                ..RoleUpdate::default()
            },
            now,
        );

        assert_eq!(role.name, "Senior recruiter");
        assert_eq!(role.code, before.code);
        assert_eq!(role.permissions, before.permissions);
        assert_eq!(role.created_at, before.created_at);
        assert_eq!(role.updated_at, now);
    }
}
