//! In-memory role list and current-role permission checks.
//!
//! The registry is pure: it never touches storage. The client crate wraps it
//! in a store that persists the active role code.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{Permission, Role, RoleCode, RoleDraft, RoleId, RoleUpdate, builtin_roles};

/// Rejected role list changes. The registry is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleError {
    #[error("Role code already in use: {0}")]
    DuplicateCode(RoleCode),

    #[error("Role not found: {0}")]
    NotFound(RoleId),
}

/// Role list plus the single active role.
///
/// The active role is held as a copy. Updating the role through
/// [`update_role`](Self::update_role) refreshes the copy; deleting it does not
/// clear it.
#[derive(Debug, Clone)]
pub struct PermissionRegistry {
    roles: Vec<Role>,
    current: Option<Role>,
    last_id: i64,
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionRegistry {
    /// Registry seeded with the built-in roles and no active role.
    #[must_use]
    pub fn new() -> Self {
        Self::with_roles(builtin_roles())
    }

    /// Registry over an explicit role list.
    #[must_use]
    pub fn with_roles(roles: Vec<Role>) -> Self {
        let last_id = roles
            .iter()
            .map(|role| role.id.as_i64())
            .max()
            .unwrap_or(0)
            .max(RoleId::MAX_RESERVED);
        Self {
            roles,
            current: None,
            last_id,
        }
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub const fn current_role(&self) -> Option<&Role> {
        self.current.as_ref()
    }

    /// Permissions of the active role, in sorted order. Empty without a role.
    pub fn permissions(&self) -> impl Iterator<Item = &Permission> {
        self.current
            .iter()
            .flat_map(|role| role.permissions.iter())
    }

    pub fn role_by_code(&self, code: &str) -> Option<&Role> {
        self.roles.iter().find(|role| role.code == *code)
    }

    pub fn role_by_id(&self, id: RoleId) -> Option<&Role> {
        self.roles.iter().find(|role| role.id == id)
    }

    /// False without an active role; always true for the super admin;
    /// otherwise plain membership. Unknown strings simply do not match.
    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.current.as_ref().is_some_and(|role| {
            role.is_super_admin() || role.grants(permission)
        })
    }

    /// True if at least one permission passes. An empty list never passes.
    pub fn has_any_permission<'a, I>(&self, permissions: I) -> bool
    where
        I: IntoIterator<Item = &'a Permission>,
    {
        permissions
            .into_iter()
            .any(|permission| self.has_permission(permission))
    }

    /// True if every permission passes. An empty list always passes.
    pub fn has_all_permissions<'a, I>(&self, permissions: I) -> bool
    where
        I: IntoIterator<Item = &'a Permission>,
    {
        permissions
            .into_iter()
            .all(|permission| self.has_permission(permission))
    }

    /// Make the role with `code` active. Unknown codes leave the current role
    /// untouched and return `None`.
    pub fn set_role(&mut self, code: &str) -> Option<&Role> {
        let role = self.role_by_code(code)?.clone();
        self.current = Some(role);
        self.current.as_ref()
    }

    /// Drop the active role.
    pub fn clear_role(&mut self) {
        self.current = None;
    }

    /// Append a custom role with a fresh id and return a copy of it.
    ///
    /// # Errors
    ///
    /// Returns `RoleError::DuplicateCode` if another role already uses the
    /// draft's code.
    pub fn add_role(&mut self, draft: RoleDraft) -> Result<Role, RoleError> {
        self.add_role_at(draft, Utc::now())
    }

    fn add_role_at(&mut self, draft: RoleDraft, now: DateTime<Utc>) -> Result<Role, RoleError> {
        if self.role_by_code(draft.code.as_str()).is_some() {
            return Err(RoleError::DuplicateCode(draft.code));
        }
        let id = self.next_id(now);
        let role = Role::create(id, draft, now);
        self.roles.push(role.clone());
        Ok(role)
    }

    /// Millisecond clock, bumped past the previous id and the reserved range
    /// so two roles created in the same millisecond still get distinct ids.
    fn next_id(&mut self, now: DateTime<Utc>) -> RoleId {
        let id = now
            .timestamp_millis()
            .max(self.last_id.saturating_add(1))
            .max(RoleId::MAX_RESERVED + 1);
        self.last_id = id;
        RoleId::new(id)
    }

    /// Merge `update` into the role with `id`. If that role is active the
    /// active copy is refreshed too.
    ///
    /// # Errors
    ///
    /// Returns `RoleError::NotFound` for an unknown id and
    /// `RoleError::DuplicateCode` if the new code belongs to another role.
    pub fn update_role(&mut self, id: RoleId, update: RoleUpdate) -> Result<&Role, RoleError> {
        if let Some(code) = &update.code
            && self
                .roles
                .iter()
                .any(|role| role.id != id && role.code == *code)
        {
            return Err(RoleError::DuplicateCode(code.clone()));
        }

        let role = self
            .roles
            .iter_mut()
            .find(|role| role.id == id)
            .ok_or(RoleError::NotFound(id))?;
        role.apply(update, Utc::now());
        if self.current.as_ref().is_some_and(|current| current.id == id) {
            self.current = Some(role.clone());
        }
        Ok(role)
    }

    /// Remove a custom role. Built-in (reserved id) and unknown roles are
    /// refused with `false`.
    pub fn delete_role(&mut self, id: RoleId) -> bool {
        if id.is_reserved() {
            return false;
        }
        let before = self.roles.len();
        self.roles.retain(|role| role.id != id);
        self.roles.len() != before
    }

    /// The code of the active role.
    pub fn current_code(&self) -> Option<&RoleCode> {
        self.current.as_ref().map(|role| &role.code)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn registry_as(code: &str) -> PermissionRegistry {
        let mut registry = PermissionRegistry::new();
        registry.set_role(code).unwrap();
        registry
    }

    fn draft(code: &str, permissions: &[Permission]) -> RoleDraft {
        RoleDraft {
            name: code.to_uppercase(),
            code: RoleCode::new(code),
            description: String::new(),
            permissions: permissions.iter().cloned().collect(),
        }
    }

    #[test]
    fn test_no_role_denies_everything() {
        let registry = PermissionRegistry::new();
        assert!(registry.current_role().is_none());
        assert!(!registry.has_permission(&Permission::DASHBOARD_VIEW));
        assert_eq!(registry.permissions().count(), 0);
    }

    #[test]
    fn test_empty_lists() {
        let none: [Permission; 0] = [];
        let registry = registry_as(RoleCode::VIEWER);
        assert!(registry.has_all_permissions(&none));
        assert!(!registry.has_any_permission(&none));

        let anonymous = PermissionRegistry::new();
        assert!(anonymous.has_all_permissions(&none));
        assert!(!anonymous.has_any_permission(&none));
    }

    #[test]
    fn test_admin_passes_undeclared_permissions() {
        let registry = registry_as(RoleCode::ADMIN);
        assert!(registry.has_permission(&Permission::SYSTEM_SETTINGS));
        assert!(registry.has_permission(&Permission::new("log:view")));
        assert!(registry.has_permission(&Permission::new("anything at all")));
    }

    #[test]
    fn test_viewer_checks() {
        let registry = registry_as(RoleCode::VIEWER);
        assert!(registry.permissions().all(|perm| perm.as_str().ends_with(":view")));
        assert!(!registry.has_permission(&Permission::TALENT_CREATE));
        assert!(registry.has_any_permission(&[Permission::TALENT_CREATE, Permission::TALENT_VIEW]));
        assert!(!registry.has_all_permissions(&[Permission::TALENT_CREATE, Permission::TALENT_VIEW]));
    }

    #[test]
    fn test_unknown_role_code_is_a_no_op() {
        let mut registry = registry_as(RoleCode::RECRUITER);
        assert!(registry.set_role("nonexistent").is_none());
        assert_eq!(registry.current_code().unwrap().as_str(), RoleCode::RECRUITER);

        let mut anonymous = PermissionRegistry::new();
        assert!(anonymous.set_role("nonexistent").is_none());
        assert!(anonymous.current_role().is_none());
    }

    #[test]
    fn test_builtin_roles_cannot_be_deleted() {
        let mut registry = PermissionRegistry::new();
        for id in 1..=5 {
            assert!(!registry.delete_role(RoleId::new(id)));
        }
        assert_eq!(registry.roles().len(), 5);
    }

    #[test]
    fn test_custom_role_lifecycle() {
        let mut registry = PermissionRegistry::new();
        let id = registry
            .add_role(draft("auditor", &[Permission::JOB_VIEW]))
            .unwrap()
            .id;
        assert!(!id.is_reserved());
        assert_eq!(registry.roles().len(), 6);

        assert!(registry.delete_role(id));
        assert!(registry.role_by_id(id).is_none());
        assert!(!registry.delete_role(id));
    }

    #[test]
    fn test_ids_strictly_increase_within_one_millisecond() {
        let mut registry = PermissionRegistry::new();
        let now = Utc::now();
        let a = registry.add_role_at(draft("a", &[]), now).unwrap().id;
        let b = registry.add_role_at(draft("b", &[]), now).unwrap().id;
        let c = registry.add_role_at(draft("c", &[]), now).unwrap().id;
        assert!(a < b && b < c);
        assert!(a.as_i64() >= now.timestamp_millis());
    }

    #[test]
    fn test_ids_skip_reserved_range() {
        let mut registry = PermissionRegistry::new();
        let epoch = DateTime::from_timestamp(0, 0).unwrap();
        let id = registry.add_role_at(draft("early", &[]), epoch).unwrap().id;
        assert_eq!(id, RoleId::new(6));
    }

    #[test]
    fn test_update_refreshes_active_role() {
        let mut registry = PermissionRegistry::new();
        let id = registry.add_role(draft("auditor", &[Permission::JOB_VIEW])).unwrap().id;
        registry.set_role("auditor").unwrap();
        assert!(!registry.has_permission(&Permission::JOB_EXPORT));

        let permissions: BTreeSet<_> = [Permission::JOB_VIEW, Permission::JOB_EXPORT].into();
        let updated = registry
            .update_role(
                id,
                RoleUpdate {
                    permissions: Some(permissions),
                    ..RoleUpdate::default()
                },
            )
            .unwrap();
        assert!(updated.updated_at >= updated.created_at);
        assert!(registry.has_permission(&Permission::JOB_EXPORT));
    }

    #[test]
    fn test_update_unknown_id_is_a_no_op() {
        let mut registry = PermissionRegistry::new();
        let before = registry.roles().to_vec();
        assert_eq!(
            registry.update_role(RoleId::new(99), RoleUpdate::default()),
            Err(RoleError::NotFound(RoleId::new(99)))
        );
        assert_eq!(registry.roles(), before.as_slice());
    }

    #[test]
    fn test_add_role_rejects_taken_code() {
        let mut registry = PermissionRegistry::new();
        let before = registry.roles().to_vec();

        let err = registry.add_role(draft(RoleCode::ADMIN, &[])).unwrap_err();

        assert_eq!(err, RoleError::DuplicateCode(RoleCode::new(RoleCode::ADMIN)));
        assert_eq!(registry.roles(), before.as_slice());

        registry.add_role(draft("intern", &[])).unwrap();
        assert!(registry.add_role(draft("intern", &[])).is_err());
        assert_eq!(registry.roles().len(), 6);
    }

    #[test]
    fn test_renaming_to_admin_code_does_not_escalate() {
        let mut registry = PermissionRegistry::new();
        let id = registry.add_role(draft("intern", &[Permission::DASHBOARD_VIEW])).unwrap().id;
        registry.set_role("intern").unwrap();

        let err = registry
            .update_role(
                id,
                RoleUpdate {
                    code: Some(RoleCode::new(RoleCode::ADMIN)),
                    ..RoleUpdate::default()
                },
            )
            .unwrap_err();

        assert_eq!(err, RoleError::DuplicateCode(RoleCode::new(RoleCode::ADMIN)));
        assert_eq!(
            registry
                .roles()
                .iter()
                .filter(|role| role.code.as_str() == RoleCode::ADMIN)
                .count(),
            1
        );
        assert_eq!(registry.current_code().unwrap().as_str(), "intern");
        assert!(!registry.has_permission(&Permission::ROLE_DELETE));
    }

    #[test]
    fn test_update_may_keep_own_code() {
        let mut registry = PermissionRegistry::new();
        let id = registry.add_role(draft("intern", &[])).unwrap().id;

        let updated = registry
            .update_role(
                id,
                RoleUpdate {
                    name: Some("Summer intern".to_owned()),
                    code: Some(RoleCode::new("intern")),
                    ..RoleUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.name, "Summer intern");
    }

    #[test]
    fn test_deleting_active_custom_role_keeps_current_copy() {
        let mut registry = PermissionRegistry::new();
        let id = registry.add_role(draft("temp", &[Permission::KANBAN_VIEW])).unwrap().id;
        registry.set_role("temp").unwrap();
        assert!(registry.delete_role(id));
        assert!(registry.has_permission(&Permission::KANBAN_VIEW));
        assert!(registry.role_by_code("temp").is_none());
    }
}
