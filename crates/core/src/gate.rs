//! Element-level permission enforcement.
//!
//! [`is_visible`] is the pure predicate. [`PermissionGate`] models the
//! lifecycle of one gated element: it is checked when mounted and on every
//! update, and a failed check removes it for good.

use serde::{Deserialize, Serialize};

use crate::registry::PermissionRegistry;
use crate::types::Permission;

/// What an element asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "permissions", rename_all = "snake_case")]
pub enum PermissionRequirement {
    /// Exactly this permission.
    One(Permission),
    /// At least one of these. An empty list is never satisfied.
    Any(Vec<Permission>),
    /// All of these. An empty list is always satisfied.
    All(Vec<Permission>),
}

/// Raw binding value as written on an element: a single permission or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionBinding {
    Single(Permission),
    List(Vec<Permission>),
}

/// Modifier that switches a list binding from any-of to all-of.
pub const ALL_MODIFIER: &str = "all";

impl PermissionRequirement {
    /// Interpret a binding and its optional modifier.
    ///
    /// An empty single permission means "no requirement" and yields `None`;
    /// the element is then left alone. The modifier only affects lists.
    #[must_use]
    pub fn from_binding(binding: PermissionBinding, modifier: Option<&str>) -> Option<Self> {
        match binding {
            PermissionBinding::Single(permission) if permission.as_str().is_empty() => None,
            PermissionBinding::Single(permission) => Some(Self::One(permission)),
            PermissionBinding::List(permissions) if modifier == Some(ALL_MODIFIER) => {
                Some(Self::All(permissions))
            }
            PermissionBinding::List(permissions) => Some(Self::Any(permissions)),
        }
    }

    /// Whether the registry's current role satisfies this requirement.
    #[must_use]
    pub fn is_satisfied(&self, registry: &PermissionRegistry) -> bool {
        match self {
            Self::One(permission) => registry.has_permission(permission),
            Self::Any(permissions) => registry.has_any_permission(permissions),
            Self::All(permissions) => registry.has_all_permissions(permissions),
        }
    }
}

impl From<Permission> for PermissionRequirement {
    fn from(permission: Permission) -> Self {
        Self::One(permission)
    }
}

/// Pure visibility check.
#[must_use]
pub fn is_visible(requirement: &PermissionRequirement, registry: &PermissionRegistry) -> bool {
    requirement.is_satisfied(registry)
}

/// One gated element.
///
/// Removal is one-way. Granting the permission later does not bring the
/// element back; only a fresh gate (a fresh mount) is checked from scratch.
#[derive(Debug, Clone)]
pub struct PermissionGate {
    requirement: Option<PermissionRequirement>,
    removed: bool,
}

impl PermissionGate {
    #[must_use]
    pub const fn new(requirement: Option<PermissionRequirement>) -> Self {
        Self {
            requirement,
            removed: false,
        }
    }

    /// Check on mount. Returns whether the element is still present.
    pub fn mounted(&mut self, registry: &PermissionRegistry) -> bool {
        self.check(registry)
    }

    /// Re-check with a possibly changed binding. Returns whether the element
    /// is still present.
    pub fn updated(
        &mut self,
        requirement: Option<PermissionRequirement>,
        registry: &PermissionRegistry,
    ) -> bool {
        self.requirement = requirement;
        self.check(registry)
    }

    #[must_use]
    pub const fn is_removed(&self) -> bool {
        self.removed
    }

    fn check(&mut self, registry: &PermissionRegistry) -> bool {
        if self.removed {
            return false;
        }
        if let Some(requirement) = &self.requirement
            && !requirement.is_satisfied(registry)
        {
            self.removed = true;
        }
        !self.removed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::RoleCode;

    fn registry_as(code: &str) -> PermissionRegistry {
        let mut registry = PermissionRegistry::new();
        registry.set_role(code).unwrap();
        registry
    }

    #[test]
    fn test_binding_shapes() {
        let single: PermissionBinding = serde_json::from_str("\"talent:create\"").unwrap();
        assert_eq!(
            PermissionRequirement::from_binding(single, Some(ALL_MODIFIER)),
            Some(PermissionRequirement::One(Permission::TALENT_CREATE))
        );

        let list: PermissionBinding =
            serde_json::from_str(r#"["talent:create","talent:edit"]"#).unwrap();
        assert_eq!(
            PermissionRequirement::from_binding(list.clone(), None),
            Some(PermissionRequirement::Any(vec![
                Permission::TALENT_CREATE,
                Permission::TALENT_EDIT
            ]))
        );
        assert!(matches!(
            PermissionRequirement::from_binding(list, Some(ALL_MODIFIER)),
            Some(PermissionRequirement::All(_))
        ));
    }

    #[test]
    fn test_empty_binding_keeps_element() {
        let registry = PermissionRegistry::new();
        let requirement =
            PermissionRequirement::from_binding(PermissionBinding::Single(Permission::new("")), None);
        assert!(requirement.is_none());

        let mut gate = PermissionGate::new(requirement);
        assert!(gate.mounted(&registry));
    }

    #[test]
    fn test_empty_any_list_removes_element() {
        let registry = registry_as(RoleCode::ADMIN);
        let mut gate = PermissionGate::new(Some(PermissionRequirement::Any(vec![])));
        assert!(!gate.mounted(&registry));
    }

    #[test]
    fn test_visibility_follows_registry() {
        let viewer = registry_as(RoleCode::VIEWER);
        let recruiter = registry_as(RoleCode::RECRUITER);
        let create = PermissionRequirement::from(Permission::TALENT_CREATE);
        assert!(!is_visible(&create, &viewer));
        assert!(is_visible(&create, &recruiter));

        let both = PermissionRequirement::All(vec![Permission::TALENT_CREATE, Permission::TALENT_DELETE]);
        assert!(!is_visible(&both, &recruiter));
    }

    #[test]
    fn test_removal_is_permanent() {
        let mut registry = registry_as(RoleCode::VIEWER);
        let requirement = Some(PermissionRequirement::One(Permission::JOB_CREATE));
        let mut gate = PermissionGate::new(requirement.clone());
        assert!(!gate.mounted(&registry));

        registry.set_role(RoleCode::ADMIN).unwrap();
        assert!(!gate.updated(requirement.clone(), &registry));
        assert!(gate.is_removed());

        let mut remounted = PermissionGate::new(requirement);
        assert!(remounted.mounted(&registry));
    }
}
