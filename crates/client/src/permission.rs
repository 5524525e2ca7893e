//! Permission registry with the active role persisted to storage.

use std::sync::Arc;

use parking_lot::RwLock;
use talent_ops_core::{
    Permission, PermissionRegistry, PermissionRequirement, Role, RoleCode, RoleDraft, RoleError,
    RoleId, RoleUpdate,
};

use crate::storage::{ClientStorage, StorageError, keys};

/// Shared, thread-safe [`PermissionRegistry`] that remembers the active role.
pub struct PermissionStore {
    registry: RwLock<PermissionRegistry>,
    storage: Arc<dyn ClientStorage>,
}

impl std::fmt::Debug for PermissionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionStore")
            .field("current", &self.registry.read().current_code())
            .finish_non_exhaustive()
    }
}

impl PermissionStore {
    /// Store over the built-in roles with no active role.
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self::with_registry(PermissionRegistry::new(), storage)
    }

    pub fn with_registry(registry: PermissionRegistry, storage: Arc<dyn ClientStorage>) -> Self {
        Self {
            registry: RwLock::new(registry),
            storage,
        }
    }

    /// Apply the persisted role, or `fallback` when nothing was persisted.
    ///
    /// Without a fallback the store stays role-less and every check fails.
    /// Returns the code of the role that ended up active.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if storage cannot be read, or if the fallback
    /// role cannot be persisted.
    pub fn init(&self, fallback: Option<&str>) -> Result<Option<RoleCode>, StorageError> {
        if let Some(saved) = self.storage.get(keys::USER_ROLE)? {
            let applied = self.registry.write().set_role(&saved).map(|role| role.code.clone());
            if applied.is_none() {
                tracing::warn!(role = %saved, "Persisted role no longer exists");
            }
            return Ok(applied);
        }

        match fallback {
            Some(code) => {
                tracing::warn!(role = code, "No persisted role, applying fallback role");
                self.set_role(code)?;
                Ok(self.current_code())
            }
            None => {
                tracing::debug!("No persisted role, permission checks will fail");
                Ok(None)
            }
        }
    }

    /// Activate the role with `code` and persist it.
    ///
    /// Returns `false` without touching anything when no such role exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the code cannot be persisted. The role is
    /// active in memory regardless.
    pub fn set_role(&self, code: &str) -> Result<bool, StorageError> {
        let applied = self.registry.write().set_role(code).is_some();
        if applied {
            tracing::info!(role = code, "Role switched");
            self.storage.set(keys::USER_ROLE, code)?;
        } else {
            tracing::warn!(role = code, "Unknown role code, keeping current role");
        }
        Ok(applied)
    }

    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.registry.read().has_permission(permission)
    }

    pub fn has_any_permission(&self, permissions: &[Permission]) -> bool {
        self.registry.read().has_any_permission(permissions)
    }

    pub fn has_all_permissions(&self, permissions: &[Permission]) -> bool {
        self.registry.read().has_all_permissions(permissions)
    }

    pub fn can(&self, requirement: &PermissionRequirement) -> bool {
        requirement.is_satisfied(&self.registry.read())
    }

    /// # Errors
    ///
    /// Returns `RoleError::DuplicateCode` if the code is taken.
    pub fn add_role(&self, draft: RoleDraft) -> Result<Role, RoleError> {
        self.registry.write().add_role(draft)
    }

    /// # Errors
    ///
    /// Returns `RoleError` for an unknown id or a code taken by another role.
    pub fn update_role(&self, id: RoleId, update: RoleUpdate) -> Result<Role, RoleError> {
        self.registry.write().update_role(id, update).cloned()
    }

    pub fn delete_role(&self, id: RoleId) -> bool {
        self.registry.write().delete_role(id)
    }

    pub fn roles(&self) -> Vec<Role> {
        self.registry.read().roles().to_vec()
    }

    pub fn current_role(&self) -> Option<Role> {
        self.registry.read().current_role().cloned()
    }

    pub fn current_code(&self) -> Option<RoleCode> {
        self.registry.read().current_code().cloned()
    }

    pub fn permissions(&self) -> Vec<Permission> {
        self.registry.read().permissions().cloned().collect()
    }

    /// Run `f` against a consistent view of the registry.
    pub fn read<R>(&self, f: impl FnOnce(&PermissionRegistry) -> R) -> R {
        f(&self.registry.read())
    }
}
