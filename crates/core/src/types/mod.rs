//! Domain types for the Talent Ops client.

pub mod api;
pub mod id;
pub mod permission;
pub mod role;
pub mod theme;
pub mod user;

pub use api::ApiResponse;
pub use id::*;
pub use permission::{PERMISSION_GROUPS, Permission, PermissionEntry, PermissionGroup, all_permissions};
pub use role::{Role, RoleCode, RoleDraft, RoleUpdate, builtin_roles};
pub use theme::{Theme, ThemeMode};
pub use user::{AccountRole, ProfileUpdate, User, UserPage, UserQuery};
