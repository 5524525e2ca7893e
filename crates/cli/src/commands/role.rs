//! Permission role inspection and switching.

use talent_ops_client::AppContext;
use talent_ops_core::{Permission, PermissionRequirement, RoleCode};

use super::CommandError;

pub fn list(ctx: &AppContext) {
    let active = ctx.permissions().current_code();
    for role in ctx.permissions().roles() {
        tracing::info!(
            id = %role.id,
            code = %role.code,
            name = %role.name,
            permissions = role.permissions.len(),
            builtin = role.is_builtin(),
            active = active.as_ref() == Some(&role.code),
        );
    }
}

pub fn current(ctx: &AppContext) {
    match ctx.permissions().current_role() {
        Some(role) => tracing::info!(
            code = %role.code,
            name = %role.name,
            super_admin = role.is_super_admin(),
            "Active role"
        ),
        None => tracing::info!("No active role"),
    }
}

pub fn switch(ctx: &AppContext, code: &str) -> Result<(), CommandError> {
    if !ctx.permissions().set_role(code)? {
        return Err(CommandError::UnknownRole(code.to_owned()));
    }
    tracing::info!(code, "Role switched");
    Ok(())
}

pub fn permissions(ctx: &AppContext) {
    let Some(role) = ctx.permissions().current_role() else {
        tracing::info!("No active role");
        return;
    };
    if role.is_super_admin() {
        tracing::info!(code = %role.code, "Super admin: every permission granted");
    }
    for permission in ctx.permissions().permissions() {
        tracing::info!(permission = %permission);
    }
}

pub fn can(ctx: &AppContext, permissions: &[String], all: bool) {
    let requirement = requirement(permissions, all);
    let granted = requirement
        .as_ref()
        .is_none_or(|requirement| ctx.can(requirement));
    let role = ctx.permissions().current_code();
    tracing::info!(
        role = role.as_ref().map_or("none", RoleCode::as_str),
        mode = if all { "all" } else { "any" },
        granted,
        "Permission check"
    );
}

fn requirement(permissions: &[String], all: bool) -> Option<PermissionRequirement> {
    let permissions: Vec<Permission> = permissions
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(Permission::from)
        .collect();

    match (permissions.as_slice(), all) {
        ([], _) => None,
        ([single], _) => Some(PermissionRequirement::One(single.clone())),
        (_, true) => Some(PermissionRequirement::All(permissions)),
        (_, false) => Some(PermissionRequirement::Any(permissions)),
    }
}
