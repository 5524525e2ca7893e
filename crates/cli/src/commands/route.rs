//! Route guard decisions.

use talent_ops_client::AppContext;
use talent_ops_core::route::GuardDecision;

pub fn check(ctx: &AppContext, path: &str) {
    let logged_in = ctx.session().is_logged_in();
    let resolved = ctx.routes().resolve(path);

    if let Some(route) = &resolved {
        tracing::info!(
            path = %route.path,
            name = route.name.as_deref().unwrap_or("-"),
            title = route.meta.title.as_deref().unwrap_or("-"),
            requires_auth = route.meta.requires_auth,
            permission = route.meta.permission.as_ref().map_or("-", |p| p.as_str()),
            "Route"
        );
        if let Some(permission) = &route.meta.permission
            && !ctx.permissions().has_permission(permission)
        {
            tracing::info!(%permission, "Active role lacks the declared permission; navigation is not blocked");
        }
    } else {
        tracing::info!(path, "No matching route");
    }

    match ctx.routes().guard(path, logged_in) {
        GuardDecision::Proceed => tracing::info!(logged_in, "Proceed"),
        GuardDecision::Redirect(to) => tracing::info!(logged_in, to = %to, "Redirect"),
    }
}
