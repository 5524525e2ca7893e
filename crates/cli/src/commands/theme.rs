//! Theme preference.

use talent_ops_client::AppContext;
use talent_ops_core::ThemeMode;

use super::CommandError;

pub fn show(ctx: &AppContext) {
    let mode = ctx.theme().mode();
    tracing::info!(
        mode = %mode,
        light_system = %mode.resolve(false),
        dark_system = %mode.resolve(true),
        "Theme"
    );
}

pub fn set(ctx: &AppContext, value: &str) -> Result<(), CommandError> {
    let mode: ThemeMode = value.parse().map_err(|_| CommandError::InvalidArgument {
        field: "theme mode",
        value: value.to_owned(),
    })?;
    ctx.theme().set_mode(mode)?;
    tracing::info!(mode = %mode, "Theme saved");
    Ok(())
}
