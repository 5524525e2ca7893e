//! Login, logout and account lookups.

use secrecy::SecretString;
use talent_ops_client::{AppContext, RegisterRequest, RegisterRole};
use talent_ops_core::UserQuery;

use super::CommandError;

pub async fn login(ctx: &AppContext, username: &str, password: String) -> Result<(), CommandError> {
    let response = ctx
        .auth()
        .login(username, SecretString::from(password))
        .await?;

    if !response.is_success() {
        return Err(CommandError::Rejected {
            code: response.code,
            message: response.message,
        });
    }

    match ctx.session().user() {
        Some(user) => tracing::info!(
            user = %user.display_name(),
            role = %user.role,
            storage = %ctx.config().storage_path.display(),
            "Logged in"
        ),
        // code 0 without a payload leaves the session untouched
        None => tracing::warn!("Server accepted the login but returned no session"),
    }
    Ok(())
}

pub fn logout(ctx: &AppContext) -> Result<(), CommandError> {
    ctx.auth().logout()?;
    tracing::info!("Logged out");
    Ok(())
}

pub async fn whoami(ctx: &AppContext, refresh: bool) -> Result<(), CommandError> {
    if !ctx.session().is_logged_in() {
        return Err(CommandError::NotLoggedIn);
    }

    if refresh {
        let response = ctx.auth().fetch_profile().await?;
        if !response.is_success() {
            tracing::warn!(code = response.code, message = %response.message, "Profile refresh failed");
        }
    }

    let Some(user) = ctx.session().user() else {
        return Err(CommandError::NotLoggedIn);
    };
    tracing::info!(
        id = %user.id,
        username = %user.username,
        name = %user.display_name(),
        email = %user.email,
        role = %user.role,
        department = user.department.as_deref().unwrap_or("-"),
        position = user.position.as_deref().unwrap_or("-"),
        "Current user"
    );
    Ok(())
}

pub fn register_request(
    username: String,
    email: String,
    password: String,
    role: Option<&str>,
    real_name: Option<String>,
    phone: Option<String>,
) -> Result<RegisterRequest, CommandError> {
    let role = role.map(parse_register_role).transpose()?;
    Ok(RegisterRequest {
        username,
        email,
        password: SecretString::from(password),
        role,
        real_name,
        phone,
    })
}

fn parse_register_role(value: &str) -> Result<RegisterRole, CommandError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "hr" => Ok(RegisterRole::Hr),
        "candidate" => Ok(RegisterRole::Candidate),
        _ => Err(CommandError::InvalidArgument {
            field: "role",
            value: value.to_owned(),
        }),
    }
}

pub async fn register(ctx: &AppContext, request: &RegisterRequest) -> Result<(), CommandError> {
    let response = ctx.auth().register(request).await?;
    tracing::info!(
        username = %request.username,
        message = %response.message,
        "Account created, log in to continue"
    );
    Ok(())
}

pub async fn users(ctx: &AppContext, page: u32, page_size: u32) -> Result<(), CommandError> {
    let response = ctx
        .auth()
        .list_users(UserQuery::new(page, page_size))
        .await?;

    let Some(listing) = response.into_success_data() else {
        tracing::info!("No users returned");
        return Ok(());
    };

    tracing::info!(
        total = listing.total,
        page = listing.page,
        page_size = listing.page_size,
        "Users"
    );
    for user in &listing.users {
        tracing::info!(
            id = %user.id,
            username = %user.username,
            email = %user.email,
            role = %user.role,
            status = %user.status,
        );
    }
    Ok(())
}
