//! Talent Ops CLI - drive the client from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password from --password or TALENT_OPS_PASSWORD)
//! tops login -u alice
//!
//! # Who am I, refreshed from the server
//! tops whoami --refresh
//!
//! # Switch the active permission role and check a permission
//! tops role switch recruiter
//! tops can talent:create talent:edit --all
//!
//! # Ask the route guard about a path
//! tops route /roles
//!
//! # Stream realtime notifications until Ctrl-C
//! tops listen --kind interview_reminder
//! ```
//!
//! # Commands
//!
//! - `login`, `logout`, `whoami`, `register`, `users` - Account and session
//! - `role` - Inspect and switch permission roles
//! - `can` - Check permissions against the active role
//! - `route` - Route guard decision for a path
//! - `theme` - Show or change the theme preference
//! - `listen` - Realtime notifications

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use talent_ops_client::{AppContext, ClientConfig};
use talent_ops_core::RoleCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "tops")]
#[command(author, version, about = "Talent Ops command-line client")]
struct Cli {
    /// Storage file (overrides `TALENT_OPS_STORAGE_PATH`)
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// Fall back to the admin role when no role has been chosen yet
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        /// Username or email
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short, long, env = "TALENT_OPS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the stored session
    Logout,
    /// Show the signed-in user
    Whoami {
        /// Reload the profile from the server first
        #[arg(long)]
        refresh: bool,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "TALENT_OPS_PASSWORD", hide_env_values = true)]
        password: String,

        /// Account type (`hr` or `candidate`)
        #[arg(short, long)]
        role: Option<String>,

        #[arg(long)]
        real_name: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },
    /// List users (admin only)
    Users {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 10)]
        page_size: u32,
    },
    /// Permission roles
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },
    /// Check permissions against the active role
    Can {
        /// Permissions, e.g. `talent:create`
        #[arg(required = true)]
        permissions: Vec<String>,

        /// Require every permission instead of any
        #[arg(long)]
        all: bool,
    },
    /// Show the guard decision for a path
    Route {
        path: String,
    },
    /// Theme preference
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
    /// Print realtime notifications until Ctrl-C
    Listen {
        /// Only this message type (default: all)
        #[arg(short, long)]
        kind: Option<String>,
    },
}

#[derive(Subcommand)]
enum RoleAction {
    /// List every role
    List,
    /// Show the active role
    Current,
    /// Activate a role by code
    Switch {
        code: String,
    },
    /// List the active role's permissions
    Permissions,
}

#[derive(Subcommand)]
enum ThemeAction {
    /// Show the saved mode
    Show,
    /// Save a mode (`light`, `dark` or `system`)
    Set {
        mode: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(log_json: bool) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "talent_ops_cli=info,talent_ops_client=info,talent_ops_core=info".into());

    let json_layer = log_json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!log_json).then(|| tracing_subscriber::fmt::layer().with_target(false));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (must be done before any TLS operations)
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(false);
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_json);

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mut config: ClientConfig) -> Result<(), CommandError> {
    if let Some(storage) = cli.storage {
        config.storage_path = storage;
    }
    if cli.demo && config.fallback_role.is_none() {
        config.fallback_role = Some(RoleCode::ADMIN.to_owned());
    }

    let ctx = AppContext::from_config(config)?;
    ctx.init()?;

    match cli.command {
        Commands::Login { username, password } => {
            commands::account::login(&ctx, &username, password).await?;
        }
        Commands::Logout => commands::account::logout(&ctx)?,
        Commands::Whoami { refresh } => commands::account::whoami(&ctx, refresh).await?,
        Commands::Register {
            username,
            email,
            password,
            role,
            real_name,
            phone,
        } => {
            let request = commands::account::register_request(
                username, email, password, role.as_deref(), real_name, phone,
            )?;
            commands::account::register(&ctx, &request).await?;
        }
        Commands::Users { page, page_size } => {
            commands::account::users(&ctx, page, page_size).await?;
        }
        Commands::Role { action } => match action {
            RoleAction::List => commands::role::list(&ctx),
            RoleAction::Current => commands::role::current(&ctx),
            RoleAction::Switch { code } => commands::role::switch(&ctx, &code)?,
            RoleAction::Permissions => commands::role::permissions(&ctx),
        },
        Commands::Can { permissions, all } => commands::role::can(&ctx, &permissions, all),
        Commands::Route { path } => commands::route::check(&ctx, &path),
        Commands::Theme { action } => match action {
            ThemeAction::Show => commands::theme::show(&ctx),
            ThemeAction::Set { mode } => commands::theme::set(&ctx, &mode)?,
        },
        Commands::Listen { kind } => commands::listen::listen(&ctx, kind.as_deref()).await?,
    }
    Ok(())
}
