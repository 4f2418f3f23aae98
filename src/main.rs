mod cache;
mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod services;
mod session;
mod workflow;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::cmd::auth::{self, LoginArgs};
use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::submit::{self, SubmitArgs};
use crate::cmd::tickets::{self, ShowArgs};
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::{ApiErrorKind, AppError, AppResult};
use crate::infra::api::ApiClient;
use crate::infra::http::build_client;
use crate::infra::keycloak::KeycloakClient;
use crate::services::TokenSource;
use crate::session::{SessionManager, SessionStore};

#[derive(Parser)]
#[command(name = "mesa", author, version, about = "Support ticket client for a Redmine-backed help desk")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in against the configured SSO realm.
    Login(LoginArgs),
    /// Clear the stored session and invalidate it remotely.
    Logout,
    /// Create a support ticket.
    Submit(SubmitArgs),
    /// List the tickets belonging to the current session.
    List,
    /// Show one ticket with its history and attachments.
    Show(ShowArgs),
    /// Manage CLI configuration.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run().await {
        match &error {
            AppError::Api {
                kind: ApiErrorKind::Warning,
                message,
            } => eprintln!("Warning: {message}"),
            _ => eprintln!("Error: {error}"),
        }
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();

    // Configuration management must work even when the config file itself
    // is broken, so it runs before anything else is assembled.
    let command = match cli.command {
        Commands::Config(args) => return config_cmd::run(args.command),
        command => command,
    };

    let config = AppConfig::load()?;

    if config.keycloak_url.is_none() {
        eprintln!("Warning: Keycloak URL not configured; login and token refresh will fail.");
    }
    if config.keycloak_realm.is_none() {
        eprintln!("Warning: Keycloak realm not configured; login and token refresh will fail.");
    }
    if config.keycloak_client_id.is_none() {
        eprintln!("Warning: Keycloak client id not configured; login and token refresh will fail.");
    }

    let http = build_client()?;
    let identity = Arc::new(KeycloakClient::new(
        http.clone(),
        config.keycloak_url.clone(),
        config.keycloak_realm.clone(),
        config.keycloak_client_id.clone(),
    ));

    let session = Arc::new(SessionManager::new(SessionStore::open()?, identity));
    session.initialize().await?;
    Arc::clone(&session).spawn_refresh_task().await;

    let support_desk = Arc::new(ApiClient::new(
        http,
        config.api_url.clone(),
        Arc::clone(&session) as Arc<dyn TokenSource>,
    ));
    let context = AppContext::new(config, Arc::clone(&session), support_desk);

    let result = match command {
        Commands::Login(args) => auth::login(&context, args).await,
        Commands::Logout => auth::logout(&context).await,
        Commands::Submit(args) => submit::run(&context, args).await,
        Commands::List => tickets::list(&context).await,
        Commands::Show(args) => tickets::show(&context, args).await,
        Commands::Config(_) => Ok(()), // handled above
    };

    session.stop_refresh_task().await;
    result
}
