//! tokenkeep - log in and register against the ticketing backend from a
//! terminal, keeping the session token between runs.

mod notifier;
mod prompt;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokenkeep_core::{
    ApiClient, Config, Entry, FormValues, LoginFlow, LoginForm, Redirect, RegistrationFlow,
    RegistrationMode, TokenStore,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notifier::TerminalNotifier;
use prompt::PromptForm;

#[derive(Parser)]
#[command(name = "tokenkeep", version, about = "Log in and register, keeping the session token")]
struct Cli {
    /// Backend base URL (overrides config and TOKENKEEP_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the session token
    Login {
        #[arg(long)]
        email: Option<String>,

        /// Keep the token across restarts
        #[arg(long)]
        remember: bool,
    },
    /// Create a new account
    Register {
        /// Post to the registration endpoint that requires a logged-in user
        #[arg(long)]
        authenticated: bool,
    },
    /// Remove the stored token
    Logout,
    /// Show whether a token is stored
    Status,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load config")?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    let store = config
        .token_store()
        .context("Failed to open token storage")?;
    let api = ApiClient::new(&config.base_url, config.request_timeout())
        .context("Failed to create API client")?;
    let notifier = Arc::new(TerminalNotifier::new());

    match cli.command {
        Command::Login { email, remember } => {
            let flow = LoginFlow::new(api, store, notifier, &config);
            login(&flow, &config, email, remember).await
        }
        Command::Register { authenticated } => {
            let mut flow = RegistrationFlow::new(api, store, notifier, &config);
            if authenticated {
                flow = flow.with_mode(RegistrationMode::Authenticated);
            }
            register(&flow, &config).await
        }
        Command::Logout => {
            let flow = LoginFlow::new(api, store, notifier, &config);
            let redirect = flow.logout().context("Failed to clear the stored token")?;
            println!("Logged out.");
            follow(&config, &redirect).await;
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => status(&store),
    }
}

async fn login(
    flow: &LoginFlow,
    config: &Config,
    email: Option<String>,
    remember: bool,
) -> Result<ExitCode> {
    if let Entry::AlreadyAuthenticated(redirect) = flow.start() {
        println!("Already logged in.");
        follow(config, &redirect).await;
        return Ok(ExitCode::SUCCESS);
    }

    let mut given = FormValues::new();
    if let Some(email) = email {
        given.set("email", email);
    }
    if remember {
        given.set("rememberMe", "true");
    }
    let form = PromptForm::new(given).with_default("email", config.last_email.as_deref());
    let form = LoginForm::read(&form);
    let email = form.credentials.email.clone();

    match flow.submit(form).await {
        Ok(redirect) => {
            if let Err(e) = Config::remember_email(&email) {
                warn!(error = %e, "Failed to save config");
            }
            follow(config, &redirect).await;
            Ok(ExitCode::SUCCESS)
        }
        // The notifier has already reported the failure
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

async fn register(flow: &RegistrationFlow, config: &Config) -> Result<ExitCode> {
    let form = PromptForm::new(FormValues::new());
    match flow.submit_form(&form).await {
        Ok(redirect) => {
            follow(config, &redirect).await;
            Ok(ExitCode::SUCCESS)
        }
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

fn status(store: &TokenStore) -> Result<ExitCode> {
    match store.load().context("Failed to read token storage")? {
        Some((_, scope)) => {
            println!("Logged in ({} storage).", scope);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("Not logged in.");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Wait out the redirect delay, then point at the landing page
async fn follow(config: &Config, redirect: &Redirect) {
    redirect.wait().await;
    info!(to = %redirect.target, "Redirect");
    println!(
        "Continue at {}{}",
        config.base_url.trim_end_matches('/'),
        redirect.target
    );
}
