//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use resxiv_core::api::{ApiSettings, AuthClient};
use resxiv_core::config::Config;
use resxiv_core::logging;

mod commands;

#[derive(Parser)]
#[command(name = "resxiv")]
#[command(version = "0.1")]
#[command(about = "ResXiv account client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    #[command(flatten)]
    Account(AccountCommands),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum AccountCommands {
    /// Log in with email and password (password is read from stdin)
    Login {
        /// Account email
        #[arg(long)]
        email: String,

        /// Keep the session after this terminal session ends
        #[arg(long, conflicts_with = "no_remember")]
        remember: bool,

        /// Keep the session only for this terminal session
        #[arg(long = "no-remember")]
        no_remember: bool,

        /// Route to continue to after login (relative paths only)
        #[arg(long, value_name = "PATH")]
        redirect: Option<String>,
    },

    /// Create an account (password and confirmation are read from stdin)
    Signup {
        /// Full name
        #[arg(long)]
        name: String,

        /// Account email
        #[arg(long)]
        email: String,

        /// Accept the terms and conditions
        #[arg(long)]
        accept_terms: bool,
    },

    /// Request a password reset link
    ForgotPassword {
        /// Account email
        #[arg(long)]
        email: String,
    },

    /// Set a new password using a reset token (password and confirmation are read from stdin)
    ResetPassword {
        /// Token from the reset link
        #[arg(long)]
        token: String,
    },

    /// Log out and remove stored tokens
    Logout,

    /// Show whether a session is active
    Status,

    /// Exchange the refresh token for a new token pair
    Refresh,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // config commands must work even when the config file is broken
    let command = match cli.command {
        Commands::Config { command } => {
            return match command {
                ConfigCommands::Path => {
                    commands::config::path();
                    Ok(())
                }
                ConfigCommands::Init => commands::config::init(),
            };
        }
        Commands::Account(command) => command,
    };

    let config = Config::load().context("load config")?;
    let _log_guard = logging::init(&config.logging)?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(command, &config).await })
}

async fn dispatch(command: AccountCommands, config: &Config) -> Result<()> {
    let settings = ApiSettings::from_config(config).context("resolve API settings")?;
    let api = AuthClient::new(&settings)?;
    tracing::debug!(base_url = api.base_url(), "using auth API");

    match command {
        AccountCommands::Login {
            email,
            remember,
            no_remember,
            redirect,
        } => {
            let remember = match (remember, no_remember) {
                (true, _) => true,
                (_, true) => false,
                _ => config.session.remember_by_default,
            };
            commands::auth::login(&api, config, &email, remember, redirect.as_deref()).await
        }
        AccountCommands::Signup {
            name,
            email,
            accept_terms,
        } => commands::auth::signup(&api, &name, &email, accept_terms).await,
        AccountCommands::ForgotPassword { email } => {
            commands::auth::forgot_password(&api, &email).await
        }
        AccountCommands::ResetPassword { token } => {
            commands::auth::reset_password(&api, &token).await
        }
        AccountCommands::Logout => commands::auth::logout(&api).await,
        AccountCommands::Status => {
            commands::auth::status(&api);
            Ok(())
        }
        AccountCommands::Refresh => commands::auth::refresh(&api).await,
    }
}
