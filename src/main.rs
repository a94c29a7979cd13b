//! CondoChat CLI - Lightweight client for the CondoChat messaging service
//!
//! A terminal-based chat client for the condominium residents backend.

mod api;
mod config;
mod models;
mod push;
mod store;
mod tui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;

#[derive(Parser)]
#[command(name = "condochat-cli")]
#[command(about = "Lightweight CLI client for the CondoChat messaging service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration status
    Status,

    /// List contacts
    Contacts,

    /// Read messages from a conversation
    Read {
        /// Contact id (from `contacts` output)
        contact_id: u64,

        /// Maximum number of messages to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Send a message
    Send {
        /// Contact id (from `contacts` output)
        #[arg(short, long)]
        to: u64,

        /// Message content
        message: String,
    },

    /// Show the server-side unread count
    Unread,

    /// Send a typing indicator
    Typing {
        /// Contact id (from `contacts` output)
        #[arg(short, long)]
        to: u64,
    },

    /// Connect to the push channel and print events
    Listen,

    /// Launch the terminal user interface
    Tui,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The TUI installs its own subscriber (logs go to an in-app buffer, not
    // stderr), so skip the global one for that command.
    if let Commands::Tui = cli.command {
        return tui::run(cli.verbose).await;
    }

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Status => {
            print_status()?;
        }
        Commands::Contacts => {
            api::list_contacts().await?;
        }
        Commands::Read { contact_id, limit } => {
            api::read_messages(contact_id, limit).await?;
        }
        Commands::Send { to, message } => {
            tracing::info!("Sending message...");
            api::send_message(to, &message).await?;
        }
        Commands::Unread => {
            api::unread().await?;
        }
        Commands::Typing { to } => {
            api::typing(to).await?;
        }
        Commands::Listen => {
            push::listen().await?;
        }
        Commands::Tui => unreachable!("handled above"),
    }

    Ok(())
}

/// Print the configuration summary, writing a template config on first run.
fn print_status() -> Result<()> {
    let path = Config::path()?;
    if !path.exists() {
        Config::default().save()?;
        println!("Wrote template config to {}", path.display());
        println!();
    }

    let config = Config::load()?;

    println!("Backend:   {}", config.base_url);
    println!(
        "Push:      {}:{} (key {}, tls {})",
        config.push.host, config.push.port, config.push.key, config.push.tls
    );

    match config.current_user() {
        Ok(user) => {
            println!(
                "User:      {} (id {}, unit {})",
                user.display_name(),
                user.id,
                user.unit_id
            );
        }
        Err(e) => {
            println!("User:      not configured ({})", e);
        }
    }

    println!(
        "API token: {}",
        if config.api_token.is_some() {
            "present"
        } else {
            "none"
        }
    );

    Ok(())
}
