pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::database::DatabaseManager;

#[derive(Parser)]
#[command(name = "reschool")]
#[command(about = "ReSchool CLI - maintenance tasks for the ReSchool API database")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Invitation maintenance")]
    Invitations {
        #[command(subcommand)]
        cmd: commands::invitations::InvitationCommands,
    },

    #[command(about = "Notification maintenance")]
    Notifications {
        #[command(subcommand)]
        cmd: commands::notifications::NotificationCommands,
    },

    #[command(about = "Mint a development token signed with AUTH_JWT_SECRET")]
    Token(commands::token::TokenArgs),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = crate::config::config();

    match cli.command {
        Commands::Migrate => commands::migrate::handle(config, output_format).await,
        Commands::Invitations { cmd } => commands::invitations::handle(cmd, config, output_format).await,
        Commands::Notifications { cmd } => commands::notifications::handle(cmd, config, output_format).await,
        Commands::Token(args) => commands::token::handle(args, config, output_format),
    }
}

/// Eager pool for one-shot commands
pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    Ok(DatabaseManager::connect(&config.database).await?)
}
