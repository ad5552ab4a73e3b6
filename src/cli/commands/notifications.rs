use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::{connect, OutputFormat};
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::notify::provider_from_config;
use crate::services::NotificationService;

#[derive(Subcommand)]
pub enum NotificationCommands {
    #[command(about = "Re-address notifications queued for an email to its registered user")]
    Activate {
        #[arg(long, help = "Email address of the registered user")]
        email: String,
    },
}

pub async fn handle(cmd: NotificationCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        NotificationCommands::Activate { email } => {
            let pool = connect(config).await?;
            let service = NotificationService::new(pool.clone(), provider_from_config(&config.notifications)?);

            let result = service.activate_pending_for_email(&email).await;
            DatabaseManager::close(pool).await;
            let activated = result?;

            output_success(
                &output_format,
                &format!("Activated {} notification(s) for {}", activated, email.trim().to_lowercase()),
                Some(json!({ "activated": activated })),
            )
        }
    }
}
