use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::{connect, OutputFormat};
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::notify::provider_from_config;
use crate::services::InvitationService;

#[derive(Subcommand)]
pub enum InvitationCommands {
    #[command(about = "Mark pending invitations past their expiry as expired")]
    Expire,
}

pub async fn handle(cmd: InvitationCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        InvitationCommands::Expire => {
            let pool = connect(config).await?;
            let service = InvitationService::new(
                pool.clone(),
                provider_from_config(&config.notifications)?,
                config.invitations.clone(),
            );

            let expired = service.expire_stale().await?;
            DatabaseManager::close(pool).await;

            output_success(
                &output_format,
                &format!("Expired {} invitation(s)", expired),
                Some(json!({ "expired": expired })),
            )
        }
    }
}
