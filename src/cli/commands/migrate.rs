use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::{connect, OutputFormat};
use crate::config::AppConfig;
use crate::database::DatabaseManager;

pub async fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    DatabaseManager::migrate(&pool).await?;

    let target = config
        .database
        .url
        .as_deref()
        .and_then(|url| DatabaseManager::redacted_url(url).ok())
        .unwrap_or_default();
    DatabaseManager::close(pool).await;

    output_success(
        &output_format,
        "Migrations applied",
        Some(json!({ "database": target })),
    )
}
