use serde_json::json;
use sqlx::SqlitePool;

use crate::auth;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::media::MediaStore;
use crate::services::SeedService;

/// Migrations already ran when the pool was opened
pub fn migrated(output_format: &OutputFormat, config: &AppConfig) -> anyhow::Result<()> {
    output_success(
        output_format,
        &format!("Database at {} is up to date", config.database.url),
        None,
    )
}

pub async fn seed(pool: &SqlitePool, config: &AppConfig, output_format: &OutputFormat) -> anyhow::Result<()> {
    let media = MediaStore::new(&config.media);
    let summary = SeedService::new(pool.clone(), media, config.security.password_hash_cost)
        .run()
        .await?;

    output_success(
        output_format,
        &format!(
            "Seed complete: {} users, {} groups, church {}",
            summary.users_created,
            summary.groups_created,
            if summary.church_created { "created" } else { "already present" }
        ),
        Some(serde_json::to_value(&summary)?),
    )
}

pub async fn purge_tokens(pool: &SqlitePool, config: &AppConfig, output_format: &OutputFormat) -> anyhow::Result<()> {
    let Some(ttl) = config.token_ttl() else {
        return output_success(output_format, "Token expiry is disabled; nothing to purge", Some(json!({ "purged": 0 })));
    };

    let purged = auth::purge_expired(pool, Some(ttl)).await?;
    output_success(
        output_format,
        &format!("Purged {} expired tokens", purged),
        Some(json!({ "purged": purged })),
    )
}
