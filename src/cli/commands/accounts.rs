use anyhow::Context;
use serde_json::json;
use sqlx::SqlitePool;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::User;
use crate::services::{AccountService, NewAccount};

pub struct AdminAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Existing accounts are matched by username and promoted in place
pub async fn create_admin(
    pool: &SqlitePool,
    config: &AppConfig,
    admin: AdminAccount,
    output_format: &OutputFormat,
) -> anyhow::Result<()> {
    if admin.password.len() < 8 {
        anyhow::bail!("Password must be at least 8 characters");
    }
    let service = AccountService::new(pool.clone(), config.security.password_hash_cost);

    let (user, action) = match User::find_by_username(pool, &admin.username).await? {
        Some(existing) => (service.promote_to_admin(existing, &admin.password).await?, "Promoted"),
        None => {
            let account = NewAccount {
                username: admin.username.clone(),
                email: admin.email.to_lowercase(),
                password: admin.password,
                first_name: admin.name,
                is_staff: true,
                is_superuser: true,
                is_admin: true,
                ..NewAccount::default()
            };
            let (user, _) = service
                .create(account, false)
                .await
                .with_context(|| format!("creating administrator {}", admin.username))?;
            (user, "Created")
        }
    };

    output_success(
        output_format,
        &format!("{} administrator {}", action, user.username),
        Some(json!({ "user_id": user.id, "username": user.username })),
    )
}
