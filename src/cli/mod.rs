pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::database::DatabaseManager;

#[derive(Parser)]
#[command(name = "church-admin")]
#[command(about = "Church API administration - migrations, demo data and accounts")]
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

    #[command(about = "Load demo accounts, church, groups and sample content (idempotent)")]
    Seed,

    #[command(about = "Create an administrator, or promote an existing account")]
    CreateAdmin {
        #[arg(long, help = "Login name")]
        username: String,
        #[arg(long, help = "E-mail address")]
        email: String,
        #[arg(long, help = "Password; replaces the current one when promoting")]
        password: String,
        #[arg(long, help = "Display name")]
        name: Option<String>,
    },

    #[command(about = "Delete tokens older than the configured TTL")]
    PurgeTokens,
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

/// Every command works on a migrated database
async fn open(config: &AppConfig) -> anyhow::Result<SqlitePool> {
    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::migrate(&pool).await?;
    Ok(pool)
}

pub async fn run(cli: Cli, config: &AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let pool = open(config).await?;

    match cli.command {
        Commands::Migrate => commands::database::migrated(&output_format, config),
        Commands::Seed => commands::database::seed(&pool, config, &output_format).await,
        Commands::PurgeTokens => commands::database::purge_tokens(&pool, config, &output_format).await,
        Commands::CreateAdmin {
            username,
            email,
            password,
            name,
        } => {
            let admin = commands::accounts::AdminAccount {
                username,
                email,
                password,
                name: name.unwrap_or_default(),
            };
            commands::accounts::create_admin(&pool, config, admin, &output_format).await
        }
    }
}
