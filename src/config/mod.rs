use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub max_request_size_bytes: usize,
    /// Applied to list endpoints when the client sends no `limit`; 0 means unbounded.
    pub default_page_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_allow_all: bool,
    pub cors_origins: Vec<String>,
    /// Token lifetime measured from issuance. 0 disables expiry.
    pub token_ttl_hours: i64,
    pub password_hash_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub root: PathBuf,
    pub url_prefix: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var("DATABASE_URL") {
            self.database.url = url;
        }
        override_from_env("DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections);
        override_from_env("DATABASE_CONNECTION_TIMEOUT", &mut self.database.connection_timeout);

        if let Ok(host) = env::var("API_HOST") {
            self.api.host = host;
        }
        // PORT is what most hosting platforms inject
        override_from_env("PORT", &mut self.api.port);
        override_from_env("API_PORT", &mut self.api.port);
        override_from_env("API_MAX_REQUEST_SIZE_BYTES", &mut self.api.max_request_size_bytes);
        override_from_env("API_DEFAULT_PAGE_LIMIT", &mut self.api.default_page_limit);

        override_from_env("SECURITY_CORS_ALLOW_ALL", &mut self.security.cors_allow_all);
        if let Ok(list) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = list
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect();
        }
        override_from_env("SECURITY_TOKEN_TTL_HOURS", &mut self.security.token_ttl_hours);
        override_from_env("SECURITY_PASSWORD_HASH_COST", &mut self.security.password_hash_cost);

        if let Ok(root) = env::var("MEDIA_ROOT") {
            self.media.root = PathBuf::from(root);
        }
        if let Ok(prefix) = env::var("MEDIA_URL") {
            self.media.url_prefix = prefix;
        }

        self
    }

    /// Local SQLite file, permissive CORS, non-expiring tokens and a cheap hash
    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: "sqlite://church.db?mode=rwc".to_string(),
                max_connections: 5,
                connection_timeout: 30,
            },
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                max_request_size_bytes: 10 * MIB,
                default_page_limit: 0,
            },
            security: SecurityConfig {
                cors_allow_all: true,
                cors_origins: vec!["http://localhost:8081".to_string(), "http://localhost:19006".to_string()],
                token_ttl_hours: 0,
                password_hash_cost: 4,
            },
            media: MediaConfig {
                root: PathBuf::from("media"),
                url_prefix: "/media/".to_string(),
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::deployed("sqlite://church.db?mode=rwc", "https://staging.iasd.local");
        config.environment = Environment::Staging;
        config.database.max_connections = 10;
        config.database.connection_timeout = 10;
        config.api.max_request_size_bytes = 10 * MIB;
        config.api.default_page_limit = 200;
        config.security.token_ttl_hours = 24 * 7;
        config
    }

    fn production() -> Self {
        let mut config = Self::deployed(
            "sqlite:///var/lib/church-api/church.db?mode=rwc",
            "https://app.iasd.local",
        );
        config.media.root = PathBuf::from("/var/lib/church-api/media");
        config
    }

    /// Shared shape of the non-development presets; production values by default
    fn deployed(database_url: &str, origin: &str) -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: database_url.to_string(),
                max_connections: 20,
                connection_timeout: 5,
            },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                max_request_size_bytes: 5 * MIB,
                default_page_limit: 100,
            },
            security: SecurityConfig {
                cors_allow_all: false,
                cors_origins: vec![origin.to_string()],
                token_ttl_hours: 24 * 3,
                password_hash_cost: bcrypt::DEFAULT_COST,
            },
            media: MediaConfig {
                root: PathBuf::from("media"),
                url_prefix: "/media/".to_string(),
            },
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Token lifetime, or `None` when tokens never expire.
    pub fn token_ttl(&self) -> Option<chrono::Duration> {
        (self.security.token_ttl_hours > 0)
            .then(|| chrono::Duration::hours(self.security.token_ttl_hours))
    }
}

/// Read once, on first use, by the binaries
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

/// Unparseable values leave the preset in place
fn override_from_env<T: FromStr>(name: &str, target: &mut T) {
    if let Some(value) = env::var(name).ok().and_then(|raw| raw.trim().parse().ok()) {
        *target = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_preset_never_expires_tokens() {
        let config = AppConfig::development();
        assert!(config.security.cors_allow_all);
        assert_eq!(config.security.token_ttl_hours, 0);
        assert!(config.token_ttl().is_none());
    }

    #[test]
    fn production_preset_is_locked_down() {
        let config = AppConfig::production();
        assert!(!config.security.cors_allow_all);
        assert_eq!(config.api.default_page_limit, 100);
        assert_eq!(config.token_ttl(), Some(chrono::Duration::hours(72)));
    }

    #[test]
    fn staging_differs_from_production_only_where_set() {
        let staging = AppConfig::staging();
        let production = AppConfig::production();
        assert!(matches!(staging.environment, Environment::Staging));
        assert_eq!(staging.api.default_page_limit, 200);
        assert_eq!(staging.api.host, production.api.host);
        assert_eq!(staging.security.password_hash_cost, production.security.password_hash_cost);
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let mut config = AppConfig::development();
        config.api.port = 9123;
        assert_eq!(config.bind_addr(), "127.0.0.1:9123");
    }
}
