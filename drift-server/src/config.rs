//! Configuration module

use std::env;
use std::str::FromStr;

use drift_core::CatalogMissPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown DRIFT_STORAGE_DRIVER {0:?} (expected memory, fs or postgres)")]
    UnknownDriver(String),

    #[error("unknown DRIFT_AUTH_MODE {0:?} (expected none or token)")]
    UnknownAuthMode(String),

    #[error("DRIFT_AUTH_MODE=token requires DRIFT_API_TOKEN")]
    MissingToken,

    #[error("postgres storage requires DATABASE_URL")]
    MissingDatabaseUrl,

    #[error("unknown DRIFT_CATALOG_MISS {0:?} (expected drop or surface)")]
    UnknownCatalogMiss(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageDriver {
    Memory,
    Fs,
    Postgres,
}

impl FromStr for StorageDriver {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StorageDriver::Memory),
            "fs" | "file" => Ok(StorageDriver::Fs),
            "postgres" => Ok(StorageDriver::Postgres),
            other => Err(ConfigError::UnknownDriver(other.to_string())),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Scenario catalog JSON
    pub catalog_path: String,

    /// memory | fs | postgres
    pub storage_driver: String,

    /// Root directory for the fs driver
    pub data_dir: String,

    /// Required for the postgres driver
    pub database_url: Option<String>,

    /// Bearer token; enables auth when set
    pub api_token: Option<String>,

    /// none | token, derived from `api_token` when unset
    pub auth_mode: String,

    /// drop | surface
    pub catalog_miss: String,

    /// Artifact export key prefix
    pub artifact_prefix: String,

    /// Environment (development, production)
    pub environment: String,

    /// text | json
    pub log_format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let api_token = non_empty_var("DRIFT_API_TOKEN");
        let default_auth = if api_token.is_some() { "token" } else { "none" };

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8085),

            catalog_path: env::var("DRIFT_CATALOG_PATH")
                .unwrap_or_else(|_| "catalog/demo-catalog.json".to_string()),

            storage_driver: env::var("DRIFT_STORAGE_DRIVER")
                .unwrap_or_else(|_| "memory".to_string()),

            data_dir: env::var("DRIFT_DATA_DIR")
                .unwrap_or_else(|_| ".drift-data".to_string()),

            database_url: non_empty_var("DATABASE_URL"),

            auth_mode: non_empty_var("DRIFT_AUTH_MODE")
                .unwrap_or_else(|| default_auth.to_string()),

            api_token,

            catalog_miss: env::var("DRIFT_CATALOG_MISS")
                .unwrap_or_else(|_| "drop".to_string()),

            artifact_prefix: env::var("DRIFT_ARTIFACT_PREFIX")
                .unwrap_or_else(|_| "stricture".to_string()),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "text".to_string()),
        }
    }

    /// Reject combinations the server cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let driver: StorageDriver = self.storage_driver.parse()?;
        if driver == StorageDriver::Postgres && self.database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        match self.auth_mode.trim().to_lowercase().as_str() {
            "none" => {}
            "token" if self.api_token.is_none() => return Err(ConfigError::MissingToken),
            "token" => {}
            other => return Err(ConfigError::UnknownAuthMode(other.to_string())),
        }

        self.catalog_miss
            .parse::<CatalogMissPolicy>()
            .map_err(|_| ConfigError::UnknownCatalogMiss(self.catalog_miss.clone()))?;
        Ok(())
    }

    /// Parsed driver; memory when invalid (call `validate` first)
    pub fn driver(&self) -> StorageDriver {
        self.storage_driver.parse().unwrap_or(StorageDriver::Memory)
    }

    /// Token required on API routes
    pub fn auth_token(&self) -> Option<&str> {
        if self.auth_mode.trim().eq_ignore_ascii_case("token") {
            self.api_token.as_deref()
        } else {
            None
        }
    }

    pub fn miss_policy(&self) -> CatalogMissPolicy {
        self.catalog_miss.parse().unwrap_or_default()
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.trim().eq_ignore_ascii_case("json")
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
impl Config {
    /// Defaults without touching the process environment
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            catalog_path: "catalog/demo-catalog.json".to_string(),
            storage_driver: "memory".to_string(),
            data_dir: ".drift-data".to_string(),
            database_url: None,
            api_token: None,
            auth_mode: "none".to_string(),
            catalog_miss: "drop".to_string(),
            artifact_prefix: "stricture".to_string(),
            environment: "test".to_string(),
            log_format: "text".to_string(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
