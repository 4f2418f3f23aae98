use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Effective configuration: stored file values overridden by environment
/// variables (`KEYCLOAK_URL`, `KEYCLOAK_REALM`, `KEYCLOAK_CLIENT_ID`,
/// `API_URL`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub keycloak_url: Option<String>,
    pub keycloak_realm: Option<String>,
    pub keycloak_client_id: Option<String>,
    pub api_url: String,
}

impl AppConfig {
    pub fn load() -> AppResult<Self> {
        let stored = StoredConfig::load()?;

        Ok(Self {
            keycloak_url: env::var("KEYCLOAK_URL").ok().or(stored.keycloak_url),
            keycloak_realm: env::var("KEYCLOAK_REALM").ok().or(stored.keycloak_realm),
            keycloak_client_id: env::var("KEYCLOAK_CLIENT_ID")
                .ok()
                .or(stored.keycloak_client_id),
            api_url: env::var("API_URL")
                .ok()
                .or(stored.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        })
    }
}

/// On-disk configuration, managed by `mesa config init`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredConfig {
    pub keycloak_url: Option<String>,
    pub keycloak_realm: Option<String>,
    pub keycloak_client_id: Option<String>,
    pub api_url: Option<String>,
}

impl StoredConfig {
    pub fn load() -> AppResult<Self> {
        let path = config_file_path()?;
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|err| AppError::Configuration(format!("invalid config file: {err}"))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self) -> AppResult<()> {
        let path = config_file_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(&path, data)?;
        Ok(())
    }
}

pub fn config_directory() -> AppResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("mesa"))
        .ok_or_else(|| {
            AppError::Configuration("could not determine the user config directory".to_string())
        })
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}
