use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{AppError, AppResult};

pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://api.imgur.com/3/image";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub client_id: String,
    pub target_directory: PathBuf,
    pub manifest_path: PathBuf,
    pub upload_endpoint: String,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    /// Caps 429 waits per file; `None` keeps retrying as long as the API asks
    pub max_rate_limit_waits: Option<u32>,
    pub request_timeout_secs: u64,
    pub webp_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            target_directory: PathBuf::from("images"),
            manifest_path: PathBuf::from("imgur_data.json"),
            upload_endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            max_retries: 3,
            retry_delay_secs: 5,
            max_rate_limit_waits: None,
            request_timeout_secs: 30,
            webp_quality: 80,
        }
    }
}

impl Config {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join("Imgur Photo Uploader");

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.json"))
}

/// Load the config at `path`, or at the default location when `None`.
///
/// A missing file is created with defaults. A file that does not parse falls
/// back to defaults; a file that parses but fails validation is an error.
pub fn load_config(path: Option<&Path>) -> AppResult<Config> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => get_config_path()?,
    };

    if config_path.exists() {
        let config_str = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&config_str).unwrap_or_else(|e| {
            log::warn!("Failed to parse config file: {}. Using defaults.", e);
            Config::default()
        });

        validate_config(&config)?;

        Ok(config)
    } else {
        let default_config = Config::default();
        save_config(&config_path, &default_config)?;
        Ok(default_config)
    }
}

pub fn save_config(config_path: &Path, config: &Config) -> AppResult<()> {
    validate_config(config)?;

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // Create backup of existing config
    if config_path.exists() {
        let backup_path = config_path.with_extension("json.bak");
        if let Err(e) = fs::copy(config_path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(config_path, config_str)?;

    log::info!("Configuration saved to {}", config_path.display());
    Ok(())
}

pub fn validate_config(config: &Config) -> AppResult<()> {
    if config.max_retries == 0 || config.max_retries > 10 {
        return Err(AppError::validation("max_retries", "Must be between 1 and 10"));
    }

    if config.webp_quality == 0 || config.webp_quality > 100 {
        return Err(AppError::validation("webp_quality", "Must be between 1 and 100"));
    }

    if config.request_timeout_secs == 0 {
        return Err(AppError::validation(
            "request_timeout_secs",
            "Must be greater than 0",
        ));
    }

    if !config.upload_endpoint.starts_with("http://")
        && !config.upload_endpoint.starts_with("https://")
    {
        return Err(AppError::validation(
            "upload_endpoint",
            "Must be an http(s) URL",
        ));
    }

    if config.manifest_path.as_os_str().is_empty() {
        return Err(AppError::validation("manifest_path", "Cannot be empty"));
    }

    Ok(())
}

/// Client IDs are only checked when something is about to be uploaded.
pub fn require_client_id(config: &Config) -> AppResult<&str> {
    let client_id = config.client_id.trim();
    if client_id.is_empty() {
        return Err(AppError::validation(
            "client_id",
            "Set an Imgur client ID in the config file, --client-id or IMGUR_CLIENT_ID",
        ));
    }
    Ok(client_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.manifest_path, PathBuf::from("imgur_data.json"));
        assert!(config.max_rate_limit_waits.is_none());
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let mut config = Config::default();
        config.max_retries = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.webp_quality = 101;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.request_timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.upload_endpoint = "ftp://example.com".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "client_id": "abc123", "retry_delay_secs": 1 }"#).unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.client_id, "abc123");
        assert_eq!(config.retry_delay_secs, 1);
        assert_eq!(config.max_retries, 3);
        assert_eq!(require_client_id(&config).unwrap(), "abc123");
    }

    #[test]
    fn test_save_keeps_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        save_config(&path, &Config::default()).unwrap();

        let mut updated = Config::default();
        updated.client_id = "new".to_string();
        save_config(&path, &updated).unwrap();

        assert!(path.with_extension("json.bak").exists());
        assert_eq!(load_config(Some(&path)).unwrap().client_id, "new");
    }

    #[test]
    fn test_blank_client_id_is_rejected() {
        let mut config = Config::default();
        config.client_id = "   ".to_string();
        assert!(require_client_id(&config).is_err());
    }
}
