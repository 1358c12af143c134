//! Configuration management for dropkit

use crate::error::{Error, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration directory name
const CONFIG_DIR: &str = "dropkit";

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Default base URL for metadata (RPC) endpoints
pub const DEFAULT_API_URL: &str = "https://api.dropboxapi.com/2";

/// Default base URL for content (upload/download) endpoints
pub const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com/2";

/// Longest request timeout accepted from the config file, in seconds
const MAX_TIMEOUT: u64 = 600;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub dropbox: DropboxConfig,
    pub advanced: Option<AdvancedConfig>,
    pub logging: Option<LoggingConfig>,
}

/// Dropbox account and endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropboxConfig {
    // Generated from the app console, never fetched by dropkit itself
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_content_url")]
    pub content_url: String,
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_url: default_api_url(),
            content_url: default_content_url(),
        }
    }
}

/// Advanced configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ConfigFile {
    /// Request timeout in seconds, falling back to the default
    pub fn timeout_secs(&self) -> u64 {
        self.advanced
            .as_ref()
            .map(|a| a.timeout)
            .unwrap_or_else(default_timeout)
    }

    /// Log level from the file, if a logging section is present
    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().map(|l| l.level.as_str())
    }
}

// Default values
fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_content_url() -> String {
    DEFAULT_CONTENT_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let home = home_dir().ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))?;
    let config_dir = home.join(".config").join(CONFIG_DIR);

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
    }

    Ok(config_dir)
}

/// Get the configuration file path
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE))
}

/// Load configuration from the default location
pub fn load_config() -> Result<ConfigFile> {
    load_config_from(&get_config_path()?)
}

/// Load configuration from a specific file
pub fn load_config_from(config_path: &Path) -> Result<ConfigFile> {
    if !config_path.exists() {
        return Err(Error::ConfigNotFound(config_path.to_path_buf()));
    }

    let content = fs::read_to_string(config_path)
        .map_err(|e| Error::InvalidConfig(format!("Failed to read config file: {}", e)))?;

    let config: ConfigFile = toml::from_str(&content)
        .map_err(|e| Error::InvalidConfig(format!("Failed to parse config file: {}", e)))?;

    Ok(config)
}

/// Save configuration to the default location
pub fn save_config(config: &ConfigFile) -> Result<()> {
    save_config_to(&get_config_path()?, config)
}

/// Save configuration to a specific file
pub fn save_config_to(config_path: &Path, config: &ConfigFile) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::InvalidConfig(format!("Failed to serialize config: {}", e)))?;

    fs::write(config_path, content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

    // The file holds a bearer token: owner read/write only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(config_path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(config_path, perms)?;
    }

    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &ConfigFile) -> Result<()> {
    if let Some(token) = &config.dropbox.access_token {
        if token.trim().is_empty() {
            return Err(Error::InvalidInput("Access token cannot be empty".to_string()));
        }
    }

    for (name, url) in [
        ("api_url", &config.dropbox.api_url),
        ("content_url", &config.dropbox.content_url),
    ] {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(Error::InvalidInput(format!(
                "{} must be an http(s) URL, got '{}'",
                name, url
            )));
        }
    }

    let timeout = config.timeout_secs();
    if timeout == 0 || timeout > MAX_TIMEOUT {
        return Err(Error::InvalidInput(format!(
            "Timeout must be between 1 and {} seconds (got {})",
            MAX_TIMEOUT, timeout
        )));
    }

    Ok(())
}

/// Check if configuration exists
pub fn config_exists() -> bool {
    get_config_path().map(|p| p.exists()).unwrap_or(false)
}

/// Public alias for ConfigFile (used by lib.rs)
pub use ConfigFile as Config;

#[cfg(test)]
mod tests {
    use super::*;

    fn make_valid_config() -> ConfigFile {
        ConfigFile {
            dropbox: DropboxConfig {
                access_token: Some("sl.test_token".to_string()),
                ..DropboxConfig::default()
            },
            advanced: None,
            logging: None,
        }
    }

    #[test]
    fn test_validate_config_valid() {
        let config = make_valid_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_config_without_token() {
        // The token may come from the command line instead
        let mut config = make_valid_config();
        config.dropbox.access_token = None;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_config_blank_token() {
        let mut config = make_valid_config();
        config.dropbox.access_token = Some("   ".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_bad_url() {
        let mut config = make_valid_config();
        config.dropbox.content_url = "content.dropboxapi.com/2".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_timeout_bounds() {
        let mut config = make_valid_config();

        config.advanced = Some(AdvancedConfig { timeout: 0 });
        assert!(validate_config(&config).is_err());

        config.advanced = Some(AdvancedConfig { timeout: 601 });
        assert!(validate_config(&config).is_err());

        config.advanced = Some(AdvancedConfig { timeout: 600 });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config: ConfigFile = toml::from_str("[dropbox]\naccess_token = \"abc\"\n").unwrap();

        assert_eq!(config.dropbox.access_token.as_deref(), Some("abc"));
        assert_eq!(config.dropbox.api_url, DEFAULT_API_URL);
        assert_eq!(config.dropbox.content_url, DEFAULT_CONTENT_URL);
        assert_eq!(config.timeout_secs(), 30);
        assert_eq!(config.log_level(), None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut config = make_valid_config();
        config.logging = Some(LoggingConfig { level: "debug".to_string() });

        save_config_to(&path, &config).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded.dropbox.access_token, config.dropbox.access_token);
        assert_eq!(loaded.log_level(), Some("debug"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        assert!(matches!(load_config_from(&path), Err(Error::ConfigNotFound(_))));
    }
}
