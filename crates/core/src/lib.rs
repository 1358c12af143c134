//! dropkit-core - Core library for the dropkit CLI
//!
//! This library wraps a subset of the Dropbox HTTP API (folder listing,
//! delete, folder creation and file upload) behind an async client, along
//! with the configuration file handling the CLI relies on.

pub mod client;
pub mod config;
pub mod error;
pub mod paths;
pub mod types;

// Re-export commonly used types
pub use client::{ClientSettings, DropboxClient, Endpoints, API_ARG_HEADER, DEFAULT_TIMEOUT};
pub use config::{config_exists, get_config_path, load_config, load_config_from, save_config, save_config_to, validate_config};
pub use config::{AdvancedConfig, Config, ConfigFile, DropboxConfig, LoggingConfig};
pub use error::{ApiResponse, Error, Result};
pub use paths::{join_remote, remote_path_for, ROOT};
pub use types::{CreateFolderOutcome, ListFolderResult, Metadata, UploadResult};
