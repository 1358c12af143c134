//! Command handlers for dropkit CLI

use crate::wizard::run_init_wizard;
use anyhow::Result;
use clap::Command;
use clap_complete::{generate, Shell as ClapShell};
use console::style;
use dropkit_core::{
    config_exists, get_config_path, load_config, remote_path_for, validate_config, ConfigFile,
    CreateFolderOutcome, DropboxClient, Error,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tabled::{Table, Tabled};
use tracing::debug;

/// Connection overrides given on the command line or through the environment
#[derive(Debug, Default)]
pub struct Connection {
    pub token: Option<String>,
    pub api_url: Option<String>,
    pub content_url: Option<String>,
}

impl Connection {
    /// The config file with the overrides applied on top
    fn config(&self) -> Result<ConfigFile> {
        let mut config = match load_config() {
            Ok(config) => config,
            Err(Error::ConfigNotFound(_)) => ConfigFile::default(),
            Err(e) => return Err(e.into()),
        };

        if let Some(token) = &self.token {
            config.dropbox.access_token = Some(token.clone());
        }
        if let Some(url) = &self.api_url {
            config.dropbox.api_url = url.clone();
        }
        if let Some(url) = &self.content_url {
            config.dropbox.content_url = url.clone();
        }

        debug!(
            api_url = %config.dropbox.api_url,
            content_url = %config.dropbox.content_url,
            token_from_cli = self.token.is_some(),
            "resolved configuration"
        );

        Ok(config)
    }

    fn client(&self) -> Result<DropboxClient> {
        let config = self.config()?;

        if config.dropbox.access_token.is_none() {
            return Err(anyhow::anyhow!(
                "No access token configured.\n\
                 Run 'dropkit init', pass --token or set DROPKIT_TOKEN.\n\
                 Generate a token from: https://www.dropbox.com/developers/apps"
            ));
        }

        Ok(DropboxClient::from_config(&config)?)
    }
}

/// Log level from the config file, when there is one
pub fn configured_log_level() -> Option<String> {
    if !config_exists() {
        return None;
    }
    load_config().ok()?.log_level().map(str::to_string)
}

/// Handle init command
pub async fn handle_init() -> Result<()> {
    run_init_wizard().await
}

/// Handle config commands
pub async fn handle_config(action: &str, conn: &Connection) -> Result<()> {
    match action {
        "show" => {
            println!("Current configuration:");
            println!();

            let config = conn.config()?;

            println!("Dropbox:");
            println!(
                "  Access token: {}",
                config.dropbox.access_token.as_deref().map(mask_token).unwrap_or_else(|| "not set".to_string())
            );
            println!("  API URL: {}", config.dropbox.api_url);
            println!("  Content URL: {}", config.dropbox.content_url);
            println!();
            println!("Advanced:");
            println!("  Timeout: {}s", config.timeout_secs());
            println!("  Log level: {}", config.log_level().unwrap_or("warn"));

            Ok(())
        }
        "validate" => {
            println!("Validating configuration...");

            let config = conn.config()?;

            validate_config(&config)?;
            println!("  ✅ Valid configuration format");

            println!("  Testing Dropbox connection...");
            let client = conn.client()?;

            // Cheapest call that still needs a valid token
            client.get_latest_cursor("").await?;

            println!("  ✅ Token accepted by Dropbox!");

            Ok(())
        }
        "edit" => {
            println!("Opening editor...");
            println!("  File: ~/.config/dropkit/config.toml");
            println!();

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
            let config_path = get_config_path()?;

            let status = std::process::Command::new(editor).arg(&config_path).status()?;

            if status.success() {
                println!("  ✅ Configuration edited");

                let config = load_config()?;
                validate_config(&config)?;
                println!("  ✅ Configuration valid");
            } else {
                println!("  ⚠️  Editor exited with error");
            }

            Ok(())
        }
        _ => {
            println!("Unknown action: {}", action);
            println!("Available actions: show, edit, validate");
            Ok(())
        }
    }
}

/// Handle ls command
pub async fn handle_ls(conn: &Connection, path: &str, json: bool) -> Result<()> {
    let client = conn.client()?;

    let spinner = spinner(format!("Listing '{}'...", display_remote(path)))?;
    let listing = client.list_folder(path, None).await;
    spinner.finish_and_clear();
    let listing = listing?;

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if listing.entries.is_empty() {
        println!("  Empty folder");
        return Ok(());
    }

    #[derive(Tabled)]
    struct EntryRow {
        kind: String,
        path: String,
        size: String,
        modified: String,
    }

    let rows: Vec<EntryRow> = listing
        .entries
        .iter()
        .map(|e| EntryRow {
            kind: e.tag.clone().unwrap_or_else(|| "-".to_string()),
            path: e.display_path().to_string(),
            size: e.size().map(format_bytes).unwrap_or_else(|| "-".to_string()),
            modified: e.server_modified().map(format_date).unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    println!("{}", Table::new(rows));
    println!();
    println!("{} entries", listing.entries.len());

    Ok(())
}

/// Handle cursor command
pub async fn handle_cursor(conn: &Connection, path: &str) -> Result<()> {
    let client = conn.client()?;

    let cursor = client.get_latest_cursor(path).await?;
    println!("{}", cursor);

    Ok(())
}

/// Handle rm command
pub async fn handle_rm(conn: &Connection, path: &str, yes: bool) -> Result<()> {
    let client = conn.client()?;

    if !yes {
        use dialoguer::{theme::ColorfulTheme, Confirm};

        println!("⚠️  Warning: you are about to delete '{}'", path);
        println!("  Folders are deleted with everything inside them.");

        let confirm = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Delete?")
            .default(false)
            .interact()?;

        if !confirm {
            println!("❌ Cancelled");
            return Ok(());
        }
    }

    let metadata = client.delete(path).await?;
    println!("  ✅ Deleted: {}", metadata.display_path());

    Ok(())
}

/// Handle mkdir command
pub async fn handle_mkdir(conn: &Connection, path: &str) -> Result<()> {
    let client = conn.client()?;

    match client.create_folder(path).await? {
        CreateFolderOutcome::Created(metadata) => {
            println!("  ✅ Folder created: {}", metadata.display_path());
        }
        CreateFolderOutcome::Conflict(body) => {
            let summary = body
                .get("error_summary")
                .and_then(|s| s.as_str())
                .unwrap_or("conflict");
            println!(
                "  {} {}",
                style("⚠️  Folder already exists:").yellow(),
                path
            );
            println!("  Dropbox said: {}", summary);
        }
    }

    Ok(())
}

/// Handle upload command
pub async fn handle_upload(
    conn: &Connection,
    file: &Path,
    dest: Option<&str>,
    local_root: Option<&Path>,
    remote_root: &str,
) -> Result<()> {
    if !file.is_file() {
        return Err(anyhow::anyhow!("File not found: {}", file.display()));
    }

    let dest = match dest {
        Some(dest) => dest.to_string(),
        None => remote_path_for(file, local_root, remote_root)?,
    };

    let client = conn.client()?;
    let file_size = file.metadata()?.len();

    println!("Uploading {} -> {}...", file.display(), dest);
    println!("  Size: {}", format_bytes(file_size));

    let spinner = spinner("Uploading...".to_string())?;
    let result = client.upload_file(file, Some(&dest)).await;
    spinner.finish_and_clear();

    match result {
        Ok(uploaded) => {
            let shown = uploaded
                .metadata()
                .map(|m| m.display_path().to_string())
                .unwrap_or(dest);
            println!("  ✅ Upload complete: {}", shown);
            Ok(())
        }
        Err(Error::RateLimit(resp)) => Err(anyhow::anyhow!(
            "Upload rejected by Dropbox ({}).\n\
             Wait a moment and retry{}",
            resp,
            resp.retry_after
                .as_deref()
                .map(|s| format!(" (Retry-After: {}s)", s))
                .unwrap_or_default()
        )),
        Err(e) => Err(e.into()),
    }
}

/// Handle shell completion generation
pub async fn handle_completion(shell: &str, cmd: &mut Command) -> Result<()> {
    use std::io;

    let clap_shell = match shell {
        "bash" => ClapShell::Bash,
        "zsh" => ClapShell::Zsh,
        "fish" => ClapShell::Fish,
        "elvish" => ClapShell::Elvish,
        "powershell" | "pwsh" => ClapShell::PowerShell,
        _ => {
            return Err(anyhow::anyhow!(
                "Unsupported shell: {}\nSupported shells: bash, zsh, fish, elvish, powershell",
                shell
            ));
        }
    };

    generate(clap_shell, cmd, "dropkit", &mut io::stdout());

    Ok(())
}

fn spinner(message: String) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Show only the start of a token
fn mask_token(token: &str) -> String {
    match token.get(..6) {
        Some(prefix) if token.len() > 10 => format!("{}...", prefix),
        _ => "***".to_string(),
    }
}

fn display_remote(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// Format ISO date string to readable format
fn format_date(iso_date: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(iso_date) {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => iso_date.to_string(),
    }
}

/// Format bytes to human-readable size
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}
