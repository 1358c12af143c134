//! Interactive setup wizard for dropkit configuration

use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};
use dropkit_core::{save_config, AdvancedConfig, ConfigFile, DropboxConfig, LoggingConfig};
use indicatif::{ProgressBar, ProgressStyle};

/// Run the interactive setup wizard
pub async fn run_init_wizard() -> Result<()> {
    println!("🚀 Welcome to dropkit setup!\n");

    println!("This wizard will guide you through the configuration process.");
    println!("You will need an access token for your Dropbox app:");
    println!("  1. Open https://www.dropbox.com/developers/apps and create an app");
    println!("  2. In the app settings, under 'OAuth 2', click 'Generate'\n");

    // Step 1: Access token
    let access_token = prompt_access_token()?;

    // Step 2: Request timeout
    let timeout = prompt_timeout()?;

    // Summary
    println!("\n📋 Configuration summary:");
    println!("  Access token: {}...", access_token.chars().take(6).collect::<String>());
    println!("  Timeout: {}s", timeout);

    let confirm = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Save this configuration?")
        .default(false)
        .interact()?;

    if !confirm {
        println!("❌ Configuration cancelled");
        return Ok(());
    }

    let config = ConfigFile {
        dropbox: DropboxConfig {
            access_token: Some(access_token),
            ..DropboxConfig::default()
        },
        advanced: Some(AdvancedConfig { timeout }),
        logging: Some(LoggingConfig::default()),
    };

    let pb = ProgressBar::new(1);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message("Saving configuration...");

    save_config(&config)?;

    pb.inc(1);
    pb.finish_with_message("✅ Configuration saved!");

    println!("\n🎉 Setup complete!");
    println!("\nConfiguration saved to: ~/.config/dropkit/config.toml");
    println!("\nYou can now use dropkit:");
    println!("  $ dropkit ls");
    println!("  $ dropkit upload notes.md --dest /notes.md");
    println!("  $ dropkit config validate");

    Ok(())
}

/// Prompt for the access token
fn prompt_access_token() -> Result<String> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Access token")
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Access token cannot be empty")
            } else if input.chars().any(|c| c.is_whitespace() || c.is_control()) {
                Err("Access token cannot contain whitespace")
            } else {
                Ok(())
            }
        })
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to get access token: {}", e))
}

/// Prompt for the request timeout in seconds
fn prompt_timeout() -> Result<u64> {
    Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Request timeout (seconds)")
        .default(30u64)
        .validate_with(|input: &u64| -> Result<(), &str> {
            if *input == 0 || *input > 600 {
                Err("Timeout must be between 1 and 600 seconds")
            } else {
                Ok(())
            }
        })
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to get timeout: {}", e))
}
