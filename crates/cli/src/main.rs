use anyhow::Result;
use clap::{CommandFactory, Parser};
use color_eyre::config::HookBuilder;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod handlers;
mod wizard;

/// dropkit - manage files in a Dropbox app folder
#[derive(Parser, Debug)]
#[command(name = "dropkit")]
#[command(author = "Kev <kev@m7academy.com>")]
#[command(version = "0.1.0")]
#[command(about = "Rust CLI for basic Dropbox file operations from your terminal", long_about = None)]
struct Cli {
    /// Access token (overrides the configuration file)
    #[arg(long, global = true, env = "DROPKIT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Base URL of the RPC endpoints
    #[arg(long, global = true, env = "DROPKIT_API_URL", hide = true)]
    api_url: Option<String>,

    /// Base URL of the content endpoints
    #[arg(long, global = true, env = "DROPKIT_CONTENT_URL", hide = true)]
    content_url: Option<String>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Sub-command to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Initial setup (interactive wizard)
    Init,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List a folder recursively
    Ls {
        /// Remote folder ("" or omitted for the app root)
        path: Option<String>,
        /// Print the raw listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the latest cursor for a folder
    Cursor {
        /// Remote folder ("" or omitted for the app root)
        path: Option<String>,
    },

    /// Delete a file or folder
    Rm {
        /// Remote path
        path: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Create a folder
    Mkdir {
        /// Remote path
        path: String,
    },

    /// Upload a file, overwriting the remote copy
    Upload {
        /// Local file to upload
        file: PathBuf,
        /// Remote destination (derived from the local path when omitted)
        #[arg(short, long)]
        dest: Option<String>,
        /// Local prefix stripped before building the remote path
        #[arg(long)]
        local_root: Option<PathBuf>,
        /// Remote folder the file is placed under
        #[arg(long, default_value = "/")]
        remote_root: String,
    },

    /// Shell completion
    Completion {
        /// Shell type (bash, zsh, fish, elvish, powershell)
        shell: String,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Show the current configuration
    Show,
    /// Edit the configuration in $EDITOR
    Edit,
    /// Validate the configuration and the token
    Validate,
}

/// Route `tracing` events to stderr.
///
/// `RUST_LOG` wins, then `-v`, then `[logging].level` from the config file.
fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match verbose {
            0 => handlers::configured_log_level().unwrap_or_else(|| "warn".to_string()),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        };
        EnvFilter::new(level)
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup error handling
    if let Err(e) = HookBuilder::default().install() {
        eprintln!("Warning: Failed to install error handler: {}", e);
    }

    // Parse CLI arguments
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let conn = handlers::Connection {
        token: cli.token,
        api_url: cli.api_url,
        content_url: cli.content_url,
    };

    // Execute command
    match cli.command {
        Commands::Init => handlers::handle_init().await,
        Commands::Config { action } => {
            let action_str = match action {
                ConfigAction::Show => "show",
                ConfigAction::Edit => "edit",
                ConfigAction::Validate => "validate",
            };
            handlers::handle_config(action_str, &conn).await
        }
        Commands::Ls { path, json } => handlers::handle_ls(&conn, path.as_deref().unwrap_or(""), json).await,
        Commands::Cursor { path } => handlers::handle_cursor(&conn, path.as_deref().unwrap_or("")).await,
        Commands::Rm { path, yes } => handlers::handle_rm(&conn, &path, yes).await,
        Commands::Mkdir { path } => handlers::handle_mkdir(&conn, &path).await,
        Commands::Upload {
            file,
            dest,
            local_root,
            remote_root,
        } => handlers::handle_upload(&conn, &file, dest.as_deref(), local_root.as_deref(), &remote_root).await,
        Commands::Completion { shell } => handlers::handle_completion(&shell, &mut Cli::command()).await,
    }
}
