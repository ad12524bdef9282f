use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stagesync::config::StagesyncConfig;
use stagesync::{ContentType, SessionId, Stage};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "stagesync")]
#[command(version, about = "Keep content pipeline sessions and workflow state in sync")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Session registry file. Overrides stagesync.toml and STAGESYNC_SESSIONS_FILE.
    #[arg(long, global = true)]
    pub sessions_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize .stagesync/ in the project
    Init,
    /// Start a new session and make it active
    New {
        /// short_video, image, carousel or story
        #[arg(long)]
        content_type: Option<ContentType>,
    },
    /// Show the active session
    Status,
    /// List all sessions, most recently updated first
    List,
    /// Make an existing session active
    Resume { id: SessionId },
    /// Open the given stage for the active session, advancing it forward
    Advance { stage: Stage },
    /// Edit one workflow field (e.g. `start.campaign_name "Summer Tour"`) and sync
    Set {
        /// `<stage>.<field>`
        field: String,
        /// JSON value; anything that doesn't parse as JSON is taken as a string
        value: String,
    },
    /// Sync and close out the active session
    Complete,
    /// Drop the active session pointer without deleting the session
    Abandon,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    stagesync::logging::init_logging(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let load_config = || {
        StagesyncConfig::with_cli_args(project_dir.clone(), cli.verbose, cli.sessions_file.clone())
    };

    match &cli.command {
        Commands::Init => cmd::cmd_init(&project_dir)?,
        Commands::New { content_type } => cmd::cmd_new(&load_config()?, *content_type)?,
        Commands::Status => cmd::cmd_status(&load_config()?)?,
        Commands::List => cmd::cmd_list(&load_config()?)?,
        Commands::Resume { id } => cmd::cmd_resume(&load_config()?, *id)?,
        Commands::Advance { stage } => cmd::cmd_advance(&load_config()?, *stage).await?,
        Commands::Set { field, value } => cmd::cmd_set(&load_config()?, field, value).await?,
        Commands::Complete => cmd::cmd_complete(&load_config()?).await?,
        Commands::Abandon => cmd::cmd_abandon(&load_config()?)?,
        Commands::Config { command } => cmd::cmd_config(&load_config()?, command.clone())?,
    }

    Ok(())
}
