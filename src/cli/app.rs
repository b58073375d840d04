//! Main CLI application structure

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::output::{Output, OutputFormat};
use super::{delete, deploy, graph};
use crate::logging::{self, LogFormat};
use crate::storage::Settings;

#[derive(Parser)]
#[command(name = "cac")]
#[command(author, version, about = "Dependency-aware deployment of configuration as code")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Log format; defaults to the `log_format` setting
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy the configs of a manifest
    Deploy(DeployArgs),

    /// Delete the objects listed in a delete file
    Delete(DeleteArgs),

    /// Print the dependency graph of every environment in DOT format
    Graph(GraphArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    /// Path to the manifest
    pub manifest: PathBuf,

    /// Projects to deploy, together with the projects they depend on (default: all)
    #[arg(long = "project", short = 'p')]
    pub projects: Vec<String>,

    /// Environments to deploy to (default: all)
    #[arg(long = "environment", short = 'e')]
    pub environments: Vec<String>,

    /// Keep deploying after a config fails
    #[arg(long, short = 'c')]
    pub continue_on_error: bool,

    /// Resolve and render everything without deploying
    #[arg(long, short = 'd')]
    pub dry_run: bool,

    /// Deploy independent components concurrently; defaults to the `parallel_deploy` setting
    #[arg(
        long,
        env = "CAC_PARALLEL_DEPLOY",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub parallel: Option<bool>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Path to the manifest
    pub manifest: PathBuf,

    /// Delete file listing the objects to delete
    #[arg(long)]
    pub file: PathBuf,

    /// Environments to delete from (default: all)
    #[arg(long = "environment", short = 'e')]
    pub environments: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct GraphArgs {
    /// Path to the manifest
    pub manifest: PathBuf,

    /// Environments to include (default: all)
    #[arg(long = "environment", short = 'e')]
    pub environments: Vec<String>,
}

impl Commands {
    fn manifest(&self) -> &Path {
        match self {
            Commands::Deploy(args) => &args.manifest,
            Commands::Delete(args) => &args.manifest,
            Commands::Graph(args) => &args.manifest,
        }
    }
}

/// Main entry point for the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.format);

    let settings = Settings::load(Some(cli.command.manifest()))?;
    logging::init(cli.verbose, cli.log_format.unwrap_or(settings.log_format));

    for source in &settings.sources {
        debug!(path = %source.display(), "Loaded settings");
    }

    match cli.command {
        Commands::Deploy(args) => deploy::run(args, &settings, &output).await?,
        Commands::Delete(args) => delete::run(args, &output).await?,
        Commands::Graph(args) => graph::run(args, &output)?,
    }

    Ok(())
}
