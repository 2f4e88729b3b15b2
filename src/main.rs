use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "taskplan")]
#[command(version, about = "Dependency-aware task planner: order, phase and assign project tasks")]
pub struct Cli {
    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a taskplan.toml. Defaults to ./taskplan.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a full plan from a JSON input file and print it as JSON
    Plan {
        /// Plan input (tasks, edges, project_window, existing_progress, members)
        input: PathBuf,

        /// Write the plan to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Count deadlines from this date instead of the window start (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Print single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Build and cycle-check the dependency graph without planning
    Check {
        /// Plan input JSON
        input: PathBuf,
    },
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
    /// Initialize a default taskplan.toml file
    Init,
}

fn init_tracing(verbose: bool) {
    let fallback_level = if verbose { "debug" } else { "warn" };
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new(fallback_level)
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback_level))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = std::env::current_dir().context("Failed to get current directory")?;

    match &cli.command {
        Commands::Plan {
            input,
            output,
            as_of,
            compact,
        } => cmd::cmd_plan(
            &project_dir,
            cli.config.as_deref(),
            input,
            output.as_deref(),
            *as_of,
            *compact,
        )?,
        Commands::Check { input } => cmd::cmd_check(&project_dir, cli.config.as_deref(), input)?,
        Commands::Config { command } => {
            cmd::cmd_config(&project_dir, cli.config.as_deref(), command.clone())?
        }
    }

    Ok(())
}
