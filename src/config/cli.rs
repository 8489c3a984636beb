use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "ui-bundle")]
#[command(about = "Stage front-end assets and package them into a zip bundle")]
pub struct CliArgs {
    /// Path to TOML configuration file (defaults to bundle.toml when present)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the project root from the config
    #[arg(long)]
    pub root: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Action {
    /// Delete the build directory
    Clean,
    /// Clean, run every asset task, then package the staging directory
    Build,
    /// Same as build
    Bundle,
    /// Run a single asset task into the staging directory
    Task {
        /// Task name, e.g. styles
        name: String,
    },
    /// Rebuild whenever a source file changes
    Watch {
        /// Run a full build before watching
        #[arg(long)]
        initial_build: bool,
    },
    /// Show what a build would copy, without writing anything
    Plan {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

impl CliArgs {
    /// The requested action; a bare invocation builds.
    pub fn action(&self) -> Action {
        self.command.clone().unwrap_or(Action::Build)
    }
}
