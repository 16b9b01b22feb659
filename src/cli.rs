use crate::types::PermissionMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the permission decision for an operation without running it
    Check(OperationArgs),

    /// Decide, record and (if allowed) run an operation
    Run(OperationArgs),

    /// List the supported tools and their risk tier under the active policy
    Tools,

    /// Print a persisted audit log
    Audit {
        /// JSONL audit file (defaults to `audit.log_file` from the settings)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
pub struct OperationArgs {
    /// Operation name, e.g. read_file
    #[arg(long)]
    pub tool: String,

    /// Parameters as a JSON object
    #[arg(long, default_value = "{}")]
    pub params: String,

    /// Free text from the requester; scanned for the confirmation code
    #[arg(short, long, default_value = "")]
    pub justification: String,
}

/// Define the application arguments
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (defaults to <config dir>/aegis/settings.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the configured permission mode
    #[arg(short, long)]
    pub mode: Option<PermissionMode>,

    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn parse() -> Self {
        <Args as Parser>::parse()
    }
}
