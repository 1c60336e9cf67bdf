//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "killtrack", about = "boss kill count and pet drop tracker")]
pub struct Cli {
    /// Record file (default: $XDG_DATA_HOME/killtrack/kills.json)
    #[arg(long, short = 's', global = true, env = "KILLTRACK_STORE")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Poll the chat source and record kills until interrupted
    Run(RunOpts),
    /// Print all stored records as a table
    Show,
    /// Write the plain-text export listing
    Export(ExportOpts),
    /// Delete all stored records
    Clear,
}

#[derive(clap::Args)]
pub struct RunOpts {
    /// Poll interval in milliseconds
    #[arg(long, default_value = "450")]
    pub poll_interval_ms: u64,

    /// Number of most recent chat lines considered per poll
    #[arg(long, default_value = "30")]
    pub window: usize,

    /// Host helper program that prints the visible chat lines
    #[arg(long, env = "KILLTRACK_CHAT_CMD")]
    pub chat_cmd: Option<String>,

    /// Argument passed to --chat-cmd (repeatable)
    #[arg(long = "chat-arg", allow_hyphen_values = true)]
    pub chat_args: Vec<String>,

    /// Kill --chat-cmd if it runs longer than this many milliseconds
    #[arg(long, default_value = "2000")]
    pub chat_timeout_ms: u64,

    /// Chat dump file kept up to date by the host
    #[arg(long, env = "KILLTRACK_CHAT_FILE")]
    pub chat_file: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ExportOpts {
    /// Output file (default: ./killtrack_export_<date>.txt)
    #[arg(long, short = 'o', conflicts_with = "stdout")]
    pub out: Option<PathBuf>,

    /// Print to stdout instead of writing a file
    #[arg(long)]
    pub stdout: bool,
}

/// Default record file location, per-user.
pub fn default_store_path() -> PathBuf {
    if let Ok(dir) = std::env::var("XDG_DATA_HOME")
        && !dir.is_empty()
    {
        return PathBuf::from(dir).join("killtrack").join("kills.json");
    }
    if let Ok(home) = std::env::var("HOME")
        && !home.is_empty()
    {
        return PathBuf::from(home)
            .join(".local/share/killtrack")
            .join("kills.json");
    }
    PathBuf::from("killtrack-kills.json")
}
