//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nshold")]
#[command(about = "Persistent namespace sets for isolated virtual devices", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding persisted namespaces
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// JSON manager configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a named namespace set
    Create {
        /// Namespace name
        name: String,

        /// Only create a mount namespace, keep the host network and IPC
        #[arg(long)]
        shared_network: bool,

        /// Latch paranoid networking inside the namespace
        #[arg(long)]
        paranoid: bool,

        /// Wait until the holder has finished its setup
        #[arg(long)]
        wait: bool,
    },

    /// Open the network namespace of a name
    Descriptor {
        /// Namespace name
        name: String,
    },

    /// Run a command inside a namespace set
    Exec {
        /// Namespace name
        name: String,

        /// Command to run
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Show namespace information
    Inspect {
        /// Namespace name
        name: Option<String>,

        /// Process ID (default: current process)
        #[arg(short, long, conflicts_with = "name")]
        pid: Option<i32>,
    },

    /// Show version information
    Version,
}
