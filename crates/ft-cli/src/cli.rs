//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::observe::ObserveArgs;
use crate::commands::report::ReportArgs;
use crate::commands::tag::TagArgs;

/// Focus tracker.
///
/// Samples which application or browser tab has focus and reports where
/// the time went.
#[derive(Debug, Parser)]
#[command(name = "ft", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the sampling loop until interrupted.
    Track,

    /// Record a single observation, e.g. from a window manager hook.
    Observe(ObserveArgs),

    /// Show usage by application, tag or web domain.
    Report(ReportArgs),

    /// Stop tracking an application and delete its history.
    Block {
        /// Exact application name.
        app: String,
    },

    /// Resume tracking a blocked application.
    Unblock {
        /// Exact application name.
        app: String,
    },

    /// List blocked applications.
    Blocked,

    /// Tag an application, or clear its tag.
    Tag(TagArgs),

    /// List tags and their applications.
    Tags,

    /// Show the current session of each track.
    Status,

    /// Delete all sessions, applications and block list entries.
    Drop {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}
