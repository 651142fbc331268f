use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "blurg")]
#[command(about = "Keep a timestamped diary, locally or on a shared server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the diaries (defaults to $BLURG_HOME or ~/.blurg)
    #[arg(long, global = true, value_name = "PATH")]
    pub base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log an entry to the current diary
    Log {
        /// Entry text (read from stdin when omitted)
        text: Vec<String>,
        /// Author to record instead of the default
        #[arg(long)]
        author: Option<String>,
    },
    /// Remove entries from the current diary
    Rm {
        /// Entry ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// List entries in the current diary
    Ls {
        /// Only show entries by this author
        #[arg(long)]
        author: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Switch to a diary, creating it if needed
    Switch {
        /// Diary name
        name: String,
        /// Create the diary on this server
        #[arg(long, value_name = "URL", requires = "user")]
        remote: Option<String>,
        /// Username to register the remote diary under
        #[arg(long, value_name = "NAME", requires = "remote")]
        user: Option<String>,
    },
    /// List known diaries
    Diaries,
    /// Permanently delete a diary
    Wipe {
        /// Diary name
        name: String,
    },
    /// Connect to an existing remote diary
    Connect {
        /// Server URL
        #[arg(long, value_name = "URL")]
        remote: String,
        /// Username to log entries as
        #[arg(long, value_name = "NAME")]
        user: String,
        /// Secret diary key
        #[arg(long, value_name = "KEY")]
        key: String,
    },
    /// Print the secret key of the current remote diary
    Key,
    /// Move a local diary to a server
    Promote {
        /// Diary name
        name: String,
        /// Server URL
        #[arg(long, value_name = "URL")]
        remote: String,
        /// Username to register the diary under
        #[arg(long, value_name = "NAME")]
        user: String,
    },
    /// Move a remote diary back to local files
    Demote {
        /// Diary name
        name: String,
    },
    /// Show the oldest entries across all diaries
    Feed {
        /// Number of entries to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}
