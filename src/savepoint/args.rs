use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "savepoint")]
#[command(about = "Backup and restore for MySQL, PostgreSQL, and file trees", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Savepoint home directory (overrides SAVEPOINT_HOME)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage encrypted credentials
    #[command(subcommand)]
    Vault(VaultCommands),

    /// Manage backup instances
    #[command(subcommand)]
    Instance(InstanceCommands),

    /// Run backups
    #[command(alias = "b")]
    Backup {
        /// Instance ids to back up (all enabled instances if omitted)
        #[arg(num_args = 0..)]
        instances: Vec<String>,
    },

    /// Restore an artifact
    Restore {
        /// Path to the backup artifact
        artifact: PathBuf,

        /// Restore through this instance instead of the one the
        /// artifact was dumped from (engines must match)
        #[arg(short, long)]
        instance: Option<String>,

        /// Restore into this target instead of the original one
        #[arg(short, long)]
        target: Option<String>,
    },

    /// List restorable artifacts
    #[command(name = "restore-list", alias = "artifacts")]
    RestoreList {
        /// Only show artifacts for this instance
        #[arg(short, long)]
        instance: Option<String>,
    },

    /// Check connectivity for an instance
    #[command(name = "test-connection", alias = "test")]
    TestConnection {
        /// Instance id
        id: String,
    },

    /// Apply the retention policy to stored artifacts
    Prune {
        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Show or change tool configuration
    Config {
        /// New storage root for artifacts
        #[arg(long)]
        storage_root: Option<PathBuf>,

        /// Daily backups to keep per target
        #[arg(long)]
        daily: Option<usize>,

        /// Weekly backups to keep per target
        #[arg(long)]
        weekly: Option<usize>,

        /// Monthly backups to keep per target
        #[arg(long)]
        monthly: Option<usize>,

        /// Per-target dump/restore timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum VaultCommands {
    /// Store or update a credential
    Set {
        /// Credential id (referenced by instances)
        id: String,

        /// Username
        #[arg(short, long)]
        username: String,

        /// Password (prompted if omitted)
        #[arg(short, long)]
        password: Option<String>,

        /// Free-form note
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Show a credential
    Get {
        id: String,

        /// Print the password in the clear
        #[arg(long)]
        reveal: bool,
    },

    /// Remove a credential
    #[command(alias = "rm")]
    Remove { id: String },

    /// List credentials (metadata only)
    #[command(alias = "ls")]
    List,

    /// Show vault statistics
    Info,
}

#[derive(Subcommand, Debug)]
pub enum InstanceCommands {
    /// Add or replace an instance definition
    Add {
        /// Instance id
        id: String,

        /// Engine: mysql, postgresql, or files
        #[arg(short, long)]
        engine: String,

        /// Server hostname (database engines)
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Server port (engine default if omitted)
        #[arg(long)]
        port: Option<u16>,

        /// Vault credential id
        #[arg(short, long, default_value = "")]
        credential: String,

        /// Root directory (files engine)
        #[arg(long)]
        root_path: Option<PathBuf>,

        /// Only back up these targets (overrides blacklist)
        #[arg(long, num_args = 0..)]
        whitelist: Vec<String>,

        /// Never back up these targets
        #[arg(long, num_args = 0..)]
        blacklist: Vec<String>,

        /// Require TLS for the server connection
        #[arg(long)]
        ssl: bool,
    },

    /// List configured instances
    #[command(alias = "ls")]
    List,

    /// Show one instance
    Show { id: String },

    /// Enable an instance
    Enable { id: String },

    /// Disable an instance (kept, but skipped by backups)
    Disable { id: String },

    /// Remove an instance definition
    #[command(alias = "rm")]
    Remove { id: String },
}
