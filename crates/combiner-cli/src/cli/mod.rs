pub mod config;
pub mod listen;
pub mod rest;
pub mod search;

use clap::{Args, Parser, Subcommand};

use cb_domain::config::CombinerConfig;

/// Command-line client for the Combiner Service.
#[derive(Debug, Parser)]
#[command(name = "combiner", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Module id (overrides config and COMBINER_MODULE_ID).
    #[arg(long, global = true)]
    pub module_id: Option<String>,
    /// Service address (overrides config and COMBINER_BASE_URL).
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the persistent channel and print every event until Ctrl-C.
    Listen {
        /// Message to queue before connecting (repeatable).
        #[arg(long = "send", value_name = "MSG")]
        send: Vec<String>,
        /// Give up after this many reconnect attempts.
        #[arg(long)]
        max_reconnect_attempts: Option<u32>,
    },
    /// Filesystem operations.
    #[command(subcommand)]
    Fs(FsCommand),
    /// Document store operations, scoped to the module id.
    #[command(subcommand)]
    Db(DbCommand),
    /// Print the session token.
    Token,
    /// Search labeled contexts.
    Search(SearchArgs),
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum FsCommand {
    /// List a directory.
    Ls {
        #[arg(default_value = ".")]
        path: String,
    },
    /// Print a file.
    Read {
        path: String,
        #[arg(long)]
        encoding: Option<String>,
    },
    /// Write a file.
    Write {
        path: String,
        content: String,
        #[arg(long)]
        encoding: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Create a document from a JSON literal.
    Create { collection: String, json: String },
    /// List documents, optionally filtered by a JSON object.
    List {
        collection: String,
        #[arg(long)]
        filter: Option<String>,
    },
    Read { collection: String, id: String },
    /// Replace a document with a JSON literal.
    Update {
        collection: String,
        id: String,
        json: String,
    },
    Delete { collection: String, id: String },
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Case-insensitive substring of name, content, or tags.
    #[arg(long)]
    pub query: Option<String>,
    /// Category filter (repeatable).
    #[arg(long = "category")]
    pub categories: Vec<String>,
    /// Tag filter (repeatable).
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub limit: Option<u32>,
    /// Sort by last update, newest first.
    #[arg(long)]
    pub sort_updated: bool,
    /// With --sort-updated, oldest first.
    #[arg(long, requires = "sort_updated")]
    pub asc: bool,
    /// Answer from the bundled fixtures instead of the service.
    #[arg(long)]
    pub test_mode: bool,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the config from `$COMBINER_CONFIG` (or `combiner.toml`), apply
/// env overrides, then the command-line overrides.
pub fn load_config(global: &GlobalArgs) -> anyhow::Result<CombinerConfig> {
    let mut cfg = CombinerConfig::load_or_default()?;
    if let Some(id) = &global.module_id {
        cfg.module_id = id.clone();
    }
    if let Some(url) = &global.base_url {
        cfg.base_url = url.clone();
    }
    Ok(cfg)
}
