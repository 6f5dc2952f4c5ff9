//! Keyledger CLI - register and manage verifiable username key chains.
//!
//! The CLI opens the configured store directly, keeps signing keys under
//! `~/.keyledger/keys` and pins every chain it displays in
//! `~/.keyledger/pins.json`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use keyledger_config::{Config, ResolvedConfig};

mod commands;
mod config_bridge;
mod theme;

use commands::keys::KeyRing;
use commands::{config, identity, keys, lookup, pointer};

/// Keyledger - verifiable username to key bindings
#[derive(Parser)]
#[command(name = "keyledger")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to an extra configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Keyledger home directory (keys, pins, data)
    #[arg(long, global = true, env = "KEYLEDGER_HOME")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create (or show) the key the next register or rotate will bind
    Keygen {
        /// Username the key is for
        username: String,
        /// Replace an existing pending key
        #[arg(long)]
        force: bool,
    },

    /// Claim a username with the pending key
    Register {
        /// Username to claim
        username: String,
        /// Days until the claim expires
        #[arg(long, default_value = "365")]
        days: i64,
    },

    /// Hand a username over to the pending key
    Rotate {
        /// Username to rotate
        username: String,
        /// Days until the new claim expires
        #[arg(long, default_value = "365")]
        days: i64,
    },

    /// Extend the expiry of the current claim
    Refresh {
        /// Username to refresh
        username: String,
        /// Days from now until the claim expires
        #[arg(long, default_value = "365")]
        days: i64,
    },

    /// Show and pin the key chain for a username
    Chain {
        /// Username to look up
        username: String,
    },

    /// Show the username bound to a public key
    Whois {
        /// Hex-encoded public key
        key: String,
    },

    /// List every registered username
    Users,

    /// Read or update metadata pointers
    Pointer {
        #[command(subcommand)]
        command: PointerCommands,
    },

    /// Show resolved configuration with source annotations
    Config,
}

#[derive(Subcommand)]
enum PointerCommands {
    /// Print the hash a pointer holds
    Read {
        /// Username or hex public key
        who: String,
    },
    /// Point a username's pointer at a new hash
    Write {
        /// Username whose key signs the update
        username: String,
        /// Hex-encoded hash
        hash: String,
    },
    /// Delete a username's pointer
    Delete {
        /// Username whose key signs the delete
        username: String,
    },
}

fn resolve_home(cli: &Cli) -> Result<PathBuf> {
    match &cli.home {
        Some(home) => Ok(home.clone()),
        None => Ok(keyledger_config::default_home()?),
    }
}

fn load_config(home: &Path, explicit: Option<&Path>) -> Result<ResolvedConfig> {
    Ok(Config::load_with_home(home, explicit)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let home = resolve_home(&cli)?;
    let resolved = load_config(&home, cli.config.as_deref())?;

    let mut log_config = config_bridge::to_log_config(&resolved.config);
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = keyledger_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let ring = KeyRing::new(&home);
    let cfg = &resolved.config;

    match cli.command {
        Commands::Keygen { username, force } => keys::generate_key(&ring, &username, force),
        Commands::Config => config::show_config(&resolved),
        command => {
            let ledger = Arc::new(config_bridge::open_ledger(cfg, &home)?);
            run_ledger_command(command, &ledger, &ring, cfg, &home).await
        },
    }
}

async fn run_ledger_command(
    command: Commands,
    ledger: &Arc<keyledger_ledger::Ledger>,
    ring: &KeyRing,
    cfg: &Config,
    home: &Path,
) -> Result<()> {
    let node = &**ledger;
    match command {
        Commands::Register { username, days } => {
            identity::register(node, ring, &username, days).await
        },
        Commands::Rotate { username, days } => identity::rotate(node, ring, &username, days).await,
        Commands::Refresh { username, days } => {
            identity::refresh(node, ring, &username, days).await
        },
        Commands::Chain { username } => {
            let pins = home.join("pins.json");
            lookup::show_chain(Arc::clone(ledger), &pins, cfg.ledger.max_tail_len, &username).await
        },
        Commands::Whois { key } => lookup::whois(node, &key).await,
        Commands::Users => lookup::list_users(node).await,
        Commands::Pointer { command } => handle_pointer(command, node, ring).await,
        Commands::Keygen { .. } | Commands::Config => Ok(()),
    }
}

async fn handle_pointer(
    command: PointerCommands,
    ledger: &keyledger_ledger::Ledger,
    ring: &KeyRing,
) -> Result<()> {
    match command {
        PointerCommands::Read { who } => pointer::read(ledger, ledger, &who).await,
        PointerCommands::Write { username, hash } => {
            pointer::write(ledger, ledger, ring, &username, &hash).await
        },
        PointerCommands::Delete { username } => pointer::delete(ledger, ledger, ring, &username).await,
    }
}
