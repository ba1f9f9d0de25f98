//! # CLI Interface
//!
//! Defines the command-line argument structure for `token-node` using
//! `clap` derive. Every subcommand works on a chain configuration (JSON)
//! and, where state is involved, a sled database directory.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Offline tooling for the token ledger.
///
/// Validates genesis snapshots, seeds and inspects a persistent token
/// store, and exports it back to a snapshot.
#[derive(Parser, Debug)]
#[command(
    name = "token-node",
    about = "Token ledger genesis and inspection tool",
    version,
    propagate_version = true
)]
pub struct TokenNodeCli {
    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "TOKEN_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the token node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a genesis snapshot, and optionally write it to a database.
    VerifyGenesis(VerifyGenesisArgs),
    /// Export the token state of a database as a genesis snapshot.
    Export(ExportArgs),
    /// Print the balances of one address.
    Balance(BalanceArgs),
    /// Print total supplies and escrow amounts.
    Supply(StateArgs),
    /// Print version information and exit.
    Version,
}

/// Chain configuration and database location shared by state commands.
#[derive(Args, Debug)]
pub struct StateArgs {
    /// Path to the chain configuration file (JSON).
    #[arg(long, short = 'c', env = "TOKEN_CONFIG")]
    pub config: PathBuf,

    /// Path to the token database directory.
    #[arg(long, short = 'd', env = "TOKEN_DB")]
    pub db: PathBuf,
}

/// Arguments for the `verify-genesis` subcommand.
#[derive(Args, Debug)]
pub struct VerifyGenesisArgs {
    /// Path to the chain configuration file (JSON).
    #[arg(long, short = 'c', env = "TOKEN_CONFIG")]
    pub config: PathBuf,

    /// Path to the genesis snapshot (JSON).
    #[arg(long, short = 'g')]
    pub genesis: PathBuf,

    /// Database directory to initialize with the snapshot.
    ///
    /// Without it the snapshot is only validated.
    #[arg(long, short = 'd', env = "TOKEN_DB")]
    pub db: Option<PathBuf>,
}

/// Arguments for the `export` subcommand.
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub state: StateArgs,

    /// Output file. Prints to stdout when omitted.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

/// Arguments for the `balance` subcommand.
#[derive(Args, Debug)]
pub struct BalanceArgs {
    #[command(flatten)]
    pub state: StateArgs,

    /// Hex-encoded 20-byte address.
    #[arg(long, short = 'a')]
    pub address: String,

    /// Hex-encoded 8-byte token id. Prints every token when omitted.
    #[arg(long, short = 't')]
    pub token: Option<String>,
}
