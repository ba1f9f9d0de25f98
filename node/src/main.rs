// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Token Node
//!
//! Entry point for the `token-node` binary. Parses CLI arguments,
//! initializes logging, and runs one offline command against a chain
//! configuration and a sled token database.
//!
//! - `verify-genesis` — validate a snapshot, optionally seed a database
//! - `export`         — dump a database as a snapshot
//! - `balance`        — print the balances of one address
//! - `supply`         — print supplies and escrow amounts
//! - `version`        — print build version information

mod cli;
mod logging;
mod offline;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use token_protocol::storage::LedgerDb;
use token_protocol::{Address, GenesisStore, TokenConfig, TokenId, TokenMethod};

use cli::{Commands, TokenNodeCli};
use logging::LogFormat;
use offline::{OfflineFee, OfflineInterop};

fn main() -> Result<()> {
    let cli = TokenNodeCli::parse();
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&cli.log_format),
    );

    match cli.command {
        Commands::VerifyGenesis(args) => verify_genesis(args),
        Commands::Export(args) => export(args),
        Commands::Balance(args) => balance(args),
        Commands::Supply(args) => supply(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Loads the chain configuration and builds an offline ledger for it.
fn load_method(config_path: &Path) -> Result<TokenMethod> {
    let json = std::fs::read_to_string(config_path)
        .with_context(|| format!("failed to read config {}", config_path.display()))?;
    let config = TokenConfig::from_json(&json)
        .with_context(|| format!("invalid config {}", config_path.display()))?;
    let interop = Arc::new(OfflineInterop::new(&config));
    let method = TokenMethod::new(config, interop, Arc::new(OfflineFee))?;
    tracing::debug!(chain_id = %method.own_chain_id(), "ledger configured");
    Ok(method)
}

fn open_db(path: &Path) -> Result<LedgerDb> {
    let db = LedgerDb::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    tracing::info!(path = %path.display(), records = db.record_count(), "database opened");
    Ok(db)
}

fn verify_genesis(args: cli::VerifyGenesisArgs) -> Result<()> {
    let method = load_method(&args.config)?;
    let json = std::fs::read_to_string(&args.genesis)
        .with_context(|| format!("failed to read genesis {}", args.genesis.display()))?;
    let genesis = GenesisStore::from_json(&json)?;

    genesis
        .validate(method.own_chain_id())
        .context("genesis snapshot rejected")?;
    tracing::info!(
        users = genesis.user_substore.len(),
        supplies = genesis.supply_substore.len(),
        escrows = genesis.escrow_substore.len(),
        "genesis snapshot is consistent"
    );

    if let Some(db_path) = args.db {
        std::fs::create_dir_all(&db_path).with_context(|| {
            format!("failed to create database directory {}", db_path.display())
        })?;
        let mut db = open_db(&db_path)?;
        if db.is_genesis_initialized()? {
            bail!("database at {} already holds a genesis state", db_path.display());
        }
        method.init_genesis_state(&mut db, &genesis)?;
        db.mark_genesis_initialized()?;
        db.flush()?;
        println!("Genesis written to {}", db_path.display());
    } else {
        println!("Genesis snapshot is valid.");
    }
    Ok(())
}

fn export(args: cli::ExportArgs) -> Result<()> {
    let method = load_method(&args.state.config)?;
    let db = open_db(&args.state.db)?;
    method
        .verify_conservation(&db)
        .context("stored token state violates supply conservation")?;

    let json = method.export_genesis(&db)?.to_json_pretty()?;
    match args.out {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "snapshot exported");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn balance(args: cli::BalanceArgs) -> Result<()> {
    let method = load_method(&args.state.config)?;
    let db = open_db(&args.state.db)?;
    let address: Address = args.address.parse()?;
    let token_id = args
        .token
        .as_deref()
        .map(str::parse::<TokenId>)
        .transpose()?;

    let mut balances = method.get_all_balances(&db, address)?;
    if let Some(token_id) = token_id {
        balances.retain(|balance| balance.token_id == token_id);
    }
    println!("{}", serde_json::to_string_pretty(&balances)?);
    Ok(())
}

fn supply(args: cli::StateArgs) -> Result<()> {
    let method = load_method(&args.config)?;
    let db = open_db(&args.db)?;

    let supplies: Vec<_> = method
        .get_all_supplies(&db)?
        .into_iter()
        .map(|(token_id, total_supply)| {
            serde_json::json!({ "tokenId": token_id, "totalSupply": total_supply })
        })
        .collect();
    let escrows: Vec<_> = method
        .get_escrowed_amounts(&db)?
        .into_iter()
        .map(|(chain_id, token_id, amount)| {
            serde_json::json!({ "escrowChainId": chain_id, "tokenId": token_id, "amount": amount })
        })
        .collect();
    let report = serde_json::json!({ "supplies": supplies, "escrows": escrows });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("token-node {}", env!("CARGO_PKG_VERSION"));
    println!("module     {}", token_protocol::config::MODULE_NAME);
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
