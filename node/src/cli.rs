//! # CLI Interface
//!
//! Defines the command-line argument structure for `bikechain-node` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `list`, and
//! `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use bikechain_protocol::config::{DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};

/// bikechain ledger node.
///
/// Hosts the bike asset ledger over a persistent world state, serves the
/// REST and JSON-RPC API, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "bikechain-node",
    about = "bikechain asset ledger node",
    version,
    propagate_version = true
)]
pub struct BikechainCli {
    /// Log output format: "pretty" or "json".
    #[arg(
        long,
        global = true,
        env = "BIKECHAIN_LOG_FORMAT",
        default_value = "pretty"
    )]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node and serve the API.
    Run(RunArgs),
    /// Write the sample bikes into the world state.
    Init(StoreArgs),
    /// Print every record in the world state as JSON.
    List(StoreArgs),
    /// Print version information and exit.
    Version,
}

/// Location of the persistent world state.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Path to the node data directory. The store lives in `<data_dir>/db`.
    ///
    /// Created on first use if it does not exist.
    #[arg(long, short = 'd', env = "BIKECHAIN_DATA_DIR", default_value = ".bikechain")]
    pub data_dir: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Port for the REST and JSON-RPC API.
    #[arg(long, env = "BIKECHAIN_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "BIKECHAIN_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Seed the sample bikes on startup if the world state is empty.
    #[arg(long)]
    pub seed: bool,
}
