//! deip-node — the DEIP chain-core node binary.
//!
//! Startup sequence:
//!   1. Parse CLI args / config file into a `NodeConfig`
//!   2. Load the genesis record and build the node
//!   3. Log readiness and hand control to whatever embeds this process
//!
//! There is no P2P network and no RPC server here (§1 Non-goals) — this
//! binary exists to prove the node boots and applies genesis; a real
//! deployment embeds `deip_node::Node` behind whatever transport it needs.

use anyhow::Context;
use clap::Parser;
use tracing::info;

use deip_node::{Args, Node, NodeConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,deip_node=debug".parse().unwrap()))
        .init();

    let args = Args::parse();
    info!("deip-node starting");

    let config = NodeConfig::from_args(args).context("loading node config")?;
    let node = Node::bootstrap_from_file(config).context("bootstrapping genesis")?;

    info!(chain_id = %node.chain_id(), "node ready");
    Ok(())
}
