//! Ferrite daemon — entry point for running a ferrite node.

use clap::Parser;
use ferrite_node::{Node, NodeConfig, NodeFlags};
use ferrite_types::Networks;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ferrite-daemon", about = "Ferrite full node daemon")]
struct Cli {
    /// Network to serve: test, beta, or live.
    #[arg(long, default_value = "test")]
    network: String,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the peering port.
    #[arg(long)]
    port: Option<u16>,

    /// Generate votes with the configured representative keys.
    #[arg(long)]
    enable_voting: bool,

    /// Skip the lazy bootstrap strategy.
    #[arg(long)]
    disable_lazy_bootstrap: bool,

    /// Skip the legacy bootstrap strategy.
    #[arg(long)]
    disable_legacy_bootstrap: bool,

    /// Do not accept inbound bootstrap connections.
    #[arg(long)]
    disable_bootstrap_listener: bool,
}

fn main() -> anyhow::Result<()> {
    ferrite_utils::init_tracing();
    let cli = Cli::parse();

    let network = match cli.network.as_str() {
        "live" => Networks::Live,
        "beta" => Networks::Beta,
        _ => Networks::Test,
    };

    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)?,
        None => NodeConfig::default(),
    };
    if let Some(port) = cli.port {
        config.peering_port = port;
    }
    if cli.enable_voting {
        config.enable_voting = true;
    }

    let flags = NodeFlags {
        disable_backup: false,
        disable_lazy_bootstrap: cli.disable_lazy_bootstrap,
        disable_legacy_bootstrap: cli.disable_legacy_bootstrap,
        disable_bootstrap_listener: cli.disable_bootstrap_listener,
    };

    tracing::info!(network = network.as_str(), "starting ferrite node");
    let node = Node::new(network, config, flags)?;
    node.start();

    // Runs until the process is signalled.
    loop {
        std::thread::park();
    }
}
