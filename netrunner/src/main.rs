use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

use netrunner::NetworkFile;
use netrunner_core::logging::init_logging;
use netrunner_core::staking::{new_cert_and_key, node_id_from_cert};
use netrunner_core::validation::validate_network_config;
use netrunner_core::{
    await_network_healthy, LocalNetwork, LocalNetworkOptions, Network, NetworkError,
    NetworkResult,
};
use netrunner_process::{HttpApiClientFactory, OsProcessFactory};

#[derive(Parser)]
#[command(name = "netrunner")]
#[command(about = "Run local validator-node test networks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Start a network and keep it running until Ctrl-C
    Start {
        /// YAML network file
        #[arg(long)]
        config: PathBuf,

        /// Overrides the file's health_timeout (e.g. 90s, 2m)
        #[arg(long, value_parser = humantime::parse_duration)]
        health_timeout: Option<Duration>,

        /// Orchestrator log level; RUST_LOG takes precedence
        #[arg(long, default_value = "info")]
        log_level: String,
    },
    /// Check a network file without starting anything
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
    /// Write a fresh staking key and certificate
    StakingKeys {
        /// Directory receiving staking.key and staking.crt
        #[arg(long)]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> NetworkResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            config,
            health_timeout,
            log_level,
        } => {
            init_logging(&log_level)?;
            handle_start(&config, health_timeout).await?;
        }
        Commands::Validate { config } => {
            init_logging("info")?;
            handle_validate(&config)?;
        }
        Commands::StakingKeys { out_dir } => {
            init_logging("info")?;
            handle_staking_keys(&out_dir)?;
        }
    }

    Ok(())
}

async fn handle_start(path: &Path, health_timeout: Option<Duration>) -> NetworkResult<()> {
    let file = NetworkFile::load(path)?;
    let config = file.to_network_config()?;
    let options = LocalNetworkOptions {
        root_dir: file.root_dir.clone(),
        stop_grace: file.stop_grace,
        ..Default::default()
    };

    let network =
        LocalNetwork::with_options(config, HttpApiClientFactory, OsProcessFactory, options).await?;
    tracing::info!("Network files in {}", network.root_dir().display());

    let timeout = health_timeout.unwrap_or(file.health_timeout);
    let healthy = tokio::select! {
        result = await_network_healthy(&network, timeout) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted before the network became healthy");
            return network.stop(file.stop_grace).await;
        }
    };

    if let Err(e) = healthy {
        if let Err(stop_err) = network.stop(file.stop_grace).await {
            tracing::warn!("Failed to stop unhealthy network: {}", stop_err);
        }
        return Err(e);
    }

    println!("Network '{}' is healthy", network.name());
    for name in network.get_nodes_names().await? {
        let node = network.get_node(&name).await?;
        let role = if node.is_beacon() { " (beacon)" } else { "" };
        println!("  {}{}  {}  {}", name, role, node.node_id(), node.api_uri());
    }
    println!("Press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Stopping network '{}'", network.name());
    network.stop(file.stop_grace).await
}

fn handle_validate(path: &Path) -> NetworkResult<()> {
    let file = NetworkFile::load(path)?;
    let config = file.to_network_config()?;
    validate_network_config(&config)?;

    for (i, node) in config.node_configs.iter().enumerate() {
        if !node.has_staking() {
            continue;
        }
        let node_id = node_id_from_cert(&node.staking_cert).map_err(|e| match e {
            NetworkError::Validation { field, message } => {
                NetworkError::validation(format!("node_configs[{}].{}", i, field), message)
            }
            other => other,
        })?;
        println!("  {}  {}", node_label(&node.name, i), node_id);
    }

    println!(
        "Network '{}' is valid ({} node(s))",
        config.name,
        config.node_configs.len()
    );
    Ok(())
}

fn node_label(name: &str, index: usize) -> String {
    if name.is_empty() {
        format!("<node {}>", index)
    } else {
        name.to_string()
    }
}

fn handle_staking_keys(out_dir: &Path) -> NetworkResult<()> {
    std::fs::create_dir_all(out_dir)?;

    let material = new_cert_and_key()?;
    let node_id = node_id_from_cert(&material.cert_pem)?;

    let key_path = out_dir.join("staking.key");
    let cert_path = out_dir.join("staking.crt");
    std::fs::write(&key_path, &material.key_pem)?;
    std::fs::write(&cert_path, &material.cert_pem)?;

    println!("Wrote {} and {}", key_path.display(), cert_path.display());
    println!("Node ID: {}", node_id);
    Ok(())
}
