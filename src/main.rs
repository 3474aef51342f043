//! DEX Keeper
//!
//! An adaptive keeper bot for a smart-contract exchange that:
//! - Executes eligible limit and stop-loss orders
//! - Liquidates positions past their loss threshold
//! - Publishes oracle prices in adaptively sized batches
//! - Tunes its gas headroom and batch size from submission feedback

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use dex_keeper::chain::{KeeperSigner, RpcChainClient};
use dex_keeper::config::AppConfig;
use dex_keeper::keeper::KeeperService;
use dex_keeper::telemetry::{init_logging, init_metrics};
use dex_keeper::utils::types::ActionKind;

/// DEX Keeper - adaptive on-chain order, liquidation and oracle automation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override log level
    #[arg(long)]
    log_level: Option<String>,

    /// Run a single cycle of one action kind and exit
    #[arg(long, value_enum)]
    once: Option<OnceKind>,

    /// Disable order execution
    #[arg(long)]
    no_orders: bool,

    /// Disable position liquidation
    #[arg(long)]
    no_liquidations: bool,

    /// Disable oracle price publication
    #[arg(long)]
    no_price_push: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnceKind {
    Orders,
    Positions,
    Prices,
}

impl From<OnceKind> for ActionKind {
    fn from(kind: OnceKind) -> Self {
        match kind {
            OnceKind::Orders => ActionKind::ExecuteOrder,
            OnceKind::Positions => ActionKind::LiquidatePosition,
            OnceKind::Prices => ActionKind::PushPrice,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let mut config = AppConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(level) = args.log_level {
        config.telemetry.log_level = level;
    }
    if args.no_orders {
        config.keeper.enable_order_execution = false;
    }
    if args.no_liquidations {
        config.keeper.enable_position_liquidation = false;
    }
    if args.no_price_push {
        config.oracle.enable_price_push = false;
    }

    // Initialize logging
    init_logging(&config.telemetry)?;

    info!("Starting DEX Keeper v{}", env!("CARGO_PKG_VERSION"));
    info!("Order execution: {}", config.keeper.enable_order_execution);
    info!("Position liquidation: {}", config.keeper.enable_position_liquidation);
    info!("Price push: {}", config.oracle.enable_price_push);

    // Initialize metrics if enabled
    if config.telemetry.enable_metrics {
        init_metrics(config.telemetry.metrics_port)?;
        info!("Metrics server started on port {}", config.telemetry.metrics_port);
    }

    let config = Arc::new(config);

    // Signing identity
    let signer = Arc::new(KeeperSigner::from_hex(
        &config.wallet.private_key,
        config.contracts.chain_id,
    )?);
    if let Some(expected) = &config.wallet.expected_address {
        match expected.parse::<alloy::primitives::Address>() {
            Ok(address) if address != signer.address() => {
                warn!(
                    derived = %signer.address(),
                    expected = %address,
                    "keeper address mismatch"
                );
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "wallet.expected_address does not parse"),
        }
    }
    info!("Keeper address: {:#x}", signer.address());

    // Chain client
    let client = Arc::new(RpcChainClient::new(
        &config.rpc,
        config.contracts.router_address()?,
        config.contracts.access_control_address()?,
    )?);

    // Build and verify the service
    let service = Arc::new(KeeperService::new(config.clone(), client, signer)?);
    service.verify_connection().await?;

    // Manual one-shot mode
    if let Some(kind) = args.once {
        service.run_once(kind.into()).await?;
        info!("Single {:?} cycle complete", kind);
        return Ok(());
    }

    Arc::clone(&service).start();

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, gracefully stopping...");
        }
        Err(err) => {
            error!("Error listening for shutdown signal: {}", err);
        }
    }

    service.shutdown().await;
    info!("DEX Keeper stopped");
    Ok(())
}
