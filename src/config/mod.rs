//! Configuration module
//!
//! Handles loading and validation of the application configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use alloy::primitives::Address;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub rpc: RpcConfig,
    pub wallet: WalletConfig,
    pub contracts: ContractsConfig,
    pub keeper: KeeperConfig,
    pub gas: GasConfig,
    pub oracle: OracleConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| "Failed to parse config file")?;

        config.validate()?;
        info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.rpc.primary_url).context("rpc.primary_url is not a valid URL")?;
        for fallback in &self.rpc.fallback_urls {
            url::Url::parse(fallback)
                .with_context(|| format!("invalid rpc fallback url: {fallback}"))?;
        }
        anyhow::ensure!(
            !self.wallet.private_key.trim().is_empty(),
            "wallet.private_key must be set"
        );
        self.contracts.router_address()?;
        self.contracts.access_control_address()?;
        anyhow::ensure!(
            self.keeper.order_check_interval_secs >= 1,
            "order_check_interval_secs must be >= 1"
        );
        anyhow::ensure!(
            self.keeper.liquidation_threshold_pct < 0.0,
            "liquidation_threshold_pct must be negative"
        );
        anyhow::ensure!(
            self.keeper.retry_attempts >= 1 && self.oracle.retry_attempts >= 1,
            "retry_attempts must be >= 1"
        );
        anyhow::ensure!(
            self.gas.min_gas_price_gwei > 0.0
                && self.gas.min_gas_price_gwei <= self.gas.max_gas_price_gwei,
            "gas price bounds must satisfy 0 < min <= max"
        );
        anyhow::ensure!(
            self.gas.base_gas_limit <= self.gas.max_gas_limit,
            "base_gas_limit must not exceed max_gas_limit"
        );
        anyhow::ensure!(
            self.oracle.max_batch_size >= 1,
            "oracle.max_batch_size must be >= 1"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.oracle.volatile_event_probability),
            "volatile_event_probability must be within [0, 1]"
        );
        anyhow::ensure!(
            self.oracle.max_price_change > 0.0 && self.oracle.min_price > 0.0,
            "oracle price bounds must be positive"
        );
        if self.oracle.enable_price_push {
            anyhow::ensure!(
                !self.oracle.tokens.is_empty(),
                "oracle.tokens must not be empty when price push is enabled"
            );
        }
        for (symbol, token) in &self.oracle.tokens {
            token
                .address
                .parse::<Address>()
                .with_context(|| format!("invalid address for token {symbol}"))?;
        }
        Ok(())
    }

    /// Create a default config for testing
    pub fn default_for_test() -> Self {
        let mut tokens = BTreeMap::new();
        tokens.insert(
            "ETH".to_string(),
            TokenConfig {
                address: "0x0000000000000000000000000000000000000000".to_string(),
                decimals: 18,
                initial_price: 2500.0,
            },
        );
        Self {
            rpc: RpcConfig {
                primary_url: "http://localhost:8545".to_string(),
                fallback_urls: vec![],
                request_timeout_ms: 10_000,
                receipt_timeout_secs: 60,
                receipt_poll_ms: 500,
            },
            wallet: WalletConfig {
                private_key: "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
                    .to_string(),
                expected_address: None,
            },
            contracts: ContractsConfig {
                chain_id: 31337,
                router: "0x0000000000000000000000000000000000000001".to_string(),
                access_control: "0x0000000000000000000000000000000000000002".to_string(),
            },
            keeper: KeeperConfig {
                order_check_interval_secs: 5,
                max_orders_per_cycle: 10,
                liquidation_threshold_pct: -90.0,
                retry_attempts: 3,
                retry_delay_base_ms: 10,
                diagnostics_interval_secs: 30,
                enable_order_execution: true,
                enable_position_liquidation: true,
            },
            gas: GasConfig {
                min_gas_price_gwei: 20.0,
                max_gas_price_gwei: 100.0,
                base_gas_limit: 800_000,
                batch_base_gas: 1_500_000,
                per_action_gas: 700_000,
                max_gas_limit: 8_000_000,
            },
            oracle: OracleConfig {
                enable_price_push: true,
                update_interval_secs: 5,
                max_batch_size: 6,
                retry_attempts: 5,
                retry_delay_base_ms: 10,
                volatility_multiplier: 1.0,
                enable_volatile_events: false,
                volatile_event_probability: 0.001,
                max_price_change: 0.5,
                min_price: 0.01,
                history_size: 100,
                pause_poll_secs: 3,
                tokens,
            },
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
                json_logs: false,
                metrics_port: 9090,
                enable_metrics: false,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub primary_url: String,
    #[serde(default)]
    pub fallback_urls: Vec<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_receipt_timeout")]
    pub receipt_timeout_secs: u64,
    #[serde(default = "default_receipt_poll")]
    pub receipt_poll_ms: u64,
}

fn default_request_timeout() -> u64 { 10_000 }
fn default_receipt_timeout() -> u64 { 60 }
fn default_receipt_poll() -> u64 { 500 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Keeper signing key, hex with or without 0x prefix
    pub private_key: String,
    /// Optional address to cross-check the derived keeper address against
    #[serde(default)]
    pub expected_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    pub chain_id: u64,
    pub router: String,
    pub access_control: String,
}

impl ContractsConfig {
    pub fn router_address(&self) -> Result<Address> {
        self.router
            .parse()
            .context("contracts.router is not a valid address")
    }

    pub fn access_control_address(&self) -> Result<Address> {
        self.access_control
            .parse()
            .context("contracts.access_control is not a valid address")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeeperConfig {
    #[serde(default = "default_order_check_interval")]
    pub order_check_interval_secs: u64,
    /// Upper bound on order ids considered per cycle
    #[serde(default = "default_max_orders_per_cycle")]
    pub max_orders_per_cycle: u64,
    /// Negative PnL percentage at which a position becomes liquidatable
    #[serde(default = "default_liquidation_threshold")]
    pub liquidation_threshold_pct: f64,
    #[serde(default = "default_keeper_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_keeper_retry_delay")]
    pub retry_delay_base_ms: u64,
    #[serde(default = "default_diagnostics_interval")]
    pub diagnostics_interval_secs: u64,
    #[serde(default = "default_true")]
    pub enable_order_execution: bool,
    #[serde(default = "default_true")]
    pub enable_position_liquidation: bool,
}

fn default_order_check_interval() -> u64 { 5 }
fn default_max_orders_per_cycle() -> u64 { 10 }
fn default_liquidation_threshold() -> f64 { -90.0 }
fn default_keeper_retry_attempts() -> u32 { 3 }
fn default_keeper_retry_delay() -> u64 { 2000 }
fn default_diagnostics_interval() -> u64 { 30 }
fn default_true() -> bool { true }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    #[serde(default = "default_min_gas_price")]
    pub min_gas_price_gwei: f64,
    #[serde(default = "default_max_gas_price")]
    pub max_gas_price_gwei: f64,
    /// Limit for a single-action transaction
    #[serde(default = "default_base_gas_limit")]
    pub base_gas_limit: u64,
    /// Fixed overhead of a batched transaction
    #[serde(default = "default_batch_base_gas")]
    pub batch_base_gas: u64,
    /// Marginal cost per batched action
    #[serde(default = "default_per_action_gas")]
    pub per_action_gas: u64,
    #[serde(default = "default_max_gas_limit")]
    pub max_gas_limit: u64,
}

fn default_min_gas_price() -> f64 { 20.0 }
fn default_max_gas_price() -> f64 { 100.0 }
fn default_base_gas_limit() -> u64 { 800_000 }
fn default_batch_base_gas() -> u64 { 1_500_000 }
fn default_per_action_gas() -> u64 { 700_000 }
fn default_max_gas_limit() -> u64 { 8_000_000 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_true")]
    pub enable_price_push: bool,
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_oracle_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_oracle_retry_delay")]
    pub retry_delay_base_ms: u64,
    #[serde(default = "default_volatility_multiplier")]
    pub volatility_multiplier: f64,
    #[serde(default = "default_true")]
    pub enable_volatile_events: bool,
    #[serde(default = "default_volatile_event_probability")]
    pub volatile_event_probability: f64,
    /// Per-step relative price change clamp
    #[serde(default = "default_max_price_change")]
    pub max_price_change: f64,
    #[serde(default = "default_min_price")]
    pub min_price: f64,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    /// Poll cadence while the system is emergency-paused
    #[serde(default = "default_pause_poll")]
    pub pause_poll_secs: u64,
    #[serde(default)]
    pub tokens: BTreeMap<String, TokenConfig>,
}

fn default_update_interval() -> u64 { 5 }
fn default_max_batch_size() -> usize { 6 }
fn default_oracle_retry_attempts() -> u32 { 5 }
fn default_oracle_retry_delay() -> u64 { 1000 }
fn default_volatility_multiplier() -> f64 { 1.0 }
fn default_volatile_event_probability() -> f64 { 0.001 }
fn default_max_price_change() -> f64 { 0.5 }
fn default_min_price() -> f64 { 0.01 }
fn default_history_size() -> usize { 100 }
fn default_pause_poll() -> u64 { 3 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub address: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    #[serde(default = "default_initial_price")]
    pub initial_price: f64,
}

fn default_decimals() -> u8 { 18 }
fn default_initial_price() -> f64 { 1.0 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    #[serde(default = "default_true")]
    pub enable_metrics: bool,
}

fn default_log_level() -> String { "info".to_string() }
fn default_metrics_port() -> u16 { 9090 }
