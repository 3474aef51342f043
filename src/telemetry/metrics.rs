//! Prometheus metrics export

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

use crate::adaptive::AdaptiveSnapshot;
use crate::utils::types::ActionKind;

pub fn init_metrics(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    register_metrics();
    info!("Prometheus metrics server started on {}", addr);
    Ok(())
}

fn register_metrics() {
    // Action metrics
    describe_counter!("dex_keeper_actions_total", "Total keeper actions submitted");
    describe_counter!("dex_keeper_actions_success", "Keeper actions confirmed on-chain");
    describe_counter!("dex_keeper_actions_failed", "Keeper actions ending in a terminal failure");
    describe_counter!("dex_keeper_retries_total", "Submission attempts that entered the retry path");

    // Adaptive state
    describe_gauge!("dex_keeper_batch_size", "Current adaptive price batch size");
    describe_gauge!("dex_keeper_gas_multiplier", "Current adaptive gas multiplier");
    describe_gauge!("dex_keeper_failed_attempts", "Current adaptive failed-attempt counter");

    // Wallet
    describe_gauge!("dex_keeper_balance_eth", "Keeper wallet balance in ETH");
}

pub fn record_action_success(kind: ActionKind) {
    counter!("dex_keeper_actions_total", "kind" => kind.as_str()).increment(1);
    counter!("dex_keeper_actions_success", "kind" => kind.as_str()).increment(1);
}

pub fn record_action_failure(kind: ActionKind) {
    counter!("dex_keeper_actions_total", "kind" => kind.as_str()).increment(1);
    counter!("dex_keeper_actions_failed", "kind" => kind.as_str()).increment(1);
}

pub fn record_retry(kind: ActionKind) {
    counter!("dex_keeper_retries_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_adaptive_state(snapshot: &AdaptiveSnapshot) {
    gauge!("dex_keeper_batch_size").set(snapshot.batch_size as f64);
    gauge!("dex_keeper_gas_multiplier").set(snapshot.gas_multiplier);
    gauge!("dex_keeper_failed_attempts").set(f64::from(snapshot.failed_attempts));
}

pub fn record_keeper_balance(balance_eth: f64) {
    gauge!("dex_keeper_balance_eth").set(balance_eth);
}
