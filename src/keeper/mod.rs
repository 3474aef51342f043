//! Keeper service
//!
//! Owns the cooperative loops: an order/position loop that checks orders
//! every cycle and positions every other cycle, and a price-push loop that
//! generates, batches, and publishes oracle prices. Loops share only the
//! adaptive controller, the state counters, and the chain client; each one
//! catches its own errors and a watch signal shuts them all down cleanly.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::adaptive::AdaptiveController;
use crate::chain::{ChainClient, KeeperSigner};
use crate::config::AppConfig;
use crate::executor::{ActionExecutor, BatchPlanner};
use crate::oracle::PriceGenerator;
use crate::scanner::EligibilityScanner;
use crate::state::KeeperState;
use crate::telemetry::metrics;
use crate::utils::helpers::wei_to_eth;
use crate::utils::types::{ActionKind, ActionOutcome};

/// Point-in-time status snapshot exposed to callers
#[derive(Debug, Clone, Serialize)]
pub struct KeeperStatus {
    pub running: bool,
    pub keeper_address: String,
    pub uptime_secs: u64,
    pub order_cycles: u64,
    pub price_cycles: u64,
    pub orders_executed: u64,
    pub positions_liquidated: u64,
    pub price_pushes: u64,
    pub error_count: u64,
    pub failed_attempts: u32,
    pub batch_size: usize,
    pub gas_multiplier: f64,
    pub last_outcomes: HashMap<String, String>,
}

pub struct KeeperService {
    config: Arc<AppConfig>,
    client: Arc<dyn ChainClient>,
    state: Arc<KeeperState>,
    adaptive: Arc<AdaptiveController>,
    scanner: EligibilityScanner,
    executor: ActionExecutor,
    planner: BatchPlanner,
    prices: PriceGenerator,
    keeper_address: alloy::primitives::Address,
    shutdown: watch::Sender<bool>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    started_at: Instant,
}

impl KeeperService {
    pub fn new(
        config: Arc<AppConfig>,
        client: Arc<dyn ChainClient>,
        signer: Arc<KeeperSigner>,
    ) -> Result<Self> {
        let adaptive = Arc::new(AdaptiveController::new(config.oracle.max_batch_size));
        let state = Arc::new(KeeperState::new());
        let scanner = EligibilityScanner::new(client.clone(), config.clone());
        let executor = ActionExecutor::new(&config, client.clone(), signer.clone(), adaptive.clone())?;
        let planner = BatchPlanner::new(adaptive.clone());
        let prices = PriceGenerator::from_config(&config.oracle)?;
        let keeper_address = signer.address();
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            config,
            client,
            state,
            adaptive,
            scanner,
            executor,
            planner,
            prices,
            keeper_address,
            shutdown,
            tasks: parking_lot::Mutex::new(Vec::new()),
            started_at: Instant::now(),
        })
    }

    /// Startup verification: the Router must answer, and the keeper wallet
    /// should be visible and funded. Fatal on failure.
    pub async fn verify_connection(&self) -> Result<()> {
        let next_order_id = self
            .client
            .next_order_id()
            .await
            .context("Router verification failed")?;
        info!(total_orders = next_order_id.saturating_sub(1), "Router verified");

        let balance = self
            .client
            .balance(self.keeper_address)
            .await
            .context("balance check failed")?;
        let balance_eth = wei_to_eth(balance);
        info!(keeper = %self.keeper_address, balance_eth = %format!("{balance_eth:.4}"), "keeper wallet");
        metrics::record_keeper_balance(balance_eth);
        if balance_eth == 0.0 {
            warn!("keeper wallet has no funds, submissions will fail");
        }

        if self
            .client
            .emergency_stopped()
            .await
            .context("emergency stop check failed")?
        {
            warn!("system is currently paused");
        }
        Ok(())
    }

    /// Spawn the configured loops. Idempotent start is not supported; call
    /// once from the binary entry point.
    pub fn start(self: Arc<Self>) {
        self.state.set_running(true);
        let mut tasks = Vec::new();

        let service = Arc::clone(&self);
        let rx = self.shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            service.order_position_loop(rx).await;
        }));

        if self.config.oracle.enable_price_push {
            let service = Arc::clone(&self);
            let rx = self.shutdown.subscribe();
            tasks.push(tokio::spawn(async move {
                service.price_push_loop(rx).await;
            }));
        }

        self.tasks.lock().extend(tasks);
        info!("Keeper service started");
    }

    /// Signal all loops to stop after their current await point.
    pub fn stop(&self) {
        self.state.set_running(false);
        let _ = self.shutdown.send(true);
        info!("Keeper service stopping");
    }

    /// Stop and wait for the loops to drain.
    pub async fn shutdown(&self) {
        self.stop();
        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }
        info!("Keeper service stopped");
    }

    pub fn status(&self) -> KeeperStatus {
        use std::sync::atomic::Ordering::Relaxed;
        let adaptive = self.adaptive.snapshot();
        KeeperStatus {
            running: self.state.is_running(),
            keeper_address: format!("{:#x}", self.keeper_address),
            uptime_secs: self.started_at.elapsed().as_secs(),
            order_cycles: self.state.order_cycles.load(Relaxed),
            price_cycles: self.state.price_cycles.load(Relaxed),
            orders_executed: self.state.orders_executed.load(Relaxed),
            positions_liquidated: self.state.positions_liquidated.load(Relaxed),
            price_pushes: self.state.price_pushes.load(Relaxed),
            error_count: self.state.error_count.load(Relaxed),
            failed_attempts: adaptive.failed_attempts,
            batch_size: adaptive.batch_size,
            gas_multiplier: adaptive.gas_multiplier,
            last_outcomes: self.state.outcome_summaries(),
        }
    }

    /// Run a single scan-and-execute cycle for one action kind.
    pub async fn run_once(&self, kind: ActionKind) -> Result<()> {
        match kind {
            ActionKind::ExecuteOrder => self.order_cycle().await,
            ActionKind::LiquidatePosition => self.position_cycle().await,
            ActionKind::PushPrice => {
                let pushed = self.price_cycle().await?;
                if !pushed {
                    warn!("system paused, no prices pushed");
                }
                Ok(())
            }
        }
    }

    // ---- loop bodies ----------------------------------------------------

    async fn order_position_loop(self: Arc<Self>, mut rx: watch::Receiver<bool>) {
        let interval = Duration::from_secs(self.config.keeper.order_check_interval_secs);
        let diagnostics_interval =
            Duration::from_secs(self.config.keeper.diagnostics_interval_secs);
        let mut cycle: u64 = 0;
        let mut last_diagnostics = Instant::now();

        info!("order/position loop started");
        loop {
            if *rx.borrow() {
                break;
            }

            if self.config.keeper.enable_order_execution {
                if let Err(err) = self.order_cycle().await {
                    error!(error = %err, "order check cycle failed");
                    self.state.increment_errors();
                }
            }

            // positions every other cycle to bound RPC load
            if self.config.keeper.enable_position_liquidation && cycle % 2 == 0 {
                if let Err(err) = self.position_cycle().await {
                    error!(error = %err, "position check cycle failed");
                    self.state.increment_errors();
                }
            }

            if last_diagnostics.elapsed() >= diagnostics_interval {
                self.log_status();
                last_diagnostics = Instant::now();
            }

            cycle += 1;
            self.state
                .order_cycles
                .store(cycle, std::sync::atomic::Ordering::Relaxed);

            tokio::select! {
                _ = sleep(interval) => {}
                _ = rx.changed() => {}
            }
        }
        info!("order/position loop stopped");
    }

    async fn price_push_loop(self: Arc<Self>, mut rx: watch::Receiver<bool>) {
        let interval = Duration::from_secs(self.config.oracle.update_interval_secs);

        info!("price push loop started");
        loop {
            if *rx.borrow() {
                break;
            }

            match self.price_cycle().await {
                Ok(true) => {
                    self.state
                        .price_cycles
                        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
                Ok(false) => {
                    // system paused: poll until it comes back or we shut down
                    if !self.wait_for_unpause(&mut rx).await {
                        break;
                    }
                    continue;
                }
                Err(err) => {
                    error!(error = %err, "price push cycle failed");
                    self.state.increment_errors();
                }
            }

            metrics::record_adaptive_state(&self.adaptive.snapshot());

            tokio::select! {
                _ = sleep(interval) => {}
                _ = rx.changed() => {}
            }
        }
        info!("price push loop stopped");
    }

    // ---- cycles ---------------------------------------------------------

    async fn order_cycle(&self) -> Result<()> {
        let requests = self.scanner.scan_orders().await?;
        let mut executed = 0u32;
        for request in &requests {
            let outcome = self.executor.execute(request).await;
            if outcome.is_success() {
                executed += 1;
            }
            self.state.record_outcome(request.kind(), &outcome);
        }
        if executed > 0 {
            info!(executed, "orders executed this cycle");
        }
        Ok(())
    }

    async fn position_cycle(&self) -> Result<()> {
        let requests = self.scanner.scan_positions().await?;
        let mut liquidated = 0u32;
        for request in &requests {
            let outcome = self.executor.execute(request).await;
            if outcome.is_success() {
                liquidated += 1;
            }
            self.state.record_outcome(request.kind(), &outcome);
        }
        if liquidated > 0 {
            info!(liquidated, "positions liquidated this cycle");
        }
        Ok(())
    }

    /// One price publication cycle. Returns `false` when the system is
    /// emergency-paused and nothing was pushed.
    async fn price_cycle(&self) -> Result<bool> {
        if self.client.emergency_stopped().await? {
            return Ok(false);
        }

        let updates = self.prices.generate_updates();
        if updates.is_empty() {
            return Ok(true);
        }

        let batches = self.planner.plan(updates);
        for batch in batches {
            let batch_len = batch.len();
            let outcome = self.executor.execute_price_batch(&batch).await;
            self.state.record_outcome(ActionKind::PushPrice, &outcome);

            match outcome {
                ActionOutcome::Success { .. } => {}
                ActionOutcome::CircuitBreakerTripped { .. } => {
                    // systemic pause signal: stop pushing until the next
                    // cycle re-checks eligibility
                    warn!("circuit breaker tripped, aborting remaining batches this cycle");
                    return Ok(true);
                }
                _ if batch_len > 1 => {
                    info!(
                        batch = batch_len,
                        "batch failed, falling back to individual updates"
                    );
                    for single in BatchPlanner::split(batch) {
                        let outcome = self.executor.execute_price_batch(&single).await;
                        self.state.record_outcome(ActionKind::PushPrice, &outcome);
                        if let ActionOutcome::CircuitBreakerTripped { .. } = outcome {
                            warn!("circuit breaker tripped during fallback, aborting cycle");
                            return Ok(true);
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(true)
    }

    /// Poll the emergency-stop flag until the system resumes. Returns
    /// `false` when shutdown was requested while waiting.
    async fn wait_for_unpause(&self, rx: &mut watch::Receiver<bool>) -> bool {
        warn!("system paused, waiting for unpause");
        let poll = Duration::from_secs(self.config.oracle.pause_poll_secs);
        loop {
            tokio::select! {
                _ = sleep(poll) => {}
                _ = rx.changed() => {
                    if *rx.borrow() {
                        return false;
                    }
                }
            }
            match self.client.emergency_stopped().await {
                Ok(false) => {
                    info!("system operational, resuming price pushes");
                    return true;
                }
                Ok(true) => {}
                Err(err) => warn!(error = %err, "pause check failed"),
            }
        }
    }

    fn log_status(&self) {
        let status = self.status();
        info!(
            uptime_secs = status.uptime_secs,
            order_cycles = status.order_cycles,
            orders_executed = status.orders_executed,
            positions_liquidated = status.positions_liquidated,
            price_pushes = status.price_pushes,
            errors = status.error_count,
            failed_attempts = status.failed_attempts,
            batch_size = status.batch_size,
            gas_multiplier = %format!("{:.2}", status.gas_multiplier),
            "keeper status"
        );
        for symbol in self.prices.symbols() {
            if let Some(stats) = self.prices.stats(&symbol) {
                debug!(
                    symbol = %symbol,
                    price = %format!("{:.6}", stats.current),
                    change_pct = %format!("{:+.2}", stats.change_pct),
                    low = %format!("{:.6}", stats.low),
                    high = %format!("{:.6}", stats.high),
                    "price feed"
                );
            }
        }
    }
}
