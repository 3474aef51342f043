//! Eligibility scanning
//!
//! Enumerates candidate orders and positions and filters to those eligible
//! for execution right now. Read-only; a failed read for one id is logged
//! and skipped so a single bad record never aborts the whole scan.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chain::{ChainClient, ChainError};
use crate::config::AppConfig;
use crate::utils::types::ActionRequest;

pub struct EligibilityScanner {
    client: Arc<dyn ChainClient>,
    config: Arc<AppConfig>,
}

impl EligibilityScanner {
    pub fn new(client: Arc<dyn ChainClient>, config: Arc<AppConfig>) -> Self {
        Self { client, config }
    }

    /// Sweep order ids up to the per-cycle cap and collect those the
    /// on-chain predicate marks executable.
    pub async fn scan_orders(&self) -> Result<Vec<ActionRequest>, ChainError> {
        let next_order_id = self.client.next_order_id().await?;
        if next_order_id <= 1 {
            debug!("no orders to check");
            return Ok(Vec::new());
        }

        // bound cycle latency on large books
        let upper = next_order_id.min(self.config.keeper.max_orders_per_cycle + 1);
        let mut eligible = Vec::new();

        for order_id in 1..upper {
            let order = match self.client.order(order_id).await {
                Ok(Some(order)) => order,
                Ok(None) => continue,
                Err(err) => {
                    warn!(order_id, error = %err, "order fetch failed, skipping");
                    continue;
                }
            };
            if order.executed {
                continue;
            }

            match self.client.should_execute_order(order_id).await {
                Ok(true) => {
                    info!(order_id, kind = %order.kind, "order eligible for execution");
                    eligible.push(ActionRequest::ExecuteOrder { order_id });
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(order_id, error = %err, "eligibility check failed, skipping");
                }
            }
        }

        Ok(eligible)
    }

    /// Sweep open positions and collect those at or past the liquidation
    /// threshold (inclusive comparison, threshold is negative).
    pub async fn scan_positions(&self) -> Result<Vec<ActionRequest>, ChainError> {
        let next_position_id = self.client.next_position_id().await?;
        if next_position_id <= 1 {
            debug!("no positions to check");
            return Ok(Vec::new());
        }

        let threshold = self.config.keeper.liquidation_threshold_pct;
        let mut eligible = Vec::new();

        for position_id in 1..next_position_id {
            let position = match self.client.position(position_id).await {
                Ok(Some(position)) => position,
                Ok(None) => continue,
                Err(err) => {
                    warn!(position_id, error = %err, "position fetch failed, skipping");
                    continue;
                }
            };
            if !position.is_open {
                continue;
            }

            let current_price = match self.client.price(position.token).await {
                Ok(price) => price,
                Err(err) => {
                    warn!(position_id, error = %err, "price fetch failed, skipping");
                    continue;
                }
            };

            let pnl = position.pnl_ratio(current_price);
            if pnl <= threshold {
                warn!(
                    position_id,
                    side = %position.side,
                    pnl_pct = %format!("{pnl:.2}"),
                    "position past liquidation threshold"
                );
                eligible.push(ActionRequest::LiquidatePosition { position_id });
            }
        }

        Ok(eligible)
    }
}
