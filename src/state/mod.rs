//! Shared keeper state
//!
//! Cross-loop counters and the last terminal outcome per action kind.
//! Everything here is lock-free or trivially locked; the adaptive tuning
//! state lives in its own controller.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::utils::types::{ActionKind, ActionOutcome};

#[derive(Debug, Default)]
pub struct KeeperState {
    pub order_cycles: AtomicU64,
    pub price_cycles: AtomicU64,
    pub orders_executed: AtomicU64,
    pub positions_liquidated: AtomicU64,
    pub price_pushes: AtomicU64,
    pub error_count: AtomicU64,
    running: RwLock<bool>,
    last_outcomes: DashMap<ActionKind, ActionOutcome>,
}

impl KeeperState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        *self.running.read()
    }

    pub fn set_running(&self, running: bool) {
        *self.running.write() = running;
    }

    /// Record a terminal outcome and bump the matching counters.
    pub fn record_outcome(&self, kind: ActionKind, outcome: &ActionOutcome) {
        if outcome.is_success() {
            match kind {
                ActionKind::ExecuteOrder => {
                    self.orders_executed.fetch_add(1, Ordering::Relaxed);
                }
                ActionKind::LiquidatePosition => {
                    self.positions_liquidated.fetch_add(1, Ordering::Relaxed);
                }
                ActionKind::PushPrice => {
                    self.price_pushes.fetch_add(1, Ordering::Relaxed);
                }
            }
        } else {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        self.last_outcomes.insert(kind, outcome.clone());
    }

    pub fn last_outcome(&self, kind: ActionKind) -> Option<ActionOutcome> {
        self.last_outcomes.get(&kind).map(|entry| entry.clone())
    }

    /// Last outcome per kind, rendered for the status snapshot.
    pub fn outcome_summaries(&self) -> HashMap<String, String> {
        self.last_outcomes
            .iter()
            .map(|entry| (entry.key().as_str().to_string(), entry.value().to_string()))
            .collect()
    }

    pub fn increment_errors(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;

    #[test]
    fn test_record_success_bumps_kind_counter() {
        let state = KeeperState::new();
        let outcome = ActionOutcome::Success {
            tx_hash: B256::ZERO,
            gas_used: 21000,
        };
        state.record_outcome(ActionKind::ExecuteOrder, &outcome);
        assert_eq!(state.orders_executed.load(Ordering::Relaxed), 1);
        assert_eq!(state.error_count.load(Ordering::Relaxed), 0);
        assert_eq!(
            state.last_outcome(ActionKind::ExecuteOrder),
            Some(outcome)
        );
    }

    #[test]
    fn test_record_failure_bumps_errors() {
        let state = KeeperState::new();
        let outcome = ActionOutcome::SubmissionFailed {
            cause: "timeout".to_string(),
            attempts: 3,
        };
        state.record_outcome(ActionKind::PushPrice, &outcome);
        assert_eq!(state.price_pushes.load(Ordering::Relaxed), 0);
        assert_eq!(state.error_count.load(Ordering::Relaxed), 1);
        let summaries = state.outcome_summaries();
        assert!(summaries["push_price"].contains("gave up"));
    }
}
