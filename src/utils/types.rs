//! Common types used throughout the application

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::helpers::short_hash;

/// The kinds of on-chain action the keeper automates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ExecuteOrder,
    LiquidatePosition,
    PushPrice,
}

impl ActionKind {
    /// Stable label used for metrics and status maps
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::ExecuteOrder => "execute_order",
            ActionKind::LiquidatePosition => "liquidate_position",
            ActionKind::PushPrice => "push_price",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single oracle price publication for one token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceUpdate {
    pub symbol: String,
    pub token: Address,
    /// Price in wei (1e18 scale), as the Router expects it
    pub price: U256,
}

/// A unit of work produced by the scanner or the price generator,
/// consumed exactly once per attempt by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    ExecuteOrder { order_id: u64 },
    LiquidatePosition { position_id: u64 },
    PushPrice(PriceUpdate),
}

impl ActionRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::ExecuteOrder { .. } => ActionKind::ExecuteOrder,
            ActionRequest::LiquidatePosition { .. } => ActionKind::LiquidatePosition,
            ActionRequest::PushPrice(_) => ActionKind::PushPrice,
        }
    }

    /// Human-readable target identifier for logs
    pub fn target(&self) -> String {
        match self {
            ActionRequest::ExecuteOrder { order_id } => format!("order {order_id}"),
            ActionRequest::LiquidatePosition { position_id } => format!("position {position_id}"),
            ActionRequest::PushPrice(update) => update.symbol.clone(),
        }
    }
}

/// Terminal result of one action's full submission lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Receipt confirmed with success status
    Success { tx_hash: B256, gas_used: u64 },
    /// On-chain revert or failed pre-broadcast simulation; never retried
    Reverted { reason: String },
    /// The oracle circuit breaker rejected the update; signals a systemic
    /// pause rather than an action-specific problem
    CircuitBreakerTripped { reason: String },
    /// Retries exhausted without a confirmation
    SubmissionFailed { cause: String, attempts: u32 },
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success { .. })
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Success { tx_hash, gas_used } => {
                write!(f, "confirmed in {} (gas {})", short_hash(tx_hash), gas_used)
            }
            ActionOutcome::Reverted { reason } => write!(f, "reverted: {reason}"),
            ActionOutcome::CircuitBreakerTripped { reason } => {
                write!(f, "circuit breaker tripped: {reason}")
            }
            ActionOutcome::SubmissionFailed { cause, attempts } => {
                write!(f, "gave up after {attempts} attempts: {cause}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_labels() {
        assert_eq!(ActionKind::ExecuteOrder.as_str(), "execute_order");
        assert_eq!(ActionKind::PushPrice.to_string(), "push_price");
    }

    #[test]
    fn test_request_kind_and_target() {
        let request = ActionRequest::ExecuteOrder { order_id: 7 };
        assert_eq!(request.kind(), ActionKind::ExecuteOrder);
        assert_eq!(request.target(), "order 7");

        let request = ActionRequest::LiquidatePosition { position_id: 3 };
        assert_eq!(request.kind(), ActionKind::LiquidatePosition);
        assert_eq!(request.target(), "position 3");
    }

    #[test]
    fn test_outcome_success_flag() {
        let outcome = ActionOutcome::Success {
            tx_hash: B256::ZERO,
            gas_used: 21000,
        };
        assert!(outcome.is_success());

        let outcome = ActionOutcome::SubmissionFailed {
            cause: "timeout".to_string(),
            attempts: 3,
        };
        assert!(!outcome.is_success());
    }
}
