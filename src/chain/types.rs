//! Read-only contract record snapshots

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::helpers::wei_to_eth;

/// Order flavor as stored by the Router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    Limit,
    StopLoss,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Limit => write!(f, "LIMIT"),
            OrderKind::StopLoss => write!(f, "STOP_LOSS"),
        }
    }
}

/// Position direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

/// Snapshot of a Router order as of the query block
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub id: u64,
    pub user: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub target_price: U256,
    pub min_amount_out: U256,
    pub kind: OrderKind,
    pub is_long: bool,
    pub executed: bool,
    pub created_at: u64,
    pub self_executable: bool,
}

/// Snapshot of a leveraged position as of the query block
#[derive(Debug, Clone)]
pub struct PositionRecord {
    pub id: u64,
    pub user: Address,
    pub token: Address,
    pub collateral: U256,
    pub leverage: u64,
    pub side: PositionSide,
    pub entry_price: U256,
    pub size: U256,
    pub created_at: u64,
    pub is_open: bool,
}

impl PositionRecord {
    /// Profit/loss as a percentage of the entry price. Negative values are
    /// losses; the liquidation threshold comparison is inclusive.
    pub fn pnl_ratio(&self, current_price: U256) -> f64 {
        let entry = wei_to_eth(self.entry_price);
        let current = wei_to_eth(current_price);
        if entry <= 0.0 {
            return 0.0;
        }
        match self.side {
            PositionSide::Long => (current - entry) * 100.0 / entry,
            PositionSide::Short => (entry - current) * 100.0 / entry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::helpers::eth_to_wei;

    fn position(side: PositionSide, entry: f64) -> PositionRecord {
        PositionRecord {
            id: 1,
            user: Address::ZERO,
            token: Address::ZERO,
            collateral: eth_to_wei(10.0),
            leverage: 5,
            side,
            entry_price: eth_to_wei(entry),
            size: eth_to_wei(50.0),
            created_at: 0,
            is_open: true,
        }
    }

    #[test]
    fn test_long_pnl_sign() {
        let p = position(PositionSide::Long, 100.0);
        assert!((p.pnl_ratio(eth_to_wei(110.0)) - 10.0).abs() < 1e-9);
        assert!((p.pnl_ratio(eth_to_wei(10.0)) - -90.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_pnl_sign() {
        let p = position(PositionSide::Short, 100.0);
        assert!((p.pnl_ratio(eth_to_wei(110.0)) - -10.0).abs() < 1e-9);
        assert!((p.pnl_ratio(eth_to_wei(90.0)) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_entry_price_is_flat() {
        let p = position(PositionSide::Long, 0.0);
        assert_eq!(p.pnl_ratio(eth_to_wei(50.0)), 0.0);
    }
}
