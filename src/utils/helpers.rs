//! Small pure helpers for unit conversions and log formatting

use alloy::primitives::{B256, U256};

/// Convert a gwei amount to wei
pub fn gwei_to_wei(gwei: f64) -> u128 {
    (gwei * 1e9).round() as u128
}

/// Convert a wei amount to gwei
pub fn wei_to_gwei(wei: u128) -> f64 {
    wei as f64 / 1e9
}

/// Convert a decimal token amount to its 1e18-scaled wei representation
pub fn eth_to_wei(amount: f64) -> U256 {
    U256::from((amount * 1e18).round() as u128)
}

/// Convert a 1e18-scaled wei amount to a decimal value
pub fn wei_to_eth(wei: U256) -> f64 {
    wei.saturating_to::<u128>() as f64 / 1e18
}

/// Abbreviated transaction hash for log lines
pub fn short_hash(hash: &B256) -> String {
    let full = format!("{hash:#x}");
    format!("{}..{}", &full[..10], &full[full.len() - 8..])
}
