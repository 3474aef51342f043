//! Gas planning
//!
//! Computes the gas price and gas limit for a pending submission from live
//! network conditions, the retry attempt number, and the shared adaptive
//! multiplier. Evaluated fresh per attempt so retries react to current
//! congestion.

use std::sync::Arc;
use tracing::debug;

use crate::adaptive::AdaptiveController;
use crate::chain::ChainClient;
use crate::config::GasConfig;
use crate::utils::helpers::{gwei_to_wei, wei_to_gwei};

/// Gas parameters for one submission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPlan {
    pub gas_limit: u64,
    /// In wei
    pub gas_price: u128,
}

pub struct GasEstimator {
    config: GasConfig,
    adaptive: Arc<AdaptiveController>,
}

impl GasEstimator {
    pub fn new(config: GasConfig, adaptive: Arc<AdaptiveController>) -> Self {
        Self { config, adaptive }
    }

    /// Produce a plan for the given attempt and batch width.
    ///
    /// A failed network gas-price read falls back to the configured floor
    /// rather than aborting the attempt.
    pub async fn estimate(
        &self,
        client: &dyn ChainClient,
        attempt: u32,
        action_count: usize,
    ) -> GasPlan {
        let multiplier = self.adaptive.gas_multiplier();

        let network_gwei = match client.gas_price().await {
            Ok(wei) => wei_to_gwei(wei),
            Err(err) => {
                debug!(error = %err, "gas price fetch failed, using configured floor");
                self.config.min_gas_price_gwei
            }
        };

        let price_gwei = self.price_gwei(network_gwei, multiplier);
        let gas_limit = self.limit_for(action_count, attempt, multiplier);

        debug!(
            network_gwei = %format!("{network_gwei:.1}"),
            price_gwei = %format!("{price_gwei:.1}"),
            gas_limit,
            attempt,
            "gas plan"
        );

        GasPlan {
            gas_limit,
            gas_price: gwei_to_wei(price_gwei),
        }
    }

    /// Gas price in gwei: network price with a 20% margin, clamped to the
    /// configured band, then scaled by the adaptive multiplier.
    pub fn price_gwei(&self, network_gwei: f64, multiplier: f64) -> f64 {
        let adjusted = (network_gwei * 1.2).clamp(
            self.config.min_gas_price_gwei,
            self.config.max_gas_price_gwei,
        );
        adjusted * multiplier
    }

    /// Gas limit: a per-batch base plus marginal cost per action, scaled up
    /// 20% per retry (state may have grown more expensive to touch) and by
    /// the adaptive multiplier, capped at the configured maximum.
    pub fn limit_for(&self, action_count: usize, attempt: u32, multiplier: f64) -> u64 {
        let base = if action_count <= 1 {
            self.config.base_gas_limit
        } else {
            self.config.batch_base_gas + self.config.per_action_gas * action_count as u64
        };
        let scaled = base as f64 * (1.0 + f64::from(attempt) * 0.2) * multiplier;
        (scaled as u64).min(self.config.max_gas_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn estimator(adaptive: Arc<AdaptiveController>) -> GasEstimator {
        GasEstimator::new(AppConfig::default_for_test().gas, adaptive)
    }

    #[test]
    fn test_price_tracks_network_with_margin() {
        // network 20 gwei, band 10..=100 -> clamp(24, 10, 100) * 1.0 = 24
        let adaptive = Arc::new(AdaptiveController::new(6));
        let mut config = AppConfig::default_for_test().gas;
        config.min_gas_price_gwei = 10.0;
        config.max_gas_price_gwei = 100.0;
        let estimator = GasEstimator::new(config, adaptive);
        assert!((estimator.price_gwei(20.0, 1.0) - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_respects_band() {
        let adaptive = Arc::new(AdaptiveController::new(6));
        let estimator = estimator(adaptive);
        // quiet network floors at the configured minimum
        assert!((estimator.price_gwei(1.0, 1.0) - 20.0).abs() < 1e-9);
        // congested network caps at the configured maximum
        assert!((estimator.price_gwei(500.0, 1.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_never_exceeds_cap_times_max_multiplier() {
        let adaptive = Arc::new(AdaptiveController::new(6));
        let estimator = estimator(adaptive);
        for network in [0.0, 5.0, 20.0, 80.0, 1000.0] {
            for multiplier in [1.0, 1.2, 1.44, 2.0] {
                let price = estimator.price_gwei(network, multiplier);
                assert!(price <= 100.0 * 2.0 + 1e-9);
                assert!(price >= 20.0 - 1e-9);
            }
        }
    }

    #[test]
    fn test_limit_scales_with_batch_and_attempt() {
        let adaptive = Arc::new(AdaptiveController::new(6));
        let estimator = estimator(adaptive);

        assert_eq!(estimator.limit_for(1, 0, 1.0), 800_000);
        // batch of 3: 1_500_000 + 3 * 700_000
        assert_eq!(estimator.limit_for(3, 0, 1.0), 3_600_000);
        // second attempt adds 20%
        assert_eq!(estimator.limit_for(1, 1, 1.0), 960_000);
        // multiplier compounds on top
        assert_eq!(estimator.limit_for(1, 1, 2.0), 1_920_000);
    }

    #[test]
    fn test_limit_capped() {
        let adaptive = Arc::new(AdaptiveController::new(6));
        let estimator = estimator(adaptive);
        assert_eq!(estimator.limit_for(12, 4, 2.0), 8_000_000);
    }
}
