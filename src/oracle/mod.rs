//! Oracle price generation
//!
//! Random-walk price feed for every configured token: per-token volatility
//! derived from the initial price tier, rare volatile events, a per-step
//! change clamp, and a hard price floor. Keeps a bounded history per symbol
//! for the periodic status line.

use alloy::primitives::Address;
use dashmap::DashMap;
use parking_lot::RwLock;
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use tracing::info;

use crate::config::OracleConfig;
use crate::utils::helpers::eth_to_wei;
use crate::utils::types::PriceUpdate;

/// A token the generator publishes prices for
#[derive(Debug, Clone)]
pub struct TokenFeed {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
    pub volatility: f64,
}

/// Summary derived from the recent history of one symbol
#[derive(Debug, Clone, Copy)]
pub struct PriceStats {
    pub current: f64,
    pub change_pct: f64,
    pub low: f64,
    pub high: f64,
    pub samples: usize,
}

/// Bounded ring of (price, timestamp millis) samples
#[derive(Debug)]
pub struct PriceHistory {
    samples: VecDeque<(f64, i64)>,
    max_size: usize,
}

impl PriceHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_size),
            max_size: max_size.max(2),
        }
    }

    pub fn push(&mut self, price: f64) {
        self.samples
            .push_back((price, chrono::Utc::now().timestamp_millis()));
        if self.samples.len() > self.max_size {
            self.samples.pop_front();
        }
    }

    pub fn stats(&self) -> Option<PriceStats> {
        if self.samples.len() < 2 {
            return None;
        }
        let current = self.samples[self.samples.len() - 1].0;
        let previous = self.samples[self.samples.len() - 2].0;
        let change_pct = (current - previous) / previous * 100.0;

        let recent: Vec<f64> = self
            .samples
            .iter()
            .rev()
            .take(24)
            .map(|(price, _)| *price)
            .collect();
        Some(PriceStats {
            current,
            change_pct,
            low: recent.iter().cloned().fold(f64::INFINITY, f64::min),
            high: recent.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            samples: self.samples.len(),
        })
    }
}

pub struct PriceGenerator {
    tokens: Vec<TokenFeed>,
    config: OracleConfig,
    current: RwLock<HashMap<String, f64>>,
    history: DashMap<String, PriceHistory>,
}

impl PriceGenerator {
    pub fn from_config(config: &OracleConfig) -> anyhow::Result<Self> {
        let mut tokens = Vec::with_capacity(config.tokens.len());
        let mut current = HashMap::new();
        let history = DashMap::new();

        for (symbol, token) in &config.tokens {
            let address: Address = token
                .address
                .parse()
                .map_err(|e| anyhow::anyhow!("token {symbol}: {e}"))?;
            tokens.push(TokenFeed {
                symbol: symbol.clone(),
                address,
                decimals: token.decimals,
                volatility: default_volatility(token.initial_price),
            });
            current.insert(symbol.clone(), token.initial_price);
            history.insert(symbol.clone(), PriceHistory::new(config.history_size));
        }

        Ok(Self {
            tokens,
            config: config.clone(),
            current: RwLock::new(current),
            history,
        })
    }

    pub fn symbols(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.symbol.clone()).collect()
    }

    /// Advance every feed one step and return the updates to publish.
    pub fn generate_updates(&self) -> Vec<PriceUpdate> {
        let mut rng = rand::thread_rng();
        let mut prices = self.current.write();
        let mut updates = Vec::with_capacity(self.tokens.len());

        for feed in &self.tokens {
            let current = prices.get(&feed.symbol).copied().unwrap_or(1.0);
            let next = self.next_price(feed, current, &mut rng);
            prices.insert(feed.symbol.clone(), next);
            if let Some(mut history) = self.history.get_mut(&feed.symbol) {
                history.push(next);
            }
            updates.push(PriceUpdate {
                symbol: feed.symbol.clone(),
                token: feed.address,
                price: eth_to_wei(next),
            });
        }

        updates
    }

    fn next_price(&self, feed: &TokenFeed, current: f64, rng: &mut impl Rng) -> f64 {
        let mut volatility = feed.volatility * self.config.volatility_multiplier;

        if self.config.enable_volatile_events
            && rng.gen::<f64>() < self.config.volatile_event_probability
        {
            volatility *= rng.gen_range(2.0..5.0);
            info!(symbol = %feed.symbol, "volatile event");
        }

        let change = ((rng.gen::<f64>() - 0.5) * 2.0 * volatility)
            .clamp(-self.config.max_price_change, self.config.max_price_change);

        (current * (1.0 + change)).max(self.config.min_price)
    }

    pub fn stats(&self, symbol: &str) -> Option<PriceStats> {
        self.history.get(symbol).and_then(|history| history.stats())
    }
}

/// Volatility tier by price magnitude, matching how the exchange's majors,
/// mid-caps and stables behave.
pub fn default_volatility(base_price: f64) -> f64 {
    if base_price >= 10_000.0 {
        0.04
    } else if base_price >= 10.0 {
        0.05
    } else if base_price <= 2.0 {
        0.001
    } else {
        0.03
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_volatility_tiers() {
        assert_eq!(default_volatility(45_000.0), 0.04);
        assert_eq!(default_volatility(25.0), 0.05);
        assert_eq!(default_volatility(1.0), 0.001);
        assert_eq!(default_volatility(5.0), 0.03);
    }

    #[test]
    fn test_generate_updates_covers_all_tokens() {
        let config = AppConfig::default_for_test().oracle;
        let generator = PriceGenerator::from_config(&config).expect("config parses");
        let updates = generator.generate_updates();
        assert_eq!(updates.len(), config.tokens.len());
        for update in &updates {
            assert!(update.price > alloy::primitives::U256::ZERO);
        }
    }

    #[test]
    fn test_walk_respects_floor_and_clamp() {
        let mut config = AppConfig::default_for_test().oracle;
        config.volatility_multiplier = 100.0;
        config.max_price_change = 0.5;
        config.min_price = 0.01;
        let generator = PriceGenerator::from_config(&config).expect("config parses");

        let mut price = 1.0;
        let feed = TokenFeed {
            symbol: "X".to_string(),
            address: Address::ZERO,
            decimals: 18,
            volatility: 0.05,
        };
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let next = generator.next_price(&feed, price, &mut rng);
            // one step can at most halve or 1.5x the price
            assert!(next >= (price * 0.5).max(0.01) - 1e-12);
            assert!(next <= price * 1.5 + 1e-12);
            assert!(next >= 0.01);
            price = next;
        }
    }

    #[test]
    fn test_history_stats() {
        let mut history = PriceHistory::new(10);
        assert!(history.stats().is_none());
        history.push(100.0);
        history.push(110.0);
        let stats = history.stats().expect("two samples");
        assert!((stats.change_pct - 10.0).abs() < 1e-9);
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.high, 110.0);
        assert_eq!(stats.low, 100.0);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = PriceHistory::new(5);
        for i in 0..50 {
            history.push(i as f64);
        }
        let stats = history.stats().expect("full history");
        assert_eq!(stats.samples, 5);
        assert_eq!(stats.current, 49.0);
    }
}
