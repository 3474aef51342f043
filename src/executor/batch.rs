//! Price-update batching
//!
//! Groups independent price updates into batches no larger than the current
//! adaptive batch size. When a multi-item batch exhausts its retries the
//! caller re-submits it as singletons via [`BatchPlanner::split`], bounding
//! the blast radius of one problematic item.

use std::sync::Arc;

use crate::adaptive::AdaptiveController;
use crate::utils::types::PriceUpdate;

pub struct BatchPlanner {
    adaptive: Arc<AdaptiveController>,
}

impl BatchPlanner {
    pub fn new(adaptive: Arc<AdaptiveController>) -> Self {
        Self { adaptive }
    }

    /// Chunk updates by the batch size in effect right now.
    pub fn plan(&self, updates: Vec<PriceUpdate>) -> Vec<Vec<PriceUpdate>> {
        let size = self.adaptive.batch_size().max(1);
        updates
            .chunks(size)
            .map(|chunk| chunk.to_vec())
            .collect()
    }

    /// Degrade a failed batch into independent single-item submissions,
    /// each with its own retry budget.
    pub fn split(batch: Vec<PriceUpdate>) -> Vec<Vec<PriceUpdate>> {
        batch.into_iter().map(|update| vec![update]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};

    fn updates(n: usize) -> Vec<PriceUpdate> {
        (0..n)
            .map(|i| PriceUpdate {
                symbol: format!("TOK{i}"),
                token: Address::repeat_byte(i as u8 + 1),
                price: U256::from(1000 + i as u64),
            })
            .collect()
    }

    #[test]
    fn test_plan_respects_batch_size() {
        let adaptive = Arc::new(AdaptiveController::new(3));
        let planner = BatchPlanner::new(adaptive);
        let batches = planner.plan(updates(7));
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 3);
        assert_eq!(batches[1].len(), 3);
        assert_eq!(batches[2].len(), 1);
    }

    #[test]
    fn test_plan_shrinks_after_failures() {
        let adaptive = Arc::new(AdaptiveController::new(6));
        let planner = BatchPlanner::new(adaptive.clone());
        assert_eq!(planner.plan(updates(6)).len(), 1);

        for _ in 0..4 {
            adaptive.on_failure();
        }
        // fully degraded: one singleton batch per update
        let batches = planner.plan(updates(6));
        assert_eq!(batches.len(), 6);
        assert!(batches.iter().all(|b| b.len() == 1));
    }

    #[test]
    fn test_split_preserves_every_item() {
        let batch = updates(4);
        let singles = BatchPlanner::split(batch.clone());
        assert_eq!(singles.len(), 4);
        for (single, original) in singles.iter().zip(&batch) {
            assert_eq!(single.len(), 1);
            assert_eq!(&single[0], original);
        }
    }

    #[test]
    fn test_empty_plan() {
        let adaptive = Arc::new(AdaptiveController::new(6));
        let planner = BatchPlanner::new(adaptive);
        assert!(planner.plan(Vec::new()).is_empty());
    }
}
