//! Adaptive submission tuning
//!
//! Process-wide controller for the three coupled knobs the keeper adjusts
//! from submission feedback: the failed-attempt counter, the price batch
//! size, and the gas multiplier. Failures shrink batches and raise gas
//! headroom; sustained success grows batches and relaxes gas, never leaving
//! the configured bounds. Additive-increase / multiplicative-backoff applied
//! to both knobs at once.

use parking_lot::Mutex;
use tracing::warn;

/// Gas multiplier bounds
const GAS_MULTIPLIER_FLOOR: f64 = 1.0;
const GAS_MULTIPLIER_CAP: f64 = 2.0;

/// Point-in-time view of the tuning state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveSnapshot {
    pub failed_attempts: u32,
    pub batch_size: usize,
    pub gas_multiplier: f64,
}

#[derive(Debug)]
struct AdaptiveState {
    failed_attempts: u32,
    batch_size: usize,
    gas_multiplier: f64,
}

/// Exclusive owner of the shared [`AdaptiveState`].
///
/// Handed around as `Arc<AdaptiveController>`; all mutation goes through
/// `on_failure`/`on_success` so readers never observe torn state.
pub struct AdaptiveController {
    state: Mutex<AdaptiveState>,
    max_batch_size: usize,
}

impl AdaptiveController {
    /// Starts fully aggressive: maximum batch size, no gas headroom.
    pub fn new(max_batch_size: usize) -> Self {
        let max_batch_size = max_batch_size.max(1);
        Self {
            state: Mutex::new(AdaptiveState {
                failed_attempts: 0,
                batch_size: max_batch_size,
                gas_multiplier: GAS_MULTIPLIER_FLOOR,
            }),
            max_batch_size,
        }
    }

    /// Record one failed submission attempt.
    pub fn on_failure(&self) {
        let mut state = self.state.lock();
        state.failed_attempts += 1;

        if state.failed_attempts >= 2 {
            if state.batch_size > 2 {
                state.batch_size -= 1;
            }
            state.gas_multiplier = (state.gas_multiplier * 1.2).min(GAS_MULTIPLIER_CAP);
            warn!(
                batch_size = state.batch_size,
                gas_multiplier = %format!("{:.2}", state.gas_multiplier),
                "reducing batch size, raising gas multiplier"
            );
        }

        if state.failed_attempts >= 4 {
            state.batch_size = 1;
            state.gas_multiplier = GAS_MULTIPLIER_CAP;
            warn!("fully degraded: individual submissions at maximum gas headroom");
        }
    }

    /// Record one confirmed action.
    pub fn on_success(&self) {
        let mut state = self.state.lock();
        state.failed_attempts = state.failed_attempts.saturating_sub(1);

        if state.failed_attempts == 0 {
            if state.batch_size < self.max_batch_size {
                state.batch_size += 1;
            }
            state.gas_multiplier = (state.gas_multiplier * 0.95).max(GAS_MULTIPLIER_FLOOR);
        }
    }

    pub fn failed_attempts(&self) -> u32 {
        self.state.lock().failed_attempts
    }

    pub fn batch_size(&self) -> usize {
        self.state.lock().batch_size
    }

    pub fn gas_multiplier(&self) -> f64 {
        self.state.lock().gas_multiplier
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn snapshot(&self) -> AdaptiveSnapshot {
        let state = self.state.lock();
        AdaptiveSnapshot {
            failed_attempts: state.failed_attempts,
            batch_size: state.batch_size,
            gas_multiplier: state.gas_multiplier,
        }
    }
}
