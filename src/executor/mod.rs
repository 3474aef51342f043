//! Action execution
//!
//! Drives one action's full lifecycle: gas estimation, fresh nonce, dry-run
//! simulation, signing, broadcast, receipt wait, outcome classification,
//! and retry with exponential backoff. Every attempt feeds the adaptive
//! controller; terminal outcomes never escape as errors, they are folded
//! into [`ActionOutcome`].

pub mod batch;
pub mod gas;

pub use batch::BatchPlanner;
pub use gas::{GasEstimator, GasPlan};

use alloy::primitives::{Address, Bytes};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::adaptive::AdaptiveController;
use crate::chain::contracts;
use crate::chain::{ChainClient, ChainError, KeeperSigner, Receipt};
use crate::config::AppConfig;
use crate::telemetry::metrics;
use crate::utils::helpers::{short_hash, wei_to_gwei};
use crate::utils::types::{ActionKind, ActionOutcome, ActionRequest, PriceUpdate};

/// Failure taxonomy derived from node error text.
///
/// The chain client surfaces raw message strings, so classification is
/// substring matching; the categories live here so a move to typed node
/// error codes touches one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Oracle circuit breaker rejected the update; systemic, terminal
    CircuitBreaker,
    /// Contract execution reverted; terminal
    Revert,
    /// Underfunded gas; retryable with raised headroom
    InsufficientGas,
    /// Network or node hiccup; retryable
    Transient,
}

impl FailureClass {
    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();
        if message.contains("price change too large") || message.contains("circuit breaker") {
            FailureClass::CircuitBreaker
        } else if message.contains("out of gas")
            || message.contains("intrinsic gas too low")
            || message.contains("gas required exceeds")
        {
            FailureClass::InsufficientGas
        } else if message.contains("execution reverted") || message.contains("revert") {
            FailureClass::Revert
        } else {
            // unrecognized errors are assumed transient
            FailureClass::Transient
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureClass::InsufficientGas | FailureClass::Transient)
    }
}

/// Outcome of a single attempt, before retry policy is applied
enum AttemptError {
    /// Fully-formed terminal outcome; no further attempts
    Terminal(ActionOutcome),
    /// Worth another attempt if budget remains
    Retryable(String),
}

pub struct ActionExecutor {
    client: Arc<dyn ChainClient>,
    signer: Arc<KeeperSigner>,
    gas: GasEstimator,
    adaptive: Arc<AdaptiveController>,
    router: Address,
    keeper_attempts: u32,
    keeper_delay: Duration,
    oracle_attempts: u32,
    oracle_delay: Duration,
    receipt_timeout: Duration,
    receipt_poll: Duration,
    /// Serializes nonce read -> sign -> broadcast across loops sharing the
    /// signer, so concurrent kinds cannot collide on a stale nonce.
    submission_lock: Mutex<()>,
}

impl ActionExecutor {
    pub fn new(
        config: &AppConfig,
        client: Arc<dyn ChainClient>,
        signer: Arc<KeeperSigner>,
        adaptive: Arc<AdaptiveController>,
    ) -> anyhow::Result<Self> {
        let router = config.contracts.router_address()?;
        let gas = GasEstimator::new(config.gas.clone(), adaptive.clone());
        Ok(Self {
            client,
            signer,
            gas,
            adaptive,
            router,
            keeper_attempts: config.keeper.retry_attempts,
            keeper_delay: Duration::from_millis(config.keeper.retry_delay_base_ms),
            oracle_attempts: config.oracle.retry_attempts,
            oracle_delay: Duration::from_millis(config.oracle.retry_delay_base_ms),
            receipt_timeout: Duration::from_secs(config.rpc.receipt_timeout_secs),
            receipt_poll: Duration::from_millis(config.rpc.receipt_poll_ms),
            submission_lock: Mutex::new(()),
        })
    }

    /// Execute a single action through its full retry lifecycle.
    pub async fn execute(&self, request: &ActionRequest) -> ActionOutcome {
        match request {
            ActionRequest::ExecuteOrder { order_id } => {
                self.submit_with_retry(
                    ActionKind::ExecuteOrder,
                    &request.target(),
                    contracts::execute_order_calldata(*order_id),
                    1,
                )
                .await
            }
            ActionRequest::LiquidatePosition { position_id } => {
                self.submit_with_retry(
                    ActionKind::LiquidatePosition,
                    &request.target(),
                    contracts::liquidate_position_calldata(*position_id),
                    1,
                )
                .await
            }
            ActionRequest::PushPrice(update) => {
                self.execute_price_batch(std::slice::from_ref(update)).await
            }
        }
    }

    /// Submit one batch of price updates as a single transaction.
    pub async fn execute_price_batch(&self, updates: &[PriceUpdate]) -> ActionOutcome {
        let target = updates
            .iter()
            .map(|u| u.symbol.as_str())
            .collect::<Vec<_>>()
            .join(",");
        self.submit_with_retry(
            ActionKind::PushPrice,
            &target,
            contracts::push_price_calldata(updates),
            updates.len(),
        )
        .await
    }

    fn retry_budget(&self, kind: ActionKind) -> (u32, Duration) {
        match kind {
            ActionKind::PushPrice => (self.oracle_attempts, self.oracle_delay),
            _ => (self.keeper_attempts, self.keeper_delay),
        }
    }

    async fn submit_with_retry(
        &self,
        kind: ActionKind,
        target: &str,
        calldata: Bytes,
        action_count: usize,
    ) -> ActionOutcome {
        let (max_attempts, base_delay) = self.retry_budget(kind);
        let mut attempt: u32 = 0;

        loop {
            match self.attempt_once(&calldata, attempt, action_count).await {
                Ok(receipt) => {
                    self.adaptive.on_success();
                    metrics::record_action_success(kind);
                    info!(
                        kind = %kind,
                        target,
                        tx = %short_hash(&receipt.transaction_hash),
                        gas_used = receipt.gas_used,
                        attempts = attempt + 1,
                        "action confirmed"
                    );
                    return ActionOutcome::Success {
                        tx_hash: receipt.transaction_hash,
                        gas_used: receipt.gas_used,
                    };
                }
                Err(AttemptError::Terminal(outcome)) => {
                    metrics::record_action_failure(kind);
                    match &outcome {
                        ActionOutcome::CircuitBreakerTripped { reason } => {
                            warn!(kind = %kind, target, reason = %reason, "circuit breaker tripped");
                        }
                        ActionOutcome::Reverted { reason } => {
                            error!(kind = %kind, target, reason = %reason, "action reverted");
                        }
                        _ => {}
                    }
                    return outcome;
                }
                Err(AttemptError::Retryable(cause)) => {
                    self.adaptive.on_failure();
                    metrics::record_retry(kind);

                    if attempt + 1 >= max_attempts {
                        error!(
                            kind = %kind,
                            target,
                            attempts = attempt + 1,
                            cause = %cause,
                            "giving up"
                        );
                        metrics::record_action_failure(kind);
                        return ActionOutcome::SubmissionFailed {
                            cause,
                            attempts: attempt + 1,
                        };
                    }

                    let delay = base_delay * 2u32.pow(attempt);
                    warn!(
                        kind = %kind,
                        target,
                        attempt = attempt + 1,
                        retry_in = ?delay,
                        cause = %cause,
                        "attempt failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One pass through the submission pipeline:
    /// estimate -> nonce -> dry run -> sign -> broadcast -> receipt.
    async fn attempt_once(
        &self,
        calldata: &Bytes,
        attempt: u32,
        action_count: usize,
    ) -> Result<Receipt, AttemptError> {
        let plan = self
            .gas
            .estimate(self.client.as_ref(), attempt, action_count)
            .await;
        debug!(
            gas_limit = plan.gas_limit,
            gas_price_gwei = %format!("{:.1}", wei_to_gwei(plan.gas_price)),
            attempt,
            "submitting"
        );

        let tx_hash = {
            let _guard = self.submission_lock.lock().await;

            let nonce = self
                .client
                .nonce(self.signer.address())
                .await
                .map_err(|e| AttemptError::Retryable(format!("nonce read failed: {e}")))?;

            // Dry-run before spending gas: a simulated revert is terminal.
            if let Err(err) = self
                .client
                .call(self.signer.address(), self.router, calldata)
                .await
            {
                return Err(self.classify_dry_run(err));
            }

            let signed = self
                .signer
                .sign_call(nonce, plan.gas_limit, plan.gas_price, self.router, calldata.clone())
                .map_err(|e| AttemptError::Retryable(format!("signing failed: {e}")))?;

            match self.client.send_raw_transaction(&signed.raw).await {
                Ok(hash) => hash,
                Err(err) => return Err(self.classify_broadcast(err)),
            }
        };

        match self.wait_for_receipt(tx_hash).await {
            Some(receipt) if receipt.succeeded() => Ok(receipt),
            Some(receipt) => Err(AttemptError::Terminal(ActionOutcome::Reverted {
                reason: format!(
                    "transaction {} reverted on-chain",
                    short_hash(&receipt.transaction_hash)
                ),
            })),
            None => Err(AttemptError::Retryable(format!(
                "no receipt for {} within {:?}",
                short_hash(&tx_hash),
                self.receipt_timeout
            ))),
        }
    }

    /// A dry-run failure means the transaction would revert; no gas is
    /// spent attempting it. Transport errors are the exception: an
    /// unreachable node says nothing about the transaction.
    fn classify_dry_run(&self, err: ChainError) -> AttemptError {
        if matches!(err, ChainError::Transport(_)) {
            return AttemptError::Retryable(format!("dry run failed: {err}"));
        }
        let message = err.to_string();
        match FailureClass::classify(&message) {
            FailureClass::CircuitBreaker => {
                AttemptError::Terminal(ActionOutcome::CircuitBreakerTripped { reason: message })
            }
            _ => AttemptError::Terminal(ActionOutcome::Reverted { reason: message }),
        }
    }

    fn classify_broadcast(&self, err: ChainError) -> AttemptError {
        let message = err.to_string();
        match FailureClass::classify(&message) {
            FailureClass::CircuitBreaker => {
                AttemptError::Terminal(ActionOutcome::CircuitBreakerTripped { reason: message })
            }
            FailureClass::Revert => {
                AttemptError::Terminal(ActionOutcome::Reverted { reason: message })
            }
            FailureClass::InsufficientGas => {
                warn!("gas insufficient, next attempt raises headroom");
                AttemptError::Retryable(message)
            }
            FailureClass::Transient => AttemptError::Retryable(message),
        }
    }

    /// Poll for the receipt until it lands or the bounded timeout elapses.
    /// `None` feeds the retry path, never a permanent hang.
    async fn wait_for_receipt(&self, hash: alloy::primitives::B256) -> Option<Receipt> {
        let deadline = Instant::now() + self.receipt_timeout;
        loop {
            match self.client.transaction_receipt(hash).await {
                Ok(Some(receipt)) => return Some(receipt),
                Ok(None) => {}
                Err(err) => {
                    warn!(error = %err, "receipt poll failed");
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            sleep(self.receipt_poll).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_breaker_classification() {
        assert_eq!(
            FailureClass::classify("execution reverted: Price change too large"),
            FailureClass::CircuitBreaker
        );
        assert_eq!(
            FailureClass::classify("Circuit breaker active"),
            FailureClass::CircuitBreaker
        );
    }

    #[test]
    fn test_gas_classification_is_retryable() {
        let class = FailureClass::classify("base fee exceeds gas limit: out of gas");
        assert_eq!(class, FailureClass::InsufficientGas);
        assert!(class.is_retryable());
    }

    #[test]
    fn test_revert_is_terminal() {
        let class = FailureClass::classify("execution reverted: insufficient balance");
        assert_eq!(class, FailureClass::Revert);
        assert!(!class.is_retryable());
    }

    #[test]
    fn test_unknown_errors_are_transient() {
        let class = FailureClass::classify("connection reset by peer");
        assert_eq!(class, FailureClass::Transient);
        assert!(class.is_retryable());
    }
}
