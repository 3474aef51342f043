//! Chain access layer
//!
//! Everything the keeper needs from the blockchain sits behind the
//! [`ChainClient`] trait: read-only contract queries, gas/nonce/balance
//! reads, the pre-broadcast dry run, and raw transaction submission.
//! [`RpcChainClient`] implements it over Ethereum JSON-RPC with endpoint
//! failover; tests substitute scripted mocks.

pub mod contracts;
pub mod rpc;
pub mod signer;
pub mod types;

pub use rpc::RpcChainClient;
pub use signer::{KeeperSigner, SignedTx};
pub use types::{OrderKind, OrderRecord, PositionRecord, PositionSide};

use alloy::primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use thiserror::Error;

/// Chain-layer error taxonomy
#[derive(Debug, Error)]
pub enum ChainError {
    /// The node could not be reached at all (connection, timeout, TLS)
    #[error("transport error: {0}")]
    Transport(String),
    /// The node answered with a JSON-RPC error object
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    /// The node answered but the payload did not decode
    #[error("failed to decode {what}: {detail}")]
    Decode { what: &'static str, detail: String },
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        ChainError::Transport(err.to_string())
    }
}

/// Decoded transaction receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub status: u64,
    pub gas_used: u64,
    pub block_number: u64,
}

impl Receipt {
    pub fn succeeded(&self) -> bool {
        self.status == 1
    }
}

/// Read and submission surface the keeper consumes.
///
/// Order/position records are immutable snapshots as of the query block and
/// are never cached beyond one scan cycle.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn next_order_id(&self) -> Result<u64, ChainError>;
    /// `None` when the id has no record (unallocated slot)
    async fn order(&self, order_id: u64) -> Result<Option<OrderRecord>, ChainError>;
    /// On-chain eligibility predicate: should this order execute now?
    async fn should_execute_order(&self, order_id: u64) -> Result<bool, ChainError>;

    async fn next_position_id(&self) -> Result<u64, ChainError>;
    async fn position(&self, position_id: u64) -> Result<Option<PositionRecord>, ChainError>;

    /// Current oracle price for a token, in wei (1e18 scale)
    async fn price(&self, token: Address) -> Result<U256, ChainError>;
    /// Current network gas price, in wei
    async fn gas_price(&self) -> Result<u128, ChainError>;
    async fn balance(&self, address: Address) -> Result<U256, ChainError>;
    /// Pending-state transaction count; read fresh before every submission
    async fn nonce(&self, address: Address) -> Result<u64, ChainError>;
    /// The AccessControl emergency-stop flag
    async fn emergency_stopped(&self) -> Result<bool, ChainError>;

    /// Dry-run a call without spending gas (`eth_call`)
    async fn call(&self, from: Address, to: Address, data: &Bytes) -> Result<Bytes, ChainError>;
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256, ChainError>;
    /// `None` while the transaction is still pending
    async fn transaction_receipt(&self, hash: B256) -> Result<Option<Receipt>, ChainError>;
}
