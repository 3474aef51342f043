//! DEX Keeper Library
//!
//! Components for automating on-chain actions against a smart-contract
//! exchange: order execution, position liquidation, and oracle price
//! publication, driven by an adaptive execution controller.

pub mod adaptive;
pub mod chain;
pub mod config;
pub mod executor;
pub mod keeper;
pub mod oracle;
pub mod scanner;
pub mod state;
pub mod telemetry;
pub mod utils;

// Re-export main types
pub use adaptive::{AdaptiveController, AdaptiveSnapshot};
pub use chain::{ChainClient, ChainError, KeeperSigner, Receipt, RpcChainClient};
pub use config::AppConfig;
pub use executor::{ActionExecutor, BatchPlanner, GasEstimator, GasPlan};
pub use keeper::{KeeperService, KeeperStatus};
pub use oracle::PriceGenerator;
pub use scanner::EligibilityScanner;
pub use state::KeeperState;
pub use utils::types::{ActionKind, ActionOutcome, ActionRequest, PriceUpdate};
