//! Router / AccessControl ABI surface
//!
//! `sol!` bindings for the contract methods the keeper touches, plus the
//! calldata builders and return decoders used by the RPC client and the
//! executor. Records are converted into the domain snapshot types
//! immediately; the generated ABI structs never leave this module.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::chain::types::{OrderKind, OrderRecord, PositionRecord, PositionSide};
use crate::chain::ChainError;
use crate::utils::types::PriceUpdate;

sol! {
    struct Order {
        uint256 id;
        address user;
        address tokenIn;
        address tokenOut;
        uint256 amountIn;
        uint256 targetPrice;
        uint256 minAmountOut;
        uint8 orderType;
        bool isLong;
        bool executed;
        uint256 createdAt;
        bool selfExecutable;
    }

    struct Position {
        uint256 id;
        address user;
        address token;
        uint256 collateralAmount;
        uint256 leverage;
        uint8 positionType;
        uint256 entryPrice;
        uint256 size;
        uint256 createdAt;
        bool isOpen;
    }

    function getNextOrderId() external view returns (uint256 nextOrderId);
    function getOrder(uint256 orderId) external view returns (Order order);
    function shouldExecuteOrder(uint256 orderId) external view returns (bool eligible);
    function selfExecuteOrder(uint256 orderId) external;

    function getNextPositionId() external view returns (uint256 nextPositionId);
    function getPosition(uint256 positionId) external view returns (Position position);
    function liquidatePosition(uint256 positionId) external;

    function getPrice(address token) external view returns (uint256 price);
    function updateOraclePrice(address token, uint256 price) external;
    function batchUpdateOraclePrices(address[] tokens, uint256[] prices) external;

    function emergencyStop() external view returns (bool stopped);
}

fn decode_err(what: &'static str, err: impl std::fmt::Display) -> ChainError {
    ChainError::Decode {
        what,
        detail: err.to_string(),
    }
}

impl From<Order> for OrderRecord {
    fn from(order: Order) -> Self {
        OrderRecord {
            id: order.id.saturating_to(),
            user: order.user,
            token_in: order.tokenIn,
            token_out: order.tokenOut,
            amount_in: order.amountIn,
            target_price: order.targetPrice,
            min_amount_out: order.minAmountOut,
            kind: if order.orderType == 0 {
                OrderKind::Limit
            } else {
                OrderKind::StopLoss
            },
            is_long: order.isLong,
            executed: order.executed,
            created_at: order.createdAt.saturating_to(),
            self_executable: order.selfExecutable,
        }
    }
}

impl From<Position> for PositionRecord {
    fn from(position: Position) -> Self {
        PositionRecord {
            id: position.id.saturating_to(),
            user: position.user,
            token: position.token,
            collateral: position.collateralAmount,
            leverage: position.leverage.saturating_to(),
            side: if position.positionType == 0 {
                PositionSide::Long
            } else {
                PositionSide::Short
            },
            entry_price: position.entryPrice,
            size: position.size,
            created_at: position.createdAt.saturating_to(),
            is_open: position.isOpen,
        }
    }
}

// ---- calldata builders -------------------------------------------------

pub fn next_order_id_calldata() -> Bytes {
    getNextOrderIdCall {}.abi_encode().into()
}

pub fn order_calldata(order_id: u64) -> Bytes {
    getOrderCall {
        orderId: U256::from(order_id),
    }
    .abi_encode()
    .into()
}

pub fn should_execute_order_calldata(order_id: u64) -> Bytes {
    shouldExecuteOrderCall {
        orderId: U256::from(order_id),
    }
    .abi_encode()
    .into()
}

pub fn execute_order_calldata(order_id: u64) -> Bytes {
    selfExecuteOrderCall {
        orderId: U256::from(order_id),
    }
    .abi_encode()
    .into()
}

pub fn next_position_id_calldata() -> Bytes {
    getNextPositionIdCall {}.abi_encode().into()
}

pub fn position_calldata(position_id: u64) -> Bytes {
    getPositionCall {
        positionId: U256::from(position_id),
    }
    .abi_encode()
    .into()
}

pub fn liquidate_position_calldata(position_id: u64) -> Bytes {
    liquidatePositionCall {
        positionId: U256::from(position_id),
    }
    .abi_encode()
    .into()
}

pub fn price_calldata(token: Address) -> Bytes {
    getPriceCall { token }.abi_encode().into()
}

/// Single updates go through `updateOraclePrice`, anything larger through
/// the batched entry point, matching how the Router meters gas.
pub fn push_price_calldata(updates: &[PriceUpdate]) -> Bytes {
    if updates.len() == 1 {
        updateOraclePriceCall {
            token: updates[0].token,
            price: updates[0].price,
        }
        .abi_encode()
        .into()
    } else {
        batchUpdateOraclePricesCall {
            tokens: updates.iter().map(|u| u.token).collect(),
            prices: updates.iter().map(|u| u.price).collect(),
        }
        .abi_encode()
        .into()
    }
}

pub fn emergency_stop_calldata() -> Bytes {
    emergencyStopCall {}.abi_encode().into()
}

// ---- return decoders ---------------------------------------------------

pub fn decode_next_order_id(data: &[u8]) -> Result<u64, ChainError> {
    getNextOrderIdCall::abi_decode_returns(data, true)
        .map(|ret| ret.nextOrderId.saturating_to())
        .map_err(|e| decode_err("getNextOrderId", e))
}

pub fn decode_order(data: &[u8]) -> Result<OrderRecord, ChainError> {
    getOrderCall::abi_decode_returns(data, true)
        .map(|ret| ret.order.into())
        .map_err(|e| decode_err("getOrder", e))
}

pub fn decode_should_execute_order(data: &[u8]) -> Result<bool, ChainError> {
    shouldExecuteOrderCall::abi_decode_returns(data, true)
        .map(|ret| ret.eligible)
        .map_err(|e| decode_err("shouldExecuteOrder", e))
}

pub fn decode_next_position_id(data: &[u8]) -> Result<u64, ChainError> {
    getNextPositionIdCall::abi_decode_returns(data, true)
        .map(|ret| ret.nextPositionId.saturating_to())
        .map_err(|e| decode_err("getNextPositionId", e))
}

pub fn decode_position(data: &[u8]) -> Result<PositionRecord, ChainError> {
    getPositionCall::abi_decode_returns(data, true)
        .map(|ret| ret.position.into())
        .map_err(|e| decode_err("getPosition", e))
}

pub fn decode_price(data: &[u8]) -> Result<U256, ChainError> {
    getPriceCall::abi_decode_returns(data, true)
        .map(|ret| ret.price)
        .map_err(|e| decode_err("getPrice", e))
}

pub fn decode_emergency_stop(data: &[u8]) -> Result<bool, ChainError> {
    emergencyStopCall::abi_decode_returns(data, true)
        .map(|ret| ret.stopped)
        .map_err(|e| decode_err("emergencyStop", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolValue;

    #[test]
    fn test_single_vs_batch_selector() {
        let update = PriceUpdate {
            symbol: "ETH".to_string(),
            token: Address::ZERO,
            price: U256::from(2500u64),
        };
        let single = push_price_calldata(std::slice::from_ref(&update));
        assert_eq!(&single[..4], updateOraclePriceCall::SELECTOR.as_slice());

        let pair = vec![update.clone(), update];
        let batched = push_price_calldata(&pair);
        assert_eq!(&batched[..4], batchUpdateOraclePricesCall::SELECTOR.as_slice());
    }

    #[test]
    fn test_order_round_trip() {
        let order = Order {
            id: U256::from(42u64),
            user: Address::repeat_byte(0x11),
            tokenIn: Address::repeat_byte(0x22),
            tokenOut: Address::repeat_byte(0x33),
            amountIn: U256::from(1000u64),
            targetPrice: U256::from(2500u64),
            minAmountOut: U256::from(990u64),
            orderType: 1,
            isLong: true,
            executed: false,
            createdAt: U256::from(1_700_000_000u64),
            selfExecutable: true,
        };
        let encoded = order.abi_encode();
        let record = decode_order(&encoded).expect("decode");
        assert_eq!(record.id, 42);
        assert_eq!(record.kind, OrderKind::StopLoss);
        assert!(!record.executed);
        assert!(record.self_executable);
    }

    #[test]
    fn test_position_side_mapping() {
        let position = Position {
            id: U256::from(3u64),
            user: Address::ZERO,
            token: Address::ZERO,
            collateralAmount: U256::from(10u64),
            leverage: U256::from(5u64),
            positionType: 1,
            entryPrice: U256::from(100u64),
            size: U256::from(50u64),
            createdAt: U256::ZERO,
            isOpen: true,
        };
        let record = decode_position(&position.abi_encode()).expect("decode");
        assert_eq!(record.side, PositionSide::Short);
        assert_eq!(record.leverage, 5);
    }
}
