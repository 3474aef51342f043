//! Ethereum JSON-RPC chain client
//!
//! Speaks raw JSON-RPC over HTTP against a primary endpoint with ordered
//! fallbacks. Transport failures rotate to the next endpoint; a node that
//! answers with an RPC error object is authoritative and does not trigger
//! failover.

use alloy::primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::chain::contracts;
use crate::chain::types::{OrderRecord, PositionRecord};
use crate::chain::{ChainClient, ChainError, Receipt};
use crate::config::RpcConfig;

/// JSON-RPC client with endpoint failover
pub struct RpcChainClient {
    http: reqwest::Client,
    /// Primary endpoint first, fallbacks in configured order
    endpoints: Vec<String>,
    /// Index of the endpoint that served the last successful request
    active: RwLock<usize>,
    router: Address,
    access_control: Address,
    request_id: AtomicU64,
}

impl RpcChainClient {
    pub fn new(
        config: &RpcConfig,
        router: Address,
        access_control: Address,
    ) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        let mut endpoints = vec![config.primary_url.clone()];
        endpoints.extend(config.fallback_urls.iter().cloned());

        debug!(
            endpoints = endpoints.len(),
            "rpc client initialized with {} fallback endpoint(s)",
            endpoints.len() - 1
        );

        Ok(Self {
            http,
            endpoints,
            active: RwLock::new(0),
            router,
            access_control,
            request_id: AtomicU64::new(1),
        })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let total = self.endpoints.len();
        let start_index = *self.active.read().await;
        let mut last_error: Option<ChainError> = None;

        let body = json!({
            "jsonrpc": "2.0",
            "id": self.request_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        for offset in 0..total {
            let index = (start_index + offset) % total;
            let started = Instant::now();
            let response = match self.http.post(&self.endpoints[index]).json(&body).send().await {
                Ok(response) => response,
                Err(err) => {
                    warn!(endpoint = index, method, error = %err, "rpc transport failure");
                    last_error = Some(err.into());
                    continue;
                }
            };

            let payload: Value = match response.json().await {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(endpoint = index, method, error = %err, "rpc response not json");
                    last_error = Some(err.into());
                    continue;
                }
            };

            debug!(method, endpoint = index, elapsed = ?started.elapsed(), "rpc request");

            if let Some(error) = payload.get("error") {
                let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown rpc error")
                    .to_string();
                return Err(ChainError::Rpc { code, message });
            }

            if index != start_index {
                *self.active.write().await = index;
                warn!("rpc failover to endpoint index {}", index);
            }

            return Ok(payload.get("result").cloned().unwrap_or(Value::Null));
        }

        Err(last_error.unwrap_or_else(|| ChainError::Transport("all endpoints failed".to_string())))
    }

    /// `eth_call` against the Router and return the raw output bytes
    async fn call_contract(&self, to: Address, data: Bytes) -> Result<Vec<u8>, ChainError> {
        let result = self
            .request(
                "eth_call",
                json!([{ "to": format!("{to:#x}"), "data": format!("0x{}", hex::encode(&data)) }, "latest"]),
            )
            .await?;
        parse_bytes(&result, "eth_call output")
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn next_order_id(&self) -> Result<u64, ChainError> {
        let out = self
            .call_contract(self.router, contracts::next_order_id_calldata())
            .await?;
        contracts::decode_next_order_id(&out)
    }

    async fn order(&self, order_id: u64) -> Result<Option<OrderRecord>, ChainError> {
        let out = self
            .call_contract(self.router, contracts::order_calldata(order_id))
            .await?;
        let record = contracts::decode_order(&out)?;
        // Unallocated slots come back zeroed
        Ok((record.id != 0).then_some(record))
    }

    async fn should_execute_order(&self, order_id: u64) -> Result<bool, ChainError> {
        let out = self
            .call_contract(self.router, contracts::should_execute_order_calldata(order_id))
            .await?;
        contracts::decode_should_execute_order(&out)
    }

    async fn next_position_id(&self) -> Result<u64, ChainError> {
        let out = self
            .call_contract(self.router, contracts::next_position_id_calldata())
            .await?;
        contracts::decode_next_position_id(&out)
    }

    async fn position(&self, position_id: u64) -> Result<Option<PositionRecord>, ChainError> {
        let out = self
            .call_contract(self.router, contracts::position_calldata(position_id))
            .await?;
        let record = contracts::decode_position(&out)?;
        Ok((record.id != 0).then_some(record))
    }

    async fn price(&self, token: Address) -> Result<U256, ChainError> {
        let out = self
            .call_contract(self.router, contracts::price_calldata(token))
            .await?;
        contracts::decode_price(&out)
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        let result = self.request("eth_gasPrice", json!([])).await?;
        parse_quantity_u128(&result, "eth_gasPrice")
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        let result = self
            .request("eth_getBalance", json!([format!("{address:#x}"), "latest"]))
            .await?;
        parse_u256(&result, "eth_getBalance")
    }

    async fn nonce(&self, address: Address) -> Result<u64, ChainError> {
        let result = self
            .request(
                "eth_getTransactionCount",
                json!([format!("{address:#x}"), "pending"]),
            )
            .await?;
        parse_quantity_u64(&result, "eth_getTransactionCount")
    }

    async fn emergency_stopped(&self) -> Result<bool, ChainError> {
        let out = self
            .call_contract(self.access_control, contracts::emergency_stop_calldata())
            .await?;
        contracts::decode_emergency_stop(&out)
    }

    async fn call(&self, from: Address, to: Address, data: &Bytes) -> Result<Bytes, ChainError> {
        let result = self
            .request(
                "eth_call",
                json!([{
                    "from": format!("{from:#x}"),
                    "to": format!("{to:#x}"),
                    "data": format!("0x{}", hex::encode(data)),
                }, "latest"]),
            )
            .await?;
        parse_bytes(&result, "eth_call output").map(Bytes::from)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256, ChainError> {
        let result = self
            .request(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        parse_b256(&result, "eth_sendRawTransaction")
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<Receipt>, ChainError> {
        let result = self
            .request("eth_getTransactionReceipt", json!([format!("{hash:#x}")]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(Receipt {
            transaction_hash: parse_b256(&result["transactionHash"], "receipt hash")?,
            status: parse_quantity_u64(&result["status"], "receipt status")?,
            gas_used: parse_quantity_u64(&result["gasUsed"], "receipt gasUsed")?,
            block_number: parse_quantity_u64(&result["blockNumber"], "receipt blockNumber")?,
        }))
    }
}

// ---- hex payload parsing -----------------------------------------------

fn hex_str<'a>(value: &'a Value, what: &'static str) -> Result<&'a str, ChainError> {
    value
        .as_str()
        .map(|s| s.trim_start_matches("0x"))
        .ok_or(ChainError::Decode {
            what,
            detail: format!("expected hex string, got {value}"),
        })
}

fn parse_quantity_u64(value: &Value, what: &'static str) -> Result<u64, ChainError> {
    let raw = hex_str(value, what)?;
    u64::from_str_radix(raw, 16).map_err(|e| ChainError::Decode {
        what,
        detail: e.to_string(),
    })
}

fn parse_quantity_u128(value: &Value, what: &'static str) -> Result<u128, ChainError> {
    let raw = hex_str(value, what)?;
    u128::from_str_radix(raw, 16).map_err(|e| ChainError::Decode {
        what,
        detail: e.to_string(),
    })
}

fn parse_u256(value: &Value, what: &'static str) -> Result<U256, ChainError> {
    let raw = hex_str(value, what)?;
    U256::from_str_radix(raw, 16).map_err(|e| ChainError::Decode {
        what,
        detail: e.to_string(),
    })
}

fn parse_bytes(value: &Value, what: &'static str) -> Result<Vec<u8>, ChainError> {
    let raw = hex_str(value, what)?;
    hex::decode(raw).map_err(|e| ChainError::Decode {
        what,
        detail: e.to_string(),
    })
}

fn parse_b256(value: &Value, what: &'static str) -> Result<B256, ChainError> {
    let bytes = parse_bytes(value, what)?;
    if bytes.len() != 32 {
        return Err(ChainError::Decode {
            what,
            detail: format!("expected 32 bytes, got {}", bytes.len()),
        });
    }
    Ok(B256::from_slice(&bytes))
}
