//! JSON-RPC client with multi-endpoint failover
//!
//! Each call walks the configured endpoints in order. Server and network
//! failures are retried on the same endpoint before failing over to the next
//! one; JSON-RPC errors are answers, not outages, and end the call.

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use reqwest::Client;
use router_types::constants::limits::{
	DEFAULT_RPC_ATTEMPTS, DEFAULT_RPC_BASE_DELAY_MS, RECEIPT_POLL_INTERVAL_MS, RECEIPT_TIMEOUT_MS,
};
use router_types::{
	with_retry_if, ChainId, ChainRpc, RetryPolicy, RpcConnector, RpcError, RpcResult,
	TransactionReceipt, TransactionRequest,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::erc20;

// ================================
// WIRE MODELS
// ================================

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
	jsonrpc: &'static str,
	id: u64,
	method: &'a str,
	params: &'a Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
	code: i64,
	message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
	#[serde(default)]
	result: Option<Value>,
	#[serde(default)]
	error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
	transaction_hash: B256,
	#[serde(default)]
	status: Option<U256>,
	gas_used: U256,
}

impl From<RpcReceipt> for TransactionReceipt {
	fn from(receipt: RpcReceipt) -> Self {
		Self {
			transaction_hash: receipt.transaction_hash,
			// Receipts without a status field predate byzantium and only exist for mined txs
			status: receipt.status.map_or(true, |status| status == U256::from(1u64)),
			gas_used: u64::try_from(receipt.gas_used).unwrap_or(u64::MAX),
		}
	}
}

/// POST one JSON-RPC request and return its `result`
pub(crate) async fn post_json_rpc(
	client: &Client,
	endpoint: &str,
	id: u64,
	method: &str,
	params: &Value,
) -> RpcResult<Value> {
	let request = JsonRpcRequest {
		jsonrpc: "2.0",
		id,
		method,
		params,
	};
	let response = client
		.post(endpoint)
		.json(&request)
		.send()
		.await
		.map_err(|e| RpcError::Transport {
			reason: e.to_string(),
		})?;

	let status = response.status();
	if status.is_server_error() || status.as_u16() == 429 {
		return Err(RpcError::Server {
			status_code: status.as_u16(),
		});
	}
	if !status.is_success() {
		return Err(RpcError::InvalidResponse {
			reason: format!("HTTP {} from {}", status, endpoint),
		});
	}

	let body: JsonRpcResponse = response.json().await.map_err(|e| RpcError::InvalidResponse {
		reason: e.to_string(),
	})?;
	if let Some(error) = body.error {
		return Err(RpcError::JsonRpc {
			code: error.code,
			message: error.message,
		});
	}
	Ok(body.result.unwrap_or(Value::Null))
}

/// Retrying RPC client bound to one chain
#[derive(Debug)]
pub struct JsonRpcClient {
	chain_id: ChainId,
	endpoints: Vec<String>,
	client: Client,
	retry_policy: RetryPolicy,
	receipt_poll_interval: Duration,
	receipt_timeout: Duration,
	next_id: AtomicU64,
}

impl JsonRpcClient {
	pub fn new(endpoints: Vec<String>, chain_id: ChainId) -> Self {
		Self::with_client(Client::new(), endpoints, chain_id)
	}

	pub fn with_client(client: Client, endpoints: Vec<String>, chain_id: ChainId) -> Self {
		Self {
			chain_id,
			endpoints,
			client,
			retry_policy: RetryPolicy::exponential(
				DEFAULT_RPC_ATTEMPTS,
				Duration::from_millis(DEFAULT_RPC_BASE_DELAY_MS),
			),
			receipt_poll_interval: Duration::from_millis(RECEIPT_POLL_INTERVAL_MS),
			receipt_timeout: Duration::from_millis(RECEIPT_TIMEOUT_MS),
			next_id: AtomicU64::new(1),
		}
	}

	pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
		self.retry_policy = retry_policy;
		self
	}

	pub fn with_receipt_timing(mut self, poll_interval: Duration, timeout: Duration) -> Self {
		self.receipt_poll_interval = poll_interval;
		self.receipt_timeout = timeout;
		self
	}

	pub fn endpoints(&self) -> &[String] {
		&self.endpoints
	}

	/// Call `method`, failing over across endpoints, and decode the result
	pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> RpcResult<T> {
		let value = self.request_value(method, &params).await?;
		serde_json::from_value(value).map_err(|e| RpcError::InvalidResponse {
			reason: format!("{}: {}", method, e),
		})
	}

	async fn request_value(&self, method: &str, params: &Value) -> RpcResult<Value> {
		let mut last_error = RpcError::NoEndpoint {
			chain_id: self.chain_id,
		};

		for endpoint in &self.endpoints {
			let label = format!("{} on chain {}", method, self.chain_id);
			let result = with_retry_if(
				&self.retry_policy,
				&label,
				|| {
					let id = self.next_id.fetch_add(1, Ordering::Relaxed);
					post_json_rpc(&self.client, endpoint, id, method, params)
				},
				RpcError::is_transient,
			)
			.await;

			match result {
				Ok(value) => return Ok(value),
				Err(e) if e.is_transient() => {
					warn!("RPC endpoint {} failed for {}, failing over: {}", endpoint, method, e);
					last_error = e;
				},
				Err(e) => return Err(e),
			}
		}

		Err(last_error)
	}
}

#[async_trait]
impl ChainRpc for JsonRpcClient {
	fn chain_id(&self) -> ChainId {
		self.chain_id
	}

	async fn native_balance(&self, account: Address) -> RpcResult<U256> {
		self.request("eth_getBalance", json!([account, "latest"])).await
	}

	async fn erc20_balance(&self, token: Address, account: Address) -> RpcResult<U256> {
		let call = json!({ "to": token, "data": erc20::balance_of_calldata(account) });
		let returned: Bytes = self.request("eth_call", json!([call, "latest"])).await?;
		erc20::decode_uint(&returned).ok_or_else(|| RpcError::InvalidResponse {
			reason: format!("balanceOf on {} returned {} bytes", token, returned.len()),
		})
	}

	async fn send_transaction(&self, tx: &TransactionRequest) -> RpcResult<B256> {
		debug!("Sending transaction from {} to {} on chain {}", tx.from, tx.to, self.chain_id);
		self.request("eth_sendTransaction", json!([tx])).await
	}

	async fn wait_for_receipt(&self, hash: B256) -> RpcResult<TransactionReceipt> {
		let started = Instant::now();
		loop {
			let receipt: Option<RpcReceipt> = self
				.request("eth_getTransactionReceipt", json!([hash]))
				.await?;
			if let Some(receipt) = receipt {
				return Ok(receipt.into());
			}
			if started.elapsed() >= self.receipt_timeout {
				return Err(RpcError::ReceiptTimeout {
					hash,
					waited_ms: started.elapsed().as_millis() as u64,
				});
			}
			tokio::time::sleep(self.receipt_poll_interval).await;
		}
	}
}

/// Connects [`JsonRpcClient`]s sharing one HTTP connection pool
#[derive(Debug, Clone, Default)]
pub struct HttpRpcConnector {
	client: Client,
	retry_policy: Option<RetryPolicy>,
}

impl HttpRpcConnector {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
		self.retry_policy = Some(retry_policy);
		self
	}
}

impl RpcConnector for HttpRpcConnector {
	fn connect(&self, endpoints: &[String], chain_id: ChainId) -> RpcResult<Arc<dyn ChainRpc>> {
		if endpoints.is_empty() {
			return Err(RpcError::NoEndpoint { chain_id });
		}
		let mut rpc = JsonRpcClient::with_client(self.client.clone(), endpoints.to_vec(), chain_id);
		if let Some(policy) = self.retry_policy {
			rpc = rpc.with_retry_policy(policy);
		}
		Ok(Arc::new(rpc))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wiremock::matchers::{body_partial_json, method};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn fast(endpoints: Vec<String>) -> JsonRpcClient {
		JsonRpcClient::new(endpoints, ChainId::BASE)
			.with_retry_policy(RetryPolicy::exponential(3, Duration::from_millis(5)))
			.with_receipt_timing(Duration::from_millis(5), Duration::from_millis(200))
	}

	fn result(value: Value) -> ResponseTemplate {
		ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": value }))
	}

	#[tokio::test]
	async fn test_native_balance_is_hex_decoded() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({ "method": "eth_getBalance" })))
			.respond_with(result(json!("0xde0b6b3a7640000")))
			.mount(&server)
			.await;

		let rpc = fast(vec![server.uri()]);
		let balance = rpc.native_balance(Address::repeat_byte(0xaa)).await.unwrap();
		assert_eq!(balance, U256::from(1_000_000_000_000_000_000u64));
	}

	#[tokio::test]
	async fn test_fails_over_after_server_errors() {
		let broken = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(503))
			.expect(3)
			.mount(&broken)
			.await;
		let healthy = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({ "method": "eth_getBalance" })))
			.respond_with(result(json!("0x2a")))
			.expect(1)
			.mount(&healthy)
			.await;

		let rpc = fast(vec![broken.uri(), healthy.uri()]);
		let balance = rpc.native_balance(Address::ZERO).await.unwrap();
		assert_eq!(balance, U256::from(42u64));
	}

	#[tokio::test]
	async fn test_json_rpc_error_does_not_fail_over() {
		let reverting = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0",
				"id": 1,
				"error": { "code": -32000, "message": "execution reverted" }
			})))
			.expect(1)
			.mount(&reverting)
			.await;
		let spare = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(result(json!("0x1")))
			.expect(0)
			.mount(&spare)
			.await;

		let rpc = fast(vec![reverting.uri(), spare.uri()]);
		let err = rpc
			.send_transaction(&TransactionRequest {
				from: Address::ZERO,
				to: Address::repeat_byte(0x11),
				data: Bytes::new(),
				value: U256::ZERO,
			})
			.await
			.unwrap_err();
		assert_eq!(
			err,
			RpcError::JsonRpc {
				code: -32000,
				message: "execution reverted".to_string()
			}
		);
	}

	#[tokio::test]
	async fn test_erc20_balance_reads_return_word() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({ "method": "eth_call" })))
			.respond_with(result(json!(
				"0x00000000000000000000000000000000000000000000000000000000000f4240"
			)))
			.mount(&server)
			.await;

		let rpc = fast(vec![server.uri()]);
		let balance = rpc
			.erc20_balance(Address::repeat_byte(0x11), Address::repeat_byte(0xaa))
			.await
			.unwrap();
		assert_eq!(balance, U256::from(1_000_000u64));
	}

	#[tokio::test]
	async fn test_receipt_fields() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({ "method": "eth_getTransactionReceipt" })))
			.respond_with(result(json!({
				"transactionHash": B256::repeat_byte(0x01),
				"status": "0x1",
				"gasUsed": "0x5208",
				"blockNumber": "0x10"
			})))
			.mount(&server)
			.await;

		let rpc = fast(vec![server.uri()]);
		let receipt = rpc.wait_for_receipt(B256::repeat_byte(0x01)).await.unwrap();
		assert!(receipt.status);
		assert_eq!(receipt.gas_used, 21_000);
	}

	#[tokio::test]
	async fn test_missing_receipt_times_out() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(result(Value::Null))
			.mount(&server)
			.await;

		let rpc = fast(vec![server.uri()]);
		let err = rpc.wait_for_receipt(B256::ZERO).await.unwrap_err();
		assert!(matches!(err, RpcError::ReceiptTimeout { .. }));
	}

	#[test]
	fn test_connector_requires_endpoints() {
		let connector = HttpRpcConnector::new();
		assert!(matches!(
			connector.connect(&[], ChainId::BASE),
			Err(RpcError::NoEndpoint { .. })
		));
		let rpc = connector
			.connect(&["http://localhost:8545".to_string()], ChainId::BASE)
			.unwrap();
		assert_eq!(rpc.chain_id(), ChainId::BASE);
	}
}
