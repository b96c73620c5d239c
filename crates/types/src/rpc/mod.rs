//! Chain RPC abstraction consumed by sandbox validation

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

use crate::models::ChainId;

/// RPC errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
	#[error("RPC transport error: {reason}")]
	Transport { reason: String },

	#[error("RPC server error: HTTP {status_code}")]
	Server { status_code: u16 },

	#[error("RPC error {code}: {message}")]
	JsonRpc { code: i64, message: String },

	#[error("Invalid RPC response: {reason}")]
	InvalidResponse { reason: String },

	#[error("No receipt for {hash} after {waited_ms}ms")]
	ReceiptTimeout { hash: B256, waited_ms: u64 },

	#[error("No RPC endpoint configured for chain {chain_id}")]
	NoEndpoint { chain_id: ChainId },
}

impl RpcError {
	/// Server and network failures are worth retrying; protocol errors are not
	pub fn is_transient(&self) -> bool {
		matches!(self, RpcError::Transport { .. } | RpcError::Server { .. })
	}
}

pub type RpcResult<T> = Result<T, RpcError>;

/// Transaction submitted from an unlocked sandbox account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
	pub from: Address,
	pub to: Address,
	pub data: Bytes,
	pub value: U256,
}

/// The receipt fields validation needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
	pub transaction_hash: B256,
	pub status: bool,
	pub gas_used: u64,
}

/// Retrying RPC client bound to one chain (or one sandbox endpoint)
#[async_trait]
pub trait ChainRpc: Send + Sync + Debug {
	fn chain_id(&self) -> ChainId;

	async fn native_balance(&self, account: Address) -> RpcResult<U256>;

	/// `balanceOf(account)` on an ERC20 contract
	async fn erc20_balance(&self, token: Address, account: Address) -> RpcResult<U256>;

	/// `eth_sendTransaction`; the sandbox signs for any account
	async fn send_transaction(&self, tx: &TransactionRequest) -> RpcResult<B256>;

	/// Poll until the receipt is available, failing with `ReceiptTimeout`
	async fn wait_for_receipt(&self, hash: B256) -> RpcResult<TransactionReceipt>;
}

/// Builds RPC clients for arbitrary endpoints, such as freshly forked sandboxes
pub trait RpcConnector: Send + Sync + Debug {
	fn connect(&self, endpoints: &[String], chain_id: ChainId) -> RpcResult<Arc<dyn ChainRpc>>;
}
