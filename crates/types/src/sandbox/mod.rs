//! Forked-chain sandbox provisioning

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

use crate::models::ChainId;
use crate::rpc::RpcError;

/// Sandbox provisioning errors.
///
/// Cloneable so one provisioning result can be shared by every waiter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SandboxError {
	#[error("Sandbox provisioning failed: {reason}")]
	Provisioning { reason: String },

	#[error("Sandbox {sandbox_id} not running after {waited_ms}ms")]
	NotReady { sandbox_id: String, waited_ms: u64 },

	#[error("Sandbox provider rejected request: HTTP {status_code}: {reason}")]
	Provider { status_code: u16, reason: String },

	#[error("Sandbox RPC failed: {0}")]
	Rpc(#[from] RpcError),

	#[error("Sandbox provisioning was abandoned")]
	Abandoned,
}

impl SandboxError {
	pub fn is_transient(&self) -> bool {
		match self {
			SandboxError::Provider { status_code, .. } => {
				*status_code == 429 || *status_code >= 500
			},
			SandboxError::Rpc(e) => e.is_transient(),
			SandboxError::Provisioning { .. } | SandboxError::NotReady { .. } => true,
			SandboxError::Abandoned => false,
		}
	}
}

pub type SandboxResult<T> = Result<T, SandboxError>;

/// A provisioned sandbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxInfo {
	pub id: String,
	pub rpc_endpoint: String,
}

/// Provider of disposable chain forks
#[async_trait]
pub trait SandboxProvisioner: Send + Sync + Debug {
	/// Fork live chain state at `block_number`, or the latest block
	async fn create_sandbox(
		&self,
		chain_id: ChainId,
		block_number: Option<u64>,
	) -> SandboxResult<SandboxInfo>;

	/// Copy an existing sandbox, including its balances
	async fn duplicate_sandbox(&self, parent_id: &str) -> SandboxResult<SandboxInfo>;

	async fn fund_native(&self, endpoint: &str, account: Address, amount: U256)
		-> SandboxResult<()>;

	async fn set_erc20_balance(
		&self,
		endpoint: &str,
		token: Address,
		account: Address,
		amount: U256,
	) -> SandboxResult<()>;
}
