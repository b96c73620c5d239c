//! Routing requests accepted by the orchestrator

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::adapters::SourceId;
use crate::models::{ChainId, TokenRef};
use crate::quotes::AmountSpec;

/// How the caller intends to use the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
	/// The result will be submitted: wait for every source
	Execution,
	/// Fast, non-submitting preview: stop shortly after the first good route
	#[default]
	Preview,
}

/// A same-chain swap routing request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
	pub chain_id: ChainId,
	pub account: Address,
	pub token_in: TokenRef,
	pub token_out: TokenRef,
	pub amount: AmountSpec,
	pub gas_price: U256,
	/// Percentage; missing or non-finite values fall back to the configured default
	#[serde(default)]
	pub slippage: Option<f64>,
	/// Protocol name pinning a single source
	#[serde(default)]
	pub source_hint: Option<String>,
	#[serde(default)]
	pub ignore: Vec<SourceId>,
	/// Sandbox already reflecting the caller's pending balances
	#[serde(default)]
	pub parent_sandbox: Option<String>,
	/// Block to fork from when no parent sandbox is given
	#[serde(default)]
	pub block_number: Option<u64>,
	#[serde(default)]
	pub limit_price: Option<f64>,
	#[serde(default)]
	pub mode: RouteMode,
}

impl SwapRequest {
	pub fn new(
		chain_id: ChainId,
		account: Address,
		token_in: TokenRef,
		token_out: TokenRef,
		amount: AmountSpec,
		gas_price: U256,
	) -> Self {
		Self {
			chain_id,
			account,
			token_in,
			token_out,
			amount,
			gas_price,
			slippage: None,
			source_hint: None,
			ignore: Vec::new(),
			parent_sandbox: None,
			block_number: None,
			limit_price: None,
			mode: RouteMode::default(),
		}
	}

	pub fn with_slippage(mut self, slippage: f64) -> Self {
		self.slippage = Some(slippage);
		self
	}

	pub fn with_source_hint(mut self, hint: impl Into<String>) -> Self {
		self.source_hint = Some(hint.into());
		self
	}

	pub fn with_ignore(mut self, ignore: Vec<SourceId>) -> Self {
		self.ignore = ignore;
		self
	}

	pub fn with_parent_sandbox(mut self, sandbox_id: impl Into<String>) -> Self {
		self.parent_sandbox = Some(sandbox_id.into());
		self
	}

	pub fn with_limit_price(mut self, price: f64) -> Self {
		self.limit_price = Some(price);
		self
	}

	pub fn with_mode(mut self, mode: RouteMode) -> Self {
		self.mode = mode;
		self
	}
}

/// A cross-chain bridge routing request (exact input only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRequest {
	pub source_chain: ChainId,
	pub dest_chain: ChainId,
	pub account: Address,
	pub source_token: TokenRef,
	pub dest_token: TokenRef,
	pub amount: U256,
	pub gas_price: U256,
	#[serde(default)]
	pub source_hint: Option<String>,
	#[serde(default)]
	pub ignore: Vec<SourceId>,
	#[serde(default)]
	pub parent_sandbox: Option<String>,
	#[serde(default)]
	pub mode: RouteMode,
}

impl BridgeRequest {
	pub fn new(
		source_chain: ChainId,
		dest_chain: ChainId,
		account: Address,
		source_token: TokenRef,
		dest_token: TokenRef,
		amount: U256,
		gas_price: U256,
	) -> Self {
		Self {
			source_chain,
			dest_chain,
			account,
			source_token,
			dest_token,
			amount,
			gas_price,
			source_hint: None,
			ignore: Vec::new(),
			parent_sandbox: None,
			mode: RouteMode::default(),
		}
	}

	pub fn with_source_hint(mut self, hint: impl Into<String>) -> Self {
		self.source_hint = Some(hint.into());
		self
	}

	pub fn with_parent_sandbox(mut self, sandbox_id: impl Into<String>) -> Self {
		self.parent_sandbox = Some(sandbox_id.into());
		self
	}

	pub fn with_mode(mut self, mode: RouteMode) -> Self {
		self.mode = mode;
		self
	}
}
