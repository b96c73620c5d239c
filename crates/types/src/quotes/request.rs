//! What adapters are asked for

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::models::{ChainId, TokenRef};

/// Which side of the trade the caller fixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmountSpec {
	/// Amount sent is fixed
	ExactIn(U256),
	/// Amount received is fixed
	ExactOut(U256),
}

impl AmountSpec {
	pub fn amount_in(&self) -> Option<U256> {
		match self {
			AmountSpec::ExactIn(amount) => Some(*amount),
			AmountSpec::ExactOut(_) => None,
		}
	}

	pub fn amount_out(&self) -> Option<U256> {
		match self {
			AmountSpec::ExactIn(_) => None,
			AmountSpec::ExactOut(amount) => Some(*amount),
		}
	}

	pub fn is_exact_out(&self) -> bool {
		matches!(self, AmountSpec::ExactOut(_))
	}
}

/// USD prices known to the orchestrator when the fan-out starts.
///
/// Adapters without native exact-output support use them to approximate
/// the input amount.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QuotePrices {
	pub token_in_usd: Option<f64>,
	pub token_out_usd: Option<f64>,
}

/// A same-chain swap quote request as seen by one adapter
#[derive(Debug, Clone)]
pub struct SwapQuery {
	pub chain_id: ChainId,
	pub account: Address,
	pub token_in: TokenRef,
	pub token_out: TokenRef,
	pub amount: AmountSpec,
	pub gas_price: U256,
	pub slippage_bps: u32,
	/// Number of adapters consulted for this request; `1` means this
	/// adapter's errors are surfaced to the caller.
	pub adapter_count_hint: usize,
	/// Restrict the source to these venues (from an aliased source hint)
	pub dex_filter: Option<Vec<String>>,
	/// Price pinned by the caller, for order-book venues
	pub limit_price: Option<f64>,
	pub prices: QuotePrices,
}

impl SwapQuery {
	pub fn is_sole_source(&self) -> bool {
		self.adapter_count_hint == 1
	}

	/// Slippage as a fraction (50 bps -> 0.005)
	pub fn slippage_fraction(&self) -> f64 {
		self.slippage_bps as f64 / 10_000.0
	}
}

/// A cross-chain bridge quote request as seen by one adapter
#[derive(Debug, Clone)]
pub struct BridgeQuery {
	pub source_chain: ChainId,
	pub dest_chain: ChainId,
	pub account: Address,
	pub source_token: TokenRef,
	pub dest_token: TokenRef,
	pub amount: U256,
	pub adapter_count_hint: usize,
}

impl BridgeQuery {
	pub fn is_sole_source(&self) -> bool {
		self.adapter_count_hint == 1
	}
}
