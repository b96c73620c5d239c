//! Validated routes handed back to callers

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapters::SourceId;
use crate::quotes::{Quote, QuoteTx};

/// A quote that survived validation (or was trusted without it)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedRoute {
	pub source: SourceId,
	pub amount_in: U256,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub amount_out: Option<U256>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tx: Option<QuoteTx>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sign_data: Option<Value>,
	/// Output value net of gas, used for ranking
	pub amount_out_usd: f64,
	/// Output value before gas, used for the slippage check
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub real_amount_out_usd: Option<f64>,
}

/// Shape produced for the downstream transaction assembler
pub type SwapRoute = ValidatedRoute;

impl ValidatedRoute {
	/// Accept a quote as-is, without sandbox execution
	pub fn trusted(quote: Quote, amount_out_usd: f64) -> Self {
		Self {
			source: quote.source,
			amount_in: quote.amount_in,
			amount_out: quote.amount_out,
			tx: quote.tx,
			sign_data: quote.sign_data,
			amount_out_usd,
			real_amount_out_usd: Some(amount_out_usd),
		}
	}

	pub fn is_signature_only(&self) -> bool {
		self.tx.is_none()
	}
}

/// A validated cross-chain route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRoute {
	pub source: SourceId,
	pub amount_in: U256,
	pub amount_out: U256,
	pub txs: Vec<QuoteTx>,
	pub amount_out_usd: f64,
	pub skip_approve: bool,
}
