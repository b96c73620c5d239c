//! What adapters return

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapters::SourceId;

/// Transaction proposed by a quote source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteTx {
	pub to: Address,
	pub data: Bytes,
	pub value: U256,
	/// Gas used in the sandbox, filled in by validation
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas: Option<u64>,
}

impl QuoteTx {
	pub fn new(to: Address, data: Bytes, value: U256) -> Self {
		Self {
			to,
			data,
			value,
			gas: None,
		}
	}
}

/// An unvalidated swap proposal from one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
	pub source: SourceId,
	pub amount_in: U256,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub amount_out: Option<U256>,
	/// Absent for signature-only flows
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tx: Option<QuoteTx>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sign_data: Option<Value>,
	/// Spender to approve when it differs from `tx.to`
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub approval_target: Option<Address>,
}

impl Quote {
	/// Quote carrying an executable transaction
	pub fn with_tx(source: SourceId, amount_in: U256, amount_out: Option<U256>, tx: QuoteTx) -> Self {
		Self {
			source,
			amount_in,
			amount_out,
			tx: Some(tx),
			sign_data: None,
			approval_target: None,
		}
	}

	/// Quote answered with an off-chain signature payload
	pub fn signature_only(
		source: SourceId,
		amount_in: U256,
		amount_out: Option<U256>,
		sign_data: Value,
	) -> Self {
		Self {
			source,
			amount_in,
			amount_out,
			tx: None,
			sign_data: Some(sign_data),
			approval_target: None,
		}
	}

	pub fn with_approval_target(mut self, spender: Address) -> Self {
		self.approval_target = Some(spender);
		self
	}

	pub fn is_signature_only(&self) -> bool {
		self.tx.is_none()
	}

	/// Address the input token must be approved for
	pub fn spender(&self) -> Option<Address> {
		self.approval_target.or(self.tx.as_ref().map(|tx| tx.to))
	}
}

/// A cross-chain proposal; may need several transactions on the source chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeQuote {
	pub source: SourceId,
	pub amount_out: U256,
	pub txs: Vec<QuoteTx>,
	/// Fees charged outside `amount_out`, in USD
	pub usd_fee: f64,
	/// The first transaction pulls funds without an ERC20 approval
	pub skip_approve: bool,
}
