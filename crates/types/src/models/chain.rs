//! Chain identifiers and per-chain execution traits

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::fmt;

/// EVM chain identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
	pub const ETHEREUM: ChainId = ChainId(1);
	pub const OPTIMISM: ChainId = ChainId(10);
	pub const BSC: ChainId = ChainId(56);
	pub const POLYGON: ChainId = ChainId(137);
	pub const ZKSYNC: ChainId = ChainId(324);
	pub const BASE: ChainId = ChainId(8453);
	pub const ARBITRUM: ChainId = ChainId(42161);
	pub const AVALANCHE: ChainId = ChainId(43114);
	pub const BLAST: ChainId = ChainId(81457);

	pub fn as_u64(self) -> u64 {
		self.0
	}

	/// Symbol of the asset that pays for gas on this chain
	pub fn native_symbol(self) -> &'static str {
		match self.0 {
			56 => "BNB",
			137 => "POL",
			43114 => "AVAX",
			_ => "ETH",
		}
	}

	/// Lowercase chain name as used by token metadata and price services
	pub fn name(self) -> Option<&'static str> {
		match self.0 {
			1 => Some("ethereum"),
			10 => Some("optimism"),
			56 => Some("bsc"),
			137 => Some("polygon"),
			324 => Some("zksync"),
			8453 => Some("base"),
			42161 => Some("arbitrum"),
			43114 => Some("avalanche"),
			81457 => Some("blast"),
			_ => None,
		}
	}

	/// Chains whose fee model the sandbox cannot reproduce.
	///
	/// Routes on these chains are trusted as quoted.
	pub fn has_alternate_gas_model(self) -> bool {
		self == Self::ZKSYNC
	}

	/// Whether the sandbox provider can override ERC20 balances on this chain
	pub fn supports_balance_override(self) -> bool {
		self != Self::BLAST
	}

	/// True when requests naming the generic "ETH" asset must be served by
	/// the chain's wrapped asset instead, because gas is paid in something else.
	pub fn wraps_generic_native(self) -> bool {
		!self.native_symbol().eq_ignore_ascii_case("eth")
	}

	/// Canonical WETH deployment on this chain
	pub fn weth_address(self) -> Option<Address> {
		match self.0 {
			1 => Some(address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2")),
			10 | 8453 => Some(address!("4200000000000000000000000000000000000006")),
			56 => Some(address!("2170Ed0880ac9A755fd29B2688956BD959F933F8")),
			137 => Some(address!("7ceB23fD6bC0adD59E62ac25578270cFf1b9f619")),
			324 => Some(address!("5AEa5775959fBC2557Cc8789bC1bf90A239D9a91")),
			42161 => Some(address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1")),
			43114 => Some(address!("49D5c2BdFfac6CE2BFdB6640F4F80f226bc10bAB")),
			81457 => Some(address!("4300000000000000000000000000000000000004")),
			_ => None,
		}
	}
}

impl From<u64> for ChainId {
	fn from(id: u64) -> Self {
		ChainId(id)
	}
}

impl fmt::Display for ChainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}
