//! Token references and unit conversion

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ChainId;

/// A fungible asset on one chain.
///
/// `address` is `None` for the chain's native (gas) asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRef {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<Address>,
	pub symbol: String,
	pub decimals: u8,
}

impl TokenRef {
	/// Native gas asset of the given chain
	pub fn native(chain_id: ChainId) -> Self {
		Self {
			address: None,
			symbol: chain_id.native_symbol().to_string(),
			decimals: 18,
		}
	}

	/// ERC20 token at `address`
	pub fn erc20(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
		Self {
			address: Some(address),
			symbol: symbol.into(),
			decimals,
		}
	}

	pub fn is_native(&self) -> bool {
		self.address.is_none()
	}

	/// Whether this reference names the generic "ETH" asset
	pub fn is_generic_eth(&self) -> bool {
		self.symbol.eq_ignore_ascii_case("eth")
	}

	/// Whether the symbol matches, ignoring case
	pub fn has_symbol(&self, symbol: &str) -> bool {
		self.symbol.eq_ignore_ascii_case(symbol)
	}

	/// Convert a raw amount of this token into a float of whole units
	pub fn to_units(&self, amount: U256) -> f64 {
		to_units_f64(amount, self.decimals)
	}

	/// Convert whole units into a raw amount of this token
	pub fn from_units(&self, value: f64) -> U256 {
		from_units_f64(value, self.decimals)
	}
}

impl fmt::Display for TokenRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.address {
			Some(address) => write!(f, "{} ({})", self.symbol, address),
			None => write!(f, "{} (native)", self.symbol),
		}
	}
}

/// Lossy conversion of a raw integer amount to whole units
pub fn to_units_f64(amount: U256, decimals: u8) -> f64 {
	let raw = amount.to_string().parse::<f64>().unwrap_or(0.0);
	raw / 10f64.powi(decimals as i32)
}

/// Lossy conversion of whole units to a raw integer amount.
///
/// Negative and non-finite inputs map to zero.
pub fn from_units_f64(value: f64, decimals: u8) -> U256 {
	if !value.is_finite() || value <= 0.0 {
		return U256::ZERO;
	}
	let scaled = value * 10f64.powi(decimals as i32);
	U256::from_str_radix(&format!("{:.0}", scaled.floor()), 10).unwrap_or(U256::ZERO)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unit_conversion() {
		let usdc = TokenRef::erc20(Address::ZERO, "USDC", 6);
		assert_eq!(usdc.to_units(U256::from(1_500_000u64)), 1.5);
		assert_eq!(usdc.from_units(2.25), U256::from(2_250_000u64));
		assert_eq!(usdc.from_units(-1.0), U256::ZERO);
		assert_eq!(usdc.from_units(f64::NAN), U256::ZERO);
	}

	#[test]
	fn test_native_token() {
		let pol = TokenRef::native(ChainId::POLYGON);
		assert!(pol.is_native());
		assert_eq!(pol.symbol, "POL");
		assert!(!pol.is_generic_eth());
		assert!(TokenRef::native(ChainId::BASE).is_generic_eth());
	}
}
