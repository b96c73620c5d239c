//! Typed identifiers for quote sources

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One external quote source.
///
/// The declaration order doubles as the final tie-break when ranking, so it
/// must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceId {
	#[serde(rename = "0x")]
	ZeroX,
	#[serde(rename = "odos")]
	Odos,
	#[serde(rename = "paraswap")]
	Paraswap,
	#[serde(rename = "cowswap")]
	CowSwap,
	#[serde(rename = "hyperliquid")]
	Hyperliquid,
	#[serde(rename = "across")]
	Across,
	#[serde(rename = "relay")]
	Relay,
}

/// What a source produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
	/// Same-chain swap quotes, validated in a sandbox
	Swap,
	/// Cross-chain bridge quotes
	Bridge,
	/// Non-EVM venue answered directly with a signature payload
	Venue,
}

impl SourceId {
	pub const ALL: [SourceId; 7] = [
		SourceId::ZeroX,
		SourceId::Odos,
		SourceId::Paraswap,
		SourceId::CowSwap,
		SourceId::Hyperliquid,
		SourceId::Across,
		SourceId::Relay,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			SourceId::ZeroX => "0x",
			SourceId::Odos => "odos",
			SourceId::Paraswap => "paraswap",
			SourceId::CowSwap => "cowswap",
			SourceId::Hyperliquid => "hyperliquid",
			SourceId::Across => "across",
			SourceId::Relay => "relay",
		}
	}

	pub fn kind(self) -> SourceKind {
		match self {
			SourceId::ZeroX | SourceId::Odos | SourceId::Paraswap | SourceId::CowSwap => {
				SourceKind::Swap
			},
			SourceId::Hyperliquid => SourceKind::Venue,
			SourceId::Across | SourceId::Relay => SourceKind::Bridge,
		}
	}

	/// Sources whose quoted price is final and need no sandbox execution
	pub fn is_firm_price(self) -> bool {
		matches!(self, SourceId::CowSwap)
	}
}

impl fmt::Display for SourceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned for an unknown canonical source id
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown quote source: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for SourceId {
	type Err = UnknownSource;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		SourceId::ALL
			.into_iter()
			.find(|id| id.as_str().eq_ignore_ascii_case(s))
			.ok_or_else(|| UnknownSource(s.to_string()))
	}
}
