//! Protocol names accepted as source hints
//!
//! A hint pins routing to exactly one source. Venue names served through an
//! aggregator map to that aggregator plus an include-filter for the venue.

use router_types::{RouteError, RouteResult, SourceId};

/// A resolved source hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHint {
	pub source_id: SourceId,
	/// Venues the source should restrict itself to
	pub dex_filter: Option<Vec<String>>,
}

impl SourceHint {
	fn source(source_id: SourceId) -> Self {
		Self {
			source_id,
			dex_filter: None,
		}
	}

	fn venue(source_id: SourceId, dexes: &[&str]) -> Self {
		Self {
			source_id,
			dex_filter: Some(dexes.iter().map(|d| d.to_string()).collect()),
		}
	}

	/// Resolve a hint for a same-chain swap
	pub fn parse_swap(hint: &str) -> RouteResult<Self> {
		let resolved = match hint.trim().to_ascii_lowercase().as_str() {
			"0x" | "matcha" => Self::source(SourceId::ZeroX),
			"aerodrome" => Self::venue(SourceId::ZeroX, &["Aerodrome"]),
			"velodrome" => Self::venue(SourceId::ZeroX, &["Velodrome"]),
			"odos" => Self::source(SourceId::Odos),
			"paraswap" => Self::source(SourceId::Paraswap),
			"sushiswap" => Self::venue(SourceId::Paraswap, &["SushiSwap", "SushiSwapV3"]),
			"curve" => Self::venue(SourceId::Paraswap, &["CurveV1", "CurveV2"]),
			"camelot" => Self::venue(SourceId::Paraswap, &["Camelot"]),
			"uniswap" => Self::venue(SourceId::Paraswap, &["UniswapV2", "UniswapV3"]),
			"cowswap" | "cow" => Self::source(SourceId::CowSwap),
			"hyperliquid" => Self::source(SourceId::Hyperliquid),
			_ => {
				return Err(RouteError::UnsupportedProtocol {
					hint: hint.to_string(),
					kind: "swaps",
				})
			},
		};
		Ok(resolved)
	}

	/// Resolve a hint for a cross-chain bridge
	pub fn parse_bridge(hint: &str) -> RouteResult<Self> {
		let resolved = match hint.trim().to_ascii_lowercase().as_str() {
			"across" => Self::source(SourceId::Across),
			"relay" | "reservoir" => Self::source(SourceId::Relay),
			_ => {
				return Err(RouteError::UnsupportedProtocol {
					hint: hint.to_string(),
					kind: "bridging",
				})
			},
		};
		Ok(resolved)
	}
}
