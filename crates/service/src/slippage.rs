//! Slippage normalization and the post-validation value check

use router_types::{TokenRef, ValidatedRoute};

/// Requested slippage in percent, or `default` when missing, negative or not finite
pub fn normalize_slippage(requested: Option<f64>, default: f64) -> f64 {
	requested
		.filter(|slippage| slippage.is_finite() && *slippage >= 0.0)
		.unwrap_or(default)
}

/// Percent to basis points, as adapters expect
pub fn slippage_bps(slippage_pct: f64) -> u32 {
	(slippage_pct * 100.0).round().clamp(0.0, 10_000.0) as u32
}

/// Rejects routes whose USD output falls too far below their USD input.
///
/// Only built when both tokens have a price.
#[derive(Debug, Clone)]
pub struct SlippageFilter {
	slippage_pct: f64,
	token_in: TokenRef,
	token_out: TokenRef,
	token_in_usd: f64,
	token_out_usd: f64,
}

impl SlippageFilter {
	pub fn new(
		slippage_pct: f64,
		token_in: TokenRef,
		token_out: TokenRef,
		prices: Option<(f64, f64)>,
	) -> Option<Self> {
		let (token_in_usd, token_out_usd) = prices?;
		Some(Self {
			slippage_pct,
			token_in,
			token_out,
			token_in_usd,
			token_out_usd,
		})
	}

	pub fn slippage_pct(&self) -> f64 {
		self.slippage_pct
	}

	/// Value out over value in must be at least `(100 - slippage) / 100`
	pub fn passes(&self, route: &ValidatedRoute) -> bool {
		let amount_in_usd = self.token_in.to_units(route.amount_in) * self.token_in_usd;
		let amount_out_usd = route
			.real_amount_out_usd
			.filter(|usd| *usd != 0.0)
			.or_else(|| {
				route
					.amount_out
					.map(|amount| self.token_out.to_units(amount) * self.token_out_usd)
			})
			.unwrap_or(0.0);

		if amount_out_usd == 0.0 {
			return false;
		}
		amount_out_usd / amount_in_usd >= (100.0 - self.slippage_pct) / 100.0
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{Address, U256};
	use router_types::SourceId;

	fn usdc() -> TokenRef {
		TokenRef::erc20(Address::repeat_byte(1), "USDC", 6)
	}

	fn dai() -> TokenRef {
		TokenRef::erc20(Address::repeat_byte(2), "DAI", 18)
	}

	fn route(amount_in: u64, real_usd: Option<f64>, amount_out: Option<U256>) -> ValidatedRoute {
		ValidatedRoute {
			source: SourceId::Odos,
			amount_in: U256::from(amount_in),
			amount_out,
			tx: None,
			sign_data: None,
			amount_out_usd: real_usd.unwrap_or(0.0),
			real_amount_out_usd: real_usd,
		}
	}

	#[test]
	fn test_normalize_slippage() {
		assert_eq!(normalize_slippage(Some(1.5), 50.0), 1.5);
		assert_eq!(normalize_slippage(None, 50.0), 50.0);
		assert_eq!(normalize_slippage(Some(f64::NAN), 50.0), 50.0);
		assert_eq!(normalize_slippage(Some(-1.0), 50.0), 50.0);
		assert_eq!(slippage_bps(0.5), 50);
		assert_eq!(slippage_bps(50.0), 5_000);
	}

	#[test]
	fn test_value_ratio_threshold() {
		let filter = SlippageFilter::new(1.0, usdc(), dai(), Some((1.0, 1.0))).unwrap();

		// 100 USDC in
		assert!(filter.passes(&route(100_000_000, Some(99.0), None)));
		assert!(filter.passes(&route(100_000_000, Some(100.5), None)));
		assert!(!filter.passes(&route(100_000_000, Some(98.9), None)));
	}

	#[test]
	fn test_falls_back_to_quoted_output() {
		let filter = SlippageFilter::new(5.0, usdc(), dai(), Some((1.0, 1.0))).unwrap();
		let ninety_six_dai = U256::from(96u64) * U256::from(10u64).pow(U256::from(18u64));

		assert!(filter.passes(&route(100_000_000, Some(0.0), Some(ninety_six_dai))));
		assert!(filter.passes(&route(100_000_000, None, Some(ninety_six_dai))));
		// No value information at all
		assert!(!filter.passes(&route(100_000_000, None, None)));
	}

	#[test]
	fn test_needs_both_prices() {
		assert!(SlippageFilter::new(1.0, usdc(), dai(), None).is_none());
	}
}
