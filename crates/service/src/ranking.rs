//! Ordering of validated candidates
//!
//! Swaps rank by USD output per unit of input, or by closeness to the
//! requested output in exact-output mode. A trusted firm-price source has
//! to beat the best competitor by a margin; a preferred bridge gets the
//! same margin in its favour. Sorting is a total order: equal scores fall
//! back to source id and then amounts, so input order never matters.

use alloy_primitives::U256;
use router_types::{BridgeRoute, SourceId, ValidatedRoute};
use std::cmp::Ordering;

use crate::run::SwapJob;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingPolicy {
	pub trusted_source: Option<SourceId>,
	pub preferred_bridge: Option<SourceId>,
	/// Margin as a fraction (0.05 = 5%)
	pub margin: f64,
}

impl RankingPolicy {
	pub fn new(
		trusted_source: Option<SourceId>,
		preferred_bridge: Option<SourceId>,
		margin_pct: f64,
	) -> Self {
		Self {
			trusted_source,
			preferred_bridge,
			margin: margin_pct / 100.0,
		}
	}
}

/// How swap scores are compared
#[derive(Debug, Clone, Copy, PartialEq)]
enum SwapScoring {
	/// USD output per raw input unit, higher first
	Ratio,
	/// Distance from the requested output's USD value, lower first
	Target(f64),
}

fn amount_as_f64(amount: U256) -> f64 {
	amount.to_string().parse::<f64>().unwrap_or(0.0)
}

fn ratio(amount_out_usd: f64, amount_in: U256) -> f64 {
	let amount_in = amount_as_f64(amount_in);
	if amount_in == 0.0 {
		return 0.0;
	}
	amount_out_usd / amount_in
}

/// Requested output in USD, when ranking exact-output swaps
pub fn target_usd(job: &SwapJob) -> Option<f64> {
	let amount_out = job.amount.amount_out()?;
	let price = job.prices.token_out_usd.filter(|price| *price > 0.0)?;
	Some(job.token_out.to_units(amount_out) * price)
}

/// Best route first
pub fn rank_swaps(
	mut routes: Vec<ValidatedRoute>,
	target_usd: Option<f64>,
	policy: &RankingPolicy,
) -> Vec<ValidatedRoute> {
	let scoring = match target_usd {
		Some(target) => SwapScoring::Target(target),
		None => SwapScoring::Ratio,
	};
	let is_trusted = |route: &ValidatedRoute| policy.trusted_source == Some(route.source);

	// Handicap the trusted source so that beating a key means beating the
	// competitor by the margin.
	let key = |route: &ValidatedRoute| match scoring {
		SwapScoring::Ratio => {
			let score = ratio(route.amount_out_usd, route.amount_in);
			if is_trusted(route) {
				score / (1.0 + policy.margin)
			} else {
				score
			}
		},
		SwapScoring::Target(target) => {
			let distance = (route.amount_out_usd - target).abs();
			if is_trusted(route) {
				distance / (1.0 - policy.margin)
			} else {
				distance
			}
		},
	};

	routes.sort_by(|a, b| {
		let by_score = match scoring {
			SwapScoring::Ratio => key(b).total_cmp(&key(a)),
			SwapScoring::Target(_) => key(a).total_cmp(&key(b)),
		};
		by_score
			// the trusted source loses exact ties
			.then_with(|| is_trusted(a).cmp(&is_trusted(b)))
			.then_with(|| a.source.cmp(&b.source))
			.then_with(|| a.amount_in.cmp(&b.amount_in))
			.then_with(|| b.amount_out.cmp(&a.amount_out))
	});
	routes
}

/// Best bridge first; the preferred source wins when within the margin
pub fn rank_bridges(mut routes: Vec<BridgeRoute>, policy: &RankingPolicy) -> Vec<BridgeRoute> {
	let is_preferred = |route: &BridgeRoute| policy.preferred_bridge == Some(route.source);
	let key = |route: &BridgeRoute| {
		let score = ratio(route.amount_out_usd, route.amount_in);
		if is_preferred(route) {
			score * (1.0 + policy.margin)
		} else {
			score
		}
	};

	routes.sort_by(|a, b| {
		key(b)
			.total_cmp(&key(a))
			.then_with(|| match (is_preferred(a), is_preferred(b)) {
				(true, false) => Ordering::Less,
				(false, true) => Ordering::Greater,
				_ => Ordering::Equal,
			})
			.then_with(|| a.source.cmp(&b.source))
			.then_with(|| b.amount_out.cmp(&a.amount_out))
	});
	routes
}
