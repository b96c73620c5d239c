//! Exact-output quoting for sources that only quote exact input
//!
//! The input amount is first approximated from USD prices, quoted once, then
//! scaled by how far the quoted output landed from the target and quoted again.

use alloy_primitives::U256;
use router_types::{AdapterError, AdapterResult, QuotePrices, TokenRef};
use std::future::Future;
use tracing::debug;

/// First guess at the input needed to receive `target_out`
pub fn approximate_amount_in(
	target_out: U256,
	token_in: &TokenRef,
	token_out: &TokenRef,
	prices: &QuotePrices,
) -> Option<U256> {
	let price_in = prices.token_in_usd.filter(|p| *p > 0.0)?;
	let price_out = prices.token_out_usd.filter(|p| *p > 0.0)?;
	let target_usd = token_out.to_units(target_out) * price_out;
	let amount_in = token_in.from_units(target_usd / price_in);
	(!amount_in.is_zero()).then_some(amount_in)
}

/// Scale `amount_in` so that it would have produced `target_out`
pub fn refine_amount_in(amount_in: U256, target_out: U256, quoted_out: U256) -> Option<U256> {
	if quoted_out.is_zero() {
		return None;
	}
	amount_in
		.checked_mul(target_out)
		.map(|scaled| scaled / quoted_out)
		.filter(|refined| !refined.is_zero())
}

/// Approximate, quote, refine and quote again.
///
/// `quote_for` receives an input amount and returns the quoted output along
/// with whatever the caller needs to finish the quote. The result carries the
/// refined input amount and the second quote.
pub async fn quote_exact_out<T, F, Fut>(
	target_out: U256,
	token_in: &TokenRef,
	token_out: &TokenRef,
	prices: &QuotePrices,
	mut quote_for: F,
) -> AdapterResult<(U256, U256, T)>
where
	F: FnMut(U256) -> Fut,
	Fut: Future<Output = AdapterResult<(U256, T)>>,
{
	let approximate = approximate_amount_in(target_out, token_in, token_out, prices)
		.ok_or_else(|| AdapterError::invalid_response("Token prices required for exact output"))?;
	let (first_out, _) = quote_for(approximate).await?;

	let refined = refine_amount_in(approximate, target_out, first_out).ok_or_else(|| {
		AdapterError::invalid_response("Quoted output is zero, cannot refine input")
	})?;
	debug!(
		"Refined exact-output input from {} to {} (target {}, first quote {})",
		approximate, refined, target_out, first_out
	);

	let (amount_out, extra) = quote_for(refined).await?;
	Ok((refined, amount_out, extra))
}
