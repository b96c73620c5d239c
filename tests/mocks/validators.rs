//! Validator that skips the sandbox and values quotes as quoted

use async_trait::async_trait;
use swap_router::service::{BridgeJob, OrchestrationRun, SwapJob};
use swap_router::{BridgeQuote, BridgeRoute, Quote, RouteResult, RouteValidator, ValidatedRoute};

#[derive(Debug, Clone, Default)]
pub struct QuotedValueValidator;

#[async_trait]
impl RouteValidator for QuotedValueValidator {
	async fn validate_swap(
		&self,
		_run: &OrchestrationRun,
		job: &SwapJob,
		quote: Quote,
	) -> RouteResult<ValidatedRoute> {
		let price = job.prices.token_out_usd.unwrap_or(1.0);
		let usd = job.token_out.to_units(quote.amount_out.unwrap_or_default()) * price;
		Ok(ValidatedRoute::trusted(quote, usd))
	}

	async fn validate_bridge(
		&self,
		_run: &OrchestrationRun,
		job: &BridgeJob,
		quote: BridgeQuote,
	) -> RouteResult<BridgeRoute> {
		let price = job.dest_token_usd.unwrap_or(1.0);
		Ok(BridgeRoute {
			source: quote.source,
			amount_in: job.amount,
			amount_out: quote.amount_out,
			amount_out_usd: job.dest_token.to_units(quote.amount_out) * price - quote.usd_fee,
			txs: quote.txs,
			skip_approve: quote.skip_approve,
		})
	}
}
