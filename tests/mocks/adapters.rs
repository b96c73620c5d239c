//! Timing-controlled quote sources for orchestration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use swap_router::alloy_primitives::{Bytes, U256};
use swap_router::models::{AdapterResult, BridgeQuery, SwapQuery};
use swap_router::{AdapterError, BridgeQuote, Quote, QuoteAdapter, QuoteTx, SourceId};

use super::fixtures::router_address;

/// Call tracking for verifying which adapters were actually called
#[derive(Debug, Clone, Default)]
pub struct CallTracker {
	calls: Arc<AtomicUsize>,
}

impl CallTracker {
	pub fn record_call(&self) {
		self.calls.fetch_add(1, Ordering::SeqCst);
	}

	pub fn call_count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[derive(Debug, Clone)]
enum Response {
	/// Output is input times the rate, in whole units
	Rate(f64),
	Fail(String),
	/// Never answers
	Hang,
}

/// Quote source that answers after a configurable delay
#[derive(Debug, Clone)]
pub struct TimingControlledAdapter {
	source: SourceId,
	delay: Duration,
	response: Response,
	pub tracker: CallTracker,
}

impl TimingControlledAdapter {
	/// Answers in 100ms
	pub fn fast(source: SourceId, rate: f64) -> Self {
		Self::new(source, 100, rate)
	}

	/// Answers in 1500ms
	pub fn slow(source: SourceId, rate: f64) -> Self {
		Self::new(source, 1_500, rate)
	}

	pub fn new(source: SourceId, delay_ms: u64, rate: f64) -> Self {
		Self {
			source,
			delay: Duration::from_millis(delay_ms),
			response: Response::Rate(rate),
			tracker: CallTracker::default(),
		}
	}

	/// Fails after 100ms with `message`
	pub fn failing(source: SourceId, message: &str) -> Self {
		Self {
			source,
			delay: Duration::from_millis(100),
			response: Response::Fail(message.to_string()),
			tracker: CallTracker::default(),
		}
	}

	pub fn hanging(source: SourceId) -> Self {
		Self {
			source,
			delay: Duration::ZERO,
			response: Response::Hang,
			tracker: CallTracker::default(),
		}
	}

	pub fn call_count(&self) -> usize {
		self.tracker.call_count()
	}

	pub fn shared(&self) -> Arc<dyn QuoteAdapter> {
		Arc::new(self.clone())
	}

	async fn respond(&self) -> AdapterResult<f64> {
		self.tracker.record_call();
		tokio::time::sleep(self.delay).await;
		match &self.response {
			Response::Rate(rate) => Ok(*rate),
			Response::Fail(message) => Err(AdapterError::fatal(message.clone())),
			Response::Hang => std::future::pending().await,
		}
	}
}

#[async_trait]
impl QuoteAdapter for TimingControlledAdapter {
	fn source(&self) -> SourceId {
		self.source
	}

	async fn quote_swap(&self, query: &SwapQuery) -> AdapterResult<Quote> {
		let rate = self.respond().await?;
		let amount_in = query.amount.amount_in().unwrap_or_default();
		let amount_out = query
			.token_out
			.from_units(query.token_in.to_units(amount_in) * rate);
		let tx = QuoteTx::new(router_address(self.source), Bytes::new(), U256::ZERO);
		Ok(Quote::with_tx(self.source, amount_in, Some(amount_out), tx))
	}

	async fn quote_bridge(&self, query: &BridgeQuery) -> AdapterResult<BridgeQuote> {
		let rate = self.respond().await?;
		Ok(BridgeQuote {
			source: self.source,
			amount_out: query
				.dest_token
				.from_units(query.source_token.to_units(query.amount) * rate),
			txs: vec![QuoteTx::new(router_address(self.source), Bytes::new(), U256::ZERO)],
			usd_fee: 0.0,
			skip_approve: false,
		})
	}
}
