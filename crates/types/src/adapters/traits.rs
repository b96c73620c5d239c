//! Core adapter trait implemented by every quote source

use async_trait::async_trait;
use std::fmt::Debug;
use tracing::debug;

use super::{AdapterError, AdapterResult, SourceId};
use crate::quotes::{BridgeQuery, BridgeQuote, Quote, SwapQuery};

/// One external quote source.
///
/// Implementations override `quote_swap` and/or `quote_bridge`; the
/// remaining methods encode the null-or-throw contract shared by all sources.
#[async_trait]
pub trait QuoteAdapter: Send + Sync + Debug {
	/// Source this adapter answers for
	fn source(&self) -> SourceId;

	/// Request a same-chain swap quote.
	///
	/// Default implementation returns UnsupportedOperation error.
	async fn quote_swap(&self, _query: &SwapQuery) -> AdapterResult<Quote> {
		Err(AdapterError::UnsupportedOperation {
			operation: "quote_swap".to_string(),
			source_id: self.source(),
		})
	}

	/// Request a cross-chain bridge quote.
	///
	/// Default implementation returns UnsupportedOperation error.
	async fn quote_bridge(&self, _query: &BridgeQuery) -> AdapterResult<BridgeQuote> {
		Err(AdapterError::UnsupportedOperation {
			operation: "quote_bridge".to_string(),
			source_id: self.source(),
		})
	}

	/// Swap quote or `None` on a recoverable failure.
	///
	/// Errors only escape when this adapter is the sole source, and then in
	/// their verbatim, user-facing form.
	async fn quote(&self, query: &SwapQuery) -> AdapterResult<Option<Quote>> {
		match self.quote_swap(query).await {
			Ok(quote) => Ok(Some(quote)),
			Err(e) if query.is_sole_source() => Err(e.into_fatal(self.source())),
			Err(e) => {
				debug!("{} returned no quote: {}", self.source(), e);
				Ok(None)
			},
		}
	}

	/// Bridge counterpart of [`QuoteAdapter::quote`]
	async fn bridge_quote(&self, query: &BridgeQuery) -> AdapterResult<Option<BridgeQuote>> {
		match self.quote_bridge(query).await {
			Ok(quote) => Ok(Some(quote)),
			Err(e) if query.is_sole_source() => Err(e.into_fatal(self.source())),
			Err(e) => {
				debug!("{} returned no bridge quote: {}", self.source(), e);
				Ok(None)
			},
		}
	}
}
