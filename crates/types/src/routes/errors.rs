//! User-facing routing errors

use thiserror::Error;

use crate::adapters::SourceId;

/// Errors a routing call can end with.
///
/// Only one of these ever reaches the caller; per-source failures are
/// recovered inside the run unless a single source was consulted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouteError {
	#[error("No quote returned by {source_id}")]
	AdapterUnavailable { source_id: SourceId },

	/// Sole-source failure, message passed through untouched
	#[error("{0}")]
	AdapterFatal(String),

	#[error("Balance drift too large for {source_id}: requested {requested}, realized {realized}")]
	ValidationMismatch {
		source_id: SourceId,
		requested: f64,
		realized: f64,
	},

	#[error("Transaction from {source_id} failed after {attempts} attempts")]
	ValidationTransient { source_id: SourceId, attempts: u32 },

	#[error("No swap route found with slippage {slippage}%")]
	SlippageExceeded { slippage: f64 },

	#[error("No sandbox left in run {run_id}")]
	PoolExhausted { run_id: String },

	#[error("No bridge routes found within timeout")]
	NoBridgeRoute,

	#[error("Protocol {hint} is not supported for {kind}")]
	UnsupportedProtocol { hint: String, kind: &'static str },

	#[error("Rate limit, come back later: no USD price for {symbol}")]
	PriceUnavailable { symbol: String },

	#[error("Invalid request: {reason}")]
	InvalidRequest { reason: String },

	#[error("Adapter registry mismatch: {reason}")]
	Registry { reason: String },
}

pub type RouteResult<T> = Result<T, RouteError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_user_facing_messages() {
		let error = RouteError::SlippageExceeded { slippage: 50.0 };
		assert_eq!(error.to_string(), "No swap route found with slippage 50%");

		let error = RouteError::SlippageExceeded { slippage: 0.5 };
		assert_eq!(error.to_string(), "No swap route found with slippage 0.5%");

		let error = RouteError::AdapterFatal("X unavailable".to_string());
		assert_eq!(error.to_string(), "X unavailable");

		let error = RouteError::UnsupportedProtocol {
			hint: "pancake".to_string(),
			kind: "swap",
		};
		assert_eq!(error.to_string(), "Protocol pancake is not supported for swap");
	}
}
