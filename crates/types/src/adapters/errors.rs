//! Error types for quote source adapters

use thiserror::Error;

use super::SourceId;
use crate::models::ChainId;

/// Adapter operation errors
#[derive(Error, Debug)]
pub enum AdapterError {
	#[error("HTTP request failed: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("HTTP {status_code}: {reason}")]
	HttpStatusError { status_code: u16, reason: String },

	#[error("Timeout occurred after {timeout_ms}ms")]
	Timeout { timeout_ms: u64 },

	#[error("Invalid response format: {reason}")]
	InvalidResponse { reason: String },

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("Unsupported operation: {operation} for source {source_id}")]
	UnsupportedOperation {
		operation: String,
		source_id: SourceId,
	},

	#[error("Chain not supported: {chain_id} by source {source_id}")]
	ChainNotSupported {
		chain_id: ChainId,
		source_id: SourceId,
	},

	#[error("{token} is not supported for swap on {source_id}")]
	UnsupportedToken { token: String, source_id: SourceId },

	#[error("No liquidity found on {source_id}")]
	NoLiquidity { source_id: SourceId },

	#[error("Rate limit exceeded for source {source_id}")]
	RateLimitExceeded { source_id: SourceId },

	#[error("Configuration error: {reason}")]
	ConfigError { reason: String },

	/// Actionable diagnosis surfaced verbatim to the caller
	#[error("{message}")]
	Fatal { message: String },
}

impl AdapterError {
	/// Extract HTTP status code from the error if available
	pub fn status_code(&self) -> Option<u16> {
		match self {
			AdapterError::HttpStatusError { status_code, .. } => Some(*status_code),
			AdapterError::HttpError(reqwest_error) => {
				reqwest_error.status().map(|status| status.as_u16())
			},
			_ => None,
		}
	}

	/// Create an HTTP failure error from response status with default reason
	pub fn from_http_failure(status_code: u16) -> Self {
		let reason = match status_code {
			400 => "Bad Request".to_string(),
			401 => "Unauthorized".to_string(),
			403 => "Forbidden".to_string(),
			404 => "Not Found".to_string(),
			429 => "Too Many Requests".to_string(),
			500 => "Internal Server Error".to_string(),
			502 => "Bad Gateway".to_string(),
			503 => "Service Unavailable".to_string(),
			504 => "Gateway Timeout".to_string(),
			_ => format!("HTTP Error {}", status_code),
		};

		Self::HttpStatusError {
			status_code,
			reason,
		}
	}

	pub fn invalid_response(reason: impl Into<String>) -> Self {
		Self::InvalidResponse {
			reason: reason.into(),
		}
	}

	pub fn fatal(message: impl Into<String>) -> Self {
		Self::Fatal {
			message: message.into(),
		}
	}

	/// Whether retrying the same request may succeed
	pub fn is_transient(&self) -> bool {
		match self {
			AdapterError::HttpError(e) => {
				e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
			},
			AdapterError::HttpStatusError { status_code, .. } => {
				*status_code == 429 || *status_code >= 500
			},
			AdapterError::Timeout { .. } | AdapterError::RateLimitExceeded { .. } => true,
			_ => false,
		}
	}

	/// Convert into the verbatim, user-facing form used when `source_id` is
	/// the only source consulted. Specific diagnoses are kept; transport and
	/// format failures become an actionable generic message.
	pub fn into_fatal(self, source_id: SourceId) -> Self {
		match self {
			AdapterError::Fatal { .. } => self,
			AdapterError::ChainNotSupported { .. }
			| AdapterError::UnsupportedToken { .. }
			| AdapterError::NoLiquidity { .. }
			| AdapterError::UnsupportedOperation { .. } => AdapterError::Fatal {
				message: self.to_string(),
			},
			_ => AdapterError::Fatal {
				message: format!(
					"Error fetching quote from {}. Please try again later or contact support if the issue persists. You can also try a different protocol for your swap.",
					source_id
				),
			},
		}
	}
}
