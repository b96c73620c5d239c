//! Quote source identity, runtime configuration and the adapter trait

use std::collections::HashMap;

use crate::models::SecretString;

pub mod errors;
pub mod source;
pub mod traits;

pub use errors::AdapterError;
pub use source::{SourceId, SourceKind, UnknownSource};
pub use traits::QuoteAdapter;

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Minimal runtime configuration needed by adapters
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterRuntimeConfig {
	pub source: SourceId,

	/// Base URL of the source's API
	pub endpoint: String,

	/// Timeout for requests in milliseconds
	pub timeout_ms: u64,

	pub api_key: Option<SecretString>,

	/// Optional custom HTTP headers for requests
	pub headers: Option<HashMap<String, String>>,
}

impl AdapterRuntimeConfig {
	pub fn new(source: SourceId, endpoint: impl Into<String>, timeout_ms: u64) -> Self {
		Self {
			source,
			endpoint: endpoint.into(),
			timeout_ms,
			api_key: None,
			headers: None,
		}
	}

	pub fn with_api_key(mut self, api_key: SecretString) -> Self {
		self.api_key = Some(api_key);
		self
	}

	pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
		self.headers = Some(headers);
		self
	}

	/// Endpoint without a trailing slash, for path joining
	pub fn base_url(&self) -> &str {
		self.endpoint.trim_end_matches('/')
	}
}
