//! Typed registry of quote source adapters

use router_types::{
	AdapterRuntimeConfig, QuoteAdapter, RouteError, RouteResult, SourceId, SourceKind,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::client_cache::ClientCache;
use crate::{
	across_adapter, cowswap_adapter, hyperliquid_adapter, odos_adapter, paraswap_adapter,
	relay_adapter, zerox_adapter, AcrossAdapter, CowSwapAdapter, HyperliquidAdapter, OdosAdapter,
	ParaswapAdapter, RelayAdapter, ZeroXAdapter,
};

/// Public API endpoint used when configuration names none
pub fn default_endpoint(source_id: SourceId) -> &'static str {
	match source_id {
		SourceId::ZeroX => zerox_adapter::DEFAULT_ENDPOINT,
		SourceId::Odos => odos_adapter::DEFAULT_ENDPOINT,
		SourceId::Paraswap => paraswap_adapter::DEFAULT_ENDPOINT,
		SourceId::CowSwap => cowswap_adapter::DEFAULT_ENDPOINT,
		SourceId::Hyperliquid => hyperliquid_adapter::DEFAULT_ENDPOINT,
		SourceId::Across => across_adapter::DEFAULT_ENDPOINT,
		SourceId::Relay => relay_adapter::DEFAULT_ENDPOINT,
	}
}

/// Build the adapter serving `config.source`
pub fn create_adapter(config: AdapterRuntimeConfig, cache: ClientCache) -> Arc<dyn QuoteAdapter> {
	match config.source {
		SourceId::ZeroX => Arc::new(ZeroXAdapter::with_cache(config, cache)),
		SourceId::Odos => Arc::new(OdosAdapter::with_cache(config, cache)),
		SourceId::Paraswap => Arc::new(ParaswapAdapter::with_cache(config, cache)),
		SourceId::CowSwap => Arc::new(CowSwapAdapter::with_cache(config, cache)),
		SourceId::Hyperliquid => Arc::new(HyperliquidAdapter::with_cache(config, cache)),
		SourceId::Across => Arc::new(AcrossAdapter::with_cache(config, cache)),
		SourceId::Relay => Arc::new(RelayAdapter::with_cache(config, cache)),
	}
}

/// Adapters keyed by the source they answer for
#[derive(Debug, Clone, Default)]
pub struct AdapterRegistry {
	adapters: HashMap<SourceId, Arc<dyn QuoteAdapter>>,
}

impl AdapterRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Build one adapter per configuration, sharing a client cache
	pub fn from_configs(
		configs: impl IntoIterator<Item = AdapterRuntimeConfig>,
		cache: ClientCache,
	) -> Self {
		let mut registry = Self::new();
		for config in configs {
			debug!("Registering {} adapter at {}", config.source, config.endpoint);
			registry.register(create_adapter(config, cache.clone()));
		}
		registry
	}

	/// Register an adapter under the source it reports, replacing any previous one
	pub fn register(&mut self, adapter: Arc<dyn QuoteAdapter>) -> Option<Arc<dyn QuoteAdapter>> {
		self.adapters.insert(adapter.source(), adapter)
	}

	pub fn with_adapter(mut self, adapter: Arc<dyn QuoteAdapter>) -> Self {
		self.register(adapter);
		self
	}

	pub fn get(&self, source_id: SourceId) -> Option<Arc<dyn QuoteAdapter>> {
		self.adapters.get(&source_id).cloned()
	}

	pub fn contains(&self, source_id: SourceId) -> bool {
		self.adapters.contains_key(&source_id)
	}

	pub fn len(&self) -> usize {
		self.adapters.len()
	}

	pub fn is_empty(&self) -> bool {
		self.adapters.is_empty()
	}

	/// Registered sources of `kind`, in ranking tie-break order
	pub fn sources_of(&self, kind: SourceKind) -> Vec<SourceId> {
		let mut sources: Vec<SourceId> = self
			.adapters
			.keys()
			.copied()
			.filter(|id| id.kind() == kind)
			.collect();
		sources.sort();
		sources
	}

	/// Sources fanned out to for same-chain swaps
	pub fn swap_sources(&self) -> Vec<SourceId> {
		self.sources_of(SourceKind::Swap)
	}

	pub fn bridge_sources(&self) -> Vec<SourceId> {
		self.sources_of(SourceKind::Bridge)
	}

	/// Check that every enabled source has a registered adapter and that at
	/// least one swap source is available. Runs when the router is assembled.
	pub fn validate(&self, enabled: &[SourceId]) -> RouteResult<()> {
		for source_id in enabled {
			let adapter = self.adapters.get(source_id).ok_or_else(|| RouteError::Registry {
				reason: format!("{} is enabled but has no adapter", source_id),
			})?;
			if adapter.source() != *source_id {
				return Err(RouteError::Registry {
					reason: format!(
						"adapter registered for {} reports {}",
						source_id,
						adapter.source()
					),
				});
			}
		}

		if !self.adapters.keys().any(|id| id.kind() == SourceKind::Swap) {
			return Err(RouteError::Registry {
				reason: "no swap source registered".to_string(),
			});
		}
		Ok(())
	}
}
