//! Route orchestration
//!
//! One call resolves tokens, prices and sources, then races a
//! quote-and-validate pipeline per source against the run deadline.
//! Execution calls wait for every pipeline; preview calls return shortly
//! after the first acceptable route.

use alloy_primitives::Address;
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use router_adapters::{AdapterRegistry, SourceHint};
use router_config::RoutingSettings;
use router_types::constants::limits::DEFAULT_VALIDATION_ATTEMPTS;
use router_types::{
	BridgeQuery, BridgeRequest, BridgeRoute, ChainId, Outcome, PriceOracle, QuoteAdapter,
	QuotePrices, RouteError, RouteMode, RouteResult, SandboxProvisioner, SourceId, SwapQuery,
	SwapRequest, SwapRoute, TokenRef, TokenResolver, ValidatedRoute,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::ranking::{rank_bridges, rank_swaps, target_usd, RankingPolicy};
use crate::run::{BridgeJob, OrchestrationRun, RunPrices, SwapJob};
use crate::sandbox_pool::SandboxPool;
use crate::slippage::{normalize_slippage, slippage_bps, SlippageFilter};
use crate::validator::RouteValidator;

type Pipeline<T> = JoinHandle<RouteResult<Option<T>>>;

/// Sources consulted for one call
#[derive(Debug, Clone, PartialEq)]
struct SourceSelection {
	sources: Vec<SourceId>,
	dex_filter: Option<Vec<String>>,
}

impl SourceSelection {
	fn is_sole(&self) -> bool {
		self.sources.len() == 1
	}
}

pub struct RouteOrchestrator {
	registry: Arc<AdapterRegistry>,
	validator: Arc<dyn RouteValidator>,
	provisioner: Arc<dyn SandboxProvisioner>,
	prices: Arc<dyn PriceOracle>,
	tokens: Arc<dyn TokenResolver>,
	routing: RoutingSettings,
	validation_attempts: u32,
}

impl std::fmt::Debug for RouteOrchestrator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RouteOrchestrator")
			.field("sources", &self.registry.len())
			.field("routing", &self.routing)
			.field("validation_attempts", &self.validation_attempts)
			.finish()
	}
}

impl RouteOrchestrator {
	pub fn new(
		registry: Arc<AdapterRegistry>,
		validator: Arc<dyn RouteValidator>,
		provisioner: Arc<dyn SandboxProvisioner>,
		prices: Arc<dyn PriceOracle>,
		tokens: Arc<dyn TokenResolver>,
		routing: RoutingSettings,
	) -> Self {
		Self {
			registry,
			validator,
			provisioner,
			prices,
			tokens,
			routing,
			validation_attempts: DEFAULT_VALIDATION_ATTEMPTS,
		}
	}

	/// Validation attempts per candidate; sizes cold sandbox pools
	pub fn with_validation_attempts(mut self, attempts: u32) -> Self {
		self.validation_attempts = attempts.max(1);
		self
	}

	pub fn registry(&self) -> &AdapterRegistry {
		&self.registry
	}

	fn ranking_policy(&self) -> RankingPolicy {
		RankingPolicy::new(
			self.routing.trusted_source,
			self.routing.preferred_bridge_source,
			self.routing.ranking_margin_pct,
		)
	}

	fn run_window(&self, selection: &SourceSelection) -> Option<Duration> {
		if selection.is_sole() {
			None
		} else {
			Some(Duration::from_millis(self.routing.timeout_ms))
		}
	}

	/// Validated swap routes, best first.
	///
	/// Fails with the sole source's own error when only one source is
	/// consulted, otherwise with `SlippageExceeded` when nothing survives.
	pub async fn swap_routes(&self, request: SwapRequest) -> RouteResult<Vec<SwapRoute>> {
		let requested = match request.amount.amount_in() {
			Some(amount) => amount,
			None => request.amount.amount_out().unwrap_or_default(),
		};
		if requested.is_zero() {
			return Err(RouteError::InvalidRequest {
				reason: "amount must be positive".to_string(),
			});
		}

		let slippage = normalize_slippage(request.slippage, self.routing.default_slippage_pct);
		let selection = self.select_swap_sources(request.source_hint.as_deref())?;
		let chain_id = request.chain_id;
		let token_in = self.normalize_token(request.token_in.clone(), chain_id).await?;
		let token_out = self.normalize_token(request.token_out.clone(), chain_id).await?;

		let run_id = Uuid::new_v4();
		info!(
			"Run {}: {} -> {} on {} via {} sources ({:?})",
			run_id,
			token_in.symbol,
			token_out.symbol,
			chain_id,
			selection.sources.len(),
			request.mode
		);

		if selection.sources == [SourceId::Hyperliquid] {
			return self
				.venue_route(&request, token_in, token_out, slippage, &selection)
				.await;
		}

		let prices = self
			.swap_prices(request.account, chain_id, &token_in, &token_out)
			.await?;
		let job = Arc::new(SwapJob {
			chain_id,
			account: request.account,
			token_in: token_in.clone(),
			token_out: token_out.clone(),
			amount: request.amount,
			gas_price: request.gas_price,
			prices,
		});

		let pipelines = selection.sources.len();
		let pool = match &request.parent_sandbox {
			Some(parent) if !chain_id.has_alternate_gas_model() => SandboxPool::warm(
				run_id.to_string(),
				parent.clone(),
				pipelines,
				Arc::clone(&self.provisioner),
			),
			_ => SandboxPool::cold(
				run_id.to_string(),
				chain_id,
				request.block_number,
				pipelines * self.validation_attempts as usize,
				Arc::clone(&self.provisioner),
			),
		};
		let run = Arc::new(OrchestrationRun::new(run_id, pool, self.run_window(&selection)));

		let query = SwapQuery {
			chain_id,
			account: request.account,
			token_in: token_in.clone(),
			token_out: token_out.clone(),
			amount: request.amount,
			gas_price: request.gas_price,
			slippage_bps: slippage_bps(slippage),
			adapter_count_hint: pipelines,
			dex_filter: selection.dex_filter.clone(),
			limit_price: request.limit_price,
			prices: QuotePrices {
				token_in_usd: prices.token_in_usd,
				token_out_usd: prices.token_out_usd,
			},
		};
		let ignore = Arc::new(request.ignore.clone());
		let handles: Vec<Pipeline<ValidatedRoute>> = self
			.adapters(&selection)?
			.into_iter()
			.map(|adapter| {
				self.spawn_swap_pipeline(
					adapter,
					query.clone(),
					Arc::clone(&run),
					Arc::clone(&job),
					Arc::clone(&ignore),
				)
			})
			.collect();

		let filter = SlippageFilter::new(slippage, token_in, token_out, prices.pair());
		let candidates = match request.mode {
			RouteMode::Execution => {
				let mut candidates = collect_all(handles, &run).await?;
				if let Some(filter) = &filter {
					candidates.retain(|route| filter.passes(route));
				}
				candidates
			},
			RouteMode::Preview => {
				let grace = Duration::from_millis(self.routing.preview_grace_ms);
				drain_preview(handles, &run, grace, |route: &ValidatedRoute| {
					filter.as_ref().map_or(true, |filter| filter.passes(route))
				})
				.await?
			},
		};

		if candidates.is_empty() {
			warn!("Run {}: no route within {}% slippage", run_id, slippage);
			return Err(RouteError::SlippageExceeded { slippage });
		}

		let ranked = rank_swaps(candidates, target_usd(&job), &self.ranking_policy());
		info!(
			"Run {}: {} routes, best from {} (${:.2})",
			run_id,
			ranked.len(),
			ranked[0].source,
			ranked[0].amount_out_usd
		);
		Ok(ranked)
	}

	/// Validated bridge routes, best first
	pub async fn bridge_routes(&self, request: BridgeRequest) -> RouteResult<Vec<BridgeRoute>> {
		if request.amount.is_zero() {
			return Err(RouteError::InvalidRequest {
				reason: "amount must be positive".to_string(),
			});
		}

		let selection = match request.source_hint.as_deref() {
			Some(hint) => {
				let hint = SourceHint::parse_bridge(hint)?;
				SourceSelection {
					sources: vec![hint.source_id],
					dex_filter: None,
				}
			},
			None => SourceSelection {
				sources: self.registry.bridge_sources(),
				dex_filter: None,
			},
		};

		let source_token = self
			.normalize_token(request.source_token.clone(), request.source_chain)
			.await?;
		let dest_token = self
			.normalize_token(request.dest_token.clone(), request.dest_chain)
			.await?;

		let run_id = Uuid::new_v4();
		info!(
			"Run {}: bridge {} {} -> {} {} via {} sources ({:?})",
			run_id,
			request.source_chain,
			source_token.symbol,
			request.dest_chain,
			dest_token.symbol,
			selection.sources.len(),
			request.mode
		);

		let (gas_token_usd, dest_token_usd) = tokio::join!(
			self.gas_token_price(request.account, request.source_chain),
			self.usd_price(request.account, &dest_token, request.dest_chain)
		);
		let job = Arc::new(BridgeJob {
			source_chain: request.source_chain,
			dest_chain: request.dest_chain,
			account: request.account,
			source_token: source_token.clone(),
			dest_token: dest_token.clone(),
			amount: request.amount,
			gas_price: request.gas_price,
			gas_token_usd: gas_token_usd?,
			dest_token_usd,
		});

		let pipelines = selection.sources.len();
		let pool = match &request.parent_sandbox {
			Some(parent) if !request.source_chain.has_alternate_gas_model() => SandboxPool::warm(
				run_id.to_string(),
				parent.clone(),
				pipelines,
				Arc::clone(&self.provisioner),
			),
			_ => SandboxPool::cold(
				run_id.to_string(),
				request.source_chain,
				None,
				pipelines,
				Arc::clone(&self.provisioner),
			),
		};
		let run = Arc::new(OrchestrationRun::new(run_id, pool, self.run_window(&selection)));

		let query = BridgeQuery {
			source_chain: request.source_chain,
			dest_chain: request.dest_chain,
			account: request.account,
			source_token,
			dest_token,
			amount: request.amount,
			adapter_count_hint: pipelines,
		};
		let ignore = Arc::new(request.ignore.clone());
		let handles: Vec<Pipeline<BridgeRoute>> = self
			.adapters(&selection)?
			.into_iter()
			.map(|adapter| {
				self.spawn_bridge_pipeline(
					adapter,
					query.clone(),
					Arc::clone(&run),
					Arc::clone(&job),
					Arc::clone(&ignore),
				)
			})
			.collect();

		let candidates = match request.mode {
			RouteMode::Execution => collect_all(handles, &run).await?,
			RouteMode::Preview => {
				let grace = Duration::from_millis(self.routing.preview_grace_ms);
				drain_preview(handles, &run, grace, |_: &BridgeRoute| true).await?
			},
		};

		if candidates.is_empty() {
			warn!("Run {}: no bridge route", run_id);
			return Err(RouteError::NoBridgeRoute);
		}

		let ranked = rank_bridges(candidates, &self.ranking_policy());
		info!(
			"Run {}: {} bridge routes, best from {}",
			run_id,
			ranked.len(),
			ranked[0].source
		);
		Ok(ranked)
	}

	fn select_swap_sources(&self, hint: Option<&str>) -> RouteResult<SourceSelection> {
		match hint {
			Some(hint) => {
				let hint = SourceHint::parse_swap(hint)?;
				Ok(SourceSelection {
					sources: vec![hint.source_id],
					dex_filter: hint.dex_filter,
				})
			},
			None => Ok(SourceSelection {
				sources: self.registry.swap_sources(),
				dex_filter: None,
			}),
		}
	}

	fn adapters(&self, selection: &SourceSelection) -> RouteResult<Vec<Arc<dyn QuoteAdapter>>> {
		selection
			.sources
			.iter()
			.map(|source_id| {
				self.registry.get(*source_id).ok_or_else(|| RouteError::Registry {
					reason: format!("{} is not configured", source_id),
				})
			})
			.collect()
	}

	/// Order-book venues cannot be forked; their quote is returned as the only route
	async fn venue_route(
		&self,
		request: &SwapRequest,
		token_in: TokenRef,
		token_out: TokenRef,
		slippage: f64,
		selection: &SourceSelection,
	) -> RouteResult<Vec<SwapRoute>> {
		let adapter = self
			.adapters(selection)?
			.pop()
			.ok_or_else(|| RouteError::Registry {
				reason: "no venue adapter".to_string(),
			})?;
		let (token_in_usd, token_out_usd) = tokio::join!(
			self.usd_price(request.account, &token_in, request.chain_id),
			self.usd_price(request.account, &token_out, request.chain_id)
		);
		let query = SwapQuery {
			chain_id: request.chain_id,
			account: request.account,
			token_in,
			token_out,
			amount: request.amount,
			gas_price: request.gas_price,
			slippage_bps: slippage_bps(slippage),
			adapter_count_hint: 1,
			dex_filter: None,
			limit_price: request.limit_price,
			prices: QuotePrices {
				token_in_usd,
				token_out_usd,
			},
		};

		match adapter.quote(&query).await {
			Ok(Some(quote)) => Ok(vec![ValidatedRoute {
				real_amount_out_usd: None,
				..ValidatedRoute::trusted(quote, 0.0)
			}]),
			Ok(None) => Err(RouteError::AdapterUnavailable {
				source_id: adapter.source(),
			}),
			Err(e) => Err(RouteError::AdapterFatal(e.to_string())),
		}
	}

	/// Generic "ETH" on chains paying gas in another asset means WETH
	async fn normalize_token(&self, token: TokenRef, chain_id: ChainId) -> RouteResult<TokenRef> {
		if !(token.is_native() && token.is_generic_eth() && chain_id.wraps_generic_native()) {
			return Ok(token);
		}
		match self.tokens.resolve_token("weth", chain_id).await {
			Ok(Some(weth)) => {
				debug!("Using {} for ETH on {}", weth, chain_id);
				Ok(weth)
			},
			Ok(None) => Err(RouteError::InvalidRequest {
				reason: format!("no wrapped ETH known on chain {}", chain_id),
			}),
			Err(e) => Err(RouteError::InvalidRequest {
				reason: e.to_string(),
			}),
		}
	}

	async fn usd_price(&self, account: Address, token: &TokenRef, chain_id: ChainId) -> Option<f64> {
		match self.prices.get_usd_price(account, token, chain_id).await {
			Ok(price) => price.filter(|price| price.is_finite() && *price > 0.0),
			Err(e) => {
				warn!("No USD price for {} on {}: {}", token.symbol, chain_id, e);
				None
			},
		}
	}

	/// Gas cannot be valued without it, so its absence ends the call
	async fn gas_token_price(&self, account: Address, chain_id: ChainId) -> RouteResult<f64> {
		let native = TokenRef::native(chain_id);
		self.usd_price(account, &native, chain_id)
			.await
			.ok_or(RouteError::PriceUnavailable {
				symbol: native.symbol,
			})
	}

	async fn swap_prices(
		&self,
		account: Address,
		chain_id: ChainId,
		token_in: &TokenRef,
		token_out: &TokenRef,
	) -> RouteResult<RunPrices> {
		let (gas_token_usd, token_in_usd, token_out_usd) = tokio::join!(
			self.gas_token_price(account, chain_id),
			self.usd_price(account, token_in, chain_id),
			self.usd_price(account, token_out, chain_id)
		);
		Ok(RunPrices {
			gas_token_usd: gas_token_usd?,
			token_in_usd,
			token_out_usd,
		})
	}

	fn spawn_swap_pipeline(
		&self,
		adapter: Arc<dyn QuoteAdapter>,
		query: SwapQuery,
		run: Arc<OrchestrationRun>,
		job: Arc<SwapJob>,
		ignore: Arc<Vec<SourceId>>,
	) -> Pipeline<ValidatedRoute> {
		let validator = Arc::clone(&self.validator);
		let span = info_span!("route", run_id = %run.run_id, source = %adapter.source());
		let pipeline = async move {
			let quote = match adapter.quote(&query).await {
				Ok(Some(quote)) => quote,
				Ok(None) => return Ok(None),
				Err(e) => return Err(RouteError::AdapterFatal(e.to_string())),
			};
			if ignore.contains(&quote.source) {
				debug!("Ignoring quote from {}", quote.source);
				return Ok(None);
			}

			let source_id = quote.source;
			match validator.validate_swap(&run, &job, quote).await {
				Ok(route) => Ok(Some(route)),
				Err(e) if query.is_sole_source() => Err(e),
				Err(e) => {
					debug!("Dropping {} candidate: {}", source_id, e);
					Ok(None)
				},
			}
		};
		tokio::spawn(pipeline.instrument(span))
	}

	fn spawn_bridge_pipeline(
		&self,
		adapter: Arc<dyn QuoteAdapter>,
		query: BridgeQuery,
		run: Arc<OrchestrationRun>,
		job: Arc<BridgeJob>,
		ignore: Arc<Vec<SourceId>>,
	) -> Pipeline<BridgeRoute> {
		let validator = Arc::clone(&self.validator);
		let span = info_span!("route", run_id = %run.run_id, source = %adapter.source());
		let pipeline = async move {
			let quote = match adapter.bridge_quote(&query).await {
				Ok(Some(quote)) => quote,
				Ok(None) => return Ok(None),
				Err(e) => return Err(RouteError::AdapterFatal(e.to_string())),
			};
			if ignore.contains(&quote.source) {
				debug!("Ignoring bridge quote from {}", quote.source);
				return Ok(None);
			}

			let source_id = quote.source;
			match validator.validate_bridge(&run, &job, quote).await {
				Ok(route) => Ok(Some(route)),
				Err(e) if query.is_sole_source() => Err(e),
				Err(e) => {
					debug!("Dropping {} bridge: {}", source_id, e);
					Ok(None)
				},
			}
		};
		tokio::spawn(pipeline.instrument(span))
	}
}

/// A panicked pipeline counts as a source without a route
async fn settle<T>(pipeline: Pipeline<T>, run_id: Uuid) -> RouteResult<Option<T>> {
	match pipeline.await {
		Ok(result) => result,
		Err(e) => {
			error!("Run {}: route pipeline failed to complete: {}", run_id, e);
			Ok(None)
		},
	}
}

/// Race a pipeline against the run deadline
async fn bounded<T, F>(pipeline: F, deadline: Option<Instant>) -> RouteResult<Outcome<T>>
where
	F: Future<Output = RouteResult<Option<T>>>,
{
	match deadline {
		Some(deadline) => match timeout_at(deadline, pipeline).await {
			Ok(result) => result.map(Outcome::from),
			Err(_) => Ok(Outcome::TimedOut),
		},
		None => pipeline.await.map(Outcome::from),
	}
}

/// Wait for every pipeline, or until the run deadline
async fn collect_all<T>(pipelines: Vec<Pipeline<T>>, run: &OrchestrationRun) -> RouteResult<Vec<T>> {
	let outcomes = join_all(
		pipelines
			.into_iter()
			.map(|pipeline| bounded(settle(pipeline, run.run_id), run.deadline)),
	)
	.await;

	let mut candidates = Vec::new();
	let mut timed_out = 0;
	for outcome in outcomes {
		match outcome? {
			Outcome::Candidate(candidate) => candidates.push(candidate),
			Outcome::TimedOut => timed_out += 1,
			Outcome::Unavailable => {},
		}
	}
	if timed_out > 0 {
		warn!("Run {}: {} sources did not finish before the deadline", run.run_id, timed_out);
	}
	Ok(candidates)
}

/// Take routes in completion order; once one is accepted, pending sources
/// get `grace` more time.
async fn drain_preview<T, F>(
	pipelines: Vec<Pipeline<T>>,
	run: &OrchestrationRun,
	grace: Duration,
	accept: F,
) -> RouteResult<Vec<T>>
where
	F: Fn(&T) -> bool,
{
	let deadline = run.deadline;
	let mut pending: FuturesUnordered<_> = pipelines
		.into_iter()
		.map(|pipeline| settle(pipeline, run.run_id))
		.collect();
	let mut grace_deadline: Option<Instant> = None;
	let mut accepted = Vec::new();

	loop {
		let stop_at = match (deadline, grace_deadline) {
			(Some(deadline), Some(grace)) => Some(deadline.min(grace)),
			(deadline, grace) => deadline.or(grace),
		};
		let next = match stop_at {
			Some(stop_at) => match timeout_at(stop_at, pending.next()).await {
				Ok(next) => next,
				Err(_) => {
					debug!(
						"Run {}: preview window closed with {} routes, {} sources pending",
						run.run_id,
						accepted.len(),
						pending.len()
					);
					break;
				},
			},
			None => pending.next().await,
		};
		let Some(result) = next else {
			break;
		};

		if let Some(candidate) = result? {
			if accept(&candidate) {
				accepted.push(candidate);
				grace_deadline.get_or_insert_with(|| Instant::now() + grace);
			} else {
				debug!("Run {}: preview candidate rejected by slippage check", run.run_id);
			}
		}
	}
	Ok(accepted)
}
