//! In-memory collaborators for examples and testing
//!
//! `SimulatedChain` plays both the sandbox provider and the chain RPC:
//! every sandbox is a balance table, and calls to a contract address move
//! balances according to a script registered for that address. Together
//! with `FixedPriceOracle` and `MockQuoteAdapter` it drives the full
//! validation path without any network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::json;
use router_types::{
	AdapterError, AdapterResult, BridgeQuery, BridgeQuote, ChainId, ChainRpc, PriceError,
	PriceOracle, Quote, QuoteAdapter, QuoteTx, RpcConnector, RpcError, RpcResult, SandboxError,
	SandboxInfo, SandboxProvisioner, SandboxResult, SourceId, SwapQuery, TokenRef,
	TransactionReceipt, TransactionRequest,
};

/// `approve(address,uint256)`
const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

const APPROVE_GAS: u64 = 46_000;
const FAILED_CALL_GAS: u64 = 21_000;

/// Balance key: token (`None` for native) and holder
type BalanceKey = (Option<Address>, Address);

/// What a call to a scripted contract does to the caller's balances
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedCall {
	/// Debited from the caller; the call reverts when the balance is short
	pub spend: Option<(Option<Address>, U256)>,
	/// Credited to the caller
	pub receive: Option<(Option<Address>, U256)>,
	pub gas_used: u64,
	/// Calls that revert before the script takes effect
	pub reverts: u32,
}

impl ScriptedCall {
	/// Swap `spend` of `token_in` for `receive` of `token_out`
	pub fn swap(
		token_in: &TokenRef,
		spend: U256,
		token_out: &TokenRef,
		receive: U256,
	) -> Self {
		Self {
			spend: Some((token_in.address, spend)),
			receive: Some((token_out.address, receive)),
			gas_used: 150_000,
			reverts: 0,
		}
	}

	/// Pull `amount` of `token` out of the account, as a bridge deposit does
	pub fn deposit(token: &TokenRef, amount: U256) -> Self {
		Self {
			spend: Some((token.address, amount)),
			receive: None,
			gas_used: 90_000,
			reverts: 0,
		}
	}

	/// Succeeds without touching balances
	pub fn noop() -> Self {
		Self {
			spend: None,
			receive: None,
			gas_used: 30_000,
			reverts: 0,
		}
	}

	pub fn with_gas(mut self, gas_used: u64) -> Self {
		self.gas_used = gas_used;
		self
	}

	/// Revert the next `count` calls
	pub fn reverting(mut self, count: u32) -> Self {
		self.reverts = count;
		self
	}
}

#[derive(Debug, Clone)]
struct Sandbox {
	chain_id: ChainId,
	balances: HashMap<BalanceKey, U256>,
	receipts: HashMap<B256, TransactionReceipt>,
}

#[derive(Debug, Default)]
struct ChainState {
	/// Balances every freshly created sandbox starts from
	genesis: DashMap<BalanceKey, U256>,
	sandboxes: DashMap<String, Sandbox>,
	scripts: DashMap<Address, ScriptedCall>,
	approvals: DashMap<(Address, Address), u32>,
	submitted: DashMap<Address, u32>,
	next_id: AtomicU64,
	next_hash: AtomicU64,
	provisioned: AtomicUsize,
	provisioning_failures: AtomicU32,
	provisioning_delay_ms: AtomicU64,
	gas_price_wei: AtomicU64,
}

/// In-memory chain with forkable sandboxes
#[derive(Debug, Clone, Default)]
pub struct SimulatedChain {
	state: Arc<ChainState>,
}

impl SimulatedChain {
	pub fn new() -> Self {
		Self::default()
	}

	/// Balance present in every sandbox forked from live state
	pub fn with_balance(self, token: &TokenRef, account: Address, amount: U256) -> Self {
		self.state.genesis.insert((token.address, account), amount);
		self
	}

	/// Register what calls to `target` do
	pub fn with_script(self, target: Address, call: ScriptedCall) -> Self {
		self.state.scripts.insert(target, call);
		self
	}

	/// Price charged per gas unit, debited from the native balance
	pub fn with_gas_price(self, wei: u64) -> Self {
		self.state.gas_price_wei.store(wei, Ordering::SeqCst);
		self
	}

	/// Time every create and duplicate call takes
	pub fn with_provisioning_delay(self, delay: Duration) -> Self {
		self.state
			.provisioning_delay_ms
			.store(delay.as_millis() as u64, Ordering::SeqCst);
		self
	}

	/// Fail the next `count` create or duplicate calls
	pub fn fail_provisioning(&self, count: u32) {
		self.state.provisioning_failures.store(count, Ordering::SeqCst);
	}

	/// Sandboxes created or duplicated so far
	pub fn provisioned(&self) -> usize {
		self.state.provisioned.load(Ordering::SeqCst)
	}

	/// Calls sent to `target`, reverted ones included
	pub fn submissions(&self, target: Address) -> u32 {
		self.state.submitted.get(&target).map(|count| *count).unwrap_or(0)
	}

	/// Approvals granted on `token` for `spender`, across all sandboxes
	pub fn approvals(&self, token: Address, spender: Address) -> u32 {
		self.state
			.approvals
			.get(&(token, spender))
			.map(|count| *count)
			.unwrap_or(0)
	}

	/// Balance inside one sandbox, for assertions
	pub fn balance(&self, sandbox_id: &str, token: &TokenRef, account: Address) -> Option<U256> {
		self.state.sandboxes.get(sandbox_id).map(|sandbox| {
			sandbox
				.balances
				.get(&(token.address, account))
				.copied()
				.unwrap_or_default()
		})
	}

	fn endpoint(sandbox_id: &str) -> String {
		format!("sim://{}", sandbox_id)
	}

	fn sandbox_id(endpoint: &str) -> &str {
		endpoint.strip_prefix("sim://").unwrap_or(endpoint)
	}

	async fn provision(&self) -> SandboxResult<String> {
		let delay = self.state.provisioning_delay_ms.load(Ordering::SeqCst);
		if delay > 0 {
			tokio::time::sleep(Duration::from_millis(delay)).await;
		}
		let failing = self
			.state
			.provisioning_failures
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
			.is_ok();
		if failing {
			return Err(SandboxError::Provider {
				status_code: 503,
				reason: "simulated outage".to_string(),
			});
		}
		self.state.provisioned.fetch_add(1, Ordering::SeqCst);
		let id = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
		Ok(format!("sandbox-{}", id))
	}

	fn with_sandbox<T>(
		&self,
		endpoint: &str,
		f: impl FnOnce(&mut Sandbox) -> T,
	) -> Result<T, SandboxError> {
		let mut sandbox = self
			.state
			.sandboxes
			.get_mut(Self::sandbox_id(endpoint))
			.ok_or_else(|| SandboxError::Provisioning {
				reason: format!("unknown sandbox {}", endpoint),
			})?;
		Ok(f(&mut sandbox))
	}

	fn execute(&self, sandbox_id: &str, tx: &TransactionRequest) -> RpcResult<B256> {
		let hash = B256::from(
			U256::from(self.state.next_hash.fetch_add(1, Ordering::SeqCst) + 1).to_be_bytes::<32>(),
		);
		let gas_price = U256::from(self.state.gas_price_wei.load(Ordering::SeqCst));
		let mut sandbox = self
			.state
			.sandboxes
			.get_mut(sandbox_id)
			.ok_or_else(|| RpcError::Transport {
				reason: format!("unknown sandbox {}", sandbox_id),
			})?;

		let (status, gas_used) = if tx.data.len() >= 36 && tx.data.starts_with(&APPROVE_SELECTOR) {
			let spender = Address::from_slice(&tx.data[16..36]);
			*self.state.approvals.entry((tx.to, spender)).or_default() += 1;
			(true, APPROVE_GAS)
		} else {
			*self.state.submitted.entry(tx.to).or_default() += 1;
			match self.state.scripts.get_mut(&tx.to) {
				Some(mut script) if script.reverts > 0 => {
					script.reverts -= 1;
					(false, script.gas_used)
				},
				Some(script) => (apply(&mut sandbox.balances, tx.from, &script), script.gas_used),
				None => (false, FAILED_CALL_GAS),
			}
		};

		let gas_cost = gas_price * U256::from(gas_used);
		let native = sandbox.balances.entry((None, tx.from)).or_default();
		*native = native.saturating_sub(gas_cost);

		sandbox.receipts.insert(
			hash,
			TransactionReceipt {
				transaction_hash: hash,
				status,
				gas_used,
			},
		);
		Ok(hash)
	}
}

/// Apply a script to `account`; false when the spend is not covered
fn apply(balances: &mut HashMap<BalanceKey, U256>, account: Address, script: &ScriptedCall) -> bool {
	if let Some((token, amount)) = script.spend {
		let balance = balances.entry((token, account)).or_default();
		if *balance < amount {
			return false;
		}
		*balance -= amount;
	}
	if let Some((token, amount)) = script.receive {
		*balances.entry((token, account)).or_default() += amount;
	}
	true
}

#[async_trait]
impl SandboxProvisioner for SimulatedChain {
	async fn create_sandbox(
		&self,
		chain_id: ChainId,
		_block_number: Option<u64>,
	) -> SandboxResult<SandboxInfo> {
		let id = self.provision().await?;
		let balances = self
			.state
			.genesis
			.iter()
			.map(|entry| (*entry.key(), *entry.value()))
			.collect();
		self.state.sandboxes.insert(
			id.clone(),
			Sandbox {
				chain_id,
				balances,
				receipts: HashMap::new(),
			},
		);
		Ok(SandboxInfo {
			rpc_endpoint: Self::endpoint(&id),
			id,
		})
	}

	async fn duplicate_sandbox(&self, parent_id: &str) -> SandboxResult<SandboxInfo> {
		let parent = self
			.state
			.sandboxes
			.get(parent_id)
			.map(|sandbox| sandbox.value().clone())
			.ok_or_else(|| SandboxError::Provisioning {
				reason: format!("unknown parent sandbox {}", parent_id),
			})?;
		let id = self.provision().await?;
		self.state.sandboxes.insert(id.clone(), parent);
		Ok(SandboxInfo {
			rpc_endpoint: Self::endpoint(&id),
			id,
		})
	}

	async fn fund_native(&self, endpoint: &str, account: Address, amount: U256) -> SandboxResult<()> {
		self.with_sandbox(endpoint, |sandbox| {
			*sandbox.balances.entry((None, account)).or_default() += amount;
		})
	}

	async fn set_erc20_balance(
		&self,
		endpoint: &str,
		token: Address,
		account: Address,
		amount: U256,
	) -> SandboxResult<()> {
		self.with_sandbox(endpoint, |sandbox| {
			sandbox.balances.insert((Some(token), account), amount);
		})
	}
}

impl RpcConnector for SimulatedChain {
	fn connect(&self, endpoints: &[String], chain_id: ChainId) -> RpcResult<Arc<dyn ChainRpc>> {
		let endpoint = endpoints.first().ok_or(RpcError::NoEndpoint { chain_id })?;
		let sandbox_id = Self::sandbox_id(endpoint).to_string();
		if !self.state.sandboxes.contains_key(&sandbox_id) {
			return Err(RpcError::Transport {
				reason: format!("cannot reach {}", endpoint),
			});
		}
		Ok(Arc::new(SandboxRpc {
			chain: self.clone(),
			sandbox_id,
			chain_id,
		}))
	}
}

/// Client bound to one simulated sandbox
#[derive(Debug)]
struct SandboxRpc {
	chain: SimulatedChain,
	sandbox_id: String,
	chain_id: ChainId,
}

impl SandboxRpc {
	fn read(&self, key: BalanceKey) -> RpcResult<U256> {
		let sandbox = self
			.chain
			.state
			.sandboxes
			.get(&self.sandbox_id)
			.ok_or_else(|| RpcError::Transport {
				reason: format!("unknown sandbox {}", self.sandbox_id),
			})?;
		debug_assert_eq!(sandbox.chain_id, self.chain_id);
		Ok(sandbox.balances.get(&key).copied().unwrap_or_default())
	}
}

#[async_trait]
impl ChainRpc for SandboxRpc {
	fn chain_id(&self) -> ChainId {
		self.chain_id
	}

	async fn native_balance(&self, account: Address) -> RpcResult<U256> {
		self.read((None, account))
	}

	async fn erc20_balance(&self, token: Address, account: Address) -> RpcResult<U256> {
		self.read((Some(token), account))
	}

	async fn send_transaction(&self, tx: &TransactionRequest) -> RpcResult<B256> {
		self.chain.execute(&self.sandbox_id, tx)
	}

	async fn wait_for_receipt(&self, hash: B256) -> RpcResult<TransactionReceipt> {
		self.chain
			.state
			.sandboxes
			.get(&self.sandbox_id)
			.and_then(|sandbox| sandbox.receipts.get(&hash).cloned())
			.ok_or(RpcError::ReceiptTimeout { hash, waited_ms: 0 })
	}
}

/// Price oracle answering from a fixed symbol table
#[derive(Debug, Clone, Default)]
pub struct FixedPriceOracle {
	prices: HashMap<String, f64>,
}

impl FixedPriceOracle {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_price(mut self, symbol: &str, usd: f64) -> Self {
		self.prices.insert(symbol.to_ascii_lowercase(), usd);
		self
	}
}

#[async_trait]
impl PriceOracle for FixedPriceOracle {
	async fn get_usd_price(
		&self,
		_account: Address,
		token: &TokenRef,
		_chain_id: ChainId,
	) -> Result<Option<f64>, PriceError> {
		Ok(self.prices.get(&token.symbol.to_ascii_lowercase()).copied())
	}
}

/// Quote source answering every request from fixed terms
///
/// Output is the input's unit amount times `rate`. Swap quotes carry one
/// call to `router`; bridge quotes carry one deposit to `router`.
#[derive(Debug, Clone)]
pub struct MockQuoteAdapter {
	source: SourceId,
	router: Address,
	rate: f64,
	signature_only: bool,
	failure: Option<String>,
	calls: Arc<AtomicUsize>,
}

impl MockQuoteAdapter {
	pub fn new(source: SourceId, router: Address, rate: f64) -> Self {
		Self {
			source,
			router,
			rate,
			signature_only: false,
			failure: None,
			calls: Arc::new(AtomicUsize::new(0)),
		}
	}

	/// Answer with a signing payload instead of a transaction
	pub fn signature_only(mut self) -> Self {
		self.signature_only = true;
		self
	}

	/// Fail every request with `message`
	pub fn failing(mut self, message: impl Into<String>) -> Self {
		self.failure = Some(message.into());
		self
	}

	pub fn call_count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	fn scaled(&self, amount: U256, from: &TokenRef, to: &TokenRef) -> U256 {
		to.from_units(from.to_units(amount) * self.rate)
	}
}

#[async_trait]
impl QuoteAdapter for MockQuoteAdapter {
	fn source(&self) -> SourceId {
		self.source
	}

	async fn quote_swap(&self, query: &SwapQuery) -> AdapterResult<Quote> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if let Some(message) = &self.failure {
			return Err(AdapterError::fatal(message.clone()));
		}

		let (amount_in, amount_out) = match query.amount.amount_in() {
			Some(amount_in) => (
				amount_in,
				self.scaled(amount_in, &query.token_in, &query.token_out),
			),
			None => {
				let amount_out = query.amount.amount_out().unwrap_or_default();
				let amount_in = query
					.token_in
					.from_units(query.token_out.to_units(amount_out) / self.rate);
				(amount_in, amount_out)
			},
		};

		if self.signature_only {
			let order = json!({
				"sellToken": query.token_in.address,
				"buyToken": query.token_out.address,
				"sellAmount": amount_in.to_string(),
				"buyAmount": amount_out.to_string(),
			});
			return Ok(Quote::signature_only(
				self.source,
				amount_in,
				Some(amount_out),
				order,
			));
		}

		let value = if query.token_in.is_native() {
			amount_in
		} else {
			U256::ZERO
		};
		let tx = QuoteTx::new(self.router, Bytes::from_static(&[0xde, 0xad]), value);
		Ok(Quote::with_tx(self.source, amount_in, Some(amount_out), tx))
	}

	async fn quote_bridge(&self, query: &BridgeQuery) -> AdapterResult<BridgeQuote> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if let Some(message) = &self.failure {
			return Err(AdapterError::fatal(message.clone()));
		}
		Ok(BridgeQuote {
			source: self.source,
			amount_out: self.scaled(query.amount, &query.source_token, &query.dest_token),
			txs: vec![QuoteTx::new(
				self.router,
				Bytes::from_static(&[0xbe, 0xef]),
				U256::ZERO,
			)],
			usd_fee: 0.0,
			skip_approve: false,
		})
	}
}
