//! Sandbox validation of quoted routes
//!
//! Every executable quote is replayed on a disposable fork: the account is
//! funded, approvals are granted, the transaction is submitted with
//! retries, and balance deltas are compared with what was requested.
//! Routes the sandbox cannot reproduce faithfully are trusted as quoted.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use router_chain::erc20;
use router_config::ValidationSettings;
use router_types::{
	to_units_f64, with_retry, with_retry_if, BridgeQuote, BridgeRoute, ChainId, ChainRpc, Quote,
	QuoteTx, RetryPolicy, RouteError, RouteResult, RpcConnector, RpcError, SandboxError,
	SandboxProvisioner, SourceId, TokenRef, TransactionReceipt, TransactionRequest,
	ValidatedRoute,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::run::{BridgeJob, OrchestrationRun, SwapJob};
use crate::sandbox_pool::PoolError;

/// Turns an adapter's quote into a validated route.
///
/// Failures are returned, never panicked; the orchestrator decides whether
/// a failure drops the candidate or reaches the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteValidator: Send + Sync {
	async fn validate_swap(
		&self,
		run: &OrchestrationRun,
		job: &SwapJob,
		quote: Quote,
	) -> RouteResult<ValidatedRoute>;

	async fn validate_bridge(
		&self,
		run: &OrchestrationRun,
		job: &BridgeJob,
		quote: BridgeQuote,
	) -> RouteResult<BridgeRoute>;
}

/// Why a single validation attempt failed
#[derive(Error, Debug)]
enum AttemptError {
	/// Final verdict on the candidate
	#[error(transparent)]
	Rejected(#[from] RouteError),

	#[error("{0}")]
	Sandbox(#[from] SandboxError),

	#[error("{0}")]
	Rpc(#[from] RpcError),
}

impl AttemptError {
	/// Infrastructure failures are worth a fresh sandbox; verdicts are not
	fn is_unexpected(&self) -> bool {
		!matches!(self, AttemptError::Rejected(_))
	}

	fn into_route_error(self, source_id: SourceId) -> RouteError {
		match self {
			AttemptError::Rejected(e) => e,
			AttemptError::Sandbox(_) | AttemptError::Rpc(_) => {
				RouteError::AdapterUnavailable { source_id }
			},
		}
	}
}

impl From<PoolError> for AttemptError {
	fn from(e: PoolError) -> Self {
		match e {
			PoolError::Exhausted { run_id, .. } => {
				AttemptError::Rejected(RouteError::PoolExhausted { run_id })
			},
			PoolError::Provisioning(e) => AttemptError::Sandbox(e),
		}
	}
}

#[derive(Error, Debug)]
enum SubmitError {
	#[error(transparent)]
	Rpc(#[from] RpcError),

	#[error("Transaction {0} reverted")]
	Reverted(B256),
}

/// Sandbox-backed validator
#[derive(Debug, Clone)]
pub struct CandidateValidator {
	provisioner: Arc<dyn SandboxProvisioner>,
	connector: Arc<dyn RpcConnector>,
	settings: ValidationSettings,
}

impl CandidateValidator {
	pub fn new(
		provisioner: Arc<dyn SandboxProvisioner>,
		connector: Arc<dyn RpcConnector>,
		settings: ValidationSettings,
	) -> Self {
		Self {
			provisioner,
			connector,
			settings,
		}
	}

	fn submit_policy(&self) -> RetryPolicy {
		RetryPolicy::exponential(
			self.settings.submit_attempts,
			Duration::from_millis(self.settings.submit_base_delay_ms),
		)
	}

	fn validation_policy(&self) -> RetryPolicy {
		RetryPolicy::fixed(
			self.settings.validation_attempts,
			Duration::from_millis(self.settings.validation_pause_ms),
		)
		.with_silent_attempts(self.settings.silent_attempts)
	}

	fn synthetic_native_balance(&self) -> U256 {
		U256::from(self.settings.synthetic_native_balance_eth)
			* U256::from(10u64).pow(U256::from(18u64))
	}

	/// Fresh sandbox with the account funded for gas, plus a client for it
	async fn prepare_sandbox(
		&self,
		run: &OrchestrationRun,
		chain_id: ChainId,
		account: Address,
	) -> Result<(String, Arc<dyn ChainRpc>), AttemptError> {
		let sandbox = run.pool.acquire().await?;
		debug!("Validating in sandbox {}", sandbox.id);
		let rpc = self
			.connector
			.connect(std::slice::from_ref(&sandbox.rpc_endpoint), chain_id)?;
		self.provisioner
			.fund_native(&sandbox.rpc_endpoint, account, self.synthetic_native_balance())
			.await?;
		Ok((sandbox.rpc_endpoint, rpc))
	}

	/// Raise an ERC20 balance to cover `needed` on chains that allow overrides
	async fn top_up(
		&self,
		endpoint: &str,
		rpc: &dyn ChainRpc,
		token: Address,
		account: Address,
		needed: U256,
	) -> Result<(), AttemptError> {
		if !rpc.chain_id().supports_balance_override() {
			return Ok(());
		}
		let current = rpc.erc20_balance(token, account).await?;
		if current < needed {
			debug!("Topping up {} for {} by {}", token, account, needed);
			self.provisioner
				.set_erc20_balance(endpoint, token, account, current + needed)
				.await?;
		}
		Ok(())
	}

	/// Unlimited allowance for `spender`; a failed receipt is not fatal here
	async fn approve(
		&self,
		rpc: &dyn ChainRpc,
		token: Address,
		account: Address,
		spender: Address,
	) -> Result<(), AttemptError> {
		let request = TransactionRequest {
			from: account,
			to: token,
			data: erc20::approve_max_calldata(spender),
			value: U256::ZERO,
		};
		let hash = rpc.send_transaction(&request).await?;
		let receipt = rpc.wait_for_receipt(hash).await?;
		if !receipt.status {
			warn!("Approval of {} for {} reverted", token, spender);
		}
		Ok(())
	}

	/// Send `tx` until a successful receipt, giving up after `submit_attempts`
	async fn submit(
		&self,
		rpc: &dyn ChainRpc,
		source_id: SourceId,
		account: Address,
		tx: &QuoteTx,
	) -> Result<TransactionReceipt, AttemptError> {
		let request = TransactionRequest {
			from: account,
			to: tx.to,
			data: tx.data.clone(),
			value: tx.value,
		};
		let policy = self.submit_policy();
		let label = format!("{} transaction", source_id);

		with_retry(&policy, &label, || async {
			let hash = rpc.send_transaction(&request).await?;
			let receipt = rpc.wait_for_receipt(hash).await?;
			if receipt.status {
				Ok(receipt)
			} else {
				Err(SubmitError::Reverted(hash))
			}
		})
		.await
		.map_err(|_| {
			AttemptError::Rejected(RouteError::ValidationTransient {
				source_id,
				attempts: policy.max_attempts,
			})
		})
	}

	/// Reject when the realized input strays from the requested one
	fn check_drift(
		&self,
		source_id: SourceId,
		token: &TokenRef,
		requested: U256,
		realized: U256,
	) -> Result<(), AttemptError> {
		if requested.is_zero() {
			warn!("{} quoted a zero {} input", source_id, token.symbol);
			return Err(RouteError::ValidationMismatch {
				source_id,
				requested: 0.0,
				realized: token.to_units(realized),
			}
			.into());
		}
		let requested = token.to_units(requested);
		let realized = token.to_units(realized);
		let drift = (realized - requested).abs() / requested;
		if drift > self.settings.drift_tolerance_pct / 100.0 {
			warn!(
				"{} spent {} {} instead of {} ({:.2}% drift)",
				source_id,
				realized,
				token.symbol,
				requested,
				drift * 100.0
			);
			return Err(RouteError::ValidationMismatch {
				source_id,
				requested,
				realized,
			}
			.into());
		}
		Ok(())
	}

	async fn simulate_swap(
		&self,
		run: &OrchestrationRun,
		job: &SwapJob,
		quote: &Quote,
		tx: &QuoteTx,
	) -> Result<ValidatedRoute, AttemptError> {
		let (endpoint, rpc) = self.prepare_sandbox(run, job.chain_id, job.account).await?;
		let rpc = rpc.as_ref();

		if let Some(token) = job.token_in.address {
			self.top_up(&endpoint, rpc, token, job.account, quote.amount_in)
				.await?;
			if let Some(spender) = quote.spender() {
				self.approve(rpc, token, job.account, spender).await?;
			}
		}

		let pre_in = balance_of(rpc, &job.token_in, job.account).await?;
		let pre_out = balance_of(rpc, &job.token_out, job.account).await?;

		let receipt = self.submit(rpc, quote.source, job.account, tx).await?;
		let gas_cost = job.gas_price * U256::from(receipt.gas_used);

		let post_in = balance_of(rpc, &job.token_in, job.account).await?;
		let post_out = balance_of(rpc, &job.token_out, job.account).await?;

		// Native input pays for gas out of the same balance
		let balance_change = pre_in.saturating_sub(post_in);
		let spent = if job.token_in.is_native() {
			balance_change.saturating_sub(gas_cost)
		} else {
			balance_change
		};
		let requested = job.amount.amount_in().unwrap_or(quote.amount_in);
		self.check_drift(quote.source, &job.token_in, requested, balance_change)?;

		let received = post_out.saturating_sub(pre_out);
		let received = if received.is_zero() {
			quote.amount_out.unwrap_or_default()
		} else {
			received
		};

		let gas_usd = to_units_f64(gas_cost, 18) * job.prices.gas_token_usd;
		let output_usd = job
			.prices
			.token_out_usd
			.map(|price| job.token_out.to_units(received) * price)
			.unwrap_or(0.0);
		let mut amount_out_usd = output_usd - gas_usd;
		if amount_out_usd == 0.0 || job.prices.token_out_usd.is_none() {
			amount_out_usd = 1.0;
		}
		let real_amount_out_usd = if output_usd == 0.0 { 1.0 } else { output_usd };

		let mut tx = tx.clone();
		tx.gas = Some(receipt.gas_used);

		info!(
			"{} validated: spent {}, received {}, gas {} (${:.2} net)",
			quote.source, spent, received, receipt.gas_used, amount_out_usd
		);

		Ok(ValidatedRoute {
			source: quote.source,
			amount_in: quote.amount_in.max(spent),
			amount_out: quote.amount_out,
			tx: Some(tx),
			sign_data: quote.sign_data.clone(),
			amount_out_usd,
			real_amount_out_usd: Some(real_amount_out_usd),
		})
	}

	async fn simulate_bridge(
		&self,
		run: &OrchestrationRun,
		job: &BridgeJob,
		quote: &BridgeQuote,
	) -> Result<BridgeRoute, AttemptError> {
		let first = quote.txs.first().ok_or(RouteError::AdapterUnavailable {
			source_id: quote.source,
		})?;
		let (endpoint, rpc) = self.prepare_sandbox(run, job.source_chain, job.account).await?;
		let rpc = rpc.as_ref();

		if let Some(token) = job.source_token.address {
			self.top_up(&endpoint, rpc, token, job.account, job.amount)
				.await?;
			if !quote.skip_approve {
				self.approve(rpc, token, job.account, first.to).await?;
			}
		}

		let pre_in = balance_of(rpc, &job.source_token, job.account).await?;
		let mut amount_in = job.amount;
		let mut total_gas = 0u64;
		let mut txs = Vec::with_capacity(quote.txs.len());

		for (index, tx) in quote.txs.iter().enumerate() {
			let receipt = self.submit(rpc, quote.source, job.account, tx).await?;
			total_gas += receipt.gas_used;

			// Only the first transaction moves the bridged funds
			if index == 0 {
				let post_in = balance_of(rpc, &job.source_token, job.account).await?;
				let balance_change = pre_in.saturating_sub(post_in);
				let spent = if job.source_token.is_native() {
					balance_change
						.saturating_sub(job.gas_price * U256::from(receipt.gas_used))
				} else {
					balance_change
				};
				self.check_drift(quote.source, &job.source_token, job.amount, balance_change)?;
				amount_in = spent.max(job.amount);
			}

			let mut tx = tx.clone();
			tx.gas = Some(receipt.gas_used);
			txs.push(tx);
		}

		let gas_cost = job.gas_price * U256::from(total_gas);
		let gas_usd = to_units_f64(gas_cost, 18) * job.gas_token_usd;
		let amount_out_usd = job
			.dest_token_usd
			.map(|price| {
				let output_usd = job.dest_token.to_units(quote.amount_out) * price;
				(output_usd - gas_usd - quote.usd_fee).max(0.0)
			})
			.unwrap_or(0.0);

		info!(
			"{} bridge validated: {} transactions, gas {} (${:.2} net)",
			quote.source,
			txs.len(),
			total_gas,
			amount_out_usd
		);

		Ok(BridgeRoute {
			source: quote.source,
			amount_in,
			amount_out: quote.amount_out,
			txs,
			amount_out_usd,
			skip_approve: quote.skip_approve,
		})
	}
}

async fn balance_of(rpc: &dyn ChainRpc, token: &TokenRef, account: Address) -> Result<U256, RpcError> {
	match token.address {
		Some(address) => rpc.erc20_balance(address, account).await,
		None => rpc.native_balance(account).await,
	}
}

/// Accepted without sandbox execution
fn unvalidated(quote: Quote, amount_out_usd: f64) -> ValidatedRoute {
	ValidatedRoute {
		real_amount_out_usd: None,
		..ValidatedRoute::trusted(quote, amount_out_usd)
	}
}

/// Signature-only flows cannot be replayed. Firm-price sources are valued
/// at their quoted output, anything else at zero.
fn signature_route(job: &SwapJob, quote: Quote) -> ValidatedRoute {
	match quote.amount_out {
		Some(amount_out) if quote.source.is_firm_price() => {
			let amount_out_usd = job
				.prices
				.token_out_usd
				.map(|price| job.token_out.to_units(amount_out) * price)
				.unwrap_or(0.0);
			ValidatedRoute::trusted(quote, amount_out_usd)
		},
		_ => unvalidated(quote, 0.0),
	}
}

#[async_trait]
impl RouteValidator for CandidateValidator {
	async fn validate_swap(
		&self,
		run: &OrchestrationRun,
		job: &SwapJob,
		quote: Quote,
	) -> RouteResult<ValidatedRoute> {
		if job.chain_id.has_alternate_gas_model() {
			debug!("Trusting {} quote on {} as quoted", quote.source, job.chain_id);
			return Ok(unvalidated(quote, 0.0));
		}

		let Some(tx) = quote.tx.clone() else {
			return Ok(signature_route(job, quote));
		};

		let label = format!("{} validation in run {}", quote.source, run.run_id);
		with_retry_if(
			&self.validation_policy(),
			&label,
			|| self.simulate_swap(run, job, &quote, &tx),
			AttemptError::is_unexpected,
		)
		.await
		.map_err(|e| e.into_route_error(quote.source))
	}

	async fn validate_bridge(
		&self,
		run: &OrchestrationRun,
		job: &BridgeJob,
		quote: BridgeQuote,
	) -> RouteResult<BridgeRoute> {
		if job.source_chain.has_alternate_gas_model() {
			debug!("Trusting {} bridge quote on {} as quoted", quote.source, job.source_chain);
			return Ok(BridgeRoute {
				source: quote.source,
				amount_in: U256::ZERO,
				amount_out: U256::ZERO,
				txs: quote.txs,
				amount_out_usd: 0.0,
				skip_approve: quote.skip_approve,
			});
		}

		match self.simulate_bridge(run, job, &quote).await {
			Ok(route) => Ok(route),
			Err(e) => {
				warn!("{} bridge validation failed: {}", quote.source, e);
				Err(e.into_route_error(quote.source))
			},
		}
	}
}
