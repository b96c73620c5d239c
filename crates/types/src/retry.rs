//! Retry with backoff, shared by submission, funding, provisioning and RPC

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How often and how patiently to retry an operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
	/// Total attempts, including the first
	pub max_attempts: u32,
	/// Pause after the first failure
	pub base_delay: Duration,
	/// Exponential backoff multiplier (1.0 = fixed delay, >1.0 = exponential)
	pub backoff_multiplier: f64,
	/// Failures up to this attempt number are logged at debug level only
	pub silent_attempts: u32,
}

impl RetryPolicy {
	/// Doubling delay: base, 2*base, 4*base...
	pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
		Self {
			max_attempts,
			base_delay,
			backoff_multiplier: 2.0,
			silent_attempts: 0,
		}
	}

	/// Same pause between every attempt
	pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
		Self {
			max_attempts,
			base_delay: delay,
			backoff_multiplier: 1.0,
			silent_attempts: 0,
		}
	}

	pub fn with_silent_attempts(mut self, silent_attempts: u32) -> Self {
		self.silent_attempts = silent_attempts;
		self
	}

	/// Pause after the given failed attempt (1-based)
	pub fn delay_after(&self, attempt: u32) -> Duration {
		let factor = self
			.backoff_multiplier
			.powi(attempt.saturating_sub(1) as i32);
		self.base_delay.mul_f64(factor)
	}
}

/// Run `operation` until it succeeds or `policy.max_attempts` is reached.
///
/// Returns the last error on exhaustion.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, operation: F) -> Result<T, E>
where
	E: Display,
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
{
	with_retry_if(policy, label, operation, |_| true).await
}

/// Like [`with_retry`], but gives up immediately on errors `should_retry` rejects.
pub async fn with_retry_if<T, E, F, Fut, P>(
	policy: &RetryPolicy,
	label: &str,
	mut operation: F,
	should_retry: P,
) -> Result<T, E>
where
	E: Display,
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	P: Fn(&E) -> bool,
{
	let max_attempts = policy.max_attempts.max(1);
	let mut attempt = 0;
	loop {
		attempt += 1;
		match operation().await {
			Ok(value) => return Ok(value),
			Err(e) => {
				if attempt <= policy.silent_attempts {
					debug!("{} failed (attempt {}/{}): {}", label, attempt, max_attempts, e);
				} else {
					warn!("{} failed (attempt {}/{}): {}", label, attempt, max_attempts, e);
				}
				if attempt >= max_attempts || !should_retry(&e) {
					return Err(e);
				}
				tokio::time::sleep(policy.delay_after(attempt)).await;
			},
		}
	}
}
