//! Per-run pool of disposable sandboxes
//!
//! A warm pool duplicates the caller's parent sandbox once per pipeline,
//! one duplication at a time, and hands the forks out in order as they
//! become ready. A cold pool forks live chain state on every acquire.
//! Either way a run can never take more sandboxes than it was sized for.

use futures::future::{BoxFuture, FutureExt, Shared};
use router_types::{ChainId, SandboxError, SandboxInfo, SandboxProvisioner, SandboxResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, error};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
	#[error("All {capacity} sandboxes of run {run_id} are in use")]
	Exhausted { run_id: String, capacity: usize },

	#[error(transparent)]
	Provisioning(#[from] SandboxError),
}

pub type PoolResult<T> = Result<T, PoolError>;

type PendingSandbox = Shared<BoxFuture<'static, SandboxResult<SandboxInfo>>>;

/// One pre-provisioned fork, claimed at most once
struct Slot {
	used: AtomicBool,
	sandbox: PendingSandbox,
}

enum Provisioning {
	/// Forks of a parent sandbox, fed by a sequential background driver
	Warm { parent_id: String, slots: Vec<Slot> },
	/// Fresh forks of chain state, created on demand
	Cold {
		chain_id: ChainId,
		block_number: Option<u64>,
		issued: AtomicUsize,
	},
}

pub struct SandboxPool {
	run_id: String,
	capacity: usize,
	provisioner: Arc<dyn SandboxProvisioner>,
	provisioning: Provisioning,
}

impl std::fmt::Debug for SandboxPool {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mode = match &self.provisioning {
			Provisioning::Warm { parent_id, .. } => format!("warm({})", parent_id),
			Provisioning::Cold { chain_id, .. } => format!("cold({})", chain_id),
		};
		f.debug_struct("SandboxPool")
			.field("run_id", &self.run_id)
			.field("capacity", &self.capacity)
			.field("mode", &mode)
			.field("used", &self.used())
			.finish()
	}
}

impl SandboxPool {
	/// Start duplicating `parent_id` `capacity` times in the background.
	///
	/// Must be called from within a Tokio runtime. Duplication stops early
	/// once every slot has been dropped.
	pub fn warm(
		run_id: impl Into<String>,
		parent_id: impl Into<String>,
		capacity: usize,
		provisioner: Arc<dyn SandboxProvisioner>,
	) -> Self {
		let run_id = run_id.into();
		let parent_id = parent_id.into();
		let mut senders = Vec::with_capacity(capacity);
		let mut slots = Vec::with_capacity(capacity);

		for _ in 0..capacity {
			let (tx, rx) = oneshot::channel::<SandboxResult<SandboxInfo>>();
			senders.push(tx);
			let sandbox = async move { rx.await.unwrap_or(Err(SandboxError::Abandoned)) }
				.boxed()
				.shared();
			slots.push(Slot {
				used: AtomicBool::new(false),
				sandbox,
			});
		}

		let driver_provisioner = Arc::clone(&provisioner);
		let driver_parent = parent_id.clone();
		let driver_run = run_id.clone();
		tokio::spawn(async move {
			for (index, sender) in senders.into_iter().enumerate() {
				if sender.is_closed() {
					debug!("Run {} ended, stopping sandbox duplication at {}", driver_run, index);
					break;
				}
				let result = driver_provisioner.duplicate_sandbox(&driver_parent).await;
				if let Err(e) = &result {
					error!("Failed to duplicate sandbox {}: {}", driver_parent, e);
				}
				let _ = sender.send(result);
			}
		});

		Self {
			run_id,
			capacity,
			provisioner,
			provisioning: Provisioning::Warm { parent_id, slots },
		}
	}

	/// Fork live chain state (at `block_number` if given) on each acquire
	pub fn cold(
		run_id: impl Into<String>,
		chain_id: ChainId,
		block_number: Option<u64>,
		capacity: usize,
		provisioner: Arc<dyn SandboxProvisioner>,
	) -> Self {
		Self {
			run_id: run_id.into(),
			capacity,
			provisioner,
			provisioning: Provisioning::Cold {
				chain_id,
				block_number,
				issued: AtomicUsize::new(0),
			},
		}
	}

	pub fn run_id(&self) -> &str {
		&self.run_id
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Sandboxes handed out so far
	pub fn used(&self) -> usize {
		match &self.provisioning {
			Provisioning::Warm { slots, .. } => {
				slots.iter().filter(|slot| slot.used.load(Ordering::Acquire)).count()
			},
			Provisioning::Cold { issued, .. } => issued.load(Ordering::Acquire).min(self.capacity),
		}
	}

	/// Claim a sandbox for exclusive use.
	///
	/// Warm pools wait for the claimed slot's duplication to finish. Claims
	/// beyond capacity fail at once.
	pub async fn acquire(&self) -> PoolResult<SandboxInfo> {
		match &self.provisioning {
			Provisioning::Warm { slots, .. } => {
				let claimed = slots
					.iter()
					.enumerate()
					.find(|(_, slot)| !slot.used.swap(true, Ordering::AcqRel));
				let Some((index, slot)) = claimed else {
					return Err(self.exhausted());
				};
				debug!("Run {} claimed sandbox slot {}", self.run_id, index);
				Ok(slot.sandbox.clone().await?)
			},
			Provisioning::Cold {
				chain_id,
				block_number,
				issued,
			} => {
				if issued.fetch_add(1, Ordering::AcqRel) >= self.capacity {
					return Err(self.exhausted());
				}
				Ok(self.provisioner.create_sandbox(*chain_id, *block_number).await?)
			},
		}
	}

	fn exhausted(&self) -> PoolError {
		error!(
			"Sandbox pool of run {} exhausted after {} sandboxes",
			self.run_id, self.capacity
		);
		PoolError::Exhausted {
			run_id: self.run_id.clone(),
			capacity: self.capacity,
		}
	}
}
