//! Tenderly virtual testnet provisioner
//!
//! Forks are created under one account/project. Duplicating a fork returns
//! before the copy is usable, so the new container is polled until it runs.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use reqwest::{Client, Response};
use router_types::constants::limits::{
	DEFAULT_CLONE_POLL_INTERVAL_MS, DEFAULT_CLONE_POLL_TIMEOUT_MS, DEFAULT_FUND_ATTEMPTS,
	DEFAULT_FUND_BASE_DELAY_MS, DEFAULT_SANDBOX_CREATE_ATTEMPTS,
	DEFAULT_SANDBOX_CREATE_BASE_DELAY_MS,
};
use router_types::{
	with_retry, with_retry_if, ChainId, RetryPolicy, SandboxError, SandboxInfo,
	SandboxProvisioner, SandboxResult, SecretString,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::rpc::post_json_rpc;

pub const DEFAULT_API_URL: &str = "https://api.tenderly.co/api/v1";

const ADMIN_RPC: &str = "Admin RPC";
const RUNNING: &str = "RUNNING";

// ================================
// TENDERLY API MODELS
// ================================

#[derive(Debug, Clone, Serialize)]
struct ForkConfig {
	network_id: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	block_number: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
struct ChainConfig {
	chain_id: u64,
}

#[derive(Debug, Clone, Serialize)]
struct VirtualNetworkConfig {
	chain_config: ChainConfig,
}

/// `POST /vnets` body
#[derive(Debug, Clone, Serialize)]
struct CreateVnetRequest {
	slug: String,
	fork_config: ForkConfig,
	virtual_network_config: VirtualNetworkConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct VnetRpc {
	name: String,
	url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateVnetResponse {
	id: String,
	#[serde(default)]
	rpcs: Vec<VnetRpc>,
}

/// `POST /vnets/clone` body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CloneVnetRequest<'a> {
	src_container_id: &'a str,
	dst_container_display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloneEndpoint {
	display_name: String,
	uri: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ConnectivityConfig {
	#[serde(default)]
	endpoints: Vec<CloneEndpoint>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloneVnetResponse {
	id: String,
	connectivity_config: ConnectivityConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct ContainerStatus {
	status: String,
}

#[derive(Debug, Clone, Deserialize)]
struct VnetStatusResponse {
	container: ContainerStatus,
}

/// Connection and retry settings for [`TenderlyProvisioner`]
#[derive(Debug, Clone)]
pub struct TenderlyConfig {
	pub api_url: String,
	pub account_slug: String,
	pub project_slug: String,
	pub access_key: SecretString,
	pub create_policy: RetryPolicy,
	pub fund_policy: RetryPolicy,
	pub clone_poll_interval: Duration,
	pub clone_poll_timeout: Duration,
}

impl TenderlyConfig {
	pub fn new(
		account_slug: impl Into<String>,
		project_slug: impl Into<String>,
		access_key: SecretString,
	) -> Self {
		Self {
			api_url: DEFAULT_API_URL.to_string(),
			account_slug: account_slug.into(),
			project_slug: project_slug.into(),
			access_key,
			create_policy: RetryPolicy::exponential(
				DEFAULT_SANDBOX_CREATE_ATTEMPTS,
				Duration::from_millis(DEFAULT_SANDBOX_CREATE_BASE_DELAY_MS),
			),
			fund_policy: RetryPolicy::exponential(
				DEFAULT_FUND_ATTEMPTS,
				Duration::from_millis(DEFAULT_FUND_BASE_DELAY_MS),
			),
			clone_poll_interval: Duration::from_millis(DEFAULT_CLONE_POLL_INTERVAL_MS),
			clone_poll_timeout: Duration::from_millis(DEFAULT_CLONE_POLL_TIMEOUT_MS),
		}
	}

	pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
		self.api_url = api_url.into();
		self
	}

	fn project_url(&self) -> String {
		format!(
			"{}/account/{}/project/{}",
			self.api_url.trim_end_matches('/'),
			self.account_slug,
			self.project_slug
		)
	}
}

/// Sandbox provisioner backed by Tenderly virtual testnets
#[derive(Debug)]
pub struct TenderlyProvisioner {
	config: TenderlyConfig,
	client: Client,
	next_id: AtomicU64,
}

impl TenderlyProvisioner {
	pub fn new(config: TenderlyConfig) -> Self {
		Self::with_client(config, Client::new())
	}

	pub fn with_client(config: TenderlyConfig, client: Client) -> Self {
		Self {
			config,
			client,
			next_id: AtomicU64::new(1),
		}
	}

	async fn read<T: DeserializeOwned>(response: Response) -> SandboxResult<T> {
		let status = response.status();
		if !status.is_success() {
			let reason = response.text().await.unwrap_or_default();
			return Err(SandboxError::Provider {
				status_code: status.as_u16(),
				reason,
			});
		}
		response
			.json()
			.await
			.map_err(|e| SandboxError::Provisioning {
				reason: format!("unreadable provider response: {}", e),
			})
	}

	fn transport_error(e: reqwest::Error) -> SandboxError {
		SandboxError::Provisioning {
			reason: e.to_string(),
		}
	}

	async fn create_once(&self, chain_id: ChainId, block_number: Option<u64>) -> SandboxResult<SandboxInfo> {
		let millis = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_millis())
			.unwrap_or_default();
		let body = CreateVnetRequest {
			slug: format!("router-{}-{}", chain_id, millis),
			fork_config: ForkConfig {
				network_id: chain_id.as_u64(),
				block_number,
			},
			virtual_network_config: VirtualNetworkConfig {
				chain_config: ChainConfig {
					chain_id: chain_id.as_u64(),
				},
			},
		};

		let response = self
			.client
			.post(format!("{}/vnets", self.config.project_url()))
			.header("X-Access-Key", self.config.access_key.expose_secret())
			.json(&body)
			.send()
			.await
			.map_err(Self::transport_error)?;
		let vnet: CreateVnetResponse = Self::read(response).await?;

		let rpc_endpoint = vnet
			.rpcs
			.into_iter()
			.find(|rpc| rpc.name == ADMIN_RPC)
			.map(|rpc| rpc.url)
			.ok_or_else(|| SandboxError::Provisioning {
				reason: format!("sandbox {} has no admin RPC", vnet.id),
			})?;
		Ok(SandboxInfo {
			id: vnet.id,
			rpc_endpoint,
		})
	}

	async fn wait_until_running(&self, sandbox_id: &str) -> SandboxResult<()> {
		let started = Instant::now();
		let url = format!("{}/vnets/{}", self.config.project_url(), sandbox_id);
		while started.elapsed() < self.config.clone_poll_timeout {
			let response = self
				.client
				.get(&url)
				.header("X-Access-Key", self.config.access_key.expose_secret())
				.send()
				.await
				.map_err(Self::transport_error)?;
			let status: VnetStatusResponse = Self::read(response).await?;
			if status.container.status == RUNNING {
				return Ok(());
			}
			tokio::time::sleep(self.config.clone_poll_interval).await;
		}
		Err(SandboxError::NotReady {
			sandbox_id: sandbox_id.to_string(),
			waited_ms: started.elapsed().as_millis() as u64,
		})
	}

	/// Admin JSON-RPC call against a sandbox, retried with the funding policy
	async fn admin_call(&self, endpoint: &str, method: &str, params: Value) -> SandboxResult<()> {
		with_retry(&self.config.fund_policy, method, || async {
			let id = self.next_id.fetch_add(1, Ordering::Relaxed);
			post_json_rpc(&self.client, endpoint, id, method, &params)
				.await
				.map(|_| ())
				.map_err(SandboxError::from)
		})
		.await
	}
}

#[async_trait]
impl SandboxProvisioner for TenderlyProvisioner {
	async fn create_sandbox(
		&self,
		chain_id: ChainId,
		block_number: Option<u64>,
	) -> SandboxResult<SandboxInfo> {
		let label = format!("create sandbox on chain {}", chain_id);
		let sandbox = with_retry_if(
			&self.config.create_policy,
			&label,
			|| self.create_once(chain_id, block_number),
			SandboxError::is_transient,
		)
		.await?;
		info!("Created sandbox {} for chain {}", sandbox.id, chain_id);
		Ok(sandbox)
	}

	async fn duplicate_sandbox(&self, parent_id: &str) -> SandboxResult<SandboxInfo> {
		let response = self
			.client
			.post(format!("{}/vnets/clone", self.config.project_url()))
			.header("X-Access-Key", self.config.access_key.expose_secret())
			.json(&CloneVnetRequest {
				src_container_id: parent_id,
				dst_container_display_name: None,
			})
			.send()
			.await
			.map_err(Self::transport_error)?;
		let clone: CloneVnetResponse = Self::read(response).await?;

		let rpc_endpoint = clone
			.connectivity_config
			.endpoints
			.into_iter()
			.find(|endpoint| endpoint.display_name == ADMIN_RPC)
			.map(|endpoint| endpoint.uri)
			.ok_or_else(|| SandboxError::Provisioning {
				reason: format!("clone {} of {} has no admin RPC", clone.id, parent_id),
			})?;

		self.wait_until_running(&clone.id).await?;
		debug!("Duplicated sandbox {} into {}", parent_id, clone.id);
		Ok(SandboxInfo {
			id: clone.id,
			rpc_endpoint,
		})
	}

	async fn fund_native(&self, endpoint: &str, account: Address, amount: U256) -> SandboxResult<()> {
		self.admin_call(endpoint, "tenderly_addBalance", json!([[account], amount]))
			.await
	}

	async fn set_erc20_balance(
		&self,
		endpoint: &str,
		token: Address,
		account: Address,
		amount: U256,
	) -> SandboxResult<()> {
		self.admin_call(
			endpoint,
			"tenderly_setErc20Balance",
			json!([token, account, amount]),
		)
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wiremock::matchers::{body_partial_json, header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	const PROJECT: &str = "/account/acme/project/routing";

	fn provisioner(server: &MockServer) -> TenderlyProvisioner {
		let mut config = TenderlyConfig::new("acme", "routing", SecretString::from("tk_test"))
			.with_api_url(server.uri());
		config.create_policy = RetryPolicy::exponential(3, Duration::from_millis(5));
		config.fund_policy = RetryPolicy::exponential(3, Duration::from_millis(5));
		config.clone_poll_interval = Duration::from_millis(5);
		config.clone_poll_timeout = Duration::from_millis(300);
		TenderlyProvisioner::new(config)
	}

	#[tokio::test]
	async fn test_create_returns_admin_rpc() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path(format!("{}/vnets", PROJECT)))
			.and(header("X-Access-Key", "tk_test"))
			.and(body_partial_json(json!({
				"fork_config": { "network_id": 8453, "block_number": 123 },
				"virtual_network_config": { "chain_config": { "chain_id": 8453 } }
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"id": "vnet-1",
				"rpcs": [
					{ "name": "Public RPC", "url": "https://public.example" },
					{ "name": "Admin RPC", "url": "https://admin.example" }
				]
			})))
			.mount(&server)
			.await;

		let sandbox = provisioner(&server)
			.create_sandbox(ChainId::BASE, Some(123))
			.await
			.unwrap();
		assert_eq!(sandbox.id, "vnet-1");
		assert_eq!(sandbox.rpc_endpoint, "https://admin.example");
	}

	#[tokio::test]
	async fn test_create_retries_then_gives_up() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path(format!("{}/vnets", PROJECT)))
			.respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
			.expect(3)
			.mount(&server)
			.await;

		let err = provisioner(&server)
			.create_sandbox(ChainId::ETHEREUM, None)
			.await
			.unwrap_err();
		assert!(matches!(err, SandboxError::Provider { status_code: 502, .. }));
	}

	#[tokio::test]
	async fn test_create_rejection_is_not_retried() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path(format!("{}/vnets", PROJECT)))
			.respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
			.expect(1)
			.mount(&server)
			.await;

		assert!(provisioner(&server)
			.create_sandbox(ChainId::ETHEREUM, None)
			.await
			.is_err());
	}

	#[tokio::test]
	async fn test_duplicate_waits_for_running_container() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path(format!("{}/vnets/clone", PROJECT)))
			.and(body_partial_json(json!({ "srcContainerId": "parent" })))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"id": "child",
				"connectivityConfig": { "endpoints": [
					{ "displayName": "Admin RPC", "uri": "https://child.example" }
				]}
			})))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path(format!("{}/vnets/child", PROJECT)))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(json!({ "container": { "status": "STARTING" } })),
			)
			.up_to_n_times(2)
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path(format!("{}/vnets/child", PROJECT)))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(json!({ "container": { "status": "RUNNING" } })),
			)
			.mount(&server)
			.await;

		let sandbox = provisioner(&server).duplicate_sandbox("parent").await.unwrap();
		assert_eq!(sandbox.id, "child");
		assert_eq!(sandbox.rpc_endpoint, "https://child.example");
	}

	#[tokio::test]
	async fn test_duplicate_that_never_runs_is_not_ready() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path(format!("{}/vnets/clone", PROJECT)))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"id": "stuck",
				"connectivityConfig": { "endpoints": [
					{ "displayName": "Admin RPC", "uri": "https://stuck.example" }
				]}
			})))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path(format!("{}/vnets/stuck", PROJECT)))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(json!({ "container": { "status": "STARTING" } })),
			)
			.mount(&server)
			.await;

		let err = provisioner(&server).duplicate_sandbox("parent").await.unwrap_err();
		assert!(matches!(err, SandboxError::NotReady { ref sandbox_id, .. } if sandbox_id == "stuck"));
	}

	#[tokio::test]
	async fn test_funding_uses_admin_rpc_methods() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({ "method": "tenderly_addBalance" })))
			.respond_with(ResponseTemplate::new(500))
			.up_to_n_times(1)
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({ "method": "tenderly_addBalance" })))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 2, "result": "0x01" })),
			)
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({ "method": "tenderly_setErc20Balance" })))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 3, "result": null })),
			)
			.expect(1)
			.mount(&server)
			.await;

		let tenderly = provisioner(&server);
		tenderly
			.fund_native(&server.uri(), Address::repeat_byte(0xaa), U256::from(1u64))
			.await
			.unwrap();
		tenderly
			.set_erc20_balance(
				&server.uri(),
				Address::repeat_byte(0x11),
				Address::repeat_byte(0xaa),
				U256::from(5u64),
			)
			.await
			.unwrap();
	}
}
