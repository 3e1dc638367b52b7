//! Configuration for the payment-authorization engine.
//!
//! An [`EngineConfig`] is the only place `networkName` → [`NetworkProfile`]
//! mappings, the shared [`DomainParamsTemplate`], and the settlement cache
//! TTL are defined. It is built once at startup and handed to the
//! [`crate::verify::AuthorizationVerifier`], [`crate::settlement::SettlementClient`],
//! and [`crate::issuer::PaymentRequirementIssuer`] as a shared, read-only
//! reference.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use tracing::Level;
use url::Url;

use crate::errors::{Result, X402Error};

/// Static configuration for one EVM network the engine accepts payments on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkProfile {
    /// EVM chain ID (e.g. `8453` for Base mainnet).
    #[serde(rename = "chainId")]
    pub chain_id: u64,

    /// The stablecoin's ERC-20 contract address on this chain.
    pub asset: Address,

    /// Base URL of the facilitator that settles authorizations for this
    /// network. Must begin `http://` or `https://`.
    #[serde(rename = "facilitatorUrl")]
    pub facilitator_url: Url,

    /// Address that receives settled payments.
    #[serde(rename = "payTo")]
    pub pay_to: Address,

    /// EVM RPC base URL for this chain (used by collaborators outside this
    /// engine; carried here because it is part of the network's identity).
    #[serde(rename = "rpcUrl")]
    pub rpc_url: Url,
}

/// The `{name, version}` pair shared by every network's EIP-712 domain.
///
/// The chain ID and verifying contract vary per network and are filled in
/// at hash time from the [`NetworkProfile`]; only the asset's human name
/// and EIP-712 version are global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainParamsTemplate {
    /// Human-readable asset name (e.g. `"USD Coin"`).
    pub name: String,
    /// EIP-712 domain version (e.g. `"2"`).
    pub version: String,
}

/// Top-level engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Allowlisted networks, keyed by the wire-level network name.
    pub networks: HashMap<String, NetworkProfile>,
    /// Shared EIP-712 domain template.
    pub domain: DomainParamsTemplate,
    /// How long a `settled` [`crate::types::SettlementRecord`] stays cached.
    pub cache_ttl: Duration,
    /// Per-call timeout for outbound facilitator HTTP requests.
    pub settlement_timeout: Duration,
    /// Verbosity the crate's own `tracing` spans/events are emitted at.
    pub log_verbosity: Level,
}

impl EngineConfig {
    /// Looks up a network by its wire-level name.
    pub fn network(&self, name: &str) -> Result<&NetworkProfile> {
        self.networks
            .get(name)
            .ok_or_else(|| X402Error::UnsupportedNetwork(name.to_string()))
    }

    /// Builds configuration from environment variables, loading a `.env`
    /// file first if present (mirrors the teacher crate's example binaries,
    /// generalized into a first-class loader).
    ///
    /// Expects `X402_NETWORKS` as a JSON object matching
    /// `HashMap<String, NetworkProfile>`, plus `X402_ASSET_NAME` /
    /// `X402_ASSET_VERSION` for the domain template. `X402_CACHE_TTL_SECS`
    /// and `X402_SETTLEMENT_TIMEOUT_SECS` are optional and default to 600
    /// and 5 respectively.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let networks_json = env::var("X402_NETWORKS").map_err(|_| {
            X402Error::ConfigError("X402_NETWORKS environment variable not set".to_string())
        })?;
        let networks: HashMap<String, NetworkProfile> = serde_json::from_str(&networks_json)?;

        let name = env::var("X402_ASSET_NAME").unwrap_or_else(|_| "USD Coin".to_string());
        let version = env::var("X402_ASSET_VERSION").unwrap_or_else(|_| "2".to_string());

        let cache_ttl = env::var("X402_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(600));

        let settlement_timeout = env::var("X402_SETTLEMENT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(5));

        let log_verbosity = env::var("X402_LOG_LEVEL")
            .ok()
            .and_then(|s| s.parse::<Level>().ok())
            .unwrap_or(Level::INFO);

        Ok(Self {
            networks,
            domain: DomainParamsTemplate { name, version },
            cache_ttl,
            settlement_timeout,
            log_verbosity,
        })
    }

    /// Builds configuration from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        #[derive(Deserialize)]
        struct FileConfig {
            networks: HashMap<String, NetworkProfile>,
            domain: DomainParamsTemplate,
            #[serde(default = "default_cache_ttl_secs")]
            cache_ttl_secs: u64,
            #[serde(default = "default_settlement_timeout_secs")]
            settlement_timeout_secs: u64,
            #[serde(default = "default_log_level")]
            log_level: String,
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| X402Error::ConfigError(format!("reading config file: {e}")))?;
        let parsed: FileConfig = serde_json::from_str(&raw)?;
        let log_verbosity = parsed
            .log_level
            .parse::<Level>()
            .map_err(|e| X402Error::ConfigError(format!("invalid log_level `{}`: {e}", parsed.log_level)))?;

        Ok(Self {
            networks: parsed.networks,
            domain: parsed.domain,
            cache_ttl: Duration::from_secs(parsed.cache_ttl_secs),
            settlement_timeout: Duration::from_secs(parsed.settlement_timeout_secs),
            log_verbosity,
        })
    }
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_settlement_timeout_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "INFO".to_string()
}
