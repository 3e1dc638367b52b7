//! Submits verified authorizations to an external facilitator and tracks
//! their outcome in an in-process, TTL-swept cache.
//!
//! The cache generalizes the teacher's `FacilitatorConfig::used_nonces`
//! (`Arc<RwLock<HashSet<String>>>`, a bare membership set) into
//! `Arc<RwLock<HashMap<nonce, CacheEntry>>>` carrying the settlement's
//! actual outcome plus an expiry, so a repeated `settle` call for the same
//! nonce can return the cached [`SettlementRecord`] instead of re-submitting
//! to the facilitator. This is explicitly an at-most-once best-effort
//! cache, not a durable ledger: entries are lost on process restart.
//!
//! The outbound HTTP call and its status-code classification follow the
//! `post_json` pattern from the x402-axum facilitator client: `200 OK` and
//! `202 Accepted` are deserialized as the settled/pending happy path, `400
//! Bad Request` is deserialized into `SettlementRecord::Failed`, and
//! anything else has its body read as text and wrapped into an operational
//! error (`FacilitatorUnavailable` for 5xx, `FacilitatorProtocolError`
//! otherwise).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::{EngineConfig, NetworkProfile};
use crate::errors::{Result, X402Error};
use crate::types::{Authorization, SettlementRecord};
use crate::verify::AuthorizationVerifier;

struct CacheEntry {
    record: SettlementRecord,
    expires_at: Instant,
}

/// TTL-swept cache of settlement outcomes, keyed by EIP-3009 nonce.
///
/// Only `Settled` outcomes are cached. `Pending` and `Failed` are never
/// stored here, so a subsequent `settle` call for the same nonce is free to
/// submit again; this matches the default re-attempt behavior.
///
/// Clone is cheap; the underlying maps are shared via `Arc`.
#[derive(Clone)]
pub struct SettlementCache {
    entries: Arc<RwLock<HashMap<[u8; 32], CacheEntry>>>,
    in_flight: Arc<RwLock<HashMap<[u8; 32], Arc<tokio::sync::Mutex<()>>>>>,
    ttl: Duration,
}

impl SettlementCache {
    /// Creates an empty cache with the given per-entry time-to-live.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Returns the cached record for `nonce`, if present and not expired.
    pub async fn get(&self, nonce: &[u8; 32]) -> Option<SettlementRecord> {
        let entries = self.entries.read().await;
        entries.get(nonce).and_then(|e| {
            if e.expires_at > Instant::now() {
                Some(e.record.clone())
            } else {
                None
            }
        })
    }

    /// Inserts or overwrites the record for `nonce`, resetting its TTL.
    /// No-op for anything but [`SettlementRecord::Settled`]: `Pending` is
    /// never terminal, and `Failed` is left re-attemptable by default.
    pub async fn put(&self, nonce: [u8; 32], record: SettlementRecord) {
        if !matches!(record, SettlementRecord::Settled { .. }) {
            return;
        }
        let mut entries = self.entries.write().await;
        entries.insert(
            nonce,
            CacheEntry {
                record,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Removes every expired entry. Intended to be called periodically by
    /// a background sweep task.
    pub async fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.expires_at > now);
    }

    /// Returns the single-flight lock for `nonce`, creating it if absent.
    ///
    /// Callers hold this lock for the duration of a cache-check-then-submit
    /// sequence so that two concurrent `settle` calls for the same nonce
    /// serialize onto at most one outbound facilitator POST.
    async fn in_flight_lock(&self, nonce: [u8; 32]) -> Arc<tokio::sync::Mutex<()>> {
        if let Some(lock) = self.in_flight.read().await.get(&nonce) {
            return lock.clone();
        }
        let mut in_flight = self.in_flight.write().await;
        in_flight
            .entry(nonce)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

#[derive(Debug, Serialize)]
struct FacilitatorSettleRequest<'a> {
    network: &'a str,
    authorization: &'a Authorization,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum FacilitatorSettleResponse {
    Settled {
        #[serde(rename = "txHash")]
        tx_hash: String,
        #[serde(rename = "blockNumber")]
        block_number: Option<u64>,
    },
    Pending {
        #[serde(rename = "retryAfter")]
        retry_after: u64,
    },
    Failed {
        error: String,
    },
}

/// Submits verified authorizations to a network's facilitator over HTTP.
pub struct SettlementClient<'a> {
    config: &'a EngineConfig,
    http: Client,
    cache: &'a SettlementCache,
}

impl<'a> SettlementClient<'a> {
    /// Builds a client bound to the given configuration and shared cache.
    pub fn new(config: &'a EngineConfig, cache: &'a SettlementCache) -> Self {
        Self {
            config,
            http: Client::new(),
            cache,
        }
    }

    /// Settles `auth` on `network_name`.
    ///
    /// Re-verifies the authorization first (the Settlement Client never
    /// trusts a caller's prior verification) and rejects it without any
    /// outbound call if that fails. If a non-expired record for this
    /// nonce is already cached, it is returned without re-submitting.
    /// Otherwise the authorization is POSTed to the network's configured
    /// facilitator and the resulting record is cached before being
    /// returned.
    pub async fn settle(&self, auth: &Authorization, network_name: &str, now: u64) -> Result<SettlementRecord> {
        let verifier = AuthorizationVerifier::new(self.config);
        let verification = verifier.verify(auth, network_name, now);
        if !verification.is_valid() {
            return Err(X402Error::InvalidAuthorization(format!(
                "authorization failed re-verification prior to settlement: {verification:?}"
            )));
        }

        let lock = self.cache.in_flight_lock(auth.nonce).await;
        let _guard = lock.lock().await;

        if let Some(cached) = self.cache.get(&auth.nonce).await {
            debug!(nonce = %hex::encode(auth.nonce), "returning cached settlement record");
            return Ok(cached);
        }

        let network = self.config.network(network_name)?;
        let record = self.submit(auth, network_name, network).await?;
        self.cache.put(auth.nonce, record.clone()).await;
        Ok(record)
    }

    async fn submit(&self, auth: &Authorization, network_name: &str, network: &NetworkProfile) -> Result<SettlementRecord> {
        let url = network
            .facilitator_url
            .join("settle")
            .map_err(X402Error::UrlParseError)?;

        let body = FacilitatorSettleRequest {
            network: network_name,
            authorization: auth,
        };

        let response = self
            .http
            .post(url)
            .json(&body)
            .timeout(self.config.settlement_timeout)
            .send()
            .await
            .map_err(|e| X402Error::FacilitatorUnavailable(e.to_string()))?;

        match response.status() {
            StatusCode::OK | StatusCode::ACCEPTED => {
                let parsed: FacilitatorSettleResponse = response
                    .json()
                    .await
                    .map_err(|e| X402Error::FacilitatorProtocolError(e.to_string()))?;
                Ok(to_settlement_record(parsed)?)
            }
            StatusCode::BAD_REQUEST => {
                let parsed: FacilitatorSettleResponse = response
                    .json()
                    .await
                    .map_err(|e| X402Error::FacilitatorProtocolError(e.to_string()))?;
                let record = to_settlement_record(parsed)?;
                warn!(?record, "facilitator classified settlement as a failure");
                Ok(record)
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                warn!(%status, body = %text, "facilitator rejected settlement");
                if status.is_server_error() {
                    Err(X402Error::FacilitatorUnavailable(format!(
                        "facilitator returned {status}: {text}"
                    )))
                } else {
                    Err(X402Error::FacilitatorProtocolError(format!(
                        "facilitator returned {status}: {text}"
                    )))
                }
            }
        }
    }
}

fn to_settlement_record(resp: FacilitatorSettleResponse) -> Result<SettlementRecord> {
    match resp {
        FacilitatorSettleResponse::Settled { tx_hash, block_number } => {
            let trimmed = tx_hash.trim_start_matches("0x");
            let mut bytes = [0u8; 32];
            hex::decode_to_slice(trimmed, &mut bytes).map_err(|e| {
                X402Error::FacilitatorProtocolError(format!("malformed txHash: {e}"))
            })?;
            Ok(SettlementRecord::Settled {
                tx_hash: bytes,
                block_number,
            })
        }
        FacilitatorSettleResponse::Pending { retry_after } => {
            Ok(SettlementRecord::Pending { retry_after })
        }
        FacilitatorSettleResponse::Failed { error } => Ok(SettlementRecord::Failed { error }),
    }
}
