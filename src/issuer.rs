//! Issues x402 payment requirements for HTTP 402 responses.
//!
//! Generalizes the teacher's ad hoc `PaymentRequirements` construction
//! (previously scattered across its `server` example) into a standalone
//! issuer with a real quoting policy: a correlation nonce and an RFC-3339
//! expiry window.
//!
//! The correlation nonce this module mints is **not** an EIP-3009 nonce.
//! It exists purely so a gateway operator can correlate an issued 402
//! response with the payment that eventually settles it; it plays no role
//! in the EIP-712 signature the payer produces, and a payer is free to
//! choose any EIP-3009 nonce when constructing its authorization.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::debug;

use crate::config::{EngineConfig, NetworkProfile};
use crate::errors::{Result, X402Error};
use crate::types::{CorrelationNonce, DomainExtra, PaymentRequirement, X402_VERSION};
use crate::utils::random_hex32;

/// Issues [`PaymentRequirement`] quotes bound to a fixed configuration.
pub struct PaymentRequirementIssuer<'a> {
    config: &'a EngineConfig,
}

impl<'a> PaymentRequirementIssuer<'a> {
    /// Builds an issuer bound to the given configuration.
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Issues a quote for `amount_atomic` units of `network_name`'s asset,
    /// granting access to `resource` for up to `max_timeout_seconds`.
    ///
    /// `amount_atomic` must be a positive decimal string with no leading
    /// zero, matching the wire format [`Authorization`](crate::types::Authorization)
    /// values use. The quote expires `max_timeout_seconds` after `now`.
    pub fn issue(
        &self,
        network_name: &str,
        amount_atomic: &str,
        resource: &str,
        description: &str,
        mime_type: &str,
        max_timeout_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<PaymentRequirement> {
        if amount_atomic.is_empty()
            || amount_atomic == "0"
            || (amount_atomic.len() > 1 && amount_atomic.starts_with('0'))
            || !amount_atomic.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(X402Error::InvalidRequirementInput {
                field: "amountAtomic",
                reason: format!("`{amount_atomic}` must be a positive decimal integer with no leading zero"),
            });
        }
        if max_timeout_seconds == 0 {
            return Err(X402Error::InvalidRequirementInput {
                field: "maxTimeoutSeconds",
                reason: "must be greater than zero".to_string(),
            });
        }
        if resource.is_empty() {
            return Err(X402Error::InvalidRequirementInput {
                field: "resource",
                reason: "must be non-empty".to_string(),
            });
        }
        if description.is_empty() {
            return Err(X402Error::InvalidRequirementInput {
                field: "description",
                reason: "must be non-empty".to_string(),
            });
        }

        let network: &NetworkProfile = self.config.network(network_name)?;
        let valid_until = now + ChronoDuration::seconds(max_timeout_seconds as i64);

        debug!(
            network = network_name,
            %resource,
            amount_atomic = amount_atomic,
            max_timeout_seconds,
            "issuing payment requirement"
        );

        Ok(PaymentRequirement {
            x402_version: X402_VERSION,
            scheme: "exact".to_string(),
            network: network_name.to_string(),
            max_amount_required: amount_atomic.to_string(),
            resource: resource.to_string(),
            description: description.to_string(),
            mime_type: mime_type.to_string(),
            pay_to: network.pay_to,
            max_timeout_seconds,
            asset: network.asset,
            extra: DomainExtra {
                name: self.config.domain.name.clone(),
                version: self.config.domain.version.clone(),
            },
            valid_until: valid_until.to_rfc3339(),
            nonce: correlation_nonce(now),
        })
    }
}

/// Mints an opaque quote-correlation id: the issuing timestamp in
/// nanoseconds, hex-encoded and prepended to 16 random hex bytes, so quotes
/// naturally sort by issue time even though the id itself is never parsed
/// back into a timestamp. The whole id is a single contiguous `0x`-hex
/// string, matching the wire format of every other hex field this engine
/// emits.
fn correlation_nonce(now: DateTime<Utc>) -> CorrelationNonce {
    let timestamp_hex = hex::encode(now.timestamp_nanos_opt().unwrap_or(0).to_be_bytes());
    let random = random_hex32();
    CorrelationNonce(format!("0x{}{}", timestamp_hex, &random[2..18]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomainParamsTemplate;
    use std::collections::HashMap;
    use std::time::Duration;

    fn config_with_network() -> EngineConfig {
        let mut networks = HashMap::new();
        networks.insert(
            "8453".to_string(),
            NetworkProfile {
                chain_id: 8453,
                asset: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"
                    .parse()
                    .unwrap(),
                facilitator_url: "https://facilitator.example.com".parse().unwrap(),
                pay_to: "0x1234567890123456789012345678901234567890"
                    .parse()
                    .unwrap(),
                rpc_url: "https://mainnet.base.org".parse().unwrap(),
            },
        );
        EngineConfig {
            networks,
            domain: DomainParamsTemplate {
                name: "USD Coin".to_string(),
                version: "2".to_string(),
            },
            cache_ttl: Duration::from_secs(600),
            settlement_timeout: Duration::from_secs(5),
            log_verbosity: tracing::Level::INFO,
        }
    }

    #[test]
    fn test_issue_valid_requirement() {
        let config = config_with_network();
        let issuer = PaymentRequirementIssuer::new(&config);
        let now = Utc::now();

        let req = issuer
            .issue("8453", "10000", "/notarize", "notarize a document", "application/json", 120, now)
            .unwrap();

        assert_eq!(req.x402_version, X402_VERSION);
        assert_eq!(req.scheme, "exact");
        assert_eq!(req.max_amount_required, "10000");
        assert!(!req.nonce.0.is_empty());
        assert!(req.nonce.0.starts_with("0x"));
        assert!(req.nonce.0[2..].bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_rejects_empty_resource() {
        let config = config_with_network();
        let issuer = PaymentRequirementIssuer::new(&config);
        let result = issuer.issue("8453", "10000", "", "d", "application/json", 120, Utc::now());
        assert!(matches!(
            result.unwrap_err(),
            X402Error::InvalidRequirementInput { field: "resource", .. }
        ));
    }

    #[test]
    fn test_rejects_empty_description() {
        let config = config_with_network();
        let issuer = PaymentRequirementIssuer::new(&config);
        let result = issuer.issue("8453", "10000", "/notarize", "", "application/json", 120, Utc::now());
        assert!(matches!(
            result.unwrap_err(),
            X402Error::InvalidRequirementInput { field: "description", .. }
        ));
    }

    #[test]
    fn test_rejects_leading_zero_amount() {
        let config = config_with_network();
        let issuer = PaymentRequirementIssuer::new(&config);
        let result = issuer.issue("8453", "010000", "/notarize", "d", "application/json", 120, Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = config_with_network();
        let issuer = PaymentRequirementIssuer::new(&config);
        let result = issuer.issue("8453", "10000", "/notarize", "d", "application/json", 0, Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unsupported_network() {
        let config = config_with_network();
        let issuer = PaymentRequirementIssuer::new(&config);
        let result = issuer.issue("1", "10000", "/notarize", "d", "application/json", 120, Utc::now());
        assert!(matches!(result.unwrap_err(), X402Error::UnsupportedNetwork(_)));
    }

    #[test]
    fn test_correlation_nonces_are_distinct() {
        let n1 = correlation_nonce(Utc::now());
        let n2 = correlation_nonce(Utc::now());
        assert_ne!(n1, n2);
    }

    #[test]
    fn test_correlation_nonce_is_contiguous_hex() {
        let nonce = correlation_nonce(Utc::now());
        assert!(nonce.0.starts_with("0x"));
        assert!(nonce.0[2..].bytes().all(|b| b.is_ascii_hexdigit()));
    }
}
