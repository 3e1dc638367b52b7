//! Pure, stateless verification of a signed [`Authorization`].
//!
//! This is the central behavioral generalization away from the teacher
//! crate: `ExactEvm::verify` fused signature checking with an on-chain
//! `authorizationState` RPC call to rule out replay. Here, replay
//! protection is entirely the [`crate::settlement::SettlementClient`]'s
//! job via its cache — `AuthorizationVerifier::verify` never performs I/O
//! and never touches a network.

use ethers::types::Address;
use tracing::debug;

use crate::config::EngineConfig;
use crate::hash::typed_data_digest;
use crate::signature::CompactSignature;
use crate::types::{Authorization, VerificationErrorKind, VerificationResult};

/// Verifies signed authorizations against a fixed set of network profiles.
pub struct AuthorizationVerifier<'a> {
    config: &'a EngineConfig,
}

impl<'a> AuthorizationVerifier<'a> {
    /// Builds a verifier bound to the given configuration.
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Verifies `auth` was validly authorized on `network_name`, as of the
    /// current wall-clock time.
    ///
    /// Runs, in order: (1) field validation (`validAfter < validBefore`,
    /// `v ∈ {27, 28}`), (2) network lookup, (3) time-window check against
    /// `now`, (4) EIP-712 digest recomputation and signature recovery, (5)
    /// signer-match against `auth.from`.
    pub fn verify(&self, auth: &Authorization, network_name: &str, now: u64) -> VerificationResult {
        if auth.valid_after >= auth.valid_before {
            let message = format!(
                "validAfter ({}) must be strictly before validBefore ({})",
                auth.valid_after, auth.valid_before
            );
            debug!(network = network_name, %message, "rejected: invalid input");
            return VerificationResult::Invalid {
                kind: VerificationErrorKind::InvalidInput,
                message,
            };
        }
        if auth.v != 27 && auth.v != 28 {
            let message = format!("v must be 27 or 28, got {}", auth.v);
            debug!(network = network_name, %message, "rejected: invalid input");
            return VerificationResult::Invalid {
                kind: VerificationErrorKind::InvalidInput,
                message,
            };
        }

        let network = match self.config.network(network_name) {
            Ok(n) => n,
            Err(_) => {
                debug!(network = network_name, "rejected: unsupported network");
                return VerificationResult::Invalid {
                    kind: VerificationErrorKind::UnsupportedNetwork,
                    message: format!("network `{network_name}` is not configured"),
                };
            }
        };

        if now < auth.valid_after {
            debug!(network = network_name, now, valid_after = auth.valid_after, "rejected: not yet valid");
            return VerificationResult::Invalid {
                kind: VerificationErrorKind::NotYetValid,
                message: format!("authorization not valid until {}", auth.valid_after),
            };
        }
        if now >= auth.valid_before {
            debug!(network = network_name, now, valid_before = auth.valid_before, "rejected: expired");
            return VerificationResult::Invalid {
                kind: VerificationErrorKind::Expired,
                message: format!("authorization expired at {}", auth.valid_before),
            };
        }

        let signature = CompactSignature {
            v: auth.v,
            r: auth.r,
            s: auth.s,
        };
        let digest = typed_data_digest(&self.config.domain, network, auth);
        let signer: Address = match signature.recover(digest) {
            Ok(addr) => addr,
            Err(kind) => {
                debug!(network = network_name, ?kind, "rejected: signature could not be recovered");
                return VerificationResult::Invalid {
                    kind,
                    message: "signature could not be recovered".to_string(),
                };
            }
        };

        if signer != auth.from {
            debug!(network = network_name, recovered = ?signer, expected = ?auth.from, "rejected: signer mismatch");
            return VerificationResult::Invalid {
                kind: VerificationErrorKind::SignerMismatch,
                message: format!("recovered signer {signer:?} does not match `from` {:?}", auth.from),
            };
        }

        debug!(network = network_name, signer = ?signer, "authorization verified");
        VerificationResult::Valid { signer }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DomainParamsTemplate, NetworkProfile};
    use ethers::signers::{LocalWallet, Signer};
    use ethers::types::U256;
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

    fn signed_authorization(wallet: &LocalWallet, config: &EngineConfig, valid_after: u64, valid_before: u64) -> Authorization {
        let network = config.network("8453").unwrap();
        let mut auth = Authorization {
            from: wallet.address(),
            to: "0x1234567890123456789012345678901234567890"
                .parse()
                .unwrap(),
            value: U256::from(1000u64),
            valid_after,
            valid_before,
            nonce: [9u8; 32],
            v: 27,
            r: [0u8; 32],
            s: [0u8; 32],
        };
        let digest = typed_data_digest(&config.domain, network, &auth);
        let sig = wallet.sign_hash(digest.into()).unwrap();
        let mut r = [0u8; 32];
        sig.r.to_big_endian(&mut r);
        let mut s = [0u8; 32];
        sig.s.to_big_endian(&mut s);
        auth.r = r;
        auth.s = s;
        auth.v = sig.v as u8;
        auth
    }

    #[test]
    fn test_valid_authorization() {
        let config = config_with_network();
        let wallet = LocalWallet::new(&mut rand::thread_rng());
        let auth = signed_authorization(&wallet, &config, 0, 9_999_999_999);

        let verifier = AuthorizationVerifier::new(&config);
        let result = verifier.verify(&auth, "8453", 1000);
        assert!(result.is_valid());
    }

    #[test]
    fn test_expired_authorization() {
        let config = config_with_network();
        let wallet = LocalWallet::new(&mut rand::thread_rng());
        let auth = signed_authorization(&wallet, &config, 0, 500);

        let verifier = AuthorizationVerifier::new(&config);
        let result = verifier.verify(&auth, "8453", 1000);
        assert_eq!(
            result,
            VerificationResult::Invalid {
                kind: VerificationErrorKind::Expired,
                message: "authorization expired at 500".to_string(),
            }
        );
    }

    #[test]
    fn test_not_yet_valid() {
        let config = config_with_network();
        let wallet = LocalWallet::new(&mut rand::thread_rng());
        let auth = signed_authorization(&wallet, &config, 5000, 9_999_999_999);

        let verifier = AuthorizationVerifier::new(&config);
        let result = verifier.verify(&auth, "8453", 1000);
        assert!(matches!(
            result,
            VerificationResult::Invalid {
                kind: VerificationErrorKind::NotYetValid,
                ..
            }
        ));
    }

    #[test]
    fn test_unsupported_network() {
        let config = config_with_network();
        let wallet = LocalWallet::new(&mut rand::thread_rng());
        let auth = signed_authorization(&wallet, &config, 0, 9_999_999_999);

        let verifier = AuthorizationVerifier::new(&config);
        let result = verifier.verify(&auth, "1", 1000);
        assert!(matches!(
            result,
            VerificationResult::Invalid {
                kind: VerificationErrorKind::UnsupportedNetwork,
                ..
            }
        ));
    }

    #[test]
    fn test_non_monotone_window_is_invalid_input() {
        let config = config_with_network();
        let wallet = LocalWallet::new(&mut rand::thread_rng());
        let auth = signed_authorization(&wallet, &config, 500, 500);

        let verifier = AuthorizationVerifier::new(&config);
        let result = verifier.verify(&auth, "8453", 1000);
        assert!(matches!(
            result,
            VerificationResult::Invalid {
                kind: VerificationErrorKind::InvalidInput,
                ..
            }
        ));
    }

    #[test]
    fn test_signer_mismatch() {
        let config = config_with_network();
        let wallet = LocalWallet::new(&mut rand::thread_rng());
        let mut auth = signed_authorization(&wallet, &config, 0, 9_999_999_999);
        auth.from = "0x0000000000000000000000000000000000dEaD"
            .parse()
            .unwrap();

        let verifier = AuthorizationVerifier::new(&config);
        let result = verifier.verify(&auth, "8453", 1000);
        assert!(matches!(
            result,
            VerificationResult::Invalid {
                kind: VerificationErrorKind::SignerMismatch,
                ..
            }
        ));
    }
}
