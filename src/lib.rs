//! # x402-notary-engine
//!
//! Payment-authorization engine for a pay-per-use notarization gateway.
//!
//! This crate implements the cryptographic and protocol core of an x402
//! "exact" scheme integration on EVM chains: it hashes and verifies
//! EIP-3009 `receiveWithAuthorization` authorizations signed under EIP-712,
//! settles them through an external facilitator, and issues the payment
//! requirements an HTTP 402 response carries. It does not run an HTTP
//! server, a client retry loop, or a facilitator service itself — those
//! are collaborators outside this crate's scope.
//!
//! ## Modules
//!
//! - [`hash`]: EIP-712 domain separator and typed-data digest computation.
//! - [`signature`]: compact `(v, r, s)` signature decoding and recovery.
//! - [`verify`]: pure, stateless authorization verification.
//! - [`settlement`]: facilitator submission with an at-most-once TTL cache.
//! - [`issuer`]: payment requirement ("quote") issuance.
//! - [`config`]: network profiles and engine-wide settings.
//! - [`types`]: wire and domain data structures.
//! - [`errors`]: operational error type.
//!
//! ## Security
//!
//! - **Trust-minimized**: payers sign authorizations; this engine and any
//!   facilitator it talks to cannot move funds beyond what was signed.
//! - **Pure verification**: [`verify::AuthorizationVerifier`] never performs
//!   I/O, so a caller can verify an authorization without depending on a
//!   network being reachable.
//! - **At-most-once settlement is best-effort**: [`settlement::SettlementCache`]
//!   lives in memory and is not a durable ledger; a process restart loses
//!   its dedupe state. Durable settlement bookkeeping is a collaborator's
//!   responsibility, not this crate's.
//!
//! ## References
//!
//! - [x402 Specification](https://github.com/coinbase/x402)
//! - [EIP-3009](https://eips.ethereum.org/EIPS/eip-3009)
//! - [EIP-712](https://eips.ethereum.org/EIPS/eip-712)

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod errors;
pub mod hash;
pub mod issuer;
pub mod settlement;
pub mod signature;
pub mod types;
pub mod utils;
pub mod verify;

pub use config::{DomainParamsTemplate, EngineConfig, NetworkProfile};
pub use errors::{Result, X402Error};
pub use issuer::PaymentRequirementIssuer;
pub use settlement::{SettlementCache, SettlementClient};
pub use types::{
    Authorization, CorrelationNonce, PaymentRequirement, SettlementRecord, VerificationErrorKind,
    VerificationResult, X402_VERSION,
};
pub use verify::AuthorizationVerifier;
