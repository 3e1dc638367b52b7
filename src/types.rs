//! Core data model for the payment-authorization engine.
//!
//! Wire shapes (§6 of the specification this crate implements) are kept
//! separate from the strongly-typed domain structs the engine operates on:
//! a `*Wire` struct mirrors the JSON exactly (string-encoded big integers,
//! `0x`-hex addresses) and converts via `TryFrom`/`From` into the typed
//! struct, so malformed wire input fails fast at the deserialization
//! boundary instead of leaking string-typed fields into the engine.

use ethers::types::{Address, U256};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Protocol version this engine issues and expects.
pub const X402_VERSION: u32 = 1;

fn decimal_no_leading_zero() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[1-9][0-9]*$").unwrap())
}

fn hex32() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{64}$").unwrap())
}

fn parse_hex32(s: &str) -> Result<[u8; 32], String> {
    if !hex32().is_match(s) {
        return Err(format!("expected 0x + 64 hex chars, got `{s}`"));
    }
    let mut out = [0u8; 32];
    hex::decode_to_slice(&s[2..], &mut out).map_err(|e| e.to_string())?;
    Ok(out)
}

fn encode_hex32(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// An EIP-3009 `ReceiveWithAuthorization` authorization, as signed by the
/// payer's wallet.
///
/// Constructing one only enforces *syntactic* invariants (valid addresses,
/// a canonical decimal `value` with no leading zero, 32-byte `nonce`/`r`/`s`).
/// The *semantic* invariants from the specification — `validAfter <
/// validBefore` and `v ∈ {27, 28}` — are deliberately left uncheckable here
/// and are instead the job of [`crate::verify::AuthorizationVerifier::verify`]'s
/// field-validation step, so that a syntactically well-formed but
/// semantically invalid authorization (e.g. one built for an
/// expired-window test case) can still be constructed and handed to the
/// verifier to exercise its negative paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AuthorizationWire", into = "AuthorizationWire")]
pub struct Authorization {
    /// Token holder authorizing the transfer.
    pub from: Address,
    /// Recipient of the tokens.
    pub to: Address,
    /// Amount to transfer, in atomic units.
    pub value: U256,
    /// Unix timestamp after which the authorization becomes valid.
    pub valid_after: u64,
    /// Unix timestamp at and after which the authorization is no longer valid.
    pub valid_before: u64,
    /// Unique 32-byte nonce for replay protection.
    pub nonce: [u8; 32],
    /// Recovery id, expected to be 27 or 28.
    pub v: u8,
    /// Signature `r` component.
    pub r: [u8; 32],
    /// Signature `s` component.
    pub s: [u8; 32],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuthorizationWire {
    from: String,
    to: String,
    value: String,
    #[serde(rename = "validAfter")]
    valid_after: u64,
    #[serde(rename = "validBefore")]
    valid_before: u64,
    nonce: String,
    v: u8,
    r: String,
    s: String,
}

impl TryFrom<AuthorizationWire> for Authorization {
    type Error = String;

    fn try_from(wire: AuthorizationWire) -> Result<Self, Self::Error> {
        if !decimal_no_leading_zero().is_match(&wire.value) {
            return Err(format!(
                "value `{}` must match ^[1-9][0-9]*$ (positive, no leading zero)",
                wire.value
            ));
        }
        let value = U256::from_dec_str(&wire.value)
            .map_err(|e| format!("value `{}` is not a valid uint256: {e}", wire.value))?;
        let from: Address = wire
            .from
            .parse()
            .map_err(|e| format!("invalid `from` address: {e}"))?;
        let to: Address = wire
            .to
            .parse()
            .map_err(|e| format!("invalid `to` address: {e}"))?;
        let nonce = parse_hex32(&wire.nonce)?;
        let r = parse_hex32(&wire.r)?;
        let s = parse_hex32(&wire.s)?;

        Ok(Authorization {
            from,
            to,
            value,
            valid_after: wire.valid_after,
            valid_before: wire.valid_before,
            nonce,
            v: wire.v,
            r,
            s,
        })
    }
}

impl From<Authorization> for AuthorizationWire {
    fn from(auth: Authorization) -> Self {
        AuthorizationWire {
            from: format!("{:?}", auth.from),
            to: format!("{:?}", auth.to),
            value: auth.value.to_string(),
            valid_after: auth.valid_after,
            valid_before: auth.valid_before,
            nonce: encode_hex32(&auth.nonce),
            v: auth.v,
            r: encode_hex32(&auth.r),
            s: encode_hex32(&auth.s),
        }
    }
}

/// The `{name, version}` fragment mirrored into a [`PaymentRequirement`]'s
/// `extra` field, and used to derive the EIP-712 domain at verify time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainExtra {
    /// Human-readable asset name (e.g. `"USD Coin"`).
    pub name: String,
    /// EIP-712 domain version (e.g. `"2"`).
    pub version: String,
}

/// An opaque quote-correlation id minted by [`crate::issuer::PaymentRequirementIssuer`].
///
/// Distinct from the EIP-3009 `nonce` carried on [`Authorization`]: the two
/// are never comparable and this type exists so the compiler rejects any
/// attempt to pass one where the other is expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationNonce(pub String);

impl std::fmt::Display for CorrelationNonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An x402 payment requirement, as issued in an HTTP 402 response body.
///
/// Field names and casing match §6.2 of the specification exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequirement {
    /// Protocol version, always 1.
    #[serde(rename = "x402_version")]
    pub x402_version: u32,
    /// Payment scheme, always `"exact"`.
    pub scheme: String,
    /// Network name (e.g. `"8453"`).
    pub network: String,
    /// Amount required, in atomic units, as a decimal string.
    #[serde(rename = "maxAmountRequired")]
    pub max_amount_required: String,
    /// The resource URL the payment grants access to.
    pub resource: String,
    /// Human-readable description of what the payment is for.
    pub description: String,
    /// MIME type of the resource.
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Recipient address.
    #[serde(rename = "payTo")]
    pub pay_to: Address,
    /// Maximum seconds the client has to submit payment.
    #[serde(rename = "maxTimeoutSeconds")]
    pub max_timeout_seconds: u64,
    /// Token contract address.
    pub asset: Address,
    /// `{name, version}` mirroring the domain params.
    pub extra: DomainExtra,
    /// RFC-3339 UTC timestamp after which this quote is no longer offered.
    pub valid_until: String,
    /// Opaque correlation id for this quote. Not an EIP-3009 nonce — see
    /// [`crate::issuer`].
    pub nonce: CorrelationNonce,
}

/// The kind of negative outcome a verification produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationErrorKind {
    /// Malformed field (bad hex, non-monotone time window, bad `v`, ...).
    InvalidInput,
    /// `networkName` is not configured.
    UnsupportedNetwork,
    /// `now < validAfter`.
    NotYetValid,
    /// `now >= validBefore`.
    Expired,
    /// The signature could not be decoded or recovery failed.
    SignatureMalformed,
    /// The recovered signer does not match `Authorization.from`.
    SignerMismatch,
}

/// Outcome of [`crate::verify::AuthorizationVerifier::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// The authorization is well-formed, in its validity window, and
    /// correctly signed by `signer`.
    Valid {
        /// The address recovered from the signature (equals `Authorization.from`).
        signer: Address,
    },
    /// The authorization was rejected.
    Invalid {
        /// Which check failed.
        kind: VerificationErrorKind,
        /// A human-readable explanation.
        message: String,
    },
}

impl VerificationResult {
    /// `true` if this is a [`VerificationResult::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationResult::Valid { .. })
    }
}

/// Status of a settlement attempt, as tracked by the [`crate::settlement::SettlementCache`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SettlementRecord {
    /// The facilitator relayed the authorization on-chain.
    Settled {
        /// Transaction hash of the settlement.
        #[serde(rename = "txHash")]
        tx_hash: [u8; 32],
        /// Block number the transaction was included in, if known.
        #[serde(rename = "blockNumber", skip_serializing_if = "Option::is_none")]
        block_number: Option<u64>,
    },
    /// The facilitator accepted the authorization but has not yet relayed it.
    Pending {
        /// Seconds the caller should wait before retrying.
        #[serde(rename = "retryAfter")]
        retry_after: u64,
    },
    /// The facilitator rejected the authorization.
    Failed {
        /// Why it was rejected.
        error: String,
    },
}
