//! Error types for the x402 payment-authorization engine.
//!
//! Verification failures are *not* represented here — a rejected signature
//! or an expired authorization is an expected outcome of [`crate::verify`],
//! carried as data on [`crate::types::VerificationResult`]. This enum is for
//! operational failures: bad configuration, malformed wire input to the
//! Issuer, and transport failures talking to a facilitator.

use thiserror::Error;

/// Operational error type for the engine.
#[derive(Error, Debug)]
pub enum X402Error {
    /// Malformed hex, bad address length, non-positive amount, non-monotone
    /// time window, or a `v` outside `{27, 28}`.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `networkName` is not present in the configured allowlist.
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// The Settlement Client re-ran verification and the authorization was
    /// rejected before any outbound facilitator call was made.
    #[error("invalid authorization: {0}")]
    InvalidAuthorization(String),

    /// The facilitator did not respond within the configured timeout, the
    /// connection failed, or it returned a 5xx.
    #[error("facilitator unavailable: {0}")]
    FacilitatorUnavailable(String),

    /// The facilitator responded with a status code or body shape this
    /// client does not know how to classify.
    #[error("facilitator protocol error: {0}")]
    FacilitatorProtocolError(String),

    /// A precondition on [`crate::issuer::PaymentRequirementIssuer::issue`]
    /// was violated.
    #[error("invalid requirement input: field `{field}`: {reason}")]
    InvalidRequirementInput {
        /// The offending field name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Error during HTTP request/response handling.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Error during JSON serialization/deserialization.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error parsing a configured URL.
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// Configuration could not be loaded or was internally inconsistent.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, X402Error>;
