//! Small helpers shared by the issuer, verifier, and settlement client.
//!
//! Trimmed down from the teacher's grab-bag `utils` module: the X-PAYMENT
//! base64 header codec and the dollar-to-token-amount converter belonged to
//! the teacher's client/server proxy flow, which this engine does not
//! implement, and were dropped.

use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use ethers::types::Address;

use crate::errors::{Result, X402Error};

/// Validates and parses an Ethereum address, with or without a `0x` prefix.
pub fn parse_address(addr: &str) -> Result<Address> {
    Address::from_str(addr).map_err(|e| X402Error::InvalidInput(format!("{addr}: {e}")))
}

/// Returns the current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs()
}

/// Generates a random 32-byte value, hex-encoded with a `0x` prefix.
///
/// Used as the raw material for both EIP-3009 nonces and, with a timestamp
/// suffix, [`crate::issuer`]'s correlation nonces.
pub fn random_hex32() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    format!("0x{}", hex::encode(bytes))
}
