//! EIP-712 typed-data hashing for `ReceiveWithAuthorization`.
//!
//! This mirrors the teacher crate's `create_domain_separator` /
//! `create_authorization_hash` pair, but hashes with the `sha3` crate's
//! `Keccak256` directly rather than `ethers::core::utils::keccak256`
//! (pre-NIST Keccak, not FIPS-202 SHA3-256 — the two disagree on padding
//! and must never be substituted for one another), and targets the
//! `ReceiveWithAuthorization` struct rather than `TransferWithAuthorization`.

use ethers::abi::{encode, Token};
use ethers::types::{Address, U256};
use sha3::{Digest, Keccak256};

use crate::config::{DomainParamsTemplate, NetworkProfile};
use crate::types::Authorization;

const EIP712_DOMAIN_TYPE: &[u8] =
    b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

const RECEIVE_WITH_AUTHORIZATION_TYPE: &[u8] = b"ReceiveWithAuthorization(address from,address to,uint256 value,uint256 validAfter,uint256 validBefore,bytes32 nonce)";

fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Computes the EIP-712 domain separator for a network's asset contract.
///
/// `domain.name`/`domain.version` come from the shared
/// [`DomainParamsTemplate`]; `chainId` and `verifyingContract` are specific
/// to the network the authorization targets.
pub fn domain_separator(domain: &DomainParamsTemplate, network: &NetworkProfile) -> [u8; 32] {
    let type_hash = keccak256(EIP712_DOMAIN_TYPE);
    let name_hash = keccak256(domain.name.as_bytes());
    let version_hash = keccak256(domain.version.as_bytes());

    keccak256(&encode(&[
        Token::FixedBytes(type_hash.to_vec()),
        Token::FixedBytes(name_hash.to_vec()),
        Token::FixedBytes(version_hash.to_vec()),
        Token::Uint(U256::from(network.chain_id)),
        Token::Address(network.asset),
    ]))
}

/// Computes `hashStruct(ReceiveWithAuthorization)` for an authorization's
/// transfer fields (everything except the signature).
pub fn struct_hash(from: Address, to: Address, value: U256, valid_after: u64, valid_before: u64, nonce: [u8; 32]) -> [u8; 32] {
    let type_hash = keccak256(RECEIVE_WITH_AUTHORIZATION_TYPE);

    keccak256(&encode(&[
        Token::FixedBytes(type_hash.to_vec()),
        Token::Address(from),
        Token::Address(to),
        Token::Uint(value),
        Token::Uint(U256::from(valid_after)),
        Token::Uint(U256::from(valid_before)),
        Token::FixedBytes(nonce.to_vec()),
    ]))
}

/// Computes the final EIP-712 digest `keccak256("\x19\x01" || domainSeparator
/// || hashStruct(message))` that the payer's wallet actually signs.
pub fn typed_data_digest(
    domain: &DomainParamsTemplate,
    network: &NetworkProfile,
    auth: &Authorization,
) -> [u8; 32] {
    let domain_sep = domain_separator(domain, network);
    let msg_hash = struct_hash(
        auth.from,
        auth.to,
        auth.value,
        auth.valid_after,
        auth.valid_before,
        auth.nonce,
    );

    let mut buf = Vec::with_capacity(2 + 32 + 32);
    buf.extend_from_slice(b"\x19\x01");
    buf.extend_from_slice(&domain_sep);
    buf.extend_from_slice(&msg_hash);
    keccak256(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_network() -> NetworkProfile {
        NetworkProfile {
            chain_id: 8453,
            asset: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"
                .parse()
                .unwrap(),
            facilitator_url: "https://facilitator.example.com".parse().unwrap(),
            pay_to: "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEbb"
                .parse()
                .unwrap(),
            rpc_url: "https://mainnet.base.org".parse().unwrap(),
        }
    }

    fn sample_domain() -> DomainParamsTemplate {
        DomainParamsTemplate {
            name: "USD Coin".to_string(),
            version: "2".to_string(),
        }
    }

    #[test]
    fn test_domain_separator_nonzero_and_deterministic() {
        let d1 = domain_separator(&sample_domain(), &sample_network());
        let d2 = domain_separator(&sample_domain(), &sample_network());
        assert_eq!(d1, d2);
        assert_ne!(d1, [0u8; 32]);
    }

    #[test]
    fn test_domain_separator_changes_with_chain_id() {
        let mut other = sample_network();
        other.chain_id = 1;
        assert_ne!(
            domain_separator(&sample_domain(), &sample_network()),
            domain_separator(&sample_domain(), &other)
        );
    }

    #[test]
    fn test_keccak256_diverges_from_fips202_sha3_256() {
        // Pre-NIST Keccak and the finalized FIPS-202 SHA3-256 disagree on
        // padding, so hashing the same input with each must not agree.
        use sha3::Sha3_256;

        let input = b"x402";
        let keccak = keccak256(input);

        let mut fips_hasher = Sha3_256::new();
        fips_hasher.update(input);
        let fips: [u8; 32] = fips_hasher.finalize().into();

        assert_ne!(keccak, fips);
    }

    #[test]
    fn test_typed_data_digest_changes_with_value() {
        let network = sample_network();
        let domain = sample_domain();
        let from: Address = "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEbb"
            .parse()
            .unwrap();
        let to: Address = "0x1234567890123456789012345678901234567890"
            .parse()
            .unwrap();

        let auth_a = Authorization {
            from,
            to,
            value: U256::from(100u64),
            valid_after: 0,
            valid_before: 9_999_999_999,
            nonce: [1u8; 32],
            v: 27,
            r: [0u8; 32],
            s: [0u8; 32],
        };
        let mut auth_b = auth_a;
        auth_b.value = U256::from(200u64);

        assert_ne!(
            typed_data_digest(&domain, &network, &auth_a),
            typed_data_digest(&domain, &network, &auth_b)
        );
    }
}
