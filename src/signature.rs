//! Decoding and recovery for the compact `(v, r, s)` ECDSA signatures carried
//! on an [`Authorization`](crate::types::Authorization).
//!
//! Recovery itself is delegated to `ethers::types::Signature::recover`, kept
//! as the teacher used it in `ExactEvm::verify`, but stripped of the RPC
//! call the teacher wrapped around it. The `v ∈ {27, 28}` check and the
//! `s`-canonicalization in [`CompactSignature::encode`] are this module's
//! own addition, grounded on the secp256k1 curve order exposed through
//! `ethers::core::k256`.
//!
//! Wallets may emit either `s` or `n - s`; both recover to the same address,
//! so [`CompactSignature::validate`]/[`recover`](CompactSignature::recover)
//! accept either. Only `encode` prefers the canonical low-`s` form.

use ethers::types::{Address, Signature as EthersSignature, H256, U256};

use crate::types::VerificationErrorKind;

/// secp256k1 group order.
const SECP256K1_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

/// secp256k1 group order, halved. A canonical ("low-s") signature's `s`
/// does not exceed this; a non-canonical one uses `n - s` instead.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// A decoded `(v, r, s)` signature over a 32-byte digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactSignature {
    /// Recovery id, `27` or `28`.
    pub v: u8,
    /// Signature `r` component.
    pub r: [u8; 32],
    /// Signature `s` component.
    pub s: [u8; 32],
}

impl CompactSignature {
    /// Validates `v ∈ {27, 28}` and that `r`/`s` are non-zero and in range.
    /// `s` may be either the low or high (`n - s`) representative; both are
    /// accepted since both recover to the same signer.
    pub fn validate(&self) -> Result<(), VerificationErrorKind> {
        if self.v != 27 && self.v != 28 {
            return Err(VerificationErrorKind::SignatureMalformed);
        }
        if self.s == [0u8; 32] || self.r == [0u8; 32] {
            return Err(VerificationErrorKind::SignatureMalformed);
        }
        if U256::from(self.s) >= U256::from(SECP256K1_ORDER) {
            return Err(VerificationErrorKind::SignatureMalformed);
        }
        Ok(())
    }

    /// Recovers the signer address over the given 32-byte digest.
    pub fn recover(&self, digest: [u8; 32]) -> Result<Address, VerificationErrorKind> {
        self.validate()?;
        let sig = EthersSignature {
            r: self.r.into(),
            s: self.s.into(),
            v: self.v as u64,
        };
        sig.recover(H256::from(digest))
            .map_err(|_| VerificationErrorKind::SignatureMalformed)
    }

    /// Returns the `(v, r, s)` triple, canonicalized to the low-`s` form:
    /// if `s` is currently in the high half of the curve order, it is
    /// replaced with `n - s` and `v` is flipped between `27`/`28` to match
    /// (flipping `s` negates the point, which flips the recovery parity).
    pub fn encode(&self) -> (u8, [u8; 32], [u8; 32]) {
        let s = U256::from(self.s);
        if s > U256::from(SECP256K1_HALF_ORDER) {
            let canonical_s = U256::from(SECP256K1_ORDER) - s;
            let mut s_bytes = [0u8; 32];
            canonical_s.to_big_endian(&mut s_bytes);
            let flipped_v = if self.v == 27 { 28 } else { 27 };
            (flipped_v, self.r, s_bytes)
        } else {
            (self.v, self.r, self.s)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_v() {
        let sig = CompactSignature {
            v: 29,
            r: [1u8; 32],
            s: [1u8; 32],
        };
        assert_eq!(
            sig.validate().unwrap_err(),
            VerificationErrorKind::SignatureMalformed
        );
    }

    /// `SECP256K1_ORDER - 1`: in range, but above the half-order, so it is a
    /// valid non-canonical ("high-s") signature component.
    const HIGH_S_IN_RANGE: [u8; 32] = [
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36,
        0x41, 0x40,
    ];

    #[test]
    fn test_rejects_s_out_of_range() {
        let sig = CompactSignature {
            v: 27,
            r: [1u8; 32],
            s: [0xff; 32],
        };
        assert_eq!(
            sig.validate().unwrap_err(),
            VerificationErrorKind::SignatureMalformed
        );
    }

    #[test]
    fn test_accepts_high_s_as_valid_but_non_canonical() {
        let sig = CompactSignature {
            v: 27,
            r: [1u8; 32],
            s: HIGH_S_IN_RANGE,
        };
        assert!(sig.validate().is_ok());
    }

    #[test]
    fn test_accepts_low_s_and_valid_v() {
        let sig = CompactSignature {
            v: 27,
            r: [1u8; 32],
            s: [1u8; 32],
        };
        assert!(sig.validate().is_ok());
    }

    #[test]
    fn test_recover_rejects_malformed_before_touching_ecdsa() {
        let sig = CompactSignature {
            v: 0,
            r: [0u8; 32],
            s: [0u8; 32],
        };
        assert_eq!(
            sig.recover([7u8; 32]).unwrap_err(),
            VerificationErrorKind::SignatureMalformed
        );
    }

    #[test]
    fn test_encode_leaves_low_s_untouched() {
        let sig = CompactSignature {
            v: 27,
            r: [1u8; 32],
            s: [1u8; 32],
        };
        assert_eq!(sig.encode(), (27, sig.r, sig.s));
    }

    #[test]
    fn test_encode_canonicalizes_high_s_and_flips_v() {
        let sig = CompactSignature {
            v: 27,
            r: [1u8; 32],
            s: HIGH_S_IN_RANGE,
        };
        let (v, r, s) = sig.encode();
        assert_eq!(v, 28);
        assert_eq!(r, sig.r);
        assert!(U256::from(s) <= U256::from(SECP256K1_HALF_ORDER));

        // Encoding is idempotent once canonical.
        let canonical = CompactSignature { v, r, s };
        assert_eq!(canonical.encode(), (v, r, s));
    }
}
