//! Shared rewind nonce
//!
//! Elements derives the range-proof nonce from an ECDH exchange between the
//! output's nonce commitment and the receiver's blinding key:
//!
//! ```text
//! shared = SHA256(compressed(blinding_key * nonce_commitment))
//! nonce  = SHA256(shared)
//! ```
//!
//! Sender (ephemeral key, receiver's blinding pubkey) and receiver (blinding
//! key, ephemeral pubkey from the output) arrive at the same 32 bytes.

use crate::pedersen::scalar_from_bytes;
use crate::{Result, StegoError};
use k256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey};
use sha2::{Digest, Sha256};

/// Derive the 32-byte nonce that seeds a proof's keystream
///
/// # Arguments
///
/// * `nonce_commitment` - The other side's public key (33 or 65 bytes SEC1)
/// * `blinding_key` - Our secret key (32 bytes)
///
/// # Errors
///
/// `StegoError::PointDecoding` for an invalid public key,
/// `StegoError::InvalidScalar` for a zero or out-of-range key.
pub fn shared_nonce(nonce_commitment: &[u8], blinding_key: &[u8; 32]) -> Result<[u8; 32]> {
    let pubkey = PublicKey::from_sec1_bytes(nonce_commitment)
        .map_err(|_| StegoError::PointDecoding("invalid nonce commitment"))?;

    let key = scalar_from_bytes(blinding_key)?;
    if bool::from(key.is_zero()) {
        return Err(StegoError::InvalidScalar("blinding key is zero"));
    }

    let shared_point = (pubkey.to_projective() * key).to_affine();
    let shared = Sha256::digest(shared_point.to_encoded_point(true).as_bytes());
    Ok(Sha256::digest(shared).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::{elliptic_curve::ops::MulByGenerator, ProjectivePoint, Scalar};

    fn pubkey(secret: u64) -> Vec<u8> {
        ProjectivePoint::mul_by_generator(&Scalar::from(secret))
            .to_affine()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    fn key(secret: u64) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&secret.to_be_bytes());
        bytes
    }

    #[test]
    fn test_both_sides_agree() {
        let sender = 0xfeed_beefu64;
        let receiver = 0x1234_5678u64;

        let at_sender = shared_nonce(&pubkey(receiver), &key(sender)).unwrap();
        let at_receiver = shared_nonce(&pubkey(sender), &key(receiver)).unwrap();
        assert_eq!(at_sender, at_receiver);
    }

    #[test]
    fn test_double_hash_of_generator() {
        // 1 * G, hashed twice
        let g = pubkey(1);
        let expected: [u8; 32] = Sha256::digest(Sha256::digest(&g)).into();
        assert_eq!(shared_nonce(&g, &key(1)).unwrap(), expected);
    }

    #[test]
    fn test_invalid_inputs() {
        // x = 5 is not on the curve
        let mut off_curve = [0u8; 33];
        off_curve[0] = 0x02;
        off_curve[32] = 5;
        assert!(matches!(
            shared_nonce(&off_curve, &key(1)),
            Err(StegoError::PointDecoding(_))
        ));
        assert!(matches!(
            shared_nonce(&pubkey(2), &[0u8; 32]),
            Err(StegoError::InvalidScalar(_))
        ));
        assert!(shared_nonce(&pubkey(2), &[0xff; 32]).is_err());
    }
}
