//! Pedersen Commitments and Ring Commitments
//!
//! Commitment: C = blind*G + value*P
//!
//! `P` is the output's asset generator. For explicit L-BTC style tests the
//! standard alternate generator `H` of libsecp256k1-zkp is provided.
//!
//! ## Ring commitments
//!
//! ```text
//! C_i      = sec_i*G + (digit_i * 4^i)*P
//! pubs_i_j = C_i - j * 4^i * P        j = 0..3
//! ```
//!
//! Only `pubs_i_{digit_i}` equals `sec_i*G`; the other three columns have no
//! known discrete log with respect to `G`. Because the `sec_i` sum to the
//! output blind, the ring commitments add up to `commitment - min_value*P`.

use crate::digits::{DigitVector, NUM_RINGS, RING_SIZE};
use crate::point::{load_point, serialize_point_tagged, COMMITMENT_TAG};
use crate::{Result, StegoError};
use k256::{
    elliptic_curve::{ops::MulByGenerator, PrimeField},
    ProjectivePoint, Scalar,
};

/// Alternate generator H (`flag || x`, flag 1: y is not a quadratic residue)
///
/// y = 31d3c6863973926e049e637cb1b5f40a36dac28af1766968c30c2313f3a38904
pub const GENERATOR_H_BYTES: [u8; 33] = [
    0x11, 0x50, 0x92, 0x9b, 0x74, 0xc1, 0xa0, 0x49, 0x54, 0xb7, 0x8b, 0x4b, 0x60, 0x35, 0xe9, 0x7a,
    0x5e, 0x07, 0x8a, 0x5a, 0x0f, 0x28, 0xec, 0x96, 0xd5, 0x47, 0xbf, 0xee, 0x9a, 0xce, 0x80, 0x3a,
    0xc0,
];

/// Load generator H
///
/// # Errors
///
/// Never fails for the built-in constant; the `Result` mirrors `load_point`.
pub fn generator_h() -> Result<ProjectivePoint> {
    load_point(&GENERATOR_H_BYTES)
}

/// Parse a 32-byte big-endian scalar, rejecting overflow
///
/// # Errors
///
/// `StegoError::InvalidScalar` if the bytes are `>= n`.
pub fn scalar_from_bytes(bytes: &[u8; 32]) -> Result<Scalar> {
    Option::<Scalar>::from(Scalar::from_repr((*bytes).into()))
        .ok_or(StegoError::InvalidScalar("value exceeds group order"))
}

/// blind*G + value*generator
pub fn pedersen_ecmult_point(
    blind: &Scalar,
    value: u64,
    generator: &ProjectivePoint,
) -> ProjectivePoint {
    ProjectivePoint::mul_by_generator(blind) + *generator * Scalar::from(value)
}

/// Create a Pedersen commitment in Elements format (`0x08`/`0x09 || x`)
///
/// # Errors
///
/// `StegoError::InvalidScalar` for a blind `>= n`, `StegoError::PointDecoding`
/// if the commitment is the point at infinity.
///
/// # Example
///
/// ```
/// use lmsg_crypto::pedersen::{generator_h, pedersen_commit};
///
/// let h = generator_h().unwrap();
/// let commitment = pedersen_commit(100, &[0x01; 32], &h).unwrap();
/// assert!(commitment[0] == 0x08 || commitment[0] == 0x09);
/// ```
pub fn pedersen_commit(value: u64, blind: &[u8; 32], generator: &ProjectivePoint) -> Result<[u8; 33]> {
    let blind = scalar_from_bytes(blind)?;
    let commitment = pedersen_ecmult_point(&blind, value, generator);
    serialize_point_tagged(&commitment, COMMITMENT_TAG)
}

/// Scale of ring `ring`, `4^ring * generator`
fn ring_base(ring: usize, generator: &ProjectivePoint) -> ProjectivePoint {
    let mut base = *generator;
    for _ in 0..ring {
        base = base.double().double();
    }
    base
}

/// Commitment of ring `ring` to `digit`: `blind*G + (digit << 2*ring)*generator`
pub fn ring_commitment(
    ring: usize,
    digit: usize,
    blind: &Scalar,
    generator: &ProjectivePoint,
) -> ProjectivePoint {
    let shifted = (digit as u64) << (2 * ring);
    let blind_g = ProjectivePoint::mul_by_generator(blind);
    if shifted == 0 {
        blind_g
    } else {
        blind_g + *generator * Scalar::from(shifted)
    }
}

/// The four public keys of a ring, column `j` = `commitment - j*4^ring*generator`
pub fn expand_ring(
    commitment: &ProjectivePoint,
    generator: &ProjectivePoint,
    ring: usize,
) -> [ProjectivePoint; RING_SIZE] {
    let step = -ring_base(ring, generator);
    let mut pubs = [*commitment; RING_SIZE];
    for j in 1..RING_SIZE {
        pubs[j] = pubs[j - 1] + step;
    }
    pubs
}

/// Commitments for all rings
pub fn ring_commitments(
    digits: &DigitVector,
    blinds: &[Scalar; NUM_RINGS],
    generator: &ProjectivePoint,
) -> [ProjectivePoint; NUM_RINGS] {
    let mut commitments = [ProjectivePoint::IDENTITY; NUM_RINGS];
    for (i, commitment) in commitments.iter_mut().enumerate() {
        *commitment = ring_commitment(i, digits.get(i), &blinds[i], generator);
    }
    commitments
}

/// Expand every ring into its 26x4 public key grid
pub fn expand_rings(
    commitments: &[ProjectivePoint; NUM_RINGS],
    generator: &ProjectivePoint,
) -> [[ProjectivePoint; RING_SIZE]; NUM_RINGS] {
    let mut pubs = [[ProjectivePoint::IDENTITY; RING_SIZE]; NUM_RINGS];
    for (i, ring) in pubs.iter_mut().enumerate() {
        *ring = expand_ring(&commitments[i], generator, i);
    }
    pubs
}
