//! Range Proofs with an embedded message
//!
//! Builds, reads, checks and rewinds the fixed-shape Borromean range proof
//! Elements attaches to a confidential output: 26 rings of 4, exponent 0,
//! minimum value 1. The proof is a normal, verifiable range proof; the
//! message rides in the fake responses, which are `keystream ^ plaintext`
//! instead of pure keystream.
//!
//! ## Layout
//!
//! ```text
//! offset  size  field
//!      0    10  header        60 33 00 00 00 00 00 00 00 01
//!     10     4  signs         bit i: ring commitment i has a non-QR y
//!     14   800  commitments   x of ring commitments 0..24
//!    814    32  e0            shared root challenge
//!    846  3328  responses     26 rings x 4 slots x 32 bytes
//!   4174        total
//! ```
//!
//! ## Keystream
//!
//! ```text
//! seed = nonce || ser(commitment) || ser(generator) || header
//! for ring i:
//!   i < 25:  discard 32 bytes; sec_i = first valid non-zero scalar; acc += sec_i
//!   i == 25: sec_i = -acc
//!   4 x 32 bytes of slot keystream
//! ```
//!
//! The prover then adds the output blind to `sec_25` so the ring commitments
//! sum to `commitment - 1*generator`.

use crate::borromean::{borromean_sign, borromean_verify, close_rings, ClosureMode, Ring, RingResponses};
use crate::digits::{DigitVector, LAST_RING, NUM_RINGS, RING_SIZE};
use crate::frame::{extract_message, layout_plaintext, locate_value, Slot, GRID_SIZE};
use crate::keystream::HmacDrbg;
use crate::pedersen::{expand_rings, pedersen_ecmult_point, ring_commitments, scalar_from_bytes};
use crate::point::{lift_x, load_point, serialize_point, PointParity};
use crate::{Result, StegoError};
use k256::{elliptic_curve::Group, ProjectivePoint, Scalar};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Proof header: has-range | has-min-value, exponent 0, mantissa 52, min value 1
pub const HEADER: [u8; 10] = [0x60, 0x33, 0, 0, 0, 0, 0, 0, 0, 0x01];

/// Minimum value encoded in the header; on-chain amount is `value + MIN_VALUE`
pub const MIN_VALUE: u64 = 1;

/// Offset of the sign bitfield
pub const SIGNS_OFFSET: usize = HEADER.len();

/// Size of the sign bitfield, one bit per ring except the last
pub const SIGNS_SIZE: usize = (NUM_RINGS + 6) >> 3;

/// Offset of the ring commitment x-coordinates
pub const COMMITMENTS_OFFSET: usize = SIGNS_OFFSET + SIGNS_SIZE;

/// Offset of the shared root challenge
pub const E0_OFFSET: usize = COMMITMENTS_OFFSET + (NUM_RINGS - 1) * 32;

/// Offset of the response grid
pub const SIGNATURES_OFFSET: usize = E0_OFFSET + 32;

/// Total proof size (4174 bytes)
pub const PROOF_SIZE: usize = SIGNATURES_OFFSET + GRID_SIZE;

/// Everything needed to build a proof carrying a message
#[derive(Debug, Clone)]
pub struct RangeProofConfig {
    /// Output value commitment (`0x08`/`0x09 || x`, any tag accepted)
    pub commitment: [u8; 33],
    /// Output asset generator (`0x0a`/`0x0b || x`, any tag accepted)
    pub generator: [u8; 33],
    /// Shared nonce seeding the keystream
    pub nonce: [u8; 32],
    /// Proven value, `amount - MIN_VALUE`
    pub value: u64,
    /// Output value blinding factor
    pub value_blind: [u8; 32],
    /// Extra data bound into the proof (the output script)
    pub extra_commit: Vec<u8>,
    /// Asset id stored in ring 0, column 0
    pub asset_id: [u8; 32],
    /// Asset blinding factor stored in ring 0, column 1
    pub asset_blinder: [u8; 32],
    /// ASCII message to embed
    pub message: String,
}

impl RangeProofConfig {
    /// Set asset id and blinder from their hex form
    ///
    /// # Errors
    ///
    /// `StegoError::InvalidHex` unless both are 32 bytes of valid hex.
    pub fn with_asset_hex(mut self, asset_id_hex: &str, asset_blinder_hex: &str) -> Result<Self> {
        hex::decode_to_slice(asset_id_hex, &mut self.asset_id)?;
        hex::decode_to_slice(asset_blinder_hex, &mut self.asset_blinder)?;
        Ok(self)
    }
}

/// What a receiver learns from a proof with the shared nonce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedOutput {
    /// Proven value
    pub value: u64,
    /// Embedded message, empty if none
    pub message: String,
}

impl DecodedOutput {
    /// On-chain amount of the output
    pub fn amount(&self) -> u64 {
        self.value + MIN_VALUE
    }
}

/// Everything recovered by rewinding a proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewound {
    /// Proven value
    pub value: u64,
    /// Output value blinding factor
    #[serde(with = "hex::serde")]
    pub blind: [u8; 32],
    /// Asset id from ring 0
    #[serde(with = "hex::serde")]
    pub asset_id: [u8; 32],
    /// Asset blinding factor from ring 0
    #[serde(with = "hex::serde")]
    pub asset_blinder: [u8; 32],
    /// Embedded message, empty if none
    pub message: String,
}

//
// ===== HELPER FUNCTIONS =====
//

/// Commitment and generator, loaded and in the serialized form hashed into the proof
struct OutputPoints {
    commitment: ProjectivePoint,
    generator: ProjectivePoint,
    commitment_ser: [u8; 33],
    generator_ser: [u8; 33],
}

impl OutputPoints {
    fn load(commitment: &[u8], generator: &[u8]) -> Result<Self> {
        let commitment = load_point(commitment)?;
        let generator = load_point(generator)?;
        Ok(Self {
            commitment_ser: serialize_point(&commitment)?,
            generator_ser: serialize_point(&generator)?,
            commitment,
            generator,
        })
    }
}

/// Prover secrets and slot keystream regenerated from the nonce
struct Draws {
    secrets: [Scalar; NUM_RINGS],
    keystream: Zeroizing<Vec<u8>>,
}

/// Regenerate ring secrets and slot keystream
///
/// Matches `secp256k1_rangeproof_genrand` draw for draw.
fn rangeproof_genrand(nonce: &[u8; 32], points: &OutputPoints) -> Draws {
    let mut seed = Zeroizing::new(Vec::with_capacity(32 + 33 + 33 + HEADER.len()));
    seed.extend_from_slice(nonce);
    seed.extend_from_slice(&points.commitment_ser);
    seed.extend_from_slice(&points.generator_ser);
    seed.extend_from_slice(&HEADER);

    let mut drbg = HmacDrbg::new(&seed);
    let mut secrets = [Scalar::ZERO; NUM_RINGS];
    let mut keystream = Zeroizing::new(vec![0u8; GRID_SIZE]);
    let mut acc = Scalar::ZERO;

    for i in 0..NUM_RINGS {
        if i < LAST_RING {
            drbg.generate_block();
            loop {
                let bytes = Zeroizing::new(drbg.generate_block());
                if let Ok(scalar) = scalar_from_bytes(&bytes) {
                    if !bool::from(scalar.is_zero()) {
                        secrets[i] = scalar;
                        acc += scalar;
                        break;
                    }
                }
                log::trace!("ring {} secret rejected, drawing again", i);
            }
        } else {
            secrets[i] = -acc;
        }

        for j in 0..RING_SIZE {
            let slot = Slot { ring: i, column: j };
            keystream[slot.range()].copy_from_slice(&drbg.generate_block());
        }
    }

    log::debug!("keystream regenerated for {} rings", NUM_RINGS);
    Draws { secrets, keystream }
}

fn xor_grid(a: &[u8], b: &[u8]) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(a.iter().zip(b).map(|(x, y)| x ^ y).collect())
}

fn slot_array(grid: &[u8], slot: Slot) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&grid[slot.range()]);
    out
}

/// Borromean message: hash of both output points, header, ring commitments and extra data
fn proof_message_hash(points: &OutputPoints, ring_commitments: &[u8], extra_commit: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(points.commitment_ser);
    hasher.update(points.generator_ser);
    hasher.update(HEADER);
    hasher.update(ring_commitments);
    hasher.update(extra_commit);
    hasher.finalize().into()
}

fn check_layout(proof: &[u8]) -> Result<()> {
    if proof.len() != PROOF_SIZE {
        return Err(StegoError::MalformedProof(format!(
            "proof is {} bytes, expected {}",
            proof.len(),
            PROOF_SIZE
        )));
    }
    if proof[..SIGNS_OFFSET] != HEADER {
        return Err(StegoError::MalformedProof(format!(
            "unsupported header {}",
            hex::encode(&proof[..SIGNS_OFFSET])
        )));
    }
    Ok(())
}

/// Public data of a proof, as the verifier sees it
struct ParsedProof {
    pubs: Vec<Ring>,
    message_hash: [u8; 32],
    e0: [u8; 32],
    responses: Vec<RingResponses>,
}

/// Rebuild ring public keys, message hash and responses from a proof
///
/// The last ring's commitment is implied: `commitment - MIN_VALUE*generator - sum(C_i)`.
fn parse_proof(proof: &[u8], points: &OutputPoints, extra_commit: &[u8]) -> Result<ParsedProof> {
    check_layout(proof)?;

    let signs = &proof[SIGNS_OFFSET..COMMITMENTS_OFFSET];
    if signs[SIGNS_SIZE - 1] >> (LAST_RING & 7) != 0 {
        return Err(StegoError::MalformedProof("unused sign bits set".into()));
    }

    let mut commitments = [ProjectivePoint::IDENTITY; NUM_RINGS];
    let mut hashed = Vec::with_capacity(LAST_RING * 33);
    let mut accj = points.generator * Scalar::from(MIN_VALUE);

    for (i, commitment) in commitments.iter_mut().enumerate().take(LAST_RING) {
        let flag = (signs[i >> 3] >> (i & 7)) & 1;
        let offset = COMMITMENTS_OFFSET + i * 32;
        let mut x = [0u8; 32];
        x.copy_from_slice(&proof[offset..offset + 32]);

        *commitment = lift_x(&x, PointParity::from_prefix(flag))
            .map_err(|_| StegoError::RingConsistency { ring: Some(i) })?;
        accj += *commitment;

        hashed.push(flag);
        hashed.extend_from_slice(&x);
    }

    let last = points.commitment - accj;
    if bool::from(last.is_identity()) {
        return Err(StegoError::RingConsistency { ring: Some(LAST_RING) });
    }
    commitments[LAST_RING] = last;

    let pubs = expand_rings(&commitments, &points.generator).to_vec();
    let message_hash = proof_message_hash(points, &hashed, extra_commit);

    let mut e0 = [0u8; 32];
    e0.copy_from_slice(&proof[E0_OFFSET..SIGNATURES_OFFSET]);

    let grid = &proof[SIGNATURES_OFFSET..];
    let mut responses = vec![[Scalar::ZERO; RING_SIZE]; NUM_RINGS];
    for (i, ring) in responses.iter_mut().enumerate() {
        for (j, s) in ring.iter_mut().enumerate() {
            *s = scalar_from_bytes(&slot_array(grid, Slot { ring: i, column: j }))
                .map_err(|_| StegoError::RingConsistency { ring: Some(i) })?;
        }
    }

    Ok(ParsedProof {
        pubs,
        message_hash,
        e0,
        responses,
    })
}

//
// ===== PUBLIC API =====
//

/// Build a range proof for `config.value` carrying `config.message`
///
/// # Errors
///
/// * `StegoError::ValueOutOfRange` for values at or above 2^52
/// * `StegoError::MessageTooLong` / `InvalidMessageByte` for an unusable message
/// * `StegoError::CommitmentMismatch` unless
///   `commitment == value_blind*G + (value + 1)*generator`
/// * `StegoError::PointDecoding` for invalid commitment or generator bytes
/// * `StegoError::InvalidScalar` if a slot draws an out-of-range response
///   (probability about 2^-128)
/// * `StegoError::RingConsistency` if a ring cannot be closed
pub fn encode(config: &RangeProofConfig) -> Result<Vec<u8>> {
    let digits = DigitVector::decompose(config.value)?;
    let secidx = digits.columns();
    let points = OutputPoints::load(&config.commitment, &config.generator)?;

    let blind = scalar_from_bytes(&config.value_blind)?;
    let expected = pedersen_ecmult_point(&blind, config.value + MIN_VALUE, &points.generator);
    if expected != points.commitment {
        return Err(StegoError::CommitmentMismatch);
    }

    let draws = rangeproof_genrand(&config.nonce, &points);
    let mut secrets = draws.secrets;
    secrets[LAST_RING] += blind;

    let prep = layout_plaintext(
        &digits,
        &config.asset_id,
        &config.asset_blinder,
        config.message.as_bytes(),
    )?;
    let grid = xor_grid(&draws.keystream, &prep);

    // Every slot starts as keystream ^ plaintext; the real slot's value is the ring nonce
    let mut nonces = [Scalar::ZERO; NUM_RINGS];
    let mut responses = vec![[Scalar::ZERO; RING_SIZE]; NUM_RINGS];
    for i in 0..NUM_RINGS {
        for j in 0..RING_SIZE {
            let value = scalar_from_bytes(&slot_array(&grid, Slot { ring: i, column: j }))?;
            if j == secidx[i] {
                nonces[i] = value;
            } else {
                responses[i][j] = value;
            }
        }
    }

    let commitments = ring_commitments(&digits, &secrets, &points.generator);
    let mut signs = [0u8; SIGNS_SIZE];
    let mut hashed = Vec::with_capacity(LAST_RING * 33);
    for (i, commitment) in commitments.iter().enumerate().take(LAST_RING) {
        let ser = serialize_point(commitment)?;
        signs[i >> 3] |= ser[0] << (i & 7);
        hashed.extend_from_slice(&ser);
    }

    let pubs = expand_rings(&commitments, &points.generator);
    let message_hash = proof_message_hash(&points, &hashed, &config.extra_commit);
    let e0 = borromean_sign(&pubs, &nonces, &secrets, &mut responses, &secidx, &message_hash)?;

    let mut proof = Vec::with_capacity(PROOF_SIZE);
    proof.extend_from_slice(&HEADER);
    proof.extend_from_slice(&signs);
    for chunk in hashed.chunks(33) {
        proof.extend_from_slice(&chunk[1..]);
    }
    proof.extend_from_slice(&e0);
    for ring in &responses {
        for s in ring {
            proof.extend_from_slice(&s.to_bytes());
        }
    }

    log::debug!(
        "encoded proof: {} bytes, message {} bytes",
        proof.len(),
        config.message.len()
    );
    Ok(proof)
}

/// Recover value and message from a proof using the shared nonce
///
/// # Errors
///
/// * `StegoError::MarkerNotFound` for a wrong nonce or a proof not built this way
/// * `StegoError::MalformedProof` for a wrong size or header
/// * `StegoError::PointDecoding` for invalid commitment or generator bytes
pub fn decode(
    proof: &[u8],
    nonce: &[u8; 32],
    commitment: &[u8],
    generator: &[u8],
) -> Result<DecodedOutput> {
    check_layout(proof)?;
    let points = OutputPoints::load(commitment, generator)?;
    let draws = rangeproof_genrand(nonce, &points);

    let plain = xor_grid(&proof[SIGNATURES_OFFSET..], &draws.keystream);
    let (value, digits) = locate_value(&plain)?;
    let message = extract_message(&plain, &digits)?;

    Ok(DecodedOutput { value, message })
}

/// Verify a proof against its output commitment and generator
///
/// # Errors
///
/// `StegoError::RingConsistency` if the rings do not close, naming the ring
/// when a single ring is at fault. `StegoError::MalformedProof` for a wrong
/// size, header or sign padding.
pub fn verify(proof: &[u8], commitment: &[u8], generator: &[u8], extra_commit: &[u8]) -> Result<()> {
    let points = OutputPoints::load(commitment, generator)?;
    let parsed = parse_proof(proof, &points, extra_commit)?;
    borromean_verify(&parsed.e0, &parsed.responses, &parsed.pubs, &parsed.message_hash)
}

/// Recover value, blind, asset data and message from a proof
///
/// The per-ring challenges are recomputed from the stored `e0`, then
///
/// ```text
/// x_25  = (k_25 - s_25) / e_25
/// blind = x_25 + acc          (sec_25 was -acc + blind)
/// ```
///
/// If ring 0's real slot is column 0 or 1 its plaintext is recovered via
/// `k_0 = s_0 + e_0*sec_0`.
///
/// # Errors
///
/// As [`decode`], plus `StegoError::CommitmentMismatch` if the recovered
/// blind does not open the commitment.
pub fn rewind(
    proof: &[u8],
    nonce: &[u8; 32],
    commitment: &[u8],
    generator: &[u8],
    extra_commit: &[u8],
) -> Result<Rewound> {
    let points = OutputPoints::load(commitment, generator)?;
    let mut parsed = parse_proof(proof, &points, extra_commit)?;
    let draws = rangeproof_genrand(nonce, &points);

    let plain = xor_grid(&proof[SIGNATURES_OFFSET..], &draws.keystream);
    let (value, digits) = locate_value(&plain)?;
    let message = extract_message(&plain, &digits)?;
    let secidx = digits.columns();

    let challenges = close_rings(
        &parsed.e0,
        &parsed.message_hash,
        &parsed.pubs,
        &mut parsed.responses,
        &secidx,
        &ClosureMode::RecomputeOnly,
    )?;

    let last = Slot {
        ring: LAST_RING,
        column: secidx[LAST_RING],
    };
    let k_last = scalar_from_bytes(&slot_array(&draws.keystream, last))?;
    let e_inv = Option::<Scalar>::from(challenges[LAST_RING].invert())
        .ok_or(StegoError::RingConsistency { ring: Some(LAST_RING) })?;
    let x_last = (k_last - parsed.responses[LAST_RING][secidx[LAST_RING]]) * e_inv;
    let blind = x_last - draws.secrets[LAST_RING];

    let opened = pedersen_ecmult_point(&blind, value + MIN_VALUE, &points.generator);
    if opened != points.commitment {
        return Err(StegoError::CommitmentMismatch);
    }

    let mut asset = [[0u8; 32]; 2];
    for (column, out) in asset.iter_mut().enumerate() {
        let slot = Slot { ring: 0, column };
        *out = if column == secidx[0] {
            let k0 = parsed.responses[0][column] + challenges[0] * draws.secrets[0];
            let k0_bytes: [u8; 32] = k0.to_bytes().into();
            let keystream = slot_array(&draws.keystream, slot);
            std::array::from_fn(|b| k0_bytes[b] ^ keystream[b])
        } else {
            slot_array(&plain, slot)
        };
    }

    log::debug!("rewound proof for value {}", value);
    Ok(Rewound {
        value,
        blind: blind.to_bytes().into(),
        asset_id: asset[0],
        asset_blinder: asset[1],
        message,
    })
}

/// Replace the message carried by an existing proof
///
/// Rewinds the proof with the shared nonce and rebuilds it with the same
/// value, blind and asset data. The result verifies against the same output.
///
/// # Errors
///
/// Anything [`rewind`] or [`encode`] reports.
pub fn reembed(
    proof: &[u8],
    nonce: &[u8; 32],
    commitment: &[u8; 33],
    generator: &[u8; 33],
    extra_commit: &[u8],
    message: &str,
) -> Result<Vec<u8>> {
    let rewound = rewind(proof, nonce, commitment, generator, extra_commit)?;

    let config = RangeProofConfig {
        commitment: *commitment,
        generator: *generator,
        nonce: *nonce,
        value: rewound.value,
        value_blind: rewound.blind,
        extra_commit: extra_commit.to_vec(),
        asset_id: rewound.asset_id,
        asset_blinder: rewound.asset_blinder,
        message: message.to_owned(),
    };
    encode(&config)
}
