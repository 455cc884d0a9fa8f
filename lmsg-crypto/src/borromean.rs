//! Borromean Ring Signatures
//!
//! Borromean ring signatures prove knowledge of one secret key in each of
//! several rings while sharing a single challenge `e0` across all of them.
//! The range proof runs one ring per base-4 digit.
//!
//! From the paper: "Borromean Ring Signatures" by Gregory Maxwell and Andrew Poelstra
//! https://github.com/Blockstream/borromean_paper
//!
//! ## Signing (libsecp256k1-zkp `borromean_impl.h`)
//!
//! ```text
//! Commit pass, for each ring i:
//!   R = k_i * G
//!   for j in secidx_i+1 .. 4:
//!     e = H(R || m || i || j)
//!     R = s_i_j * G + e * P_i_j
//!   R_i = R
//!
//! e0 = SHA256(R_0 || ... || R_25 || m)
//!
//! Closure pass, for each ring i:
//!   e = H(e0 || m || i || 0)
//!   for j in 0 .. secidx_i:
//!     R = s_i_j * G + e * P_i_j
//!     e = H(R || m || i || j+1)
//!   s_i_secidx = k_i - e * sec_i
//! ```
//!
//! Nonce points are hashed in SEC1 compressed form. The closure pass can also
//! run with the final write skipped, which recovers the per-ring challenges of
//! an existing signature from its `e0`.

use crate::digits::RING_SIZE;
use crate::point::compressed;
use crate::{Result, StegoError};
use k256::{
    elliptic_curve::{ops::MulByGenerator, Group, PrimeField},
    ProjectivePoint, Scalar,
};
use sha2::{Digest, Sha256};

/// Public keys of one ring
pub type Ring = [ProjectivePoint; RING_SIZE];

/// Responses of one ring
pub type RingResponses = [Scalar; RING_SIZE];

/// Borromean hash function
///
/// Computes: SHA256(e || m || BE32(ring_idx) || BE32(element_idx))
///
/// From C code (borromean_impl.h):
/// ```c
/// uint32_t ring = BE32((uint32_t)ridx);
/// uint32_t epos = BE32((uint32_t)eidx);
/// sha256_write(&sha256_en, e, elen);
/// sha256_write(&sha256_en, m, mlen);
/// sha256_write(&sha256_en, (unsigned char *)&ring, 4);
/// sha256_write(&sha256_en, (unsigned char *)&epos, 4);
/// ```
pub fn borromean_hash(e: &[u8], message: &[u8], ring_idx: usize, element_idx: usize) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(e);
    hasher.update(message);
    hasher.update((ring_idx as u32).to_be_bytes());
    hasher.update((element_idx as u32).to_be_bytes());
    hasher.finalize().into()
}

/// Challenge scalar `H(e || m || i || j)`; overflow or zero breaks the ring
fn challenge(e: &[u8], message: &[u8], ring: usize, element: usize) -> Result<Scalar> {
    let hash = borromean_hash(e, message, ring, element);
    let scalar = Option::<Scalar>::from(Scalar::from_repr(hash.into()))
        .ok_or(StegoError::RingConsistency { ring: Some(ring) })?;
    if bool::from(scalar.is_zero()) {
        return Err(StegoError::RingConsistency { ring: Some(ring) });
    }
    Ok(scalar)
}

/// Nonce point for a forged slot, `R = s*G + e*P`
///
/// # Errors
///
/// `StegoError::RingConsistency` for a zero response or a result at infinity,
/// both of which verification rejects.
pub fn signature_point(
    pubkey: &ProjectivePoint,
    e: &Scalar,
    s: &Scalar,
    ring: usize,
) -> Result<ProjectivePoint> {
    if bool::from(s.is_zero()) {
        return Err(StegoError::RingConsistency { ring: Some(ring) });
    }

    let r = ProjectivePoint::mul_by_generator(s) + *pubkey * e;
    if bool::from(r.is_identity()) {
        return Err(StegoError::RingConsistency { ring: Some(ring) });
    }
    Ok(r)
}

/// Commit pass: walk each ring from just after its real slot to the end
///
/// Returns the final nonce point of every ring.
///
/// # Errors
///
/// `StegoError::RingConsistency` for a degenerate nonce or challenge.
pub fn commit_pass(
    pubs: &[Ring],
    nonces: &[Scalar],
    responses: &[RingResponses],
    secidx: &[usize],
    message: &[u8],
) -> Result<Vec<ProjectivePoint>> {
    let mut finals = Vec::with_capacity(pubs.len());

    for (i, ring) in pubs.iter().enumerate() {
        let mut r = ProjectivePoint::mul_by_generator(&nonces[i]);
        if bool::from(r.is_identity()) {
            return Err(StegoError::RingConsistency { ring: Some(i) });
        }

        for j in (secidx[i] + 1)..RING_SIZE {
            let e = challenge(compressed(&r).as_bytes(), message, i, j)?;
            r = signature_point(&ring[j], &e, &responses[i][j], i)?;
        }

        log::trace!("ring {} committed", i);
        finals.push(r);
    }

    Ok(finals)
}

/// Shared root challenge `e0 = SHA256(R_0 || ... || R_n || m)`
pub fn root_challenge(finals: &[ProjectivePoint], message: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for r in finals {
        hasher.update(compressed(r).as_bytes());
    }
    hasher.update(message);
    hasher.finalize().into()
}

/// What the closure pass does once a ring's real challenge is known
pub enum ClosureMode<'a> {
    /// Write `s = k - e*sec` into the real slot of each ring
    Sign {
        /// Per-ring nonces `k_i`
        nonces: &'a [Scalar],
        /// Per-ring secret keys `sec_i`
        secrets: &'a [Scalar],
    },
    /// Leave the responses untouched and only report the challenges
    RecomputeOnly,
}

/// Closure pass: walk each ring from `e0` up to its real slot
///
/// Returns the challenge `e_i` reached at each ring's real slot.
///
/// # Errors
///
/// `StegoError::RingConsistency` for a degenerate challenge or nonce point.
pub fn close_rings(
    e0: &[u8; 32],
    message: &[u8],
    pubs: &[Ring],
    responses: &mut [RingResponses],
    secidx: &[usize],
    mode: &ClosureMode<'_>,
) -> Result<Vec<Scalar>> {
    let mut challenges = Vec::with_capacity(pubs.len());

    for (i, ring) in pubs.iter().enumerate() {
        let mut e = challenge(e0, message, i, 0)?;

        for j in 0..secidx[i] {
            let r = signature_point(&ring[j], &e, &responses[i][j], i)?;
            e = challenge(compressed(&r).as_bytes(), message, i, j + 1)?;
        }

        if let ClosureMode::Sign { nonces, secrets } = mode {
            let s = nonces[i] - e * secrets[i];
            if bool::from(s.is_zero()) {
                return Err(StegoError::RingConsistency { ring: Some(i) });
            }
            responses[i][secidx[i]] = s;
        }
        challenges.push(e);
    }

    Ok(challenges)
}

/// Sign a Borromean ring signature
///
/// `responses` holds the fake responses on entry; the real slot of every ring
/// (`secidx`) is overwritten. Returns `e0`.
///
/// # Errors
///
/// `StegoError::RingConsistency` if any ring cannot be closed, and
/// `StegoError::MalformedProof` if the input lengths disagree.
pub fn borromean_sign(
    pubs: &[Ring],
    nonces: &[Scalar],
    secrets: &[Scalar],
    responses: &mut [RingResponses],
    secidx: &[usize],
    message: &[u8],
) -> Result<[u8; 32]> {
    let nrings = pubs.len();
    if nrings == 0 {
        return Err(StegoError::MalformedProof("no rings provided".into()));
    }
    if nonces.len() != nrings
        || secrets.len() != nrings
        || responses.len() != nrings
        || secidx.len() != nrings
    {
        return Err(StegoError::MalformedProof("ring input lengths differ".into()));
    }
    if let Some(i) = secidx.iter().position(|&idx| idx >= RING_SIZE) {
        return Err(StegoError::MalformedProof(format!(
            "secret index {} out of range for ring {}",
            secidx[i], i
        )));
    }

    let finals = commit_pass(pubs, nonces, responses, secidx, message)?;
    let e0 = root_challenge(&finals, message);
    log::debug!("borromean root challenge derived over {} rings", nrings);

    close_rings(
        &e0,
        message,
        pubs,
        responses,
        secidx,
        &ClosureMode::Sign { nonces, secrets },
    )?;

    Ok(e0)
}

/// Verify a Borromean ring signature
///
/// ```text
/// for each ring i:
///   e = H(e0 || m || i || 0)
///   for each pubkey j:
///     R = s_i_j * G + e * P_i_j
///     e = H(R || m || i || j+1)      (j not last)
///   R_i = R
/// return e0 == SHA256(R_0 || ... || R_n || m)
/// ```
///
/// # Errors
///
/// `StegoError::RingConsistency` naming the ring when a response, challenge
/// or nonce point is degenerate, or without a ring when the rings do not
/// close on `e0`.
pub fn borromean_verify(
    e0: &[u8; 32],
    responses: &[RingResponses],
    pubs: &[Ring],
    message: &[u8],
) -> Result<()> {
    if pubs.is_empty() || responses.len() != pubs.len() {
        return Err(StegoError::MalformedProof("ring input lengths differ".into()));
    }

    let mut hasher = Sha256::new();
    for (i, ring) in pubs.iter().enumerate() {
        let mut e = challenge(e0, message, i, 0)?;

        for j in 0..RING_SIZE {
            let s = &responses[i][j];
            if bool::from(s.is_zero()) || bool::from(ring[j].is_identity()) {
                return Err(StegoError::RingConsistency { ring: Some(i) });
            }

            let r = ProjectivePoint::mul_by_generator(s) + ring[j] * e;
            if bool::from(r.is_identity()) {
                return Err(StegoError::RingConsistency { ring: Some(i) });
            }

            let r_bytes = compressed(&r);
            if j == RING_SIZE - 1 {
                hasher.update(r_bytes.as_bytes());
            } else {
                e = challenge(r_bytes.as_bytes(), message, i, j + 1)?;
            }
        }
    }
    hasher.update(message);

    let computed: [u8; 32] = hasher.finalize().into();
    if computed == *e0 {
        Ok(())
    } else {
        Err(StegoError::RingConsistency { ring: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(nrings: usize, secidx: &[usize]) -> (Vec<Ring>, Vec<Scalar>, Vec<Scalar>, Vec<RingResponses>) {
        let mut pubs = Vec::new();
        let mut nonces = Vec::new();
        let mut secrets = Vec::new();
        let mut responses = Vec::new();

        for i in 0..nrings {
            let sec = Scalar::from(1000 + i as u64);
            let mut ring = [ProjectivePoint::IDENTITY; RING_SIZE];
            let mut s = [Scalar::ZERO; RING_SIZE];
            for j in 0..RING_SIZE {
                ring[j] = if j == secidx[i] {
                    ProjectivePoint::mul_by_generator(&sec)
                } else {
                    ProjectivePoint::mul_by_generator(&Scalar::from(77 * (i * RING_SIZE + j) as u64 + 5))
                };
                s[j] = Scalar::from(31 * (i * RING_SIZE + j) as u64 + 11);
            }
            pubs.push(ring);
            nonces.push(Scalar::from(555 + i as u64));
            secrets.push(sec);
            responses.push(s);
        }

        (pubs, nonces, secrets, responses)
    }

    #[test]
    fn test_borromean_hash_layout() {
        let e = [0xaa; 32];
        let m = [0xbb; 32];

        let mut preimage = Vec::new();
        preimage.extend_from_slice(&e);
        preimage.extend_from_slice(&m);
        preimage.extend_from_slice(&[0, 0, 0, 3, 0, 0, 0, 2]);
        let expected: [u8; 32] = Sha256::digest(&preimage).into();

        assert_eq!(borromean_hash(&e, &m, 3, 2), expected);
        assert_ne!(borromean_hash(&e, &m, 2, 3), expected);
    }

    #[test]
    fn test_sign_then_verify() {
        let secidx = [0, 1, 2, 3, 2];
        let (pubs, nonces, secrets, mut responses) = fixture(5, &secidx);
        let message = [0x42u8; 32];

        let e0 = borromean_sign(&pubs, &nonces, &secrets, &mut responses, &secidx, &message).unwrap();
        assert!(borromean_verify(&e0, &responses, &pubs, &message).is_ok());
    }

    #[test]
    fn test_only_real_slots_change() {
        let secidx = [3, 0, 1];
        let (pubs, nonces, secrets, mut responses) = fixture(3, &secidx);
        let before = responses.clone();

        borromean_sign(&pubs, &nonces, &secrets, &mut responses, &secidx, b"msg").unwrap();

        for i in 0..3 {
            for j in 0..RING_SIZE {
                assert_eq!(responses[i][j] == before[i][j], j != secidx[i], "ring {i} slot {j}");
            }
        }
    }

    #[test]
    fn test_recompute_only_matches_signing_challenges() {
        let secidx = [2, 1, 3, 0];
        let (pubs, nonces, secrets, mut responses) = fixture(4, &secidx);
        let message = b"recompute";

        let e0 = borromean_sign(&pubs, &nonces, &secrets, &mut responses, &secidx, message).unwrap();
        let signed = responses.clone();

        let challenges = close_rings(
            &e0,
            message,
            &pubs,
            &mut responses,
            &secidx,
            &ClosureMode::RecomputeOnly,
        )
        .unwrap();

        assert_eq!(responses, signed);
        for i in 0..4 {
            // s = k - e*sec, so k = s + e*sec
            assert_eq!(responses[i][secidx[i]] + challenges[i] * secrets[i], nonces[i]);
        }
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let secidx = [1, 2];
        let (pubs, nonces, secrets, mut responses) = fixture(2, &secidx);
        let message = [7u8; 32];
        let e0 = borromean_sign(&pubs, &nonces, &secrets, &mut responses, &secidx, &message).unwrap();

        let mut bad = responses.clone();
        bad[1][0] += Scalar::ONE;
        assert_eq!(
            borromean_verify(&e0, &bad, &pubs, &message),
            Err(StegoError::RingConsistency { ring: None })
        );

        let mut other = message;
        other[0] ^= 1;
        assert!(borromean_verify(&e0, &responses, &pubs, &other).is_err());

        let mut bad_pubs = pubs.clone();
        bad_pubs[0][3] = bad_pubs[0][3].double();
        assert!(borromean_verify(&e0, &responses, &bad_pubs, &message).is_err());
    }

    #[test]
    fn test_zero_response_is_rejected() {
        let pubkey = ProjectivePoint::mul_by_generator(&Scalar::from(9u64));
        assert_eq!(
            signature_point(&pubkey, &Scalar::from(4u64), &Scalar::ZERO, 3),
            Err(StegoError::RingConsistency { ring: Some(3) })
        );

        // R = s*G + e*P lands on infinity when s = -e*9
        let e = Scalar::from(4u64);
        let s = -(e * Scalar::from(9u64));
        assert_eq!(
            signature_point(&pubkey, &e, &s, 1),
            Err(StegoError::RingConsistency { ring: Some(1) })
        );
    }

    #[test]
    fn test_sign_refuses_zero_real_response() {
        let secidx = [0, 2];
        let (pubs, mut nonces, secrets, mut responses) = fixture(2, &secidx);
        let e0 = [0x5c; 32];
        let message = b"zero";

        let challenges =
            close_rings(&e0, message, &pubs, &mut responses, &secidx, &ClosureMode::RecomputeOnly).unwrap();
        // k_1 = e_1 * sec_1 makes s = k - e*sec vanish in ring 1
        nonces[1] = challenges[1] * secrets[1];

        assert_eq!(
            close_rings(
                &e0,
                message,
                &pubs,
                &mut responses,
                &secidx,
                &ClosureMode::Sign { nonces: &nonces, secrets: &secrets },
            ),
            Err(StegoError::RingConsistency { ring: Some(1) })
        );
    }

    #[test]
    fn test_input_validation() {
        let secidx = [4];
        let (pubs, nonces, secrets, mut responses) = fixture(1, &[0]);
        assert!(matches!(
            borromean_sign(&pubs, &nonces, &secrets, &mut responses, &secidx, b""),
            Err(StegoError::MalformedProof(_))
        ));
        assert!(borromean_sign(&[], &[], &[], &mut [], &[], b"").is_err());
    }
}
