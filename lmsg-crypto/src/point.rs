//! Quadratic-residue point encoding
//!
//! libsecp256k1-zkp serializes commitments, generators and ring commitments
//! as `flag || x` where the flag says whether `y` is a quadratic residue, not
//! whether it is even. Elements adds a type tag on top of the flag
//! (`0x08`/`0x09` for value commitments, `0x0a`/`0x0b` for asset generators).
//! Everything here reads only bit 0 of the prefix and always writes the bare
//! `0x00`/`0x01` form unless a tag is asked for.

use crate::{Result, StegoError};
use k256::{
    elliptic_curve::{
        sec1::{FromEncodedPoint, ToEncodedPoint},
        Group,
    },
    AffinePoint, EncodedPoint, FieldElement, ProjectivePoint,
};

/// Elements tag base for value commitments
pub const COMMITMENT_TAG: u8 = 0x08;

/// Elements tag base for asset generators
pub const GENERATOR_TAG: u8 = 0x0a;

/// Which square root of `x^3 + 7` a serialized point uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointParity {
    /// `y` is a quadratic residue (flag 0)
    Residue,
    /// `y` is not a quadratic residue (flag 1)
    NonResidue,
}

impl PointParity {
    /// Read the flag from any tagged prefix byte
    pub fn from_prefix(byte: u8) -> Self {
        if byte & 1 == 0 {
            Self::Residue
        } else {
            Self::NonResidue
        }
    }

    /// Flag bit as written into proofs and hash preimages
    pub fn flag(self) -> u8 {
        match self {
            Self::Residue => 0,
            Self::NonResidue => 1,
        }
    }

    /// Parity of an affine point's `y`
    pub fn of(point: &AffinePoint) -> Result<Self> {
        let encoded = point.to_encoded_point(false);
        let y_bytes = encoded
            .y()
            .ok_or(StegoError::PointDecoding("point at infinity"))?;
        let y = Option::<FieldElement>::from(FieldElement::from_bytes(y_bytes))
            .ok_or(StegoError::PointDecoding("y coordinate out of range"))?;

        Ok(if is_quad(&y) {
            Self::Residue
        } else {
            Self::NonResidue
        })
    }
}

/// True when `y` has a square root in the base field
pub fn is_quad(y: &FieldElement) -> bool {
    y.sqrt().is_some().into()
}

/// Rebuild a point from its x-coordinate and quadratic-residue parity
///
/// # Errors
///
/// `StegoError::PointDecoding` if `x` is not the x-coordinate of a curve point.
pub fn lift_x(x_bytes: &[u8; 32], parity: PointParity) -> Result<ProjectivePoint> {
    let x = Option::<FieldElement>::from(FieldElement::from_bytes(&(*x_bytes).into()))
        .ok_or(StegoError::PointDecoding("x coordinate out of range"))?;

    let y_squared = x * x * x + FieldElement::from(7u64);
    let mut y = Option::<FieldElement>::from(y_squared.sqrt())
        .ok_or(StegoError::PointDecoding("x is not on the curve"))?;
    if !is_quad(&y) {
        y = -y;
    }

    let encoded = EncodedPoint::from_affine_coordinates(&(*x_bytes).into(), &y.to_bytes(), false);
    let affine = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .ok_or(StegoError::PointDecoding("invalid point"))?;

    let point = ProjectivePoint::from(affine);
    Ok(match parity {
        PointParity::Residue => point,
        PointParity::NonResidue => -point,
    })
}

/// Load a 33-byte `flag || x` point, accepting any tag in the upper bits
///
/// # Errors
///
/// `StegoError::PointDecoding` if the buffer has the wrong length or `x` is
/// not on the curve.
pub fn load_point(bytes: &[u8]) -> Result<ProjectivePoint> {
    if bytes.len() != 33 {
        return Err(StegoError::PointDecoding("expected 33 bytes"));
    }
    let x: [u8; 32] = bytes[1..33]
        .try_into()
        .map_err(|_| StegoError::PointDecoding("expected 33 bytes"))?;
    lift_x(&x, PointParity::from_prefix(bytes[0]))
}

/// Serialize as `flag || x` with an optional Elements tag base
///
/// # Errors
///
/// `StegoError::PointDecoding` for the point at infinity.
pub fn serialize_point_tagged(point: &ProjectivePoint, tag: u8) -> Result<[u8; 33]> {
    if bool::from(point.is_identity()) {
        return Err(StegoError::PointDecoding("point at infinity"));
    }
    let affine = point.to_affine();
    let parity = PointParity::of(&affine)?;
    let encoded = affine.to_encoded_point(true);

    let mut out = [0u8; 33];
    out[0] = tag | parity.flag();
    out[1..33].copy_from_slice(&encoded.as_bytes()[1..33]);
    Ok(out)
}

/// Serialize as bare `flag || x`, the form hashed into proofs
///
/// # Errors
///
/// `StegoError::PointDecoding` for the point at infinity.
pub fn serialize_point(point: &ProjectivePoint) -> Result<[u8; 33]> {
    serialize_point_tagged(point, 0)
}

/// Standard SEC1 compressed encoding (`0x02`/`0x03`)
pub fn compressed(point: &ProjectivePoint) -> EncodedPoint {
    point.to_affine().to_encoded_point(true)
}
