//! lmsg Crypto Library
//!
//! Pure Rust implementation of message embedding inside Elements/Liquid
//! Borromean range proofs. A sender folds a short ASCII message into the
//! fake ring-signature responses of a confidential output's range proof; a
//! receiver holding the shared nonce regenerates the keystream and reads the
//! value and the message back out. The proof stays valid throughout.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]

pub mod borromean;
pub mod digits;
pub mod envelope;
pub mod frame;
pub mod keystream;
pub mod nonce;
pub mod pedersen;
pub mod point;
pub mod rangeproof;

// Re-export main functions for easy access
pub use digits::{DigitVector, NUM_RINGS, RING_SIZE};
pub use envelope::Envelope;
pub use keystream::HmacDrbg;
pub use nonce::shared_nonce;
pub use pedersen::pedersen_commit;
pub use point::PointParity;
pub use rangeproof::{
    decode, encode, reembed, rewind, verify, DecodedOutput, RangeProofConfig, Rewound,
    PROOF_SIZE,
};

use thiserror::Error;

/// Error types for range-proof message operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StegoError {
    /// Value does not fit in 26 base-4 digits
    #[error("value {value} is out of range (must be below 2^52)")]
    ValueOutOfRange {
        /// The rejected value
        value: u64,
    },
    /// Message does not fit in the free signature slots
    #[error("message of {len} bytes exceeds the {capacity} byte capacity")]
    MessageTooLong {
        /// Message length in bytes
        len: usize,
        /// Free-slot capacity for this value
        capacity: usize,
    },
    /// Message contains a byte that cannot be carried (NUL or non-ASCII)
    #[error("message byte {byte:#04x} at position {position} is not printable ASCII")]
    InvalidMessageByte {
        /// Offset of the byte
        position: usize,
        /// The byte itself
        byte: u8,
    },
    /// A ring failed to close or its self-check failed
    #[error("ring signature is inconsistent{}", ring_suffix(.ring))]
    RingConsistency {
        /// Index of the failing ring, when it can be pinned down
        ring: Option<usize>,
    },
    /// The value marker could not be located in the decrypted grid
    #[error("value marker not found (wrong nonce or foreign proof)")]
    MarkerNotFound,
    /// A serialized point is not on the curve
    #[error("point decoding failed: {0}")]
    PointDecoding(&'static str),
    /// Bytes do not form a valid non-zero scalar
    #[error("invalid scalar: {0}")]
    InvalidScalar(&'static str),
    /// Commitment does not open to the supplied value and blind
    #[error("commitment does not match value and blind")]
    CommitmentMismatch,
    /// Proof buffer has the wrong size or header
    #[error("malformed proof: {0}")]
    MalformedProof(String),
    /// Envelope string could not be parsed
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),
    /// Hex input could not be decoded
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

fn ring_suffix(ring: &Option<usize>) -> String {
    ring.map(|r| format!(" at ring {r}")).unwrap_or_default()
}

impl From<hex::FromHexError> for StegoError {
    fn from(err: hex::FromHexError) -> Self {
        Self::InvalidHex(err.to_string())
    }
}

/// Result type for range-proof message operations
pub type Result<T> = std::result::Result<T, StegoError>;
