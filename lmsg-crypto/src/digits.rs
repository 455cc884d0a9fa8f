//! Base-4 value decomposition
//!
//! A proven value is split into 26 radix-4 digits, one per ring. Ring `i`
//! carries bits `2i` and `2i + 1`; the digit selects which of the ring's four
//! public keys the prover actually knows.

use crate::{Result, StegoError};

/// Number of rings in the proof (52-bit mantissa, 2 bits per ring)
pub const NUM_RINGS: usize = 26;

/// Public keys per ring
pub const RING_SIZE: usize = 4;

/// Index of the last ring
pub const LAST_RING: usize = NUM_RINGS - 1;

/// Exclusive upper bound on representable values (`4^26 = 2^52`)
pub const MAX_VALUE: u64 = 1 << (2 * NUM_RINGS);

/// The 26 base-4 digits of a value, least significant first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DigitVector([u8; NUM_RINGS]);

impl DigitVector {
    /// Split `value` into digits, rejecting values at or above 2^52
    ///
    /// # Errors
    ///
    /// `StegoError::ValueOutOfRange` if `value >= MAX_VALUE`.
    pub fn decompose(value: u64) -> Result<Self> {
        if value >= MAX_VALUE {
            return Err(StegoError::ValueOutOfRange { value });
        }

        let mut digits = [0u8; NUM_RINGS];
        for (i, digit) in digits.iter_mut().enumerate() {
            *digit = ((value >> (2 * i)) & 3) as u8;
        }
        Ok(Self(digits))
    }

    /// Rebuild the value, `sum(digit[i] * 4^i)`
    pub fn recompose(&self) -> u64 {
        self.0
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &d)| acc | (u64::from(d) << (2 * i)))
    }

    /// Real column of ring `ring`
    pub fn get(&self, ring: usize) -> usize {
        usize::from(self.0[ring])
    }

    /// Digit of the last ring
    pub fn last(&self) -> usize {
        self.get(LAST_RING)
    }

    /// All digits, least significant first
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Real column of every ring
    pub fn columns(&self) -> [usize; NUM_RINGS] {
        self.0.map(usize::from)
    }
}
