//! Message framing over the signature grid
//!
//! The 26x4 grid of 32-byte responses is built as `keystream ^ plaintext`.
//! The plaintext ("prep") grid holds:
//!
//! ```text
//! row 0, col 0        asset id
//! row 0, col 1        asset blinder
//! real slot of a row  zeros (overwritten by the real response later)
//! row 25, marker col  0x80 || 0x00*7 || BE64(v) || BE64(v) || BE64(v)
//! everything else     message bytes, then zero padding
//! ```
//!
//! The marker sits in column 3 unless the last digit is 3, in which case it
//! moves to column 2. Asset id and blinder win over a real slot in row 0.
//! Encoder and decoder both walk [`free_slots`], so the two sides cannot
//! disagree on where the message lives.

use crate::digits::{DigitVector, LAST_RING, MAX_VALUE, NUM_RINGS, RING_SIZE};
use crate::{Result, StegoError};
use zeroize::Zeroizing;

/// Bytes per response slot
pub const SLOT_SIZE: usize = 32;

/// Size of the signature grid (26 * 4 * 32)
pub const GRID_SIZE: usize = NUM_RINGS * RING_SIZE * SLOT_SIZE;

/// Flag byte opening the value marker
pub const MARKER_FLAG: u8 = 0x80;

/// One response slot in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Ring (row)
    pub ring: usize,
    /// Column within the ring
    pub column: usize,
}

impl Slot {
    /// Byte offset of the slot inside the grid
    pub fn offset(self) -> usize {
        (self.ring * RING_SIZE + self.column) * SLOT_SIZE
    }

    /// Byte range of the slot inside the grid
    pub fn range(self) -> std::ops::Range<usize> {
        self.offset()..self.offset() + SLOT_SIZE
    }
}

/// Column of the last ring holding the value marker
pub fn marker_column(last_digit: usize) -> usize {
    if last_digit == RING_SIZE - 1 {
        RING_SIZE - 2
    } else {
        RING_SIZE - 1
    }
}

/// Slots free to carry message bytes, in row-major order
pub fn free_slots(digits: &DigitVector) -> Vec<Slot> {
    let marker = Slot {
        ring: LAST_RING,
        column: marker_column(digits.last()),
    };

    let mut slots = Vec::with_capacity(NUM_RINGS * RING_SIZE);
    for ring in 0..NUM_RINGS {
        for column in 0..RING_SIZE {
            let slot = Slot { ring, column };
            let asset = ring == 0 && column < 2;
            if asset || column == digits.get(ring) || slot == marker {
                continue;
            }
            slots.push(slot);
        }
    }
    slots
}

/// Message capacity in bytes for a given digit layout (2400 or 2432)
pub fn capacity(digits: &DigitVector) -> usize {
    free_slots(digits).len() * SLOT_SIZE
}

/// The 32-byte value marker
pub fn value_marker(value: u64) -> [u8; SLOT_SIZE] {
    let mut marker = [0u8; SLOT_SIZE];
    marker[0] = MARKER_FLAG;
    for copy in 1..4 {
        marker[copy * 8..copy * 8 + 8].copy_from_slice(&value.to_be_bytes());
    }
    marker
}

/// Parse a value marker, `None` unless flag, padding and all three copies agree
pub fn read_value_marker(slot: &[u8]) -> Option<u64> {
    if slot.len() != SLOT_SIZE || slot[0] != MARKER_FLAG || slot[1..8].iter().any(|&b| b != 0) {
        return None;
    }
    if slot[8..16] != slot[16..24] || slot[16..24] != slot[24..32] {
        return None;
    }
    let bytes: [u8; 8] = slot[24..32].try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

/// Check that a message can be carried and fits the layout
///
/// # Errors
///
/// `StegoError::InvalidMessageByte` for NUL or non-ASCII bytes,
/// `StegoError::MessageTooLong` when it exceeds [`capacity`].
pub fn check_message(message: &[u8], digits: &DigitVector) -> Result<()> {
    if let Some(position) = message.iter().position(|&b| b == 0 || !b.is_ascii()) {
        return Err(StegoError::InvalidMessageByte {
            position,
            byte: message[position],
        });
    }

    let capacity = capacity(digits);
    if message.len() > capacity {
        return Err(StegoError::MessageTooLong {
            len: message.len(),
            capacity,
        });
    }
    Ok(())
}

/// Build the plaintext grid for a proof
///
/// # Errors
///
/// See [`check_message`].
pub fn layout_plaintext(
    digits: &DigitVector,
    asset_id: &[u8; 32],
    asset_blinder: &[u8; 32],
    message: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    check_message(message, digits)?;

    let mut grid = Zeroizing::new(vec![0u8; GRID_SIZE]);
    grid[..SLOT_SIZE].copy_from_slice(asset_id);
    grid[SLOT_SIZE..2 * SLOT_SIZE].copy_from_slice(asset_blinder);

    let marker = Slot {
        ring: LAST_RING,
        column: marker_column(digits.last()),
    };
    grid[marker.range()].copy_from_slice(&value_marker(digits.recompose()));

    for (slot, chunk) in free_slots(digits).into_iter().zip(message.chunks(SLOT_SIZE)) {
        grid[slot.offset()..slot.offset() + chunk.len()].copy_from_slice(chunk);
    }

    Ok(grid)
}

/// Find the value marker in a decrypted grid
///
/// Equal trailing 8-byte groups put the marker in column 3, anything else
/// points one slot back to column 2. The candidate must parse as a marker,
/// hold a value below 2^52, and agree with the last digit it implies.
///
/// # Errors
///
/// `StegoError::MarkerNotFound` otherwise. For a wrong nonce this happens
/// with probability about `1 - 2^-128`.
pub fn locate_value(plain: &[u8]) -> Result<(u64, DigitVector)> {
    if plain.len() != GRID_SIZE {
        return Err(StegoError::MalformedProof(format!(
            "signature grid is {} bytes, expected {}",
            plain.len(),
            GRID_SIZE
        )));
    }

    let tail = GRID_SIZE - 8;
    let column = if plain[tail..] == plain[tail - 8..tail] {
        RING_SIZE - 1
    } else {
        RING_SIZE - 2
    };
    let slot = Slot {
        ring: LAST_RING,
        column,
    };

    let value = read_value_marker(&plain[slot.range()]).ok_or(StegoError::MarkerNotFound)?;
    if value >= MAX_VALUE {
        return Err(StegoError::MarkerNotFound);
    }
    let digits = DigitVector::decompose(value)?;
    if marker_column(digits.last()) != column {
        return Err(StegoError::MarkerNotFound);
    }

    log::debug!("value marker found in column {}", column);
    Ok((value, digits))
}

/// Read the message back out of a decrypted grid, trimmed at the first NUL
///
/// # Errors
///
/// `StegoError::InvalidMessageByte` if a non-ASCII byte precedes the NUL.
pub fn extract_message(plain: &[u8], digits: &DigitVector) -> Result<String> {
    let mut bytes = Vec::new();
    for slot in free_slots(digits) {
        let chunk = &plain[slot.range()];
        match chunk.iter().position(|&b| b == 0) {
            Some(end) => {
                bytes.extend_from_slice(&chunk[..end]);
                break;
            }
            None => bytes.extend_from_slice(chunk),
        }
    }

    if let Some(position) = bytes.iter().position(|b| !b.is_ascii()) {
        return Err(StegoError::InvalidMessageByte {
            position,
            byte: bytes[position],
        });
    }
    Ok(bytes.into_iter().map(char::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_capacity_depends_on_first_digit() {
        // Ring 0 real slot inside the asset columns frees one more slot
        assert_eq!(capacity(&DigitVector::decompose(0).unwrap()), 76 * 32);
        assert_eq!(capacity(&DigitVector::decompose(1).unwrap()), 2432);
        assert_eq!(capacity(&DigitVector::decompose(2).unwrap()), 2400);
        assert_eq!(capacity(&DigitVector::decompose(MAX_VALUE - 1).unwrap()), 2400);
    }

    #[test]
    fn test_free_slots_for_max_value() {
        // All digits 3: row 0 keeps col 2, last row keeps cols 0 and 1
        let digits = DigitVector::decompose(MAX_VALUE - 1).unwrap();
        let slots = free_slots(&digits);

        assert_eq!(slots[0], Slot { ring: 0, column: 2 });
        assert_eq!(slots[1], Slot { ring: 1, column: 0 });
        let last: Vec<_> = slots.iter().filter(|s| s.ring == LAST_RING).collect();
        assert_eq!(last, vec![&Slot { ring: LAST_RING, column: 0 }, &Slot { ring: LAST_RING, column: 1 }]);
    }

    #[test]
    fn test_value_marker_layout() {
        let marker = value_marker(1000);
        assert_eq!(
            hex::encode(marker),
            "8000000000000000\
             00000000000003e8\
             00000000000003e8\
             00000000000003e8"
        );
        assert_eq!(read_value_marker(&marker), Some(1000));

        let mut broken = marker;
        broken[20] ^= 1;
        assert_eq!(read_value_marker(&broken), None);
        broken = marker;
        broken[0] = 0;
        assert_eq!(read_value_marker(&broken), None);
    }

    #[test]
    fn test_layout_places_asset_and_marker() {
        let digits = DigitVector::decompose(1000).unwrap();
        let grid = layout_plaintext(&digits, &[0xa1; 32], &[0xb2; 32], b"hi").unwrap();

        assert_eq!(grid[..32], [0xa1; 32]);
        assert_eq!(grid[32..64], [0xb2; 32]);
        // 1000 has digit 0 in ring 0, so the message starts at column 2
        assert_eq!(&grid[64..66], b"hi");
        assert_eq!(grid[66..96], [0u8; 30]);
        let marker = Slot { ring: LAST_RING, column: 3 };
        assert_eq!(grid[marker.range()], value_marker(1000));
    }

    #[test]
    fn test_locate_value_in_both_columns() {
        for value in [1000u64, MAX_VALUE - 1, 3 << 50] {
            let digits = DigitVector::decompose(value).unwrap();
            let mut grid = layout_plaintext(&digits, &[1; 32], &[2; 32], b"").unwrap();
            // Real slot of the last ring holds unrelated response bytes
            let real = Slot { ring: LAST_RING, column: digits.last() };
            grid[real.range()].copy_from_slice(&[0x5c; 32]);
            grid[real.offset() + 31] = 0x77;

            assert_eq!(locate_value(&grid).unwrap().0, value);
        }
    }

    #[test]
    fn test_locate_value_rejects_noise() {
        let noise: Vec<u8> = (0..GRID_SIZE).map(|i| (i * 131 % 251) as u8).collect();
        assert_eq!(locate_value(&noise), Err(StegoError::MarkerNotFound));
    }

    #[test]
    fn test_message_validation() {
        let digits = DigitVector::decompose(6).unwrap();
        assert_eq!(
            check_message(b"ok\0no", &digits),
            Err(StegoError::InvalidMessageByte { position: 2, byte: 0 })
        );
        assert_eq!(
            check_message(&[b'a', 0xc3, 0xa9], &digits),
            Err(StegoError::InvalidMessageByte { position: 1, byte: 0xc3 })
        );
        assert_eq!(
            check_message(&vec![b'x'; 2401], &digits),
            Err(StegoError::MessageTooLong { len: 2401, capacity: 2400 })
        );
        assert!(check_message(&vec![b'x'; 2400], &digits).is_ok());
    }

    proptest! {
        #[test]
        fn prop_layout_and_extract_agree(
            value in 0u64..MAX_VALUE,
            message in "[ -~]{0,600}",
        ) {
            let digits = DigitVector::decompose(value).unwrap();
            let grid = layout_plaintext(&digits, &[9; 32], &[8; 32], message.as_bytes()).unwrap();
            prop_assert_eq!(extract_message(&grid, &digits).unwrap(), message);
        }

        #[test]
        fn prop_free_slots_avoid_reserved(value in 0u64..MAX_VALUE) {
            let digits = DigitVector::decompose(value).unwrap();
            let slots = free_slots(&digits);
            prop_assert!(slots.len() == 75 || slots.len() == 76);
            for slot in slots {
                prop_assert!(slot.column != digits.get(slot.ring));
                prop_assert!(!(slot.ring == 0 && slot.column < 2));
                prop_assert!(!(slot.ring == LAST_RING && slot.column == marker_column(digits.last())));
            }
        }
    }
}
