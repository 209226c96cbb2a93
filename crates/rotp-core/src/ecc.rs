//! ECC row codec
//!
//! An ECC row stores a 16-bit value in 24 raw bits: the value in bits 0-15,
//! five Hamming check bits in 16-20, an overall parity bit in 21, and two
//! polarity flags in bits 22-23. A row with both polarity flags programmed
//! holds the complement of its codeword. Fuse defects are stuck-at-1, so
//! inverting the codeword rescues rows whose high bits were already set, and
//! the Hamming code absorbs one further stray bit.

use crate::error::{Error, Result};
use crate::geometry::{ROW_DATA_MASK, ROW_ERROR_MASK};

/// Polarity flags within the 24-bit codeword
pub const BRBP_MASK: u32 = 0x00C0_0000;
/// Hamming-protected portion of the codeword (16 value + 5 check + 1 parity)
pub const ECC_DATA_MASK: u32 = 0x003F_FFFF;

/// Syndrome column assigned to each value bit. Powers of two are reserved
/// for the check bits themselves, zero for the parity bit.
const SYNDROMES: [u32; 16] = [3, 5, 6, 7, 9, 10, 11, 12, 13, 14, 15, 17, 18, 19, 20, 21];

/// ECC codec capability
///
/// The engine relies on two codec properties: `encode(v) ^ 0xFFFFFF` decodes
/// back to `v` (the polarity escape), and a codeword with one extra stuck
/// bit still decodes.
pub trait EccCodec {
    /// Encode a 16-bit value into a 24-bit row word
    fn encode(&self, value: u16) -> u32;

    /// Decode a raw row word back to its 16-bit value
    ///
    /// Fails if the word carries the hardware error marker in its upper
    /// byte, or the codeword is damaged beyond single-bit repair.
    fn decode(&self, raw: u32) -> Result<u16>;
}

/// Default codec: Hamming SEC-DED over 22 bits plus two polarity flags
#[derive(Debug, Default, Clone, Copy)]
pub struct Secded;

impl EccCodec for Secded {
    fn encode(&self, value: u16) -> u32 {
        let mut word = value as u32;
        let mut check = 0u32;
        for (bit, &col) in SYNDROMES.iter().enumerate() {
            if value & (1 << bit) != 0 {
                check ^= col;
            }
        }
        word |= check << 16;
        if word.count_ones() % 2 == 1 {
            word |= 1 << 21;
        }
        word
    }

    fn decode(&self, raw: u32) -> Result<u16> {
        if raw & ROW_ERROR_MASK != 0 {
            return Err(Error::DecodeError);
        }
        let word = raw & ROW_DATA_MASK;
        // Stuck bits only ever set, so an inverted row cannot lose its
        // polarity flags; anything short of both flags reads as direct.
        let half = if word & BRBP_MASK == BRBP_MASK {
            !word & ECC_DATA_MASK
        } else {
            word & ECC_DATA_MASK
        };
        correct22(half).ok_or(Error::DecodeError)
    }
}

/// Repair up to one flipped bit in a 22-bit half-codeword and return the
/// value it protects.
fn correct22(word: u32) -> Option<u16> {
    let mut syndrome = 0u32;
    for (bit, &col) in SYNDROMES.iter().enumerate() {
        if word & (1 << bit) != 0 {
            syndrome ^= col;
        }
    }
    syndrome ^= (word >> 16) & 0x1F;
    let parity_even = word.count_ones() % 2 == 0;
    let value = (word & 0xFFFF) as u16;

    if syndrome == 0 {
        // Clean, or only the parity bit itself flipped.
        return Some(value);
    }
    if parity_even {
        // Nonzero syndrome with even parity: two or more flipped bits,
        // beyond what the code can repair.
        return None;
    }
    if syndrome.is_power_of_two() {
        // A check bit flipped; the value bits are intact.
        return Some(value);
    }
    SYNDROMES
        .iter()
        .position(|&col| col == syndrome)
        .map(|bit| value ^ (1 << bit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_cover_the_row() {
        assert_eq!(BRBP_MASK | ECC_DATA_MASK, ROW_DATA_MASK);
        assert_eq!(BRBP_MASK & ECC_DATA_MASK, 0);
    }

    #[test]
    fn test_roundtrip_all_values() {
        for value in 0..=u16::MAX {
            let word = Secded.encode(value);
            assert_eq!(word & !ROW_DATA_MASK, 0);
            assert_eq!(Secded.decode(word), Ok(value));
        }
    }

    #[test]
    fn test_inverted_roundtrip() {
        for value in [0x0000, 0x0001, 0x1234, 0xBEEF, 0x8000, 0xFFFF] {
            let inverted = Secded.encode(value) ^ ROW_DATA_MASK;
            assert_eq!(Secded.decode(inverted), Ok(value));
        }
    }

    #[test]
    fn test_single_stuck_bit_is_absorbed() {
        for value in [0x0000, 0x5A5A, 0xBEEF, 0xFFFF] {
            for word in [Secded.encode(value), Secded.encode(value) ^ ROW_DATA_MASK] {
                for bit in 0..24 {
                    if word & (1 << bit) != 0 {
                        continue;
                    }
                    assert_eq!(Secded.decode(word | 1 << bit), Ok(value));
                }
            }
        }
    }

    #[test]
    fn test_double_damage_is_detected() {
        let word = Secded.encode(0x1234);
        let mut clear = (0..22).filter(|bit| word & (1 << bit) == 0);
        let first = clear.next().unwrap();
        let second = clear.next().unwrap();
        assert_eq!(
            Secded.decode(word | 1 << first | 1 << second),
            Err(Error::DecodeError)
        );
    }

    #[test]
    fn test_error_marker_rejected() {
        let word = Secded.encode(0x1234);
        assert_eq!(Secded.decode(word | 0x0100_0000), Err(Error::DecodeError));
        assert_eq!(Secded.decode(0xFFFF_FFFF), Err(Error::DecodeError));
    }
}
