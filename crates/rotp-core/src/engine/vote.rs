//! N-of-M voted values across consecutive rows
//!
//! A 24-bit value is replicated over M consecutive rows and decoded per bit:
//! a bit counts as set once at least N of the readable rows carry it. RBIT-3
//! is the 2-of-3 majority form; RBIT-8 sets the bar at 3 of 8, biased toward
//! treating bits as set, and is reserved for criticality fuses.

use heapless::Vec;

use crate::ecc::EccCodec;
use crate::error::{Error, Result};
use crate::geometry::{check_transfer, ROW_BYTES, ROW_DATA_MASK, ROW_ERROR_MASK};
use crate::port::{OtpAccess, WriteGate};

use super::Engine;

const MAX_VOTE_ROWS: usize = 8;

/// Voting layouts the engine supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteScheme {
    /// 24-bit value over three rows, per-bit 2-of-3 majority
    Rbit3,
    /// 24-bit value over eight rows; a bit is set with at least 3 votes
    Rbit8,
}

impl VoteScheme {
    /// Largest supported row group
    pub const MAX_ROWS: usize = MAX_VOTE_ROWS;

    /// Map an (N, M) pair onto a supported scheme.
    pub fn new(threshold: u8, rows: u8) -> Result<Self> {
        match (threshold, rows) {
            (2, 3) => Ok(Self::Rbit3),
            (3, 8) => Ok(Self::Rbit8),
            _ => {
                log::error!("unsupported {}-of-{} voting", threshold, rows);
                Err(Error::UnsupportedVoting)
            }
        }
    }

    /// Votes required to consider a bit set
    pub const fn threshold(self) -> u8 {
        match self {
            Self::Rbit3 => 2,
            Self::Rbit8 => 3,
        }
    }

    /// Number of consecutive rows in the group
    pub const fn rows(self) -> u8 {
        match self {
            Self::Rbit3 => 3,
            Self::Rbit8 => 8,
        }
    }
}

/// Per-bit tally over the words that could be read.
///
/// A zero is only trustworthy when the rows that failed to read could not
/// tip the bit over the threshold; otherwise the group is undecidable. A
/// marginal row that reads today and fails tomorrow must never change the
/// decoded value.
fn tally(words: &[u32], failed: u8, threshold: u8) -> Result<u32> {
    let mut result = 0u32;
    for bit in 0..24 {
        let votes = words.iter().filter(|&&w| w & (1 << bit) != 0).count() as u8;
        if votes >= threshold {
            result |= 1 << bit;
        } else if failed >= threshold - votes {
            log::error!(
                "bit {} undecidable: {} votes, {} unreadable rows",
                bit,
                votes,
                failed
            );
            return Err(Error::QuorumNotReached);
        }
    }
    Ok(result)
}

impl<A: OtpAccess, C: EccCodec, G: WriteGate> Engine<A, C, G> {
    /// Read the voted 24-bit value from a group of consecutive rows.
    pub fn read_voted(&mut self, start_row: u16, scheme: VoteScheme) -> Result<u32> {
        check_transfer(start_row, scheme.rows() as usize * ROW_BYTES)?;

        let mut words: Vec<u32, MAX_VOTE_ROWS> = Vec::new();
        let mut failed = 0u8;
        for i in 0..scheme.rows() as u16 {
            match self.read_row(start_row + i) {
                Ok(raw) if raw & ROW_ERROR_MASK == 0 => {
                    let _ = words.push(raw);
                }
                _ => failed += 1,
            }
        }

        if (words.len() as u8) < scheme.threshold() {
            log::error!(
                "rows {:#05x}..{:#05x}: only {} of {} reads succeeded",
                start_row,
                start_row + scheme.rows() as u16,
                words.len(),
                scheme.rows()
            );
            return Err(Error::QuorumNotReached);
        }
        tally(&words, failed, scheme.threshold())
    }

    /// Write a voted 24-bit value, widening every row in the group.
    ///
    /// Every row gets all requested bits OR-ed in, including bits the vote
    /// already carries; widening a row past the minimum cannot degrade a
    /// per-bit majority. Individual rows may fail to read or write without
    /// sinking the operation, and the final voted read-back decides success.
    pub fn write_voted(&mut self, start_row: u16, scheme: VoteScheme, value: u32) -> Result<()> {
        if value & !ROW_DATA_MASK != 0 {
            return Err(Error::ReservedBitsSet);
        }
        check_transfer(start_row, scheme.rows() as usize * ROW_BYTES)?;

        let current = self.read_voted(start_row, scheme)?;
        let stuck = current & !value;
        if stuck != 0 {
            log::error!(
                "voted value {:#08x} at {:#05x} has bits {:#08x} that {:#08x} would unset",
                current,
                start_row,
                stuck,
                value
            );
            return Err(Error::VoteClearViolation);
        }

        for i in 0..scheme.rows() as u16 {
            let row = start_row + i;
            let old = match self.read_row(row) {
                Ok(raw) if raw & ROW_ERROR_MASK == 0 => raw,
                _ => {
                    log::warn!("row {:#05x} unreadable, deferring to the vote", row);
                    continue;
                }
            };
            if old & value == value {
                log::debug!("row {:#05x} already carries {:#08x}", row, value);
                continue;
            }
            if let Err(e) = self.write_row(row, old | value) {
                log::warn!(
                    "row {:#05x} write failed ({}), deferring to the vote",
                    row,
                    e
                );
            }
        }

        let voted = self.read_voted(start_row, scheme)?;
        if voted != value {
            log::error!(
                "group at {:#05x} verify failed: wanted {:#08x}, voted {:#08x}",
                start_row,
                value,
                voted
            );
            return Err(Error::VerifyError);
        }
        log::debug!(
            "{}-of-{} group at {:#05x} now votes {:#08x}",
            scheme.threshold(),
            scheme.rows(),
            start_row,
            value
        );
        Ok(())
    }

    /// Read a 24-bit value stored with 2-of-3 voting over three rows.
    pub fn read_rbit3(&mut self, start_row: u16) -> Result<u32> {
        self.read_voted(start_row, VoteScheme::Rbit3)
    }

    /// Write a 24-bit value with 2-of-3 voting over three rows.
    pub fn write_rbit3(&mut self, start_row: u16, value: u32) -> Result<()> {
        self.write_voted(start_row, VoteScheme::Rbit3, value)
    }

    /// Read a 24-bit value stored with 3-of-8 voting over eight rows.
    pub fn read_rbit8(&mut self, start_row: u16) -> Result<u32> {
        self.read_voted(start_row, VoteScheme::Rbit8)
    }

    /// Write a 24-bit value with 3-of-8 voting over eight rows.
    pub fn write_rbit8(&mut self, start_row: u16, value: u32) -> Result<()> {
        self.write_voted(start_row, VoteScheme::Rbit8, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_mapping() {
        assert_eq!(VoteScheme::new(2, 3), Ok(VoteScheme::Rbit3));
        assert_eq!(VoteScheme::new(3, 8), Ok(VoteScheme::Rbit8));
        assert_eq!(VoteScheme::new(2, 8), Err(Error::UnsupportedVoting));
        assert_eq!(VoteScheme::new(3, 3), Err(Error::UnsupportedVoting));
        assert_eq!(VoteScheme::new(5, 9), Err(Error::UnsupportedVoting));
    }

    #[test]
    fn test_tally_majority() {
        assert_eq!(tally(&[0xFF, 0xFF, 0x00], 0, 2), Ok(0xFF));
        assert_eq!(tally(&[0xF0, 0x0F, 0xFF], 0, 2), Ok(0xFF));
        assert_eq!(tally(&[0x00, 0x00, 0x00], 0, 2), Ok(0x00));
    }

    #[test]
    fn test_tally_failed_reads_may_tip_the_vote() {
        // One vote short with one unreadable row: undecidable.
        assert_eq!(tally(&[0xFF, 0x00], 1, 2), Err(Error::QuorumNotReached));
        // All-zero votes with a single unreadable row cannot reach two.
        assert_eq!(tally(&[0x00, 0x00], 1, 2), Ok(0x00));
        // Set bits carry regardless of unreadable rows.
        assert_eq!(tally(&[0xFF, 0xFF], 1, 2), Ok(0xFF));
    }

    #[test]
    fn test_tally_biased_threshold() {
        // 3-of-8: set bits carry no matter how many rows are unreadable.
        assert_eq!(tally(&[0xFFFFFF, 0xFFFFFF, 0xFFFFFF], 5, 3), Ok(0xFFFFFF));
        // Two votes are short of the biased threshold.
        assert_eq!(tally(&[0x01, 0x01, 0x00], 0, 3), Ok(0x00));
        // A clear bit stays undecidable while unreadable rows could lift it.
        assert_eq!(tally(&[0x01, 0x01, 0x01], 5, 3), Err(Error::QuorumNotReached));
    }
}
