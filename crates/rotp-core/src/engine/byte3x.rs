//! Triple-redundant byte rows
//!
//! A byte-3x row replicates one byte into the three data bytes of a single
//! row; the decoded bit is the 2-of-3 majority across the byte lanes.

use crate::ecc::EccCodec;
use crate::error::{Error, Result};
use crate::geometry::ROW_ERROR_MASK;
use crate::port::{OtpAccess, WriteGate};

use super::Engine;

fn lanes(raw: u32) -> [u8; 3] {
    [raw as u8, (raw >> 8) as u8, (raw >> 16) as u8]
}

/// Per-bit 2-of-3 majority across the three byte lanes.
fn vote3(lanes: [u8; 3]) -> u8 {
    let mut result = 0u8;
    for bit in 0..8 {
        let mask = 1u8 << bit;
        let votes = lanes.iter().filter(|&&lane| lane & mask != 0).count();
        if votes >= 2 {
            result |= mask;
        }
    }
    result
}

impl<A: OtpAccess, C: EccCodec, G: WriteGate> Engine<A, C, G> {
    /// Read the majority-voted byte stored in a byte-3x row.
    pub fn read_byte_3x(&mut self, row: u16) -> Result<u8> {
        let raw = self.read_row(row)?;
        if raw & ROW_ERROR_MASK != 0 {
            log::error!("row {:#05x} read back the error marker {:#010x}", row, raw);
            return Err(Error::ReadError);
        }
        Ok(vote3(lanes(raw)))
    }

    /// Write a byte into a byte-3x row, widening all three lanes.
    ///
    /// A bit two lanes already hold is voted set and can never be cleared
    /// again; requesting a value without such a bit is refused. Lanes that
    /// already contain every requested bit leave the row untouched.
    pub fn write_byte_3x(&mut self, row: u16, value: u8) -> Result<()> {
        let raw = self.read_row(row)?;
        if raw & ROW_ERROR_MASK != 0 {
            log::error!("row {:#05x} read back the error marker {:#010x}", row, raw);
            return Err(Error::ReadError);
        }
        let old = lanes(raw);

        let voted_set = vote3(old);
        if voted_set & !value != 0 {
            log::error!(
                "row {:#05x} already votes bits {:#04x} as set, cannot write {:#04x}",
                row,
                voted_set & !value,
                value
            );
            return Err(Error::VoteClearViolation);
        }

        if old.iter().all(|&lane| lane & value == value) {
            log::debug!("row {:#05x} already votes {:#04x}, not writing", row, value);
            return Ok(());
        }

        let widened = raw | value as u32 | (value as u32) << 8 | (value as u32) << 16;
        self.write_row(row, widened)?;

        let verify = self.read_byte_3x(row)?;
        if verify != value {
            log::error!(
                "row {:#05x} verify failed: wanted {:#04x}, voted {:#04x}",
                row,
                value,
                verify
            );
            return Err(Error::VerifyError);
        }
        Ok(())
    }
}
