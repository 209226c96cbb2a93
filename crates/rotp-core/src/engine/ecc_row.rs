//! ECC row operations with partial-write reconciliation

use crate::ecc::{EccCodec, BRBP_MASK, ECC_DATA_MASK};
use crate::error::{Error, Result};
use crate::geometry::{ROW_DATA_MASK, ROW_ERROR_MASK};
use crate::port::{OtpAccess, WriteGate};

use super::Engine;

impl<A: OtpAccess, C: EccCodec, G: WriteGate> Engine<A, C, G> {
    /// Read and decode the 16-bit value stored in an ECC row.
    pub fn read_ecc_row(&mut self, row: u16) -> Result<u16> {
        let raw = self.read_row(row)?;
        match self.codec.decode(raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                log::error!("row {:#05x} raw word {:#08x} does not decode", row, raw);
                Err(e)
            }
        }
    }

    /// Encode and write a 16-bit value into an ECC row.
    ///
    /// A row that already holds bits is reconciled where the code allows:
    /// the polarity-inverted codeword is tried when the direct one cannot be
    /// reached, and one stray bit in the protected region plus one stray
    /// polarity flag are tolerated at the cost of the row's remaining
    /// redundancy. Writing a value the row already decodes to is a no-op.
    pub fn write_ecc_row(&mut self, row: u16, value: u16) -> Result<()> {
        let existing = self.read_row(row)?;

        // Nothing to burn if the row already decodes to the value.
        if let Ok(current) = self.codec.decode(existing) {
            if current == value {
                log::debug!("row {:#05x} already holds {:#06x}, not writing", row, value);
                return Ok(());
            }
        }
        if existing & ROW_ERROR_MASK != 0 {
            log::error!("row {:#05x} read back the error marker {:#010x}", row, existing);
            return Err(Error::ReadError);
        }

        let encoded = self.codec.encode(value);
        let encoded_inv = encoded ^ ROW_DATA_MASK;

        // Bits only transition 0 -> 1, so these two words are the only ones
        // that can physically land in the row.
        let merged = existing | encoded;
        let merged_inv = existing | encoded_inv;

        // Bits that differ from the ideal codeword are damage the decoder
        // has to absorb.
        let stray = encoded ^ merged;
        let stray_inv = encoded_inv ^ merged_inv;

        let to_write = if stray == 0 {
            merged
        } else if stray_inv == 0 {
            merged_inv
        } else if (stray_inv & BRBP_MASK).count_ones() <= 1
            && (stray_inv & ECC_DATA_MASK).count_ones() <= 1
        {
            log::warn!(
                "row {:#05x}: redundancy compromised, writing inverted codeword {:#08x} (stray bits {:#08x})",
                row,
                merged_inv,
                stray_inv
            );
            merged_inv
        } else if (stray & BRBP_MASK).count_ones() <= 1
            && (stray & ECC_DATA_MASK).count_ones() <= 1
        {
            log::warn!(
                "row {:#05x}: redundancy compromised, writing codeword {:#08x} (stray bits {:#08x})",
                row,
                merged,
                stray
            );
            merged
        } else {
            log::error!(
                "row {:#05x} cannot take {:#06x}: existing {:#08x} leaves stray bits {:#08x} / {:#08x}",
                row,
                value,
                existing,
                stray,
                stray_inv
            );
            return Err(Error::MonotonicityViolation);
        };

        self.write_row(row, to_write)?;

        // The row must now decode to the requested value.
        let verify = self.read_ecc_row(row)?;
        if verify != value {
            log::error!(
                "row {:#05x} verify failed: wanted {:#06x}, decoded {:#06x}",
                row,
                value,
                verify
            );
            return Err(Error::VerifyError);
        }
        Ok(())
    }
}
