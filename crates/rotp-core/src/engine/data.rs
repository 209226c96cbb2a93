//! Buffer-sized transfers through the encoding engines

use crate::ecc::EccCodec;
use crate::error::{Error, Result};
use crate::geometry::MAX_ECC_DATA_BYTES;
use crate::port::{OtpAccess, WriteGate};

use super::Engine;

impl<A: OtpAccess, C: EccCodec, G: WriteGate> Engine<A, C, G> {
    /// Write a byte buffer as consecutive ECC rows.
    ///
    /// Bytes pair up little-endian, two per row; an odd final byte goes
    /// into one more row zero-extended. The first row that fails aborts the
    /// transfer, leaving earlier rows programmed.
    pub fn write_data_ecc(&mut self, start_row: u16, data: &[u8]) -> Result<()> {
        let mut row = start_row;
        let mut pairs = data.chunks_exact(2);
        for pair in pairs.by_ref() {
            self.write_ecc_row(row, u16::from_le_bytes([pair[0], pair[1]]))?;
            row += 1;
        }
        if let [tail] = pairs.remainder() {
            self.write_ecc_row(row, *tail as u16)?;
        }
        Ok(())
    }

    /// Read consecutive ECC rows back into a byte buffer.
    ///
    /// The dual of [`Engine::write_data_ecc`]: for a buffer ending mid-row,
    /// only the final row's low byte is stored, so nothing past the buffer
    /// is touched.
    pub fn read_data_ecc(&mut self, start_row: u16, buf: &mut [u8]) -> Result<()> {
        if buf.len() > MAX_ECC_DATA_BYTES {
            return Err(Error::AddressOutOfBounds);
        }
        let mut row = start_row;
        let mut pairs = buf.chunks_exact_mut(2);
        for pair in pairs.by_ref() {
            pair.copy_from_slice(&self.read_ecc_row(row)?.to_le_bytes());
            row += 1;
        }
        if let [tail] = pairs.into_remainder() {
            *tail = self.read_ecc_row(row)? as u8;
        }
        Ok(())
    }

    /// Read raw row words into a byte buffer, bypassing every decoder.
    ///
    /// The buffer is zeroed first so a failed transfer never leaves stale
    /// contents behind.
    pub fn read_data_raw(&mut self, start_row: u16, buf: &mut [u8]) -> Result<()> {
        buf.fill(0);
        self.read_raw(start_row, buf)
    }

    /// Write raw row words from a byte buffer, bypassing every encoder.
    ///
    /// The caller manages redundancy for these rows. Words must keep the
    /// reserved upper byte clear and sizes must be whole rows.
    pub fn write_data_raw(&mut self, start_row: u16, data: &[u8]) -> Result<()> {
        self.write_raw(start_row, data)
    }
}
