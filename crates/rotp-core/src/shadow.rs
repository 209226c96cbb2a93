//! Virtualized OTP image
//!
//! The shadow store mirrors the whole fuse array in memory with the same
//! physics as the hardware: writes may only accumulate bits, and rows that
//! could not be read while priming stay poisoned until a snapshot restore
//! overwrites them. With the shadow installed, programming sequences can be
//! dry-run and inspected without burning a single fuse.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::geometry::{
    check_transfer, page_of, page_row_of, word_from_le, NUM_PAGES, NUM_ROWS, ROWS_PER_PAGE,
    ROW_BYTES, ROW_ERROR_MASK,
};
use crate::port::OtpAccess;

/// In-memory mirror of the 4096-row fuse array
///
/// Each entry is the raw row word; a nonzero upper byte marks a row whose
/// priming read failed, in the same format the hardware uses to report read
/// errors.
pub struct ShadowStore {
    rows: Vec<u32>,
}

impl ShadowStore {
    /// Prime a fresh image from the hardware port, row by row.
    ///
    /// Pages with their bit set in `ignored_pages_mask` are skipped and keep
    /// zeroed, readable rows. A row that fails to read is stored as
    /// `0xFFFF_FFFF` so the error is sticky for later accesses.
    pub fn prime<A: OtpAccess>(port: &mut A, ignored_pages_mask: u64) -> Self {
        let mut rows = vec![0u32; NUM_ROWS];
        let mut failed = 0usize;
        for page in 0..NUM_PAGES {
            if ignored_pages_mask & (1u64 << page) != 0 {
                continue;
            }
            for offset in 0..ROWS_PER_PAGE {
                let row = page * ROWS_PER_PAGE + offset;
                let mut word = [0u8; ROW_BYTES];
                if port.read(row as u16, &mut word).is_ok() {
                    rows[row] = u32::from_le_bytes(word);
                } else {
                    rows[row] = 0xFFFF_FFFF;
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            log::warn!("shadow: {} rows failed to read while priming", failed);
            for (row, &raw) in rows.iter().enumerate() {
                if raw & ROW_ERROR_MASK != 0 {
                    log::warn!(
                        "shadow: row {:#05x} ({:02x}:{:02x}) is unreadable",
                        row,
                        page_of(row as u16),
                        page_row_of(row as u16)
                    );
                }
            }
        }
        Self { rows }
    }

    /// Row was flagged unreadable while priming?
    pub fn row_is_error(&self, row: u16) -> bool {
        self.rows[row as usize] & ROW_ERROR_MASK != 0
    }

    /// Copy rows out of the image, refusing rows flagged unreadable.
    pub fn read(&self, start_row: u16, buf: &mut [u8]) -> Result<()> {
        check_transfer(start_row, buf.len())?;
        for (i, chunk) in buf.chunks_exact_mut(ROW_BYTES).enumerate() {
            let row = start_row as usize + i;
            let raw = self.rows[row];
            if raw & ROW_ERROR_MASK != 0 {
                log::error!("shadow: read of unreadable row {:#05x}", row);
                return Err(Error::ReadError);
            }
            chunk.copy_from_slice(&raw.to_le_bytes());
        }
        Ok(())
    }

    /// Accumulate words into the image with fuse physics.
    ///
    /// Each row must be readable and must not lose any programmed bit. A
    /// refused row aborts the call; rows before it stay updated, the same
    /// partial effect a failed hardware write leaves behind.
    pub fn write(&mut self, start_row: u16, data: &[u8]) -> Result<()> {
        check_transfer(start_row, data.len())?;
        for (i, chunk) in data.chunks_exact(ROW_BYTES).enumerate() {
            let row = start_row as usize + i;
            let new = word_from_le(chunk);
            let current = self.rows[row];
            if current & ROW_ERROR_MASK != 0 {
                log::error!("shadow: write to unreadable row {:#05x}", row);
                return Err(Error::ReadError);
            }
            if current | new != new {
                log::error!(
                    "shadow: row {:#05x} write {:#08x} -> {:#08x} would clear bits {:#08x}",
                    row,
                    current,
                    new,
                    current & !new
                );
                return Err(Error::MonotonicityViolation);
            }
            self.rows[row] = current | new;
        }
        Ok(())
    }

    /// Install snapshot words, bypassing fuse physics and error flags.
    ///
    /// This is a snapshot load, not an OTP write: bits may clear and
    /// poisoned rows may be replaced.
    pub fn restore(&mut self, start_row: u16, data: &[u8]) -> Result<()> {
        check_transfer(start_row, data.len())?;
        for (i, chunk) in data.chunks_exact(ROW_BYTES).enumerate() {
            self.rows[start_row as usize + i] = word_from_le(chunk);
        }
        Ok(())
    }

    /// Dump raw image words, error markers included.
    pub fn save(&self, start_row: u16, buf: &mut [u8]) -> Result<()> {
        check_transfer(start_row, buf.len())?;
        for (i, chunk) in buf.chunks_exact_mut(ROW_BYTES).enumerate() {
            chunk.copy_from_slice(&self.rows[start_row as usize + i].to_le_bytes());
        }
        Ok(())
    }
}

impl OtpAccess for ShadowStore {
    fn read(&mut self, start_row: u16, buf: &mut [u8]) -> Result<()> {
        ShadowStore::read(self, start_row, buf)
    }

    fn write(&mut self, start_row: u16, data: &[u8]) -> Result<()> {
        ShadowStore::write(self, start_row, data)
    }
}
