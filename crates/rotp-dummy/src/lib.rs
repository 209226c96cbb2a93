//! rotp-dummy - In-memory OTP fuse emulator for testing
//!
//! This crate provides a dummy access port that emulates the serialized
//! boot-ROM OTP primitive over a heap image of the 4096-row fuse array.
//! Writes accumulate bits the way fuses burn, per-row faults can be injected
//! to exercise the engine's recovery paths, and a write log records every
//! call that reached the array.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use bitflags::bitflags;
use rotp_core::error::{Error, Result};
use rotp_core::geometry::{transfer_is_valid, NUM_ROWS, ROW_BYTES, ROW_DATA_MASK};
use rotp_core::port::OtpAccess;

bitflags! {
    /// Fault modes injected on one emulated row
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RowFaults: u8 {
        /// Any read touching the row fails
        const READ_FAIL = 1 << 0;
        /// Any write touching the row fails
        const WRITE_FAIL = 1 << 1;
    }
}

/// Emulated OTP fuse array
///
/// Reads return the stored words; writes OR the lower 24 bits of each word
/// into the array, because a programmed fuse bit can never be cleared again.
#[cfg(feature = "alloc")]
pub struct DummyOtp {
    rows: Vec<u32>,
    faults: Vec<RowFaults>,
    writes: Vec<(u16, usize)>,
}

#[cfg(feature = "alloc")]
impl DummyOtp {
    /// Create a blank fuse array with every bit unprogrammed.
    pub fn new() -> Self {
        Self {
            rows: vec![0; NUM_ROWS],
            faults: vec![RowFaults::empty(); NUM_ROWS],
            writes: Vec::new(),
        }
    }

    /// Create a fuse array with some rows pre-programmed.
    pub fn with_rows(image: &[(u16, u32)]) -> Self {
        let mut otp = Self::new();
        for &(row, raw) in image {
            otp.rows[row as usize] = raw;
        }
        otp
    }

    /// Raw word currently stored in a row
    pub fn raw(&self, row: u16) -> u32 {
        self.rows[row as usize]
    }

    /// Overwrite a row's raw word, bypassing fuse physics.
    pub fn set_raw(&mut self, row: u16, raw: u32) {
        self.rows[row as usize] = raw;
    }

    /// Make accesses touching `row` fail with the given fault modes.
    pub fn inject_fault(&mut self, row: u16, faults: RowFaults) {
        self.faults[row as usize] = faults;
    }

    /// Write calls that reached the array, as (start_row, byte_count)
    pub fn writes(&self) -> &[(u16, usize)] {
        &self.writes
    }
}

#[cfg(feature = "alloc")]
impl Default for DummyOtp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "alloc")]
impl OtpAccess for DummyOtp {
    fn read(&mut self, start_row: u16, buf: &mut [u8]) -> Result<()> {
        if !transfer_is_valid(start_row, buf.len()) {
            return Err(Error::AddressOutOfBounds);
        }
        for (i, chunk) in buf.chunks_exact_mut(ROW_BYTES).enumerate() {
            let row = start_row as usize + i;
            if self.faults[row].contains(RowFaults::READ_FAIL) {
                log::debug!("dummy: injected read fault at row {:#05x}", row);
                return Err(Error::ReadError);
            }
            chunk.copy_from_slice(&self.rows[row].to_le_bytes());
        }
        Ok(())
    }

    fn write(&mut self, start_row: u16, data: &[u8]) -> Result<()> {
        if !transfer_is_valid(start_row, data.len()) {
            return Err(Error::AddressOutOfBounds);
        }
        self.writes.push((start_row, data.len()));
        for (i, chunk) in data.chunks_exact(ROW_BYTES).enumerate() {
            let row = start_row as usize + i;
            if self.faults[row].contains(RowFaults::WRITE_FAIL) {
                log::debug!("dummy: injected write fault at row {:#05x}", row);
                return Err(Error::WriteError);
            }
            let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            // Fuse programming only ever sets bits.
            self.rows[row] |= word & ROW_DATA_MASK;
        }
        Ok(())
    }
}
