//! Encoding-aware read/write/verify engine
//!
//! The engine owns the access port, the ECC codec, and (optionally) the
//! shadow image, and layers the redundancy schemes on top of raw row
//! transfers. Every public write validates the transfer, enforces fuse
//! physics, and verifies itself by reading back through the matching
//! decoder.

mod byte3x;
mod data;
mod ecc_row;
mod vote;

pub use vote::VoteScheme;

use crate::ecc::{EccCodec, Secded};
use crate::error::{Error, Result};
use crate::geometry::{check_transfer, word_from_le, ROW_BYTES, ROW_ERROR_MASK};
use crate::port::{NoGate, OtpAccess, WriteGate};
#[cfg(feature = "alloc")]
use crate::shadow::ShadowStore;

/// Encoding-aware OTP engine over an access port
///
/// Once [`Engine::virtualize`] has installed the shadow image, every
/// transfer is routed to it instead of the port; the port is only touched
/// again to prime a snapshot or after building a fresh engine.
pub struct Engine<A, C = Secded, G = NoGate> {
    port: A,
    codec: C,
    gate: G,
    gate_armed: bool,
    #[cfg(feature = "alloc")]
    shadow: Option<ShadowStore>,
}

impl<A: OtpAccess> Engine<A> {
    /// Build an engine with the default codec and a no-op write gate.
    pub fn new(port: A) -> Self {
        Self::with_parts(port, Secded, NoGate)
    }
}

impl<A: OtpAccess, C: EccCodec, G: WriteGate> Engine<A, C, G> {
    /// Build an engine from explicit capabilities.
    pub fn with_parts(port: A, codec: C, gate: G) -> Self {
        Self {
            port,
            codec,
            gate,
            gate_armed: false,
            #[cfg(feature = "alloc")]
            shadow: None,
        }
    }

    /// Arm or disarm the pre-write confirmation gate.
    ///
    /// While armed, the gate blocks once before every write that reaches
    /// hardware. Shadow-routed writes are not gated.
    pub fn arm_write_gate(&mut self, armed: bool) {
        self.gate_armed = armed;
    }

    /// Access port the engine was built over
    pub fn port(&self) -> &A {
        &self.port
    }

    /// Mutable access to the port, e.g. to adjust an emulated backend
    pub fn port_mut(&mut self) -> &mut A {
        &mut self.port
    }

    /// Read one row's raw 32-bit word.
    ///
    /// A nonzero upper byte in the result is the hardware's per-row read
    /// error marker.
    pub fn read_raw_row(&mut self, row: u16) -> Result<u32> {
        self.read_row(row)
    }

    /// Write one raw row, unencoded.
    ///
    /// The caller takes over redundancy management for this row. The write
    /// is refused if it would clear programmed bits, skipped if the row
    /// already holds the exact value, and read back to verify otherwise.
    pub fn write_raw_row(&mut self, row: u16, value: u32) -> Result<()> {
        let existing = self.read_row(row)?;
        if existing == value {
            return Ok(());
        }
        let stuck = existing & !value;
        if stuck != 0 {
            log::error!(
                "row {:#05x} cannot go {:#08x} -> {:#08x}: bits {:#08x} are already programmed",
                row,
                existing,
                value,
                stuck
            );
            return Err(Error::MonotonicityViolation);
        }
        self.write_row(row, value)?;
        let verify = self.read_row(row)?;
        if verify != value {
            log::error!(
                "row {:#05x} verify failed: wrote {:#08x}, read {:#08x}",
                row,
                value,
                verify
            );
            return Err(Error::VerifyError);
        }
        Ok(())
    }

    /// Validate and dispatch a raw read to the shadow or the port.
    pub(crate) fn read_raw(&mut self, start_row: u16, buf: &mut [u8]) -> Result<()> {
        check_transfer(start_row, buf.len())?;
        #[cfg(feature = "alloc")]
        if let Some(shadow) = self.shadow.as_ref() {
            return shadow.read(start_row, buf);
        }
        self.port.read(start_row, buf)
    }

    /// Validate and dispatch a raw write to the shadow or the port.
    ///
    /// Candidate words must keep the reserved upper byte clear; the check
    /// runs before anything can reach the fuses.
    pub(crate) fn write_raw(&mut self, start_row: u16, data: &[u8]) -> Result<()> {
        check_transfer(start_row, data.len())?;
        for chunk in data.chunks_exact(ROW_BYTES) {
            if word_from_le(chunk) & ROW_ERROR_MASK != 0 {
                log::error!(
                    "write at row {:#05x} carries reserved upper bits, refusing",
                    start_row
                );
                return Err(Error::ReservedBitsSet);
            }
        }
        #[cfg(feature = "alloc")]
        if let Some(shadow) = self.shadow.as_mut() {
            return shadow.write(start_row, data);
        }
        if self.gate_armed {
            self.gate.await_confirmation();
        }
        log::debug!(
            "writing {} rows starting at {:#05x}",
            data.len() / ROW_BYTES,
            start_row
        );
        self.port.write(start_row, data)
    }

    pub(crate) fn read_row(&mut self, row: u16) -> Result<u32> {
        let mut word = [0u8; ROW_BYTES];
        self.read_raw(row, &mut word)?;
        Ok(u32::from_le_bytes(word))
    }

    pub(crate) fn write_row(&mut self, row: u16, value: u32) -> Result<()> {
        self.write_raw(row, &value.to_le_bytes())
    }
}

#[cfg(feature = "alloc")]
impl<A: OtpAccess, C: EccCodec, G: WriteGate> Engine<A, C, G> {
    /// Install the shadow image, priming it from the port.
    ///
    /// Pages with their bit set in `ignored_pages_mask` are not primed and
    /// start out zeroed. From here on every transfer is served by the
    /// image. Initializing twice is refused and leaves the image untouched.
    pub fn virtualize(&mut self, ignored_pages_mask: u64) -> Result<()> {
        if self.shadow.is_some() {
            log::error!("shadow image is already initialized");
            return Err(Error::AlreadyVirtualized);
        }
        self.shadow = Some(ShadowStore::prime(&mut self.port, ignored_pages_mask));
        Ok(())
    }

    /// Shadow image installed?
    pub fn is_virtualized(&self) -> bool {
        self.shadow.is_some()
    }

    /// Load snapshot words into the shadow image, bypassing fuse physics.
    pub fn restore_shadow(&mut self, start_row: u16, data: &[u8]) -> Result<()> {
        match self.shadow.as_mut() {
            Some(shadow) => shadow.restore(start_row, data),
            None => Err(Error::NotVirtualized),
        }
    }

    /// Dump raw shadow words, error markers included.
    pub fn save_shadow(&self, start_row: u16, buf: &mut [u8]) -> Result<()> {
        match self.shadow.as_ref() {
            Some(shadow) => shadow.save(start_row, buf),
            None => Err(Error::NotVirtualized),
        }
    }
}
