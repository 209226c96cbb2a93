//! Access-port trait definitions

use crate::error::Result;

/// Serialized OTP access primitive
///
/// This trait represents the hardware path to the fuse array, usually a
/// boot-ROM entry point that serializes all concurrent OTP access
/// internally. Buffers carry one little-endian 32-bit word per row: the low
/// 24 bits are row data, and a nonzero upper byte in a word read back flags
/// a hardware error for that row. Implementations may block while the ROM
/// arbitrates access.
pub trait OtpAccess {
    /// Read `buf.len() / 4` rows starting at `start_row` into `buf`
    fn read(&mut self, start_row: u16, buf: &mut [u8]) -> Result<()>;

    /// Write `data.len() / 4` rows starting at `start_row`
    ///
    /// Rows are written in ascending order. Fuse bits OR-accumulate: a bit
    /// already programmed stays programmed no matter what is written over it.
    fn write(&mut self, start_row: u16, data: &[u8]) -> Result<()>;
}

/// Pre-write confirmation hook used during bring-up
///
/// When armed on the engine, the hook runs once before every write that
/// reaches hardware, and blocks until the operator acts. Shadow-routed
/// writes never trigger it.
pub trait WriteGate {
    /// Block until the operator confirms the pending write
    fn await_confirmation(&mut self);
}

/// Gate that never blocks
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGate;

impl WriteGate for NoGate {
    fn await_confirmation(&mut self) {}
}
