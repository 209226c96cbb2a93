//! Error types for rotp-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Address/size errors
    /// Start row or transfer length falls outside the 4096-row array
    AddressOutOfBounds,
    /// Transfer size is zero or not a multiple of the 4-byte row width
    InvalidAlignment,

    // Access errors
    /// The access primitive failed to read a row, or the row is recorded as
    /// unreadable in the shadow image
    ReadError,
    /// The access primitive failed to write a row
    WriteError,

    // Encoding errors
    /// ECC row contents did not decode to a value
    DecodeError,
    /// Write would clear a fuse bit that is already programmed
    MonotonicityViolation,
    /// Write would need to unset a bit the redundant copies already vote as set
    VoteClearViolation,
    /// Too few rows of a voting group could be read to decide the value
    QuorumNotReached,
    /// Read-back after a write did not match the requested value
    VerifyError,

    // Parameter errors
    /// Voting threshold/row-count pair is not a supported scheme
    UnsupportedVoting,
    /// Candidate write word has bits set in the reserved upper byte
    ReservedBitsSet,

    // Shadow lifecycle errors
    /// The shadow image was already initialized
    AlreadyVirtualized,
    /// Operation needs the shadow image, but it was never initialized
    NotVirtualized,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressOutOfBounds => write!(f, "row range out of bounds"),
            Self::InvalidAlignment => write!(f, "transfer size not a multiple of the row width"),
            Self::ReadError => write!(f, "row read failed"),
            Self::WriteError => write!(f, "row write failed"),
            Self::DecodeError => write!(f, "ECC row did not decode"),
            Self::MonotonicityViolation => write!(f, "write would clear programmed fuse bits"),
            Self::VoteClearViolation => write!(f, "write would unset a voted-set bit"),
            Self::QuorumNotReached => write!(f, "too few readable rows to decide the vote"),
            Self::VerifyError => write!(f, "verify failed: read-back mismatch"),
            Self::UnsupportedVoting => write!(f, "unsupported voting scheme"),
            Self::ReservedBitsSet => write!(f, "reserved upper bits set in write word"),
            Self::AlreadyVirtualized => write!(f, "shadow image already initialized"),
            Self::NotVirtualized => write!(f, "shadow image not initialized"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
