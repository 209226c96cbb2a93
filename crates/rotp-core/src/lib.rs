//! rotp-core - Safer access layer for OTP fuse memory
//!
//! One-time-programmable fuse rows hold 24 data bits each and can only ever
//! transition bits from 0 to 1. This crate wraps a serialized hardware access
//! primitive (typically a boot-ROM entry point) with the redundancy schemes
//! manufacturers layer over the raw rows: ECC rows with a polarity-inversion
//! escape, triple-redundant bytes within one row, and N-of-M voting groups
//! spread over consecutive rows. Every write is checked against fuse physics
//! up front and verified by reading back through the matching decoder.
//!
//! The engine can also run against an in-memory shadow of the whole fuse
//! array that obeys the same physics, so bring-up code and tests can dry-run
//! a programming sequence without burning anything.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable heap allocation, required for the shadow image
//!
//! # Example
//!
//! ```ignore
//! use rotp_core::{port::OtpAccess, Engine};
//!
//! fn provision<A: OtpAccess>(port: A) {
//!     let mut otp = Engine::new(port);
//!     match otp.write_ecc_row(0x010, 0xBEEF) {
//!         Ok(()) => log::info!("row programmed and verified"),
//!         Err(e) => log::error!("programming failed: {}", e),
//!     }
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod ecc;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod port;
#[cfg(feature = "alloc")]
pub mod shadow;

pub use engine::{Engine, VoteScheme};
pub use error::{Error, Result};
