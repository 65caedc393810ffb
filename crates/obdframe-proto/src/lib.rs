//! Wire-level vocabulary for on-board diagnostics.
//!
//! This crate knows nothing about parameter catalogs or evaluators; it
//! provides the byte-level building blocks the engine crate composes:
//!
//! - [`hex`]: hex/byte conversions and declarative numeric literal parsing
//! - [`link`]: classification of catalog protocol names into link protocols
//! - [`frame`]: raw frame / cleaned message records, masked header compare,
//!   response-prefix handling
//! - [`isotp`]: ISO 15765-2 (ISO-TP) PCI encoding and request splitting
//! - [`kwp`]: ISO 14230 (KWP2000) format-byte and length arithmetic
//!
//! Everything here is pure byte manipulation; no I/O, no allocation beyond
//! the byte vectors handed in and out.

pub mod errors;
pub mod frame;
pub mod hex;
pub mod isotp;
pub mod kwp;
pub mod link;

pub use errors::{Result, WireError};
pub use frame::{CleanedMessage, RawFrame, mask_match, strip_prefix};
pub use link::LinkProtocol;
