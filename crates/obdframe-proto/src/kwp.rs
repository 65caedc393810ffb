//! ISO 14230 (KWP2000) header arithmetic.
//!
//! The format byte `A1 A0 L5 L4 L3 L2 L1 L0` drives the whole header
//! layout:
//!
//! - `[A1 A0]` non-zero means `target` and `source` address bytes follow
//!   (`10` physical, `01` functional addressing)
//! - `[L5..L0]` all zero means the data length sits in an explicit length
//!   byte at the end of the header; otherwise the six bits are the length
//!
//! Four layouts result: `[F]`, `[F][L]`, `[F][T][S]`, `[F][T][S][L]`.

use crate::errors::{Result, WireError};

/// Mask selecting the addressing-mode bits of the format byte.
pub const ADDRESSING_MASK: u8 = 0xC0;

/// Mask selecting the embedded-length bits of the format byte.
pub const LENGTH_MASK: u8 = 0x3F;

/// Maximum payload length when an explicit length byte is used.
pub const MAX_LEN_EXPLICIT: usize = 255;

/// Maximum payload length that fits the format byte's six length bits.
pub const MAX_LEN_EMBEDDED: usize = 63;

/// Whether the format byte announces target and source address bytes.
#[must_use]
pub fn has_addressing(format: u8) -> bool {
    format >> 6 != 0
}

/// Whether the format byte announces an explicit trailing length byte
/// (all six length bits zero).
#[must_use]
pub fn has_length_byte(format: u8) -> bool {
    format & LENGTH_MASK == 0
}

/// On-wire header length implied by a format byte: 1–4 bytes.
#[must_use]
pub fn header_len(format: u8) -> usize {
    let mut len = 4;
    if !has_addressing(format) {
        len -= 2;
    }
    if !has_length_byte(format) {
        len -= 1;
    }
    len
}

/// Encode the request payload length into a built request header.
///
/// With `explicit_length_byte` the length is appended as a trailing header
/// byte; otherwise it is OR-ed into the format byte's low six bits. The
/// header must already start with the format byte.
///
/// # Errors
///
/// `WireError::LengthOverflow` when the payload exceeds 255 bytes, or 63
/// bytes without an explicit length byte.
pub fn encode_length(header: &mut Vec<u8>, len: usize, explicit_length_byte: bool) -> Result<()> {
    if len > MAX_LEN_EXPLICIT {
        return Err(WireError::LengthOverflow {
            len,
            max: MAX_LEN_EXPLICIT,
        });
    }

    if explicit_length_byte {
        header.push(len as u8);
        return Ok(());
    }

    if len > MAX_LEN_EMBEDDED {
        return Err(WireError::LengthOverflow {
            len,
            max: MAX_LEN_EMBEDDED,
        });
    }
    if let Some(format) = header.first_mut() {
        *format |= len as u8;
    }
    Ok(())
}
