//! Hex/byte conversions and numeric literal parsing.
//!
//! Catalogs write byte values as text (`"0x41"`, `"0b1000"`, `"104"`), and
//! diagnostics render bytes back as uppercase hex pairs. Both directions
//! live here.

use crate::errors::{Result, WireError};

/// Render a byte as exactly two uppercase hex digits (`0x2A` → `"2A"`).
#[must_use]
pub fn byte_to_pair(byte: u8) -> String {
    format!("{byte:02X}")
}

/// Convert a two-digit hex pair back to a byte (`"FF"` → `255`).
///
/// Lowercase input is uppercased first. Anything that is not exactly two
/// ASCII hex digits yields `0` with no error signal; callers validate
/// upstream.
#[must_use]
pub fn pair_to_byte(pair: &str) -> u8 {
    if pair.len() != 2 || !pair.bytes().all(|b| b.is_ascii_hexdigit()) {
        return 0;
    }
    u8::from_str_radix(&pair.to_ascii_uppercase(), 16).unwrap_or(0)
}

/// Render a byte sequence as uppercase space-separated hex pairs
/// (`[0x48, 0x6B, 0x10]` → `"48 6B 10"`).
#[must_use]
pub fn render(bytes: &[u8]) -> String {
    let pairs: Vec<String> = bytes.iter().map(|&b| byte_to_pair(b)).collect();
    pairs.join(" ")
}

/// Parse a declarative numeric literal.
///
/// Accepts `0b…` (binary), `0x…` (hex, either case), or plain decimal.
///
/// # Errors
///
/// `WireError::InvalidNumber` when the selected base rejects a digit or no
/// digits remain after the base prefix.
pub fn parse_uint(literal: &str) -> Result<u32> {
    let (digits, base) = match literal.as_bytes() {
        [b'0', b'b', rest @ ..] if !rest.is_empty() => (&literal[2..], 2),
        [b'0', b'x', rest @ ..] if !rest.is_empty() => (&literal[2..], 16),
        _ => (literal, 10),
    };

    u32::from_str_radix(digits, base).map_err(|_| WireError::InvalidNumber {
        literal: literal.to_string(),
    })
}

/// Parse a declarative numeric literal and keep the low eight bits.
///
/// Header and data byte positions only carry a byte; values wider than
/// eight bits are truncated to their low byte.
///
/// # Errors
///
/// `WireError::InvalidNumber` as for [`parse_uint`].
pub fn parse_byte(literal: &str) -> Result<u8> {
    parse_uint(literal).map(|v| v as u8)
}
