//! Raw frames, cleaned messages, and response acceptance checks.
//!
//! A [`RawFrame`] is one contiguous byte sequence `[header ‖ data]` exactly
//! as delivered by the transport (checksums and trailers already removed).
//! A [`CleanedMessage`] is the result of splitting, validating, and
//! stripping a reply; the two are distinct types on purpose so a frame can
//! never masquerade as an assembled message.

/// One received frame: `[header bytes ‖ data bytes]`.
///
/// The header length is not knowable from the frame alone; it depends on
/// the link protocol (and, for ISO 14230, on the frame's own format byte),
/// so splitting is always driven by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Vec<u8>,
}

impl RawFrame {
    /// Wrap received bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// The frame's bytes, header included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total byte count, header included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the frame carries no bytes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Split into `(header, data)` at `header_len`.
    ///
    /// Returns `None` when the frame is shorter than the requested header,
    /// which callers treat as a per-frame rejection.
    #[must_use]
    pub fn split(&self, header_len: usize) -> Option<(&[u8], &[u8])> {
        if self.bytes.len() < header_len {
            return None;
        }
        Some(self.bytes.split_at(header_len))
    }
}

impl From<Vec<u8>> for RawFrame {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for RawFrame {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

/// One accepted logical reply: validated header plus payload with any
/// transport PCI bytes and declared prefix already removed.
///
/// Unlike a [`RawFrame`], a cleaned message may have been assembled from
/// several frames (ISO 15765 multi-frame transport).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedMessage {
    /// Header bytes of the frame (or first frame) that carried the reply.
    pub header: Vec<u8>,
    /// Payload bytes after PCI and prefix removal.
    pub data: Vec<u8>,
}

/// Masked header compare.
///
/// Byte `i` matches iff `(got[i] & mask[i]) == (expected[i] & mask[i])`;
/// a zero mask byte therefore accepts any value at that position. Returns
/// `false` when `got` is shorter than the template.
///
/// `expected` and `mask` must be the same length; builders uphold this.
#[must_use]
pub fn mask_match(expected: &[u8], mask: &[u8], got: &[u8]) -> bool {
    debug_assert_eq!(expected.len(), mask.len());

    if got.len() < expected.len() {
        return false;
    }
    expected
        .iter()
        .zip(mask)
        .zip(got)
        .all(|((&e, &m), &g)| g & m == e & m)
}

/// Check that `prefix` matches the front of `data` in full, then strip it.
///
/// The prefix must match completely before any byte is consumed; on a
/// mismatch `data` is left untouched and `false` is returned so the caller
/// can reject the frame unchanged.
pub fn strip_prefix(prefix: &[u8], data: &mut Vec<u8>) -> bool {
    if data.len() < prefix.len() || &data[..prefix.len()] != prefix {
        return false;
    }
    data.drain(..prefix.len());
    true
}
