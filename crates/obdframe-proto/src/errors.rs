//! Error types for the wire-level vocabulary.
//!
//! These errors cover the two places where declarative input meets byte
//! encoding: numeric literals written in a catalog, and length fields that
//! must fit the framing they are encoded into. Anything richer (catalog
//! lookups, evaluator failures) belongs to the engine crate.

use thiserror::Error;

/// Convenience alias for wire-level results.
pub type Result<T> = std::result::Result<T, WireError>;

/// Errors raised while interpreting declarative byte values or encoding
/// link-level framing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// A numeric literal could not be parsed in its selected base.
    #[error("invalid numeric literal {literal:?}")]
    InvalidNumber {
        /// The offending literal as written.
        literal: String,
    },

    /// A protocol name matched no known classifier.
    #[error("unsupported protocol {name:?}")]
    UnsupportedProtocol {
        /// The protocol name as written.
        name: String,
    },

    /// An ISO 14230 payload exceeded what its length encoding can carry.
    #[error("payload length {len} exceeds ISO 14230 limit of {max} bytes")]
    LengthOverflow {
        /// Actual payload length in bytes.
        len: usize,
        /// Maximum length the active encoding can express.
        max: usize,
    },
}
