//! Error types for the protocol engine.
//!
//! Per-frame problems (header mismatch, prefix mismatch) are not errors:
//! they are recovered by dropping the frame and recorded in the engine's
//! diagnostics log. Everything here aborts the current `build` or `parse`
//! call.

use thiserror::Error;

use crate::eval::EvalError;

/// Convenience alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;

/// The catalog level at which a lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupLevel {
    /// No spec with the requested name.
    Spec,
    /// No protocol with the requested name under the spec.
    Protocol,
    /// No address with the requested name under the protocol.
    Address,
    /// No parameter group attached to the address.
    ParameterGroup,
    /// No parameter with the requested name in the group.
    Parameter,
}

impl std::fmt::Display for LookupLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Spec => "spec",
            Self::Protocol => "protocol",
            Self::Address => "address",
            Self::ParameterGroup => "parameter group",
            Self::Parameter => "parameter",
        };
        f.write_str(label)
    }
}

/// Errors surfaced by [`crate::engine::Engine`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A catalog lookup failed; reports the first level that was missing.
    #[error("could not find {level} {name:?} in catalog")]
    CatalogLookup {
        /// Tree level that did not resolve.
        level: LookupLevel,
        /// The name that was looked up at that level.
        name: String,
    },

    /// The protocol name matched no known classifier.
    #[error("unsupported protocol {name:?}")]
    UnsupportedProtocol {
        /// The protocol name as written in the catalog.
        name: String,
    },

    /// A declarative header attribute was missing where required or was
    /// not parseable as an integer.
    #[error("{protocol}: malformed header: {detail}")]
    MalformedHeader {
        /// Human-readable protocol family label.
        protocol: &'static str,
        /// What was missing or unparseable.
        detail: String,
    },

    /// Request/response data attributes were inconsistent or unparseable.
    #[error("parameter {name:?}: malformed request data: {detail}")]
    MalformedData {
        /// Parameter whose declaration is broken.
        name: String,
        /// What was inconsistent or unparseable.
        detail: String,
    },

    /// An ISO 14230 payload exceeded what its length encoding can carry.
    #[error("payload length {len} exceeds ISO 14230 limit of {max} bytes")]
    LengthOverflow {
        /// Actual payload length in bytes.
        len: usize,
        /// Maximum length the active encoding can express.
        max: usize,
    },

    /// After cleaning, a message retained no valid reply at all.
    #[error("no valid frames remained after cleaning response data")]
    NoValidFrames,

    /// No evaluator script is bound to the resolved parameter, or the
    /// frame was never built.
    #[error("no parse script bound for {key:?}")]
    ScriptUnbound {
        /// `spec:address:parameter` identifying the parameter.
        key: String,
    },

    /// The evaluator sandbox reported a failure.
    #[error("evaluator failure: {0}")]
    Evaluator(String),
}

impl From<EvalError> for EngineError {
    fn from(err: EvalError) -> Self {
        Self::Evaluator(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_error_names_the_level() {
        let err = EngineError::CatalogLookup {
            level: LookupLevel::ParameterGroup,
            name: "Default".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "could not find parameter group \"Default\" in catalog"
        );
    }

    #[test]
    fn eval_errors_convert() {
        let err: EngineError = EvalError::new("division by zero").into();
        assert_eq!(err.to_string(), "evaluator failure: division by zero");
    }
}
