//! On-board diagnostics protocol engine.
//!
//! Given a declarative parameter catalog, this crate builds the request
//! bytes needed to obtain a named parameter from a vehicle and parses the
//! raw frames that come back into structured values. Four link protocols
//! are covered: SAE J1850, ISO 9141-2, ISO 14230, and ISO 15765 with both
//! 11-bit and 29-bit identifiers including multi-frame transport.
//!
//! The engine performs no I/O and embeds no script language. Moving bytes
//! to and from the vehicle is the caller's job; converting bytes to values
//! is delegated to an [`eval::Evaluator`] the caller supplies. The crate's
//! own responsibilities are framing, addressing, masked header
//! acceptance, prefix checks, and ISO 15765 multi-frame reassembly.
//!
//! See [`engine::Engine`] for the build/parse call pattern.

pub mod catalog;
pub mod diag;
pub mod engine;
pub mod error;
pub mod eval;
pub mod message;

mod builder;
mod cleaner;
mod driver;
#[cfg(test)]
mod testutil;

pub use catalog::{Catalog, Node};
pub use diag::DiagLog;
pub use driver::SOURCE_ADDRESS_PROPERTY;
pub use engine::Engine;
pub use error::{EngineError, LookupLevel, Result};
pub use eval::{
    EvalError, Evaluator, LiteralValue, NumericalValue, ParsedData, ScriptHandle,
};
pub use message::{MessageData, ParameterFrame, ParseMode, ProtocolOptions};
