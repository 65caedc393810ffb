//! Evaluator sandbox contract and result records.
//!
//! The engine never interprets parse scripts itself; it drives an
//! [`Evaluator`] through a fixed set of operations and copies the results
//! out. Any implementation satisfying this trait works: an embedded
//! interpreter, a WASM host, a rule table. The harness crate ships a
//! deterministic reference implementation for tests.
//!
//! # Contract
//!
//! For each script invocation the driver performs, in order:
//!
//! 1. [`Evaluator::clear_all_data`] to reset result lists and staged data
//! 2. [`Evaluator::add_list_databytes`] (separate mode) or one
//!    [`Evaluator::add_msg_data`] call per message (combined mode)
//! 3. [`Evaluator::invoke`] with the parameter's script handle
//! 4. [`Evaluator::num_data`] and [`Evaluator::lit_data`] to harvest
//!
//! Scripts see the staged bytes through their accessor vocabulary:
//! `BYTE(b)` in separate mode, `REQ(n).DATA(k).BYTE(b)` in combined mode.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable handle to a script registered with the evaluator sandbox.
///
/// Handles are issued by [`Evaluator::register`] at catalog load and stay
/// valid for the evaluator's lifetime; scripts are never unloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptHandle(usize);

impl ScriptHandle {
    /// Wrap a registry index.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// The registry index backing this handle.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A numerical quantity produced by a parse script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericalValue {
    /// What the quantity measures, e.g. `"Engine RPM"`.
    pub property: String,
    /// Unit label, e.g. `"rpm"`.
    pub units: String,
    /// Lower bound of the value's valid range.
    pub min: f64,
    /// Upper bound of the value's valid range.
    pub max: f64,
    /// The computed value.
    pub value: f64,
}

/// A literal property produced by a parse script: a boolean selecting one
/// of two renderings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralValue {
    /// What the property describes, e.g. `"Fuel System Status"`.
    pub property: String,
    /// Which rendering applies.
    pub value: bool,
    /// Rendering when `value` is true.
    pub value_if_true: String,
    /// Rendering when `value` is false.
    pub value_if_false: String,
}

impl LiteralValue {
    /// The rendering selected by `value`.
    #[must_use]
    pub fn display_value(&self) -> &str {
        if self.value {
            &self.value_if_true
        } else {
            &self.value_if_false
        }
    }
}

/// Parsed results for one script invocation.
///
/// Separate-mode parsing yields one of these per cleaned reply; combined
/// mode yields exactly one per parameter frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedData {
    /// Name of the parameter that was parsed.
    pub parameter: String,
    /// Catalog address the parameter was resolved under.
    pub address: String,
    /// Numerical results in evaluator order.
    pub numerical: Vec<NumericalValue>,
    /// Literal results in evaluator order. Separate-mode records carry a
    /// trailing synthetic `"Source Address"` literal whose true-rendering
    /// is the reply's header bytes in hex.
    pub literal: Vec<LiteralValue>,
}

/// Error reported by an evaluator sandbox.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EvalError {
    /// Human-readable description of the failure.
    message: String,
}

impl EvalError {
    /// Create an error from a description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The sandbox contract the parse driver drives.
///
/// One evaluator instance is owned by one engine; implementations need no
/// internal synchronization. See the module docs for the call sequence.
pub trait Evaluator {
    /// Register a script body under a stable key
    /// (`spec:address:parameter:protocols`), returning its handle.
    ///
    /// Called once per script at catalog load; scripts are never
    /// unregistered.
    ///
    /// # Errors
    ///
    /// Implementations reject bodies they cannot compile.
    fn register(&mut self, key: &str, body: &str) -> Result<ScriptHandle, EvalError>;

    /// Reset both result lists and any staged data.
    fn clear_all_data(&mut self);

    /// Install the current reply data for separate-mode parsing.
    fn add_list_databytes(&mut self, data: &[Vec<u8>]);

    /// Append one message's cleaned headers and data for combined-mode
    /// parsing. `headers` and `data` are parallel lists.
    fn add_msg_data(&mut self, headers: &[Vec<u8>], data: &[Vec<u8>]);

    /// Run a registered script as a zero-argument function against the
    /// staged data.
    ///
    /// # Errors
    ///
    /// Whatever the sandbox signals: unknown handle, out-of-range byte
    /// access, arithmetic failure.
    fn invoke(&mut self, script: ScriptHandle) -> Result<(), EvalError>;

    /// Numerical results published by the last invocation(s).
    fn num_data(&self) -> Vec<NumericalValue>;

    /// Literal results published by the last invocation(s).
    fn lit_data(&self) -> Vec<LiteralValue>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_display_follows_value() {
        let lit = LiteralValue {
            property: "Fuel System Status".to_string(),
            value: true,
            value_if_true: "Closed loop".to_string(),
            value_if_false: "Open loop".to_string(),
        };
        assert_eq!(lit.display_value(), "Closed loop");

        let lit = LiteralValue { value: false, ..lit };
        assert_eq!(lit.display_value(), "Open loop");
    }
}
