//! Reference evaluator implementing the sandbox contract.
//!
//! Compiles each registered script with [`crate::expr`] and executes it
//! against the data staged by the parse driver. Everything is
//! deterministic and synchronous, which is exactly what integration tests
//! want from an evaluator.

use obdframe_core::eval::{EvalError, Evaluator, LiteralValue, NumericalValue, ScriptHandle};

use crate::expr::{Script, Staged, StagedMessage};

/// Deterministic evaluator sandbox for tests.
#[derive(Debug, Default)]
pub struct SimEvaluator {
    scripts: Vec<Script>,
    keys: Vec<String>,
    staged: Staged,
    num_out: Vec<NumericalValue>,
    lit_out: Vec<LiteralValue>,
}

impl SimEvaluator {
    /// Create an empty sandbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registration key of a handle, if known. Handy for asserting which
    /// script a parameter resolved to.
    #[must_use]
    pub fn key_of(&self, script: ScriptHandle) -> Option<&str> {
        self.keys.get(script.index()).map(String::as_str)
    }
}

impl Evaluator for SimEvaluator {
    fn register(&mut self, key: &str, body: &str) -> Result<ScriptHandle, EvalError> {
        let script = Script::parse(body)
            .map_err(|err| EvalError::new(format!("script {key:?}: {err}")))?;
        self.scripts.push(script);
        self.keys.push(key.to_string());
        Ok(ScriptHandle::new(self.scripts.len() - 1))
    }

    fn clear_all_data(&mut self) {
        self.staged = Staged::default();
        self.num_out.clear();
        self.lit_out.clear();
    }

    fn add_list_databytes(&mut self, data: &[Vec<u8>]) {
        self.staged.separate = data.to_vec();
    }

    fn add_msg_data(&mut self, headers: &[Vec<u8>], data: &[Vec<u8>]) {
        self.staged.combined.push(StagedMessage {
            headers: headers.to_vec(),
            data: data.to_vec(),
        });
    }

    fn invoke(&mut self, script: ScriptHandle) -> Result<(), EvalError> {
        let script = self
            .scripts
            .get(script.index())
            .ok_or_else(|| EvalError::new("unknown script handle"))?;
        let (numerical, literal) = script.run(&self.staged)?;
        self.num_out.extend(numerical);
        self.lit_out.extend(literal);
        Ok(())
    }

    fn num_data(&self) -> Vec<NumericalValue> {
        self.num_out.clone()
    }

    fn lit_data(&self) -> Vec<LiteralValue> {
        self.lit_out.clone()
    }
}
