//! Public façade over the catalog, builder, cleaner, and parse driver.
//!
//! One [`Engine`] owns one catalog and one evaluator sandbox for its whole
//! life. Everything runs synchronously on the caller's thread and nothing
//! is locked, so an engine must not be shared across threads without
//! external serialization; separate engines are fully independent.
//!
//! The call pattern is symmetric:
//!
//! ```text
//! let mut frame = ParameterFrame::new(spec, protocol, address, name);
//! engine.build(&mut frame)?;          // request bytes in frame.messages
//! /* send frame.messages[i].wire_frames(), collect replies */
//! frame.messages[i].push_raw_frame(reply);
//! let values = engine.parse(&mut frame)?;
//! ```

use crate::builder;
use crate::catalog::{Catalog, Node};
use crate::cleaner;
use crate::diag::DiagLog;
use crate::driver;
use crate::error::{EngineError, Result};
use crate::eval::{Evaluator, ParsedData};
use crate::message::ParameterFrame;

/// The protocol engine: builds requests from a catalog and parses raw
/// response frames into values.
#[derive(Debug)]
pub struct Engine<E> {
    catalog: Catalog,
    evaluator: E,
    diag: DiagLog,
}

impl<E: Evaluator> Engine<E> {
    /// Index the catalog tree and register every parse script with the
    /// evaluator.
    ///
    /// # Errors
    ///
    /// `EngineError::Evaluator` when a script body fails to register.
    pub fn new(root: &Node, mut evaluator: E) -> Result<Self> {
        let catalog = Catalog::from_node(root, &mut evaluator)?;
        Ok(Self {
            catalog,
            evaluator,
            diag: DiagLog::default(),
        })
    }

    /// Parameter names available under `(spec, protocol, address)`, in
    /// catalog order.
    ///
    /// # Errors
    ///
    /// `EngineError::CatalogLookup` naming the first missing level.
    pub fn parameter_names(
        &self,
        spec: &str,
        protocol: &str,
        address: &str,
    ) -> Result<Vec<String>> {
        self.catalog.parameter_names(spec, protocol, address)
    }

    /// Resolve the frame's parameter selection and populate its request
    /// messages: headers, payload frames, expected-response templates.
    ///
    /// # Errors
    ///
    /// Catalog lookup failures, unsupported protocol names, malformed
    /// header or data declarations, ISO 14230 length overflow, and
    /// unmatched script patterns. The error message is also recorded in
    /// the diagnostics log.
    pub fn build(&mut self, frame: &mut ParameterFrame) -> Result<()> {
        match builder::build_frame(&self.catalog, frame, &mut self.diag) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.diag.error(err.to_string());
                Err(err)
            }
        }
    }

    /// Clean the raw frames loaded into the built frame's messages, then
    /// run its parse script over the replies.
    ///
    /// # Errors
    ///
    /// `EngineError::ScriptUnbound` when the frame was never built,
    /// `EngineError::NoValidFrames` when a message retains no reply after
    /// cleaning, and `EngineError::Evaluator` when the sandbox fails. The
    /// error message is also recorded in the diagnostics log.
    pub fn parse(&mut self, frame: &mut ParameterFrame) -> Result<Vec<ParsedData>> {
        match self.parse_inner(frame) {
            Ok(results) => Ok(results),
            Err(err) => {
                self.diag.error(err.to_string());
                Err(err)
            }
        }
    }

    fn parse_inner(&mut self, frame: &mut ParameterFrame) -> Result<Vec<ParsedData>> {
        let (Some(link), Some(script)) = (frame.link(), frame.script()) else {
            return Err(EngineError::ScriptUnbound { key: frame.key() });
        };

        for msg in &mut frame.messages {
            cleaner::clean_frames(link, msg, &mut self.diag)?;
        }

        driver::parse_frame(frame, script, &mut self.evaluator)
    }

    /// Drain accumulated diagnostic lines. Draining clears the log;
    /// calling again without intervening work yields nothing.
    pub fn diagnostics(&mut self) -> Vec<String> {
        self.diag.drain()
    }
}
