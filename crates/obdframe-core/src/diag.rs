//! Engine-scoped diagnostics log.
//!
//! Recoverable problems (rejected frames, advisory mismatches) and the
//! final message of any aborted call accumulate here as plain strings.
//! The owner drains them whenever convenient; draining clears the log, so
//! repeated drains after the same call yield nothing new. Every recorded
//! line is also emitted as a `tracing` event.

/// Accumulating diagnostics log, one engine instance each.
#[derive(Debug, Default)]
pub struct DiagLog {
    lines: Vec<String>,
}

impl DiagLog {
    /// Record a recoverable warning.
    pub(crate) fn warn(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::warn!(target: "obdframe", "{line}");
        self.lines.push(line);
    }

    /// Record the message of an error that aborted the current call.
    pub(crate) fn error(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::error!(target: "obdframe", "{line}");
        self.lines.push(line);
    }

    /// Take all accumulated lines, leaving the log empty.
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    /// Whether any lines are waiting to be drained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_is_idempotent() {
        let mut log = DiagLog::default();
        log.warn("header bytes mismatch");
        log.error("no valid frames");

        let lines = log.drain();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("header bytes mismatch"));

        assert!(log.drain().is_empty());
        assert!(log.is_empty());
    }
}
