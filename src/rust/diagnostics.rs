//! Sinks for diagnostic output produced while a model is being loaded.
//!
//! Loaders never write to stderr directly; they report through the sink the
//! caller configured on the builder. Harnesses that want silence pass a
//! [`NullSink`].

use log::Level;

pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, level: Level, message: &str);
}

/// Forwards diagnostics to the `log` facade under the `fasttext_parallel::loader` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, level: Level, message: &str) {
        log::log!(target: "fasttext_parallel::loader", level, "{}", message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _level: Level, _message: &str) {}
}
