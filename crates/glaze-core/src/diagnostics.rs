//! Per-session diagnostics.
//!
//! The codec never logs through global state. Every parse or emit call is
//! handed a [`DiagnosticSink`]; hosts choose whether messages go to
//! `tracing`, into a buffer shown to the user, or nowhere.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic, from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Debug,
    Info,
    /// Timing output from [`Profiler`].
    Profile,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Profile => "PROFILE",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

/// One message raised while processing a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Field path the message refers to, if any.
    pub path: Option<String>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {} ({})", self.severity, self.message, path),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Receiver of diagnostics for one session.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

/// Convenience methods usable on `dyn DiagnosticSink`.
impl dyn DiagnosticSink + '_ {
    pub fn debug(&mut self, message: impl Into<String>) {
        self.log(Severity::Debug, message, None);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(Severity::Info, message, None);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.log(Severity::Warning, message, None);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(Severity::Error, message, None);
    }

    /// Emit a warning attached to a field path.
    pub fn warning_at(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.log(Severity::Warning, message, Some(path.into()));
    }

    pub fn log(&mut self, severity: Severity, message: impl Into<String>, path: Option<String>) {
        self.emit(Diagnostic {
            severity,
            message: message.into(),
            path,
        });
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&mut self, _diagnostic: Diagnostic) {}
}

/// Collects diagnostics in memory, e.g. for display after an import.
#[derive(Debug, Clone)]
pub struct MemorySink {
    minimum: Severity,
    messages: Vec<Diagnostic>,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySink {
    /// Keep every message.
    pub fn new() -> Self {
        Self::with_minimum(Severity::Debug)
    }

    /// Keep messages at or above `minimum`.
    pub fn with_minimum(minimum: Severity) -> Self {
        Self {
            minimum,
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[Diagnostic] {
        &self.messages
    }

    /// Messages of exactly one severity.
    pub fn of(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter().filter(move |d| d.severity == severity)
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|d| d.severity >= Severity::Error)
    }

    /// Take the buffered messages, leaving the sink empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.messages)
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity >= self.minimum {
            self.messages.push(diagnostic);
        }
    }
}

/// Forwards diagnostics to `tracing` under the `glaze` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, d: Diagnostic) {
        let path = d.path.as_deref().unwrap_or("");
        match d.severity {
            Severity::Debug => tracing::debug!(target: "glaze", path, "{}", d.message),
            Severity::Info => tracing::info!(target: "glaze", path, "{}", d.message),
            Severity::Profile => tracing::info!(target: "glaze::profile", path, "{}", d.message),
            Severity::Warning => tracing::warn!(target: "glaze", path, "{}", d.message),
            Severity::Error | Severity::Critical => {
                tracing::error!(target: "glaze", path, "{}", d.message)
            }
        }
    }
}

/// Measures the time between paired `start`/`end` calls.
///
/// Only one measurement runs at a time. Misuse is reported to the sink
/// instead of panicking.
#[derive(Debug, Default)]
pub struct Profiler {
    started: Option<Instant>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn start(&mut self, sink: &mut dyn DiagnosticSink) {
        if self.started.is_some() {
            sink.error("profiler already started");
            return;
        }
        self.started = Some(Instant::now());
    }

    /// Stop the running measurement and emit its duration.
    ///
    /// Returns the elapsed seconds, or `None` if nothing was running.
    pub fn end(&mut self, label: &str, sink: &mut dyn DiagnosticSink) -> Option<f64> {
        let Some(started) = self.started.take() else {
            sink.error("profiler not started");
            return None;
        };
        let delta = started.elapsed().as_secs_f64();
        sink.log(
            Severity::Profile,
            format!("Delta time: {delta} ({label})"),
            None,
        );
        Some(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_filters_by_minimum() {
        let mut sink = MemorySink::with_minimum(Severity::Warning);
        {
            let dyn_sink: &mut dyn DiagnosticSink = &mut sink;
            dyn_sink.info("ignored");
            dyn_sink.warning_at("nodes[0]", "kept");
        }
        assert_eq!(sink.messages().len(), 1);
        assert_eq!(sink.messages()[0].path.as_deref(), Some("nodes[0]"));
        assert!(!sink.has_errors());
    }

    #[test]
    fn test_profiler_pairs() {
        let mut sink = MemorySink::new();
        let mut profiler = Profiler::new();
        profiler.start(&mut sink);
        assert!(profiler.is_running());
        let delta = profiler.end("decode", &mut sink);
        assert!(delta.is_some());
        let profile: Vec<_> = sink.of(Severity::Profile).collect();
        assert_eq!(profile.len(), 1);
        assert!(profile[0].message.ends_with("(decode)"));
    }

    #[test]
    fn test_profiler_misuse_is_reported() {
        let mut sink = MemorySink::new();
        let mut profiler = Profiler::new();
        assert_eq!(profiler.end("nothing", &mut sink), None);
        profiler.start(&mut sink);
        profiler.start(&mut sink);
        assert_eq!(sink.of(Severity::Error).count(), 2);
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Profile > Severity::Info);
        assert!(Severity::Critical > Severity::Error);
        assert_eq!(Severity::Warning.to_string(), "WARNING");
    }
}
