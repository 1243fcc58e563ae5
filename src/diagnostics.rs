use std::fmt;
use tracing::{debug, error, info, warn};

/// Named trace-source lookup.
pub trait Diagnostics: Send + Sync {
    fn source(&self, name: &str) -> TraceSource;
}

/// Emits `tracing` events tagged with the source they came from. A
/// disabled source drops everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSource {
    name: String,
    enabled: bool,
}

impl TraceSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }

    /// Source that swallows every event.
    pub fn null(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn debug(&self, message: impl fmt::Display) {
        if self.enabled {
            debug!(source = %self.name, "{message}");
        }
    }

    pub fn info(&self, message: impl fmt::Display) {
        if self.enabled {
            info!(source = %self.name, "{message}");
        }
    }

    pub fn warn(&self, message: impl fmt::Display) {
        if self.enabled {
            warn!(source = %self.name, "{message}");
        }
    }

    pub fn error(&self, message: impl fmt::Display) {
        if self.enabled {
            error!(source = %self.name, "{message}");
        }
    }
}

/// Hands out enabled sources backed by the global `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn source(&self, name: &str) -> TraceSource {
        TraceSource::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_diagnostics_names_sources() {
        let source = TracingDiagnostics.source("PackageDownloadsReportQuery");
        assert_eq!(source.name(), "PackageDownloadsReportQuery");
        assert!(source.is_enabled());
    }

    #[test]
    fn null_source_is_disabled() {
        let source = TraceSource::null("quiet");
        assert!(!source.is_enabled());
        source.error("dropped");
    }

    #[test]
    fn sources_share_one_shape() {
        let source = TraceSource::new("ReportLoader");
        assert_eq!(source, TracingDiagnostics.source("ReportLoader"));
        source.info(format_args!("read {} bytes", 12));
        TraceSource::null("ReportLoader").info("dropped");
    }
}
