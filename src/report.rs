//! Report loading: fetch a stored JSON report by name and parse it.
//!
//! Reports live at `<container>/<namespace>/<lowercase name>.json`. A
//! missing report is `None`, which callers branch on; it is never an error.

use serde::de::DeserializeOwned;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

use crate::diagnostics::{Diagnostics, TraceSource};
use crate::storage::{ContentStream, FileStorage, StorageError};

pub const DEFAULT_CONTAINER: &str = "stats";
pub const DEFAULT_NAMESPACE: &str = "popularity";

const TRACE_SOURCE: &str = "ReportLoader";

/// `<namespace>/<lowercase report name>.json`
pub fn report_key(namespace: &str, report_name: &str) -> String {
    format!("{namespace}/{}.json", report_name.to_lowercase())
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("reading report: {0}")]
    Read(#[from] std::io::Error),

    #[error("parsing report '{name}': {reason}")]
    Parse { name: String, reason: String },
}

/// Turns drained report content into a typed report.
pub trait ReportParser {
    type Report;

    fn parse(
        &self,
        trace: &TraceSource,
        report_name: &str,
        content: &str,
    ) -> Result<Self::Report, ReportError>;
}

/// Deserializes the whole report as JSON into `T`.
pub struct JsonReportParser<T> {
    _report: PhantomData<fn() -> T>,
}

impl<T> JsonReportParser<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _report: PhantomData,
        }
    }
}

impl<T> Default for JsonReportParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> ReportParser for JsonReportParser<T> {
    type Report = T;

    fn parse(&self, trace: &TraceSource, report_name: &str, content: &str) -> Result<T, ReportError> {
        serde_json::from_str(content).map_err(|e| {
            trace.warn(format_args!("report '{report_name}' is not valid JSON: {e}"));
            ReportError::Parse {
                name: report_name.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

/// Loads one named report from file storage.
///
/// Two loaders are equal when they share the same storage handle, the same
/// diagnostics handle (or both have none), and report names that differ at
/// most in case. That makes a loader usable as a memoization key.
#[derive(Clone)]
pub struct ReportLoader {
    storage: Arc<dyn FileStorage>,
    diagnostics: Option<Arc<dyn Diagnostics>>,
    report_name: String,
    container: String,
    namespace: String,
}

impl ReportLoader {
    pub fn new(
        storage: Arc<dyn FileStorage>,
        diagnostics: Option<Arc<dyn Diagnostics>>,
        report_name: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            diagnostics,
            report_name: report_name.into(),
            container: DEFAULT_CONTAINER.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    #[must_use]
    pub fn with_location(mut self, container: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.container = container.into();
        self.namespace = namespace.into();
        self
    }

    pub fn report_name(&self) -> &str {
        &self.report_name
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn key(&self) -> String {
        report_key(&self.namespace, &self.report_name)
    }

    fn trace(&self) -> TraceSource {
        match &self.diagnostics {
            Some(d) => d.source(TRACE_SOURCE),
            None => TraceSource::null(TRACE_SOURCE),
        }
    }

    /// Raw content stream, or `None` if no such report exists.
    pub async fn fetch(&self) -> Result<Option<ContentStream>, StorageError> {
        self.storage.get_file(&self.container, &self.key()).await
    }

    /// Fetch, drain, and parse. `Ok(None)` when the report is absent.
    pub async fn load<P: ReportParser>(&self, parser: &P) -> Result<Option<P::Report>, ReportError> {
        let trace = self.trace();
        let key = self.key();

        let Some(mut stream) = self.fetch().await? else {
            trace.debug(format_args!("report {}/{key} not found", self.container));
            return Ok(None);
        };

        let mut content = String::new();
        stream.read_to_string(&mut content).await?;
        drop(stream);
        trace.info(format_args!(
            "read report {}/{key} ({} bytes)",
            self.container,
            content.len()
        ));

        parser.parse(&trace, &self.report_name, &content).map(Some)
    }
}

fn thin_ptr<T: ?Sized>(arc: &Arc<T>) -> *const () {
    Arc::as_ptr(arc).cast::<()>()
}

impl PartialEq for ReportLoader {
    fn eq(&self, other: &Self) -> bool {
        thin_ptr(&self.storage) == thin_ptr(&other.storage)
            && self.diagnostics.as_ref().map(thin_ptr) == other.diagnostics.as_ref().map(thin_ptr)
            && self.report_name.to_lowercase() == other.report_name.to_lowercase()
    }
}

impl Eq for ReportLoader {}

impl Hash for ReportLoader {
    fn hash<H: Hasher>(&self, state: &mut H) {
        thin_ptr(&self.storage).hash(state);
        self.diagnostics.as_ref().map(thin_ptr).hash(state);
        self.report_name.to_lowercase().hash(state);
    }
}

impl fmt::Debug for ReportLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportLoader")
            .field("report_name", &self.report_name)
            .field("container", &self.container)
            .field("namespace", &self.namespace)
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}
