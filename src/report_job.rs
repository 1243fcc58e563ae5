use async_trait::async_trait;
use std::sync::{Arc, LazyLock};
use tracing::info;

use crate::binder::{BindingError, Bindings};
use crate::context::InvocationContext;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::job::{Job, JobError};
use crate::params::Parameters;
use crate::report::{JsonReportParser, ReportLoader};
use crate::storage::{FileStorage, LocalFileStorage};

#[derive(Debug, thiserror::Error)]
pub enum ReportJobError {
    #[error("missing required parameter: ReportName")]
    MissingReportName,

    #[error("no report storage configured")]
    NoStorage,
}

/// Loads a JSON report by name and keeps the parsed document.
///
/// An absent report is not a failure: the job completes with no report.
/// Storage comes from [`ReportJob::with_storage`] or, failing that, the
/// configured `storage_root`.
#[derive(Default)]
pub struct ReportJob {
    pub report_name: String,
    pub report: Option<serde_json::Value>,
    storage: Option<Arc<dyn FileStorage>>,
}

static FIELDS: LazyLock<Bindings<ReportJob>> = LazyLock::new(|| {
    Bindings::new().field("ReportName", |job: &mut ReportJob, v: String| {
        job.report_name = v
    })
});

impl ReportJob {
    pub const JOB_TYPE: &'static str = "report";

    #[must_use]
    pub fn with_storage(storage: Arc<dyn FileStorage>) -> Self {
        Self {
            storage: Some(storage),
            ..Self::default()
        }
    }

    fn storage(&self, ctx: &InvocationContext) -> Option<Arc<dyn FileStorage>> {
        self.storage.clone().or_else(|| {
            ctx.config()
                .storage_root
                .as_ref()
                .map(|root| Arc::new(LocalFileStorage::new(root)) as Arc<dyn FileStorage>)
        })
    }
}

#[async_trait]
impl Job for ReportJob {
    fn bind(&mut self, params: &Parameters) -> Result<usize, BindingError> {
        FIELDS.bind(self, params)
    }

    async fn execute(&mut self, ctx: &InvocationContext) -> Result<(), JobError> {
        if self.report_name.is_empty() {
            return Err(ReportJobError::MissingReportName.into());
        }
        let storage = self.storage(ctx).ok_or(ReportJobError::NoStorage)?;
        let config = ctx.config();
        let diagnostics: Arc<dyn Diagnostics> = Arc::new(TracingDiagnostics);
        let loader = ReportLoader::new(storage, Some(diagnostics), self.report_name.clone())
            .with_location(config.report_container.clone(), config.report_namespace.clone());

        self.report = loader
            .load(&JsonReportParser::<serde_json::Value>::new())
            .await?;
        match &self.report {
            Some(report) => info!(
                report = loader.report_name(),
                bytes = report.to_string().len(),
                "report loaded"
            ),
            None => info!(
                report = loader.report_name(),
                container = loader.container(),
                key = %loader.key(),
                "report absent"
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::context::{Invocation, JobRequest};
    use crate::report::ReportError;
    use crate::storage::MemoryFileStorage;

    fn ctx(params: &[(&str, &str)], config: ServiceConfig) -> InvocationContext {
        InvocationContext::new(
            Arc::new(Invocation::for_request(JobRequest::new(
                ReportJob::JOB_TYPE,
                "stats",
                params.iter().copied().collect(),
            ))),
            Arc::new(config),
            None,
            None,
        )
    }

    #[tokio::test]
    async fn loads_named_report() {
        let storage = Arc::new(MemoryFileStorage::new());
        storage.put("stats", "popularity/recentpopularity.json", r#"{"top":["serde"]}"#);

        let mut job = ReportJob::with_storage(storage);
        let result = job
            .invoke(&ctx(&[("ReportName", "RecentPopularity")], ServiceConfig::default()))
            .await;
        assert!(result.is_completed(), "{:?}", result.fault());
        assert_eq!(job.report, Some(serde_json::json!({"top": ["serde"]})));
    }

    #[tokio::test]
    async fn absent_report_completes_empty() {
        let mut job = ReportJob::with_storage(Arc::new(MemoryFileStorage::new()));
        let result = job
            .invoke(&ctx(&[("ReportName", "Nothing")], ServiceConfig::default()))
            .await;
        assert!(result.is_completed());
        assert!(job.report.is_none());
    }

    #[tokio::test]
    async fn malformed_report_faults() {
        let storage = Arc::new(MemoryFileStorage::new());
        storage.put("stats", "popularity/bad.json", "{");
        let result = ReportJob::with_storage(storage)
            .invoke(&ctx(&[("ReportName", "Bad")], ServiceConfig::default()))
            .await;
        assert!(matches!(
            result.fault().and_then(|f| f.downcast_ref::<ReportError>()),
            Some(ReportError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn falls_back_to_configured_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("stats/popularity")).unwrap();
        std::fs::write(dir.path().join("stats/popularity/weekly.json"), "[1]").unwrap();
        let config = ServiceConfig {
            storage_root: Some(dir.path().to_path_buf()),
            ..ServiceConfig::default()
        };

        let mut job = ReportJob::default();
        job.invoke(&ctx(&[("ReportName", "Weekly")], config)).await;
        assert_eq!(job.report, Some(serde_json::json!([1])));
    }

    #[tokio::test]
    async fn without_storage_faults() {
        let result = ReportJob::default()
            .invoke(&ctx(&[("ReportName", "x")], ServiceConfig::default()))
            .await;
        assert!(matches!(
            result.fault().and_then(|f| f.downcast_ref::<ReportJobError>()),
            Some(ReportJobError::NoStorage)
        ));
    }
}
