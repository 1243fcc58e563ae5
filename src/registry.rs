use std::collections::HashMap;
use std::fmt;

use crate::enqueue_job::EnqueueJob;
use crate::http_job::HttpJob;
use crate::job::Job;
use crate::report_job::ReportJob;
use crate::shell_job::ShellJob;

type Factory = Box<dyn Fn() -> Box<dyn Job> + Send + Sync>;

/// Maps job type names to constructors.
///
/// Each lookup builds a new instance, so an invocation always owns its job
/// exclusively. Type names match exactly.
#[derive(Default)]
pub struct JobRegistry {
    factories: HashMap<String, Factory>,
}

impl JobRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every job type shipped in this crate.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register::<ShellJob>(ShellJob::JOB_TYPE)
            .register::<HttpJob>(HttpJob::JOB_TYPE)
            .register::<EnqueueJob>(EnqueueJob::JOB_TYPE)
            .register::<ReportJob>(ReportJob::JOB_TYPE);
        registry
    }

    /// Register a job type constructed with `Default`. Replaces any earlier
    /// registration under the same name.
    pub fn register<J>(&mut self, job_type: impl Into<String>) -> &mut Self
    where
        J: Job + Default + 'static,
    {
        self.register_with(job_type, || Box::new(J::default()))
    }

    pub fn register_with<F>(&mut self, job_type: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Job> + Send + Sync + 'static,
    {
        self.factories.insert(job_type.into(), Box::new(factory));
        self
    }

    pub fn create(&self, job_type: &str) -> Option<Box<dyn Job>> {
        self.factories.get(job_type).map(|factory| factory())
    }

    pub fn contains(&self, job_type: &str) -> bool {
        self.factories.contains_key(job_type)
    }

    /// Registered type names, sorted.
    pub fn job_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRegistry")
            .field("job_types", &self.job_types())
            .finish()
    }
}
