use async_trait::async_trait;
use std::sync::{Arc, LazyLock};
use url::Url;

use crate::binder::{BindingError, Bindings};
use crate::context::{Invocation, InvocationContext};
use crate::job::{Job, JobError};
use crate::params::Parameters;

/// Failure raised by a [`MockJob`] configured with [`MockJob::failing`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MockFailure(pub String);

/// Mock job for testing. Declares one plain string field and one converted
/// URL field, records the invocation it ran under, and either completes or
/// fails with a preset error.
#[derive(Debug, Default)]
pub struct MockJob {
    pub test_parameter: String,
    pub convert_value: Option<Url>,
    fail_with: Option<JobError>,
    invocation: Option<Arc<Invocation>>,
    executions: usize,
}

static FIELDS: LazyLock<Bindings<MockJob>> = LazyLock::new(|| {
    Bindings::new()
        .field("TestParameter", |job: &mut MockJob, v: String| {
            job.test_parameter = v
        })
        .field_with("ConvertValue", to_test_url, |job: &mut MockJob, v: Url| {
            job.convert_value = Some(v)
        })
});

/// Converter used by `ConvertValue`: prefixes the raw value with a fixed base.
pub fn to_test_url(raw: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("http://it.was.a.string/{raw}"))
}

impl MockJob {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with a [`MockFailure`] carrying `message`.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self::failing_with(MockFailure(message.to_string()))
    }

    /// Fails with exactly this error object.
    #[must_use]
    pub fn failing_with(error: impl Into<JobError>) -> Self {
        Self {
            fail_with: Some(error.into()),
            ..Self::default()
        }
    }

    /// Invocation observed during the last execution.
    pub fn invocation(&self) -> Option<&Arc<Invocation>> {
        self.invocation.as_ref()
    }

    pub fn executions(&self) -> usize {
        self.executions
    }
}

#[async_trait]
impl Job for MockJob {
    fn bind(&mut self, params: &Parameters) -> Result<usize, BindingError> {
        FIELDS.bind(self, params)
    }

    async fn execute(&mut self, ctx: &InvocationContext) -> Result<(), JobError> {
        self.executions += 1;
        self.invocation = Some(ctx.invocation().clone());
        match self.fail_with.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
