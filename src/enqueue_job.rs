use async_trait::async_trait;
use std::sync::LazyLock;
use tracing::info;

use crate::binder::{BindingError, Bindings};
use crate::context::{InvocationContext, InvocationId, JobRequest};
use crate::job::{Job, JobError};
use crate::params::Parameters;
use crate::queue::QueueError;

#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    #[error("missing required parameter: NextJobType")]
    MissingJobType,

    #[error("no queue attached to this invocation")]
    NoQueue,

    #[error("enqueue failed: {0}")]
    Queue(#[from] QueueError),
}

/// Enqueues one follow-up request through the invocation's queue handle.
///
/// Fields: `NextJobType` (required), `NextJobName` (defaults to this
/// invocation's job name), `NextParameters` (JSON object of strings).
#[derive(Debug, Default)]
pub struct EnqueueJob {
    pub next_job_type: String,
    pub next_job_name: Option<String>,
    pub next_parameters: Parameters,
    /// Id of the follow-up invocation once accepted by the queue.
    pub enqueued: Option<InvocationId>,
}

static FIELDS: LazyLock<Bindings<EnqueueJob>> = LazyLock::new(|| {
    Bindings::new()
        .field("NextJobType", |job: &mut EnqueueJob, v: String| {
            job.next_job_type = v
        })
        .field("NextJobName", |job: &mut EnqueueJob, v: Option<String>| {
            job.next_job_name = v
        })
        .field_with(
            "NextParameters",
            |raw: &str| serde_json::from_str::<Parameters>(raw),
            |job: &mut EnqueueJob, v| job.next_parameters = v,
        )
});

impl EnqueueJob {
    pub const JOB_TYPE: &'static str = "enqueue";
}

#[async_trait]
impl Job for EnqueueJob {
    fn bind(&mut self, params: &Parameters) -> Result<usize, BindingError> {
        FIELDS.bind(self, params)
    }

    async fn execute(&mut self, ctx: &InvocationContext) -> Result<(), JobError> {
        if self.next_job_type.is_empty() {
            return Err(EnqueueError::MissingJobType.into());
        }
        let queue = ctx.queue().ok_or(EnqueueError::NoQueue)?;

        let name = self
            .next_job_name
            .clone()
            .unwrap_or_else(|| ctx.request().job_name.clone());
        let request = JobRequest::new(
            self.next_job_type.clone(),
            name,
            self.next_parameters.clone(),
        );
        let invocation = queue.enqueue(request).await.map_err(EnqueueError::from)?;
        info!(follow_up = %invocation.id, job_type = %self.next_job_type, "enqueued follow-up");
        self.enqueued = Some(invocation.id);
        Ok(())
    }
}
