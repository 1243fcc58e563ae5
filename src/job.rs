use async_trait::async_trait;

use crate::binder::BindingError;
use crate::context::InvocationContext;
use crate::params::Parameters;
use crate::result::JobResult;
use crate::runner;

/// Failure raised by a job body. Any error type can be returned; the
/// invocation boundary keeps it intact inside the faulted result.
pub type JobError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A named, parameterized unit of work.
///
/// A job instance is created per invocation. The runner first binds the
/// request parameters onto the job's configurable fields via [`Job::bind`],
/// then calls [`Job::execute`]. Callers only ever use [`Job::invoke`] (or
/// [`crate::Invoker`]), which never lets a failure escape.
///
/// Jobs with configurable fields override `bind`, typically by delegating
/// to a [`crate::Bindings`] table:
///
/// ```ignore
/// fn bind(&mut self, params: &Parameters) -> Result<usize, BindingError> {
///     FIELDS.bind(self, params)
/// }
/// ```
#[async_trait]
pub trait Job: Send {
    /// Apply request parameters to configurable fields. Returns how many
    /// fields were set. The default declares no fields.
    fn bind(&mut self, params: &Parameters) -> Result<usize, BindingError> {
        let _ = params;
        Ok(0)
    }

    /// The work itself.
    async fn execute(&mut self, ctx: &InvocationContext) -> Result<(), JobError>;

    /// Bind, execute, and capture the outcome as data.
    async fn invoke(&mut self, ctx: &InvocationContext) -> JobResult
    where
        Self: Sized,
    {
        runner::invoke(self, ctx).await
    }
}
