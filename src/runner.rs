//! Invocation boundary: bind, execute, and turn every outcome into a
//! [`JobResult`]. Nothing raised by a job (error or panic) crosses it.

use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::context::InvocationContext;
use crate::job::Job;
use crate::monitor::{MonitorEvent, Stage};
use crate::params::Parameters;
use crate::registry::JobRegistry;
use crate::result::{Fault, JobResult};

/// Run one job instance under the containment boundary.
///
/// Binding strictly precedes execution. A binding failure skips execution.
/// Errors returned by the job body are kept verbatim; panics in either phase
/// are captured with their message.
pub async fn invoke<J>(job: &mut J, ctx: &InvocationContext) -> JobResult
where
    J: Job + ?Sized,
{
    let span = invocation_span(ctx);
    async move {
        record(ctx, Stage::Started);
        let result = match bind_contained(job, &ctx.request().parameters) {
            Ok(applied) => {
                debug!(applied, "parameters bound");
                execute_contained(job, ctx).await
            }
            Err(fault) => JobResult::faulted(fault),
        };
        finish(ctx, result)
    }
    .instrument(span)
    .await
}

fn invocation_span(ctx: &InvocationContext) -> tracing::Span {
    let request = ctx.request();
    info_span!(
        "invoke",
        invocation_id = %ctx.id(),
        job_type = %request.job_type,
        job_name = %request.job_name,
    )
}

fn bind_contained<J>(job: &mut J, params: &Parameters) -> Result<usize, Fault>
where
    J: Job + ?Sized,
{
    match panic::catch_unwind(AssertUnwindSafe(|| job.bind(params))) {
        Ok(Ok(applied)) => Ok(applied),
        Ok(Err(e)) => Err(Fault::Binding(e)),
        Err(payload) => Err(Fault::Panicked(panic_message(payload.as_ref()))),
    }
}

async fn execute_contained<J>(job: &mut J, ctx: &InvocationContext) -> JobResult
where
    J: Job + ?Sized,
{
    match AssertUnwindSafe(job.execute(ctx)).catch_unwind().await {
        Ok(Ok(())) => JobResult::completed(),
        Ok(Err(e)) => JobResult::faulted(Fault::execution(e)),
        Err(payload) => JobResult::faulted(Fault::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn finish(ctx: &InvocationContext, result: JobResult) -> JobResult {
    match result.fault() {
        None => {
            info!("job completed");
            record(ctx, Stage::Completed);
        }
        Some(fault) => {
            error!(kind = fault.kind(), fault = %fault, "job faulted");
            record(
                ctx,
                Stage::Faulted {
                    kind: fault.kind().to_string(),
                    message: fault.to_string(),
                },
            );
        }
    }
    result
}

fn record(ctx: &InvocationContext, stage: Stage) {
    if let Some(monitor) = ctx.monitor() {
        let request = ctx.request();
        monitor.record(MonitorEvent {
            invocation_id: ctx.id(),
            job_type: request.job_type.clone(),
            job_name: request.job_name.clone(),
            stage,
            at: Utc::now(),
        });
    }
}

/// Resolves the request's job type through a registry and runs a fresh
/// instance for every invocation.
#[derive(Clone)]
pub struct Invoker {
    registry: Arc<JobRegistry>,
}

impl Invoker {
    pub fn new(registry: Arc<JobRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Always resolves to a result. An unregistered job type or a panicking
    /// constructor is a fault, not an error.
    pub async fn invoke(&self, ctx: &InvocationContext) -> JobResult {
        let job_type = &ctx.request().job_type;
        let created = panic::catch_unwind(AssertUnwindSafe(|| self.registry.create(job_type)));
        let fault = match created {
            Ok(Some(mut job)) => return invoke(job.as_mut(), ctx).await,
            Ok(None) => {
                invocation_span(ctx).in_scope(|| warn!("no job registered for requested type"));
                Fault::UnknownJobType(job_type.clone())
            }
            Err(payload) => Fault::Panicked(panic_message(payload.as_ref())),
        };
        invocation_span(ctx).in_scope(|| {
            record(ctx, Stage::Started);
            finish(ctx, JobResult::faulted(fault))
        })
    }
}
