use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use ulid::Ulid;

use crate::config::ServiceConfig;
use crate::monitor::Monitor;
use crate::params::Parameters;
use crate::queue::JobQueue;

/// Unique identifier of one invocation (128-bit ULID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationId(Ulid);

impl InvocationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inv_{}", self.0.to_string().to_lowercase())
    }
}

/// What the dispatch source asks for: which job, under what label, with
/// which parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub job_type: String,
    pub job_name: String,
    #[serde(default)]
    pub parameters: Parameters,
}

impl JobRequest {
    pub fn new(
        job_type: impl Into<String>,
        job_name: impl Into<String>,
        parameters: Parameters,
    ) -> Self {
        Self {
            job_type: job_type.into(),
            job_name: job_name.into(),
            parameters,
        }
    }
}

/// One execution attempt of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub id: InvocationId,
    pub request: JobRequest,
    pub queued_at: DateTime<Utc>,
}

impl Invocation {
    pub fn new(id: InvocationId, request: JobRequest, queued_at: DateTime<Utc>) -> Self {
        Self {
            id,
            request,
            queued_at,
        }
    }

    /// Fresh id, queued now.
    pub fn for_request(request: JobRequest) -> Self {
        Self::new(InvocationId::new(), request, Utc::now())
    }
}

/// Everything a job body may read while it runs. Built once per attempt
/// and never mutated.
#[derive(Clone)]
pub struct InvocationContext {
    invocation: Arc<Invocation>,
    config: Arc<ServiceConfig>,
    monitor: Option<Arc<dyn Monitor>>,
    queue: Option<Arc<dyn JobQueue>>,
}

impl InvocationContext {
    pub fn new(
        invocation: Arc<Invocation>,
        config: Arc<ServiceConfig>,
        monitor: Option<Arc<dyn Monitor>>,
        queue: Option<Arc<dyn JobQueue>>,
    ) -> Self {
        Self {
            invocation,
            config,
            monitor,
            queue,
        }
    }

    pub fn invocation(&self) -> &Arc<Invocation> {
        &self.invocation
    }

    pub fn request(&self) -> &JobRequest {
        &self.invocation.request
    }

    pub fn id(&self) -> InvocationId {
        self.invocation.id
    }

    pub fn config(&self) -> &Arc<ServiceConfig> {
        &self.config
    }

    pub fn monitor(&self) -> Option<&Arc<dyn Monitor>> {
        self.monitor.as_ref()
    }

    pub fn queue(&self) -> Option<&Arc<dyn JobQueue>> {
        self.queue.as_ref()
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("invocation", &self.invocation)
            .field("config", &self.config)
            .field("monitor", &self.monitor.is_some())
            .field("queue", &self.queue.is_some())
            .finish()
    }
}
