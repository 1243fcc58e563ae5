use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::binder::BindingError;
use crate::job::JobError;

/// Terminal outcome of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Completed,
    Faulted,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Faulted => "faulted",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an invocation faulted. Execution failures keep the error object the
/// job returned, so callers can downcast to the original type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Fault {
    #[error("binding failed: {0}")]
    Binding(#[from] BindingError),

    #[error("{0}")]
    Execution(Arc<dyn Error + Send + Sync + 'static>),

    #[error("job panicked: {0}")]
    Panicked(String),

    #[error("no job registered for type '{0}'")]
    UnknownJobType(String),
}

impl Fault {
    pub fn execution(err: JobError) -> Self {
        Self::Execution(Arc::from(err))
    }

    /// The error a job body returned, if that is what faulted.
    pub fn execution_error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            Self::Execution(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.execution_error().and_then(|e| e.downcast_ref::<E>())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Binding(_) => "binding",
            Self::Execution(_) => "execution",
            Self::Panicked(_) => "panic",
            Self::UnknownJobType(_) => "unknown_job_type",
        }
    }
}

/// Immutable record of an invocation's outcome. `fault` is present exactly
/// when the status is [`JobStatus::Faulted`].
#[derive(Debug, Clone)]
pub struct JobResult {
    status: JobStatus,
    fault: Option<Fault>,
}

impl JobResult {
    #[must_use]
    pub fn completed() -> Self {
        Self {
            status: JobStatus::Completed,
            fault: None,
        }
    }

    #[must_use]
    pub fn faulted(fault: Fault) -> Self {
        Self {
            status: JobStatus::Faulted,
            fault: Some(fault),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }

    pub fn is_faulted(&self) -> bool {
        self.status == JobStatus::Faulted
    }

    pub fn into_fault(self) -> Option<Fault> {
        self.fault
    }
}

impl From<Fault> for JobResult {
    fn from(fault: Fault) -> Self {
        Self::faulted(fault)
    }
}

#[derive(Serialize)]
struct FailureWire {
    kind: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ResultWire {
    status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<FailureWire>,
}

impl Serialize for JobResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ResultWire {
            status: self.status,
            failure: self.fault.as_ref().map(|f| FailureWire {
                kind: f.kind(),
                message: f.to_string(),
            }),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, thiserror::Error)]
    #[error("boom {0}")]
    struct Boom(u8);

    #[test]
    fn completed_has_no_fault() {
        let result = JobResult::completed();
        assert_eq!(result.status(), JobStatus::Completed);
        assert!(result.fault().is_none());
    }

    #[test]
    fn faulted_keeps_original_error() {
        let result = JobResult::faulted(Fault::execution(Box::new(Boom(7))));
        assert!(result.is_faulted());
        let fault = result.fault().unwrap();
        assert_eq!(fault.downcast_ref::<Boom>(), Some(&Boom(7)));
        assert_eq!(fault.to_string(), "boom 7");
    }

    #[test]
    fn into_fault_hands_over_the_cause() {
        assert!(JobResult::completed().into_fault().is_none());

        let fault = JobResult::from(Fault::Panicked("oops".to_string()))
            .into_fault()
            .unwrap();
        assert_eq!(fault.kind(), "panic");
        assert_eq!(fault.to_string(), "job panicked: oops");
    }

    #[test]
    fn serializes_status_and_failure() {
        let ok = serde_json::to_value(JobResult::completed()).unwrap();
        assert_eq!(ok, serde_json::json!({"status": "completed"}));

        let bad = serde_json::to_value(JobResult::faulted(Fault::UnknownJobType(
            "nope".to_string(),
        )))
        .unwrap();
        assert_eq!(bad["status"], "faulted");
        assert_eq!(bad["failure"]["kind"], "unknown_job_type");
        assert_eq!(
            bad["failure"]["message"],
            "no job registered for type 'nope'"
        );
    }
}
