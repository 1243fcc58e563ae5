use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::context::InvocationId;

/// Lifecycle stage reported to a monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "lowercase")]
pub enum Stage {
    Started,
    Completed,
    Faulted { kind: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorEvent {
    pub invocation_id: InvocationId,
    pub job_type: String,
    pub job_name: String,
    #[serde(flatten)]
    pub stage: Stage,
    pub at: DateTime<Utc>,
}

/// Sink for invocation lifecycle events. The runner records `Started` and
/// a terminal stage for every invocation whose context carries a monitor;
/// job bodies may record through the same handle.
pub trait Monitor: Send + Sync {
    fn record(&self, event: MonitorEvent);
}

/// In-memory monitor for tests and single-process runs.
#[derive(Default)]
pub struct MemoryMonitor {
    events: Mutex<Vec<MonitorEvent>>,
}

impl MemoryMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section is a single push or clone; poisoning is recovered.
    fn lock(&self) -> MutexGuard<'_, Vec<MonitorEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<MonitorEvent> {
        self.lock().clone()
    }

    pub fn events_for(&self, id: InvocationId) -> Vec<MonitorEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.invocation_id == id)
            .collect()
    }
}

impl Monitor for MemoryMonitor {
    fn record(&self, event: MonitorEvent) {
        self.lock().push(event);
    }
}
