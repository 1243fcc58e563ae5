use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::context::{Invocation, JobRequest};

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue is full ({0} pending)")]
    Full(usize),
}

/// Handle jobs use to enqueue follow-up work. Each accepted request becomes
/// a new invocation with its own id and enqueue time.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, request: JobRequest) -> Result<Invocation, QueueError>;
}

/// In-process FIFO queue.
pub struct MemoryQueue {
    pending: Mutex<VecDeque<Invocation>>,
    capacity: Option<usize>,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            capacity: None,
        }
    }

    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            capacity: Some(capacity),
        }
    }

    // Critical sections are single VecDeque calls; poisoning is recovered.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Invocation>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Oldest pending invocation, if any.
    pub fn dequeue(&self) -> Option<Invocation> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, request: JobRequest) -> Result<Invocation, QueueError> {
        let mut pending = self.lock();
        if let Some(cap) = self.capacity {
            if pending.len() >= cap {
                return Err(QueueError::Full(pending.len()));
            }
        }
        let invocation = Invocation::for_request(request);
        pending.push_back(invocation.clone());
        Ok(invocation)
    }
}
