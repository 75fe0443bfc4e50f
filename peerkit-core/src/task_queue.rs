//! Task queues for engine subsystems
//!
//! Audio device modules need their own serial queue for device buffer work.
//! The [`TaskQueueFactory`] hands those out as dedicated execution contexts.

use crate::context::{ContextHandle, ContextKind, ExecutionContext};
use crate::error::PeerKitResult;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Creates named, started task queues
#[derive(Debug, Clone, Default)]
pub struct TaskQueueFactory {
    created: Arc<AtomicUsize>,
}

impl TaskQueueFactory {
    /// Create a new task queue factory
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new serial task queue
    pub fn create_task_queue(&self, name: &str) -> PeerKitResult<TaskQueue> {
        let context = ExecutionContext::start(name, ContextKind::Plain)?;
        self.created.fetch_add(1, Ordering::Relaxed);
        debug!(queue = %name, "Created task queue");
        Ok(TaskQueue { context })
    }

    /// Number of queues this factory (and its clones) have created
    pub fn queues_created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

/// A serial task queue backed by its own thread; stopped on drop
#[derive(Debug)]
pub struct TaskQueue {
    context: ExecutionContext,
}

impl TaskQueue {
    /// Queue name
    pub fn name(&self) -> &str {
        self.context.name()
    }

    /// Whether the queue still runs tasks
    pub fn is_running(&self) -> bool {
        self.context.is_running()
    }

    /// Non-owning handle for submitting work
    pub fn handle(&self) -> ContextHandle {
        self.context.handle()
    }

    /// Queue a task
    pub fn post<F>(&self, task: F) -> PeerKitResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.context.post(task)
    }
}
