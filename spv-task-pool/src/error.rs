use thiserror::Error;

/// Errors from task pool operations.
#[derive(Debug, Error)]
pub enum TaskPoolError {
    /// Work was submitted after shutdown began.
    #[error("task pool has been shut down")]
    Invalidated,
    /// The task was dropped from the queue before a worker picked it up.
    #[error("task was cancelled before it started")]
    Cancelled,
    /// The task panicked; carries the panic message.
    #[error("task panicked: {0}")]
    TaskPanicked(String),
    /// A pool needs at least one worker.
    #[error("worker count must be at least 1")]
    NoWorkers,
    /// The OS refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    /// A worker thread panicked outside any task.
    #[error("worker thread {0} panicked")]
    WorkerPanicked(usize),
}
