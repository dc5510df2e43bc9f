use std::sync::mpsc::{Receiver, TryRecvError};

use crate::TaskPoolError;

/// Handle to the eventual result of one enqueued task.
///
/// The handle resolves exactly once. If the task is dropped from the queue
/// (see [`TaskPool::cancel_pending`](crate::TaskPool::cancel_pending)) the
/// handle resolves to [`TaskPoolError::Cancelled`].
#[derive(Debug)]
pub struct TaskHandle<R> {
    receiver: Receiver<Result<R, TaskPoolError>>,
}

impl<R> TaskHandle<R> {
    pub(crate) fn new(receiver: Receiver<Result<R, TaskPoolError>>) -> Self {
        Self { receiver }
    }

    /// Block until the task has run (or was discarded) and return its result.
    pub fn wait(self) -> Result<R, TaskPoolError> {
        self.receiver
            .recv()
            .unwrap_or(Err(TaskPoolError::Cancelled))
    }

    /// Return the result if the task already finished, without blocking.
    pub fn try_wait(&self) -> Option<Result<R, TaskPoolError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(TaskPoolError::Cancelled)),
        }
    }
}
