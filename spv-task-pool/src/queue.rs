use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
};

use crate::TaskPoolError;

/// A type-erased unit of work. Result delivery is baked into the closure.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

pub(crate) enum QueueItem {
    Run(Job),
    /// Sentinel: the worker that dequeues it terminates.
    Stop,
}

struct QueueState {
    work: VecDeque<QueueItem>,
    valid: bool,
}

/// FIFO work queue shared by all workers of a pool.
pub(crate) struct TaskQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                work: VecDeque::new(),
                valid: true,
            }),
            available: Condvar::new(),
        }
    }

    // Jobs run outside the lock and unwind inside `catch_unwind`, so a
    // poisoned mutex still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push(&self, job: Job) -> Result<(), TaskPoolError> {
        {
            let mut state = self.lock();
            if !state.valid {
                return Err(TaskPoolError::Invalidated);
            }
            state.work.push_back(QueueItem::Run(job));
        }
        self.available.notify_one();
        Ok(())
    }

    /// Blocking dequeue. Waits while the queue is empty and still valid.
    pub(crate) fn pop(&self) -> QueueItem {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.work.pop_front() {
                return item;
            }
            if !state.valid {
                return QueueItem::Stop;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Drop every queued job that has not started. Sentinels stay queued so a
    /// shutdown in progress still reaches every worker.
    pub(crate) fn cancel_pending(&self) -> usize {
        let mut state = self.lock();
        let before = state.work.len();
        state.work.retain(|item| matches!(item, QueueItem::Stop));
        before - state.work.len()
    }

    /// Invalidate the queue and push one sentinel per worker, atomically with
    /// respect to `push`.
    pub(crate) fn push_stops(&self, worker_count: usize) {
        {
            let mut state = self.lock();
            state.valid = false;
            for _ in 0..worker_count {
                state.work.push_back(QueueItem::Stop);
            }
        }
        self.available.notify_all();
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.lock().valid
    }

    /// Number of queued jobs, sentinels excluded.
    pub(crate) fn pending(&self) -> usize {
        self.lock()
            .work
            .iter()
            .filter(|item| matches!(item, QueueItem::Run(_)))
            .count()
    }
}
