use std::{
    any::Any,
    fmt, io,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc,
    },
    thread::{self, JoinHandle},
};

use tracing::{debug, trace, warn};

use crate::{
    queue::{Job, QueueItem, TaskQueue},
    TaskHandle, TaskPoolError,
};

/// Main loop of one worker thread.
pub(crate) type WorkerBody = Box<dyn FnOnce() + Send + 'static>;

/// A fixed pool of persistent worker threads pulling from one FIFO queue.
///
/// The number of workers is set at construction and never changes. Dropping
/// the pool performs [`TaskPool::shutdown`].
pub struct TaskPool {
    queue: Arc<TaskQueue>,
    workers: Vec<JoinHandle<()>>,
    worker_count: usize,
    pub(crate) live: Arc<AtomicUsize>,
    batch: Vec<TaskHandle<bool>>,
}

impl fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskPool")
            .field("worker_count", &self.worker_count)
            .field("live_workers", &self.live_workers())
            .field("batch_len", &self.batch.len())
            .finish()
    }
}

/// Cloneable submission handle for a [`TaskPool`].
///
/// Lets other threads enqueue work while the owner keeps control of the
/// batch and of shutdown.
#[derive(Clone)]
pub struct TaskSubmitter {
    queue: Arc<TaskQueue>,
}

impl TaskSubmitter {
    /// Enqueue a task and return a handle to its result.
    ///
    /// Fails with [`TaskPoolError::Invalidated`] once shutdown has begun.
    pub fn enqueue<F, R>(&self, task: F) -> Result<TaskHandle<R>, TaskPoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        submit(&self.queue, task)
    }
}

fn submit<F, R>(queue: &TaskQueue, task: F) -> Result<TaskHandle<R>, TaskPoolError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(1);
    let job: Job = Box::new(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(task)).map_err(|payload| {
            let message = panic_message(payload.as_ref());
            warn!(%message, "task panicked");
            TaskPoolError::TaskPanicked(message)
        });
        // Nobody may be waiting on the handle anymore.
        let _ = sender.send(outcome);
    });
    queue.push(job)?;
    Ok(TaskHandle::new(receiver))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

fn run_worker(index: usize, queue: Arc<TaskQueue>, live: Arc<AtomicUsize>) {
    trace!(worker = index, "worker started");
    loop {
        match queue.pop() {
            QueueItem::Run(job) => job(),
            QueueItem::Stop => break,
        }
    }
    live.fetch_sub(1, Ordering::SeqCst);
    trace!(worker = index, "worker terminated");
}

impl TaskPool {
    /// Start a pool with exactly `worker_count` threads.
    pub fn new(worker_count: usize) -> Result<Self, TaskPoolError> {
        Self::start_with(worker_count, |name, body| {
            thread::Builder::new().name(name).spawn(body)
        })
    }

    /// Start a pool whose worker threads come from `spawn`.
    ///
    /// If a spawn fails, the workers already started are stopped and joined
    /// before the error is returned.
    pub(crate) fn start_with<S>(worker_count: usize, mut spawn: S) -> Result<Self, TaskPoolError>
    where
        S: FnMut(String, WorkerBody) -> io::Result<JoinHandle<()>>,
    {
        if worker_count == 0 {
            return Err(TaskPoolError::NoWorkers);
        }
        let queue = Arc::new(TaskQueue::new());
        let live = Arc::new(AtomicUsize::new(0));
        let mut pool = TaskPool {
            queue,
            workers: Vec::with_capacity(worker_count),
            worker_count,
            live,
            batch: Vec::new(),
        };
        for index in 0..worker_count {
            let queue = Arc::clone(&pool.queue);
            let live = Arc::clone(&pool.live);
            live.fetch_add(1, Ordering::SeqCst);
            let body: WorkerBody = Box::new(move || run_worker(index, queue, live));
            match spawn(format!("spv-worker-{index}"), body) {
                Ok(handle) => pool.workers.push(handle),
                Err(e) => {
                    pool.live.fetch_sub(1, Ordering::SeqCst);
                    pool.worker_count = pool.workers.len();
                    if let Err(shutdown) = pool.shutdown() {
                        warn!(error = %shutdown, "stopping partially started pool failed");
                    }
                    warn!(index, error = %e, "worker thread spawn failed");
                    return Err(TaskPoolError::Spawn(e));
                }
            }
        }
        debug!(worker_count, "task pool started");
        Ok(pool)
    }

    /// Start a pool sized to the machine: one worker per core minus the
    /// calling thread, at least one.
    pub fn with_available_cores() -> Result<Self, TaskPoolError> {
        Self::new(Self::available_workers())
    }

    /// `num_cpus::get() - 1`, never less than 1.
    pub fn available_workers() -> usize {
        num_cpus::get().saturating_sub(1).max(1)
    }

    /// Number of worker threads this pool was started with.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Number of worker threads that have not yet terminated.
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// `true` until shutdown begins.
    pub fn is_running(&self) -> bool {
        !self.workers.is_empty() && self.queue.is_valid()
    }

    /// Number of queued tasks not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.queue.pending()
    }

    /// Number of tracked tasks awaiting [`TaskPool::await_batch`].
    pub fn batch_len(&self) -> usize {
        self.batch.len()
    }

    /// A cloneable handle other threads can enqueue through.
    pub fn submitter(&self) -> TaskSubmitter {
        TaskSubmitter {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Enqueue a task and return a handle to its result.
    pub fn enqueue<F, R>(&self, task: F) -> Result<TaskHandle<R>, TaskPoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        submit(&self.queue, task)
    }

    /// Enqueue a task whose boolean outcome joins the current batch.
    pub fn enqueue_tracked<F>(&mut self, task: F) -> Result<(), TaskPoolError>
    where
        F: FnOnce() -> bool + Send + 'static,
    {
        let handle = submit(&self.queue, task)?;
        self.batch.push(handle);
        Ok(())
    }

    /// Wait for every tracked task and return the AND of their outcomes.
    ///
    /// All handles are waited on even after a failure is seen, so on return
    /// no task of the batch is still running. A cancelled or panicked task
    /// counts as a failure. The batch is cleared.
    pub fn await_batch(&mut self) -> bool {
        let mut status = true;
        for handle in self.batch.drain(..) {
            match handle.wait() {
                Ok(ok) => status &= ok,
                Err(e) => {
                    trace!(error = %e, "tracked task did not complete");
                    status = false;
                }
            }
        }
        status
    }

    /// Drop all queued work that has not started. Running tasks finish.
    ///
    /// Returns the number of tasks discarded.
    pub fn cancel_pending(&self) -> usize {
        let dropped = self.queue.cancel_pending();
        if dropped > 0 {
            warn!(dropped, "cancelled pending tasks");
        }
        dropped
    }

    /// Stop the pool: one sentinel per worker, then join every worker.
    ///
    /// Work queued before the call still runs. Calling it again is a no-op.
    pub fn shutdown(&mut self) -> Result<(), TaskPoolError> {
        if self.workers.is_empty() {
            return Ok(());
        }
        self.queue.push_stops(self.workers.len());
        let mut result = Ok(());
        for (index, worker) in self.workers.drain(..).enumerate() {
            if worker.join().is_err() && result.is_ok() {
                result = Err(TaskPoolError::WorkerPanicked(index));
            }
        }
        debug!(worker_count = self.worker_count, "task pool shut down");
        result
    }

    /// Discard queued work, then [`shutdown`](Self::shutdown).
    pub fn abort(&mut self) -> Result<(), TaskPoolError> {
        self.cancel_pending();
        self.shutdown()
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "task pool shutdown on drop failed");
        }
    }
}
