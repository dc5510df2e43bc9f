//! Fixed-size pool of persistent worker threads fed from one FIFO queue.
//!
//! Work is submitted either as fire-and-collect ([`TaskPool::enqueue`], which
//! hands back a typed [`TaskHandle`]) or as fire-and-aggregate
//! ([`TaskPool::enqueue_tracked`] + [`TaskPool::await_batch`], which folds the
//! boolean outcome of every tracked task into one success flag). The batch
//! wait is a barrier: it returns only after every tracked task has finished.
//!
//! # Shutdown
//!
//! [`TaskPool::shutdown`] invalidates the queue and pushes exactly one
//! sentinel per worker under the queue lock. Because the queue is FIFO, work
//! accepted before shutdown still runs, every worker eventually dequeues a
//! sentinel and exits, and nothing submitted afterwards is accepted.
//! [`TaskPool::abort`] drops the queued work first.

#![warn(missing_docs)]

mod error;
mod handle;
mod pool;
mod queue;
#[cfg(test)]
mod tests;

pub use error::TaskPoolError;
pub use handle::TaskHandle;
pub use pool::{TaskPool, TaskSubmitter};
