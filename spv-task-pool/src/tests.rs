use std::{
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc, Barrier,
    },
    thread,
    time::Duration,
};

use assert_matches::assert_matches;

use crate::{TaskPool, TaskPoolError};

/// Occupy the single worker of `pool` until the returned sender fires.
fn block_worker(pool: &TaskPool) -> mpsc::Sender<()> {
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let started = Arc::new(Barrier::new(2));
    let started_in_task = Arc::clone(&started);
    pool.enqueue(move || {
        started_in_task.wait();
        let _ = release_rx.recv();
    })
    .expect("enqueue blocker");
    started.wait();
    release_tx
}

#[test]
fn test_zero_workers_rejected() {
    assert_matches!(TaskPool::new(0), Err(TaskPoolError::NoWorkers));
}

#[test]
fn test_failed_spawn_stops_started_workers() {
    let exited = Arc::new(AtomicUsize::new(0));
    let spawned_exited = Arc::clone(&exited);
    let result = TaskPool::start_with(4, move |name, body| {
        if name == "spv-worker-2" {
            return Err(io::Error::new(io::ErrorKind::Other, "no more threads"));
        }
        let exited = Arc::clone(&spawned_exited);
        thread::Builder::new().name(name).spawn(move || {
            body();
            exited.fetch_add(1, Ordering::SeqCst);
        })
    });
    assert_matches!(result, Err(TaskPoolError::Spawn(e)) if e.to_string() == "no more threads");
    // Both workers that did start were stopped and joined.
    assert_eq!(exited.load(Ordering::SeqCst), 2);
}

#[test]
fn test_debug_reports_pool_state() {
    let mut pool = TaskPool::new(2).expect("start pool");
    pool.enqueue_tracked(|| true).expect("enqueue tracked");
    assert_eq!(
        format!("{pool:?}"),
        "TaskPool { worker_count: 2, live_workers: 2, batch_len: 1 }"
    );
    assert!(pool.await_batch());
    pool.shutdown().expect("shutdown");
    assert_eq!(
        format!("{pool:?}"),
        "TaskPool { worker_count: 2, live_workers: 0, batch_len: 0 }"
    );
}

#[test]
fn test_enqueue_returns_typed_result() {
    let pool = TaskPool::new(2).expect("start pool");
    let number = pool.enqueue(|| 6 * 7).expect("enqueue number");
    let text = pool
        .enqueue(|| String::from("done"))
        .expect("enqueue string");
    assert_eq!(number.wait().expect("number result"), 42);
    assert_eq!(text.wait().expect("string result"), "done");
}

#[test]
fn test_single_worker_runs_fifo() {
    let pool = TaskPool::new(1).expect("start pool");
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let handles: Vec<_> = (0..10)
        .map(|i| {
            let order = Arc::clone(&order);
            pool.enqueue(move || order.lock().expect("lock").push(i))
                .expect("enqueue")
        })
        .collect();
    for handle in handles {
        handle.wait().expect("task result");
    }
    assert_eq!(*order.lock().expect("lock"), (0..10).collect::<Vec<_>>());
}

#[test]
fn test_await_batch_all_true() {
    let mut pool = TaskPool::new(4).expect("start pool");
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..64 {
        let counter = Arc::clone(&counter);
        pool.enqueue_tracked(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .expect("enqueue tracked");
    }
    assert_eq!(pool.batch_len(), 64);
    assert!(pool.await_batch());
    // The barrier returns only after every task ran.
    assert_eq!(counter.load(Ordering::SeqCst), 64);
    assert_eq!(pool.batch_len(), 0);
}

#[test]
fn test_await_batch_waits_for_all_after_failure() {
    let mut pool = TaskPool::new(2).expect("start pool");
    let finished = Arc::new(AtomicUsize::new(0));
    pool.enqueue_tracked(|| false).expect("enqueue failing task");
    for _ in 0..8 {
        let finished = Arc::clone(&finished);
        pool.enqueue_tracked(move || {
            thread::sleep(Duration::from_millis(5));
            finished.fetch_add(1, Ordering::SeqCst);
            true
        })
        .expect("enqueue slow task");
    }
    assert!(!pool.await_batch());
    assert_eq!(finished.load(Ordering::SeqCst), 8);
}

#[test]
fn test_empty_batch_is_success() {
    let mut pool = TaskPool::new(1).expect("start pool");
    assert!(pool.await_batch());
}

#[test]
fn test_panicking_task_reports_and_worker_survives() {
    let mut pool = TaskPool::new(1).expect("start pool");
    let handle = pool
        .enqueue(|| -> u32 { panic!("boom") })
        .expect("enqueue panicking task");
    assert_matches!(handle.wait(), Err(TaskPoolError::TaskPanicked(msg)) if msg == "boom");

    pool.enqueue_tracked(|| panic!("tracked boom"))
        .expect("enqueue tracked panic");
    assert!(!pool.await_batch());

    // The lone worker is still serving the queue.
    let after = pool.enqueue(|| 1u8).expect("enqueue after panic");
    assert_eq!(after.wait().expect("result after panic"), 1);
    assert_eq!(pool.live_workers(), 1);
}

#[test]
fn test_cancel_pending_drops_only_unstarted_work() {
    let mut pool = TaskPool::new(1).expect("start pool");
    let release = block_worker(&pool);

    let ran = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..5)
        .map(|_| {
            let ran = Arc::clone(&ran);
            pool.enqueue(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .expect("enqueue")
        })
        .collect();
    assert_eq!(pool.pending(), 5);

    assert_eq!(pool.cancel_pending(), 5);
    assert_eq!(pool.pending(), 0);
    release.send(()).expect("release blocker");

    for handle in handles {
        assert_matches!(handle.wait(), Err(TaskPoolError::Cancelled));
    }
    pool.shutdown().expect("shutdown");
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancelled_tracked_tasks_fail_the_batch() {
    let mut pool = TaskPool::new(1).expect("start pool");
    let release = block_worker(&pool);
    pool.enqueue_tracked(|| true).expect("enqueue tracked");
    pool.cancel_pending();
    release.send(()).expect("release blocker");
    assert!(!pool.await_batch());
}

#[test]
fn test_shutdown_terminates_every_worker() {
    for workers in [1, 2, 4, 8] {
        let mut pool = TaskPool::new(workers).expect("start pool");
        assert_eq!(pool.worker_count(), workers);
        assert_eq!(pool.live_workers(), workers);
        assert!(pool.is_running());

        pool.shutdown().expect("shutdown");
        assert_eq!(pool.live_workers(), 0);
        assert!(!pool.is_running());
        // A second shutdown has nothing left to stop.
        pool.shutdown().expect("second shutdown");
    }
}

#[test]
fn test_shutdown_runs_work_queued_before_it() {
    let mut pool = TaskPool::new(2).expect("start pool");
    let ran = Arc::new(AtomicUsize::new(0));
    for _ in 0..100 {
        let ran = Arc::clone(&ran);
        pool.enqueue(move || {
            ran.fetch_add(1, Ordering::SeqCst);
        })
        .expect("enqueue");
    }
    pool.shutdown().expect("shutdown");
    assert_eq!(ran.load(Ordering::SeqCst), 100);
}

#[test]
fn test_enqueue_after_shutdown_is_rejected() {
    let mut pool = TaskPool::new(2).expect("start pool");
    let submitter = pool.submitter();
    pool.shutdown().expect("shutdown");
    assert_matches!(pool.enqueue(|| ()), Err(TaskPoolError::Invalidated));
    assert_matches!(pool.enqueue_tracked(|| true), Err(TaskPoolError::Invalidated));
    assert_matches!(submitter.enqueue(|| ()), Err(TaskPoolError::Invalidated));
    assert_eq!(pool.batch_len(), 0);
}

#[test]
fn test_no_task_accepted_during_shutdown_is_lost_or_extra() {
    let mut pool = TaskPool::new(4).expect("start pool");
    let submitter = pool.submitter();
    let executed = Arc::new(AtomicUsize::new(0));

    let producer_executed = Arc::clone(&executed);
    let producer = thread::spawn(move || {
        let mut accepted = 0usize;
        loop {
            let executed = Arc::clone(&producer_executed);
            match submitter.enqueue(move || {
                executed.fetch_add(1, Ordering::SeqCst);
            }) {
                Ok(_) => accepted += 1,
                Err(TaskPoolError::Invalidated) => break accepted,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
    });

    thread::sleep(Duration::from_millis(10));
    pool.shutdown().expect("shutdown");
    let accepted = producer.join().expect("producer thread");

    // Everything accepted before invalidation sits ahead of the sentinels.
    assert_eq!(executed.load(Ordering::SeqCst), accepted);
    assert_eq!(pool.live_workers(), 0);
}

#[test]
fn test_abort_discards_queued_work() {
    let mut pool = TaskPool::new(1).expect("start pool");
    let release = block_worker(&pool);
    let ran = Arc::new(AtomicUsize::new(0));
    for _ in 0..10 {
        let ran = Arc::clone(&ran);
        pool.enqueue(move || {
            ran.fetch_add(1, Ordering::SeqCst);
        })
        .expect("enqueue");
    }
    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        let _ = release.send(());
    });
    pool.abort().expect("abort");
    releaser.join().expect("releaser thread");
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(pool.live_workers(), 0);
}

#[test]
fn test_drop_joins_workers() {
    let live = {
        let pool = TaskPool::new(3).expect("start pool");
        Arc::clone(&pool.live)
    };
    assert_eq!(live.load(Ordering::SeqCst), 0);
}

#[test]
fn test_available_workers_at_least_one() {
    assert!(TaskPool::available_workers() >= 1);
}
