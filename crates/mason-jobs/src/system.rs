//! Worker pool over the job ring.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crate::ring::{Job, JobRing};

/// Widest supported worker pool; one busy-mask bit per worker.
pub const MAX_WORKERS: usize = 64;

struct Shared {
    ring: JobRing,
    /// One bit per worker, set while that worker is between claiming a job
    /// and finishing it (or probing the ring). See the ordering note on
    /// the worker loop.
    busy_mask: AtomicU64,
    shutdown: AtomicBool,
}

/// Fixed pool of worker threads draining a shared [`JobRing`].
///
/// Owned object with an explicit lifecycle: construct it where it is
/// needed, pass it by reference, and dropping it joins every worker after
/// the queue drains of claimed jobs. Multiple independent instances can
/// coexist (there is no global state).
pub struct JobSystem {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl JobSystem {
    /// Spawns `worker_count` workers (clamped to 1..=[`MAX_WORKERS`])
    /// sharing a ring of `queue_capacity` slots.
    pub fn new(worker_count: usize, queue_capacity: usize) -> Self {
        let worker_count = worker_count.clamp(1, MAX_WORKERS);
        let shared = Arc::new(Shared {
            ring: JobRing::new(queue_capacity),
            busy_mask: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        });

        let workers = (0..worker_count)
            .map(|index| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("mason-worker-{index}"))
                    .spawn(move || worker_loop(&shared, index))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self { shared, workers }
    }

    /// Enqueues a job for any worker to run.
    ///
    /// Inherits the ring's capacity contract: scheduling into a full queue
    /// drops the oldest unclaimed job silently. Returns whether that
    /// happened.
    pub fn schedule(&self, job: Job) -> bool {
        self.shared.ring.push(job)
    }

    /// Busy-polls the calling thread until every queued job has been
    /// claimed and finished.
    ///
    /// Racy with concurrent producers by design: a job scheduled *while*
    /// the barrier is polling may or may not be covered. The intended use
    /// is drain-before-frame-start, where producers are quiet.
    pub fn wait_for_all(&self) {
        loop {
            // Order matters: observe emptiness before idleness. A worker
            // raises its bit before popping, so any job claimed before the
            // mask load still shows as busy; a job claimed after it must
            // have been pushed after the emptiness check (producer race,
            // out of scope).
            if self.shared.ring.is_empty()
                && self.shared.busy_mask.load(Ordering::Acquire) == 0
            {
                return;
            }
            thread::yield_now();
        }
    }

    /// Jobs queued but not yet claimed.
    pub fn pending_jobs(&self) -> usize {
        self.shared.ring.len()
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for JobSystem {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: &Shared, index: usize) {
    let my_bit = 1u64 << index;
    loop {
        // Raise the busy bit *before* probing the ring. A barrier can then
        // never observe "all idle and queue empty" while a claimed job is
        // still in flight between pop and execution: the claimer's bit is
        // already up when the job leaves the queue.
        shared.busy_mask.fetch_or(my_bit, Ordering::AcqRel);
        match shared.ring.pop() {
            Some(job) => {
                job();
                shared.busy_mask.fetch_and(!my_bit, Ordering::AcqRel);
            }
            None => {
                shared.busy_mask.fetch_and(!my_bit, Ordering::AcqRel);
                if shared.shutdown.load(Ordering::Acquire) {
                    return;
                }
                thread::yield_now();
            }
        }
    }
}
