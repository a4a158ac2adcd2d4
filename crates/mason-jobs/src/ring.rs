//! Fixed-capacity circular job buffer with drop-oldest overflow.
//!
//! Head/tail and the slot array live behind a short
//! [`parking_lot::Mutex`]; the occupancy count is a separate atomic so
//! barriers can poll emptiness without taking the lock. The mutex is what
//! makes the ring safe for any number of producers and consumers: the
//! head/tail/size triple cannot be updated as one atomic transaction, and
//! pretending otherwise only holds under a single-producer discipline no
//! caller should have to prove.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

/// A queued unit of work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

struct RingState {
    slots: Vec<Option<Job>>,
    head: usize,
    tail: usize,
}

/// Bounded FIFO of jobs; full pushes overwrite the oldest entry.
pub struct JobRing {
    state: Mutex<RingState>,
    /// Occupancy mirror for lock-free observation. Updated inside the
    /// critical section, read with acquire ordering by pollers.
    size: AtomicUsize,
    capacity: usize,
}

impl JobRing {
    /// Creates a ring holding at most `capacity` queued jobs.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be nonzero");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            state: Mutex::new(RingState { slots, head: 0, tail: 0 }),
            size: AtomicUsize::new(0),
            capacity,
        }
    }

    /// Enqueues `job` at the head.
    ///
    /// When the ring is full the oldest unclaimed job is dropped to make
    /// room — by contract, without signaling the producer. Returns whether
    /// an old job was dropped.
    pub fn push(&self, job: Job) -> bool {
        let mut state = self.state.lock();
        let head = state.head;
        state.slots[head] = Some(job);
        state.head = (head + 1) % self.capacity;
        if self.size.load(Ordering::Relaxed) == self.capacity {
            // Full: the slot just overwritten was the oldest entry.
            state.tail = (state.tail + 1) % self.capacity;
            true
        } else {
            self.size.fetch_add(1, Ordering::Release);
            false
        }
    }

    /// Dequeues the oldest job, if any.
    pub fn pop(&self) -> Option<Job> {
        let mut state = self.state.lock();
        if self.size.load(Ordering::Relaxed) == 0 {
            return None;
        }
        let tail = state.tail;
        let job = state.slots[tail].take();
        debug_assert!(job.is_some(), "occupied slot was empty");
        state.tail = (tail + 1) % self.capacity;
        self.size.fetch_sub(1, Ordering::Release);
        job
    }

    /// Queued job count. Lock-free; racy by nature, exact only when no
    /// concurrent push/pop is in flight.
    #[inline]
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
