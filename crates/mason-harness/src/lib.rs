//! Workload drivers and JSON report types for the harness binary.
//!
//! The binary (`mason-harness`) runs deterministic stress workloads against
//! the allocators and the job system, verifies the structural invariants as
//! it goes, and emits one JSON report per run. The drivers live here so the
//! library tests can exercise them without going through the CLI.

use serde::{Deserialize, Serialize};

use mason_alloc::{AllocError, BlockId, TlsfAllocator, TlsfStats};
use mason_jobs::JobSystem;

/// Harness-level failures (distinct from allocator errors, which the
/// stress driver treats as data).
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("invariant violated at operation {op}: {detail}")]
    InvariantViolated { op: u64, detail: String },

    #[error("allocator setup failed: {0}")]
    Setup(#[from] AllocError),

    #[error("report serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Deterministic 64-bit generator (Knuth LCG step, xorshift-multiply
/// output permutation); reports embed the seed so any run can be replayed
/// exactly.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        // Permute the raw state so the low bits are usable by `below`.
        let mut word = self.0;
        word = (word ^ (word >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        word = (word ^ (word >> 27)).wrapping_mul(0x94d049bb133111eb);
        word ^ (word >> 31)
    }

    /// Uniform-ish draw in `[0, bound)`; `bound` must be nonzero.
    pub fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

/// Outcome of one TLSF stress run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressReport {
    pub seed: u64,
    pub capacity: u64,
    pub max_allocs: u32,
    pub operations: u64,
    pub oom_failures: u64,
    pub table_exhaustions: u64,
    pub peak_live: u32,
    pub final_stats: TlsfStats,
    pub passed: bool,
}

/// Outcome of one job-system throughput run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsReport {
    pub workers: usize,
    pub queue_capacity: usize,
    pub scheduled: u64,
    pub dropped: u64,
    pub executed: u64,
    pub elapsed_micros: u64,
    pub passed: bool,
}

/// Runs `operations` random allocate/free steps against a fresh TLSF
/// allocator, validating the physical chain after every step.
pub fn run_tlsf_stress(
    seed: u64,
    capacity: u64,
    max_allocs: u32,
    operations: u64,
) -> Result<StressReport, HarnessError> {
    let mut tlsf = TlsfAllocator::new(capacity, max_allocs)?;
    let mut rng = Lcg::new(seed);
    let mut live: Vec<BlockId> = Vec::new();
    let mut oom_failures = 0;
    let mut table_exhaustions = 0;
    let mut peak_live = 0;

    for op in 0..operations {
        let free_bias = live.len() >= max_allocs as usize / 2;
        if !live.is_empty() && (free_bias || rng.below(3) == 0) {
            let victim = rng.below(live.len() as u64) as usize;
            let id = live.swap_remove(victim);
            tlsf.free(id)
                .map_err(|e| HarnessError::InvariantViolated { op, detail: e.to_string() })?;
        } else {
            // Clamp the bound so arenas under 64 bytes still get a draw.
            let size = 1 + rng.below((capacity / 64).max(1));
            let alignment = 1 << rng.below(7);
            match tlsf.allocate(size, alignment) {
                Ok(id) => live.push(id),
                Err(AllocError::OutOfMemory { .. }) => oom_failures += 1,
                Err(AllocError::TableExhausted { .. }) => table_exhaustions += 1,
                Err(other) => {
                    return Err(HarnessError::InvariantViolated {
                        op,
                        detail: other.to_string(),
                    });
                }
            }
        }
        peak_live = peak_live.max(live.len() as u32);
        verify_chain(&tlsf, op)?;
    }

    for id in live.drain(..) {
        tlsf.free(id)
            .map_err(|e| HarnessError::InvariantViolated { op: operations, detail: e.to_string() })?;
    }
    verify_chain(&tlsf, operations)?;

    let final_stats = tlsf.stats();
    let passed = final_stats.free_blocks == 1 && final_stats.free_bytes == capacity;
    Ok(StressReport {
        seed,
        capacity,
        max_allocs,
        operations,
        oom_failures,
        table_exhaustions,
        peak_live,
        final_stats,
        passed,
    })
}

/// Checks arena coverage and coalescing over the physical chain.
fn verify_chain(tlsf: &TlsfAllocator, op: u64) -> Result<(), HarnessError> {
    let mut end = 0;
    let mut prev_free = false;
    for block in tlsf.physical_blocks() {
        if block.offset != end {
            return Err(HarnessError::InvariantViolated {
                op,
                detail: format!("gap at offset {end}, next block at {}", block.offset),
            });
        }
        if prev_free && block.is_free {
            return Err(HarnessError::InvariantViolated {
                op,
                detail: format!("uncoalesced free blocks at offset {}", block.offset),
            });
        }
        end = block.offset + block.size;
        prev_free = block.is_free;
    }
    if end != tlsf.capacity() {
        return Err(HarnessError::InvariantViolated {
            op,
            detail: format!("chain ends at {end}, capacity {}", tlsf.capacity()),
        });
    }
    Ok(())
}

/// Schedules `jobs` counter increments over `workers` workers and waits
/// for the queue to drain.
pub fn run_jobs_workload(workers: usize, queue_capacity: usize, jobs: u64) -> JobsReport {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Instant;

    let system = JobSystem::new(workers, queue_capacity);
    let counter = Arc::new(AtomicU64::new(0));
    let start = Instant::now();
    let mut dropped = 0;

    for _ in 0..jobs {
        let counter = Arc::clone(&counter);
        if system.schedule(Box::new(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })) {
            dropped += 1;
        }
        // Pace the producer so the capacity contract is honored: this
        // workload measures throughput, not drop behavior.
        while system.pending_jobs() > queue_capacity / 2 {
            std::thread::yield_now();
        }
    }
    system.wait_for_all();

    let executed = counter.load(Ordering::Relaxed);
    JobsReport {
        workers: system.worker_count(),
        queue_capacity,
        scheduled: jobs,
        dropped,
        executed,
        elapsed_micros: start.elapsed().as_micros() as u64,
        passed: executed + dropped == jobs,
    }
}
