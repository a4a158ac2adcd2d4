//! # mason-jobs
//!
//! A bounded, drop-oldest job queue and the worker pool that drains it.
//!
//! [`JobRing`] is a fixed-capacity FIFO of boxed closures. Overflow is a
//! *capacity contract*, not an error channel: pushing into a full ring
//! silently drops the oldest unclaimed job, so producers that cannot
//! tolerate job loss must never outrun their consumers.
//!
//! [`JobSystem`] owns a ring and a fixed set of worker threads that
//! spin-pop it, yielding the processor between empty polls. It is an
//! explicitly constructed object with an explicit lifecycle (workers join
//! on drop) — nothing in this crate is a global singleton, so tests and
//! subsystems can run independent instances side by side.

#![deny(unsafe_code)]

pub mod ring;
pub mod system;

pub use ring::{Job, JobRing};
pub use system::JobSystem;
