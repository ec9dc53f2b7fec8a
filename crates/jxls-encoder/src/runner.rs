//! Parallel work dispatch
//!
//! The encoder never spawns threads. Group work is handed to a caller
//! supplied runner; the two implementations here cover the common cases.

use rayon::prelude::*;

/// Dispatches `op` over the index range `0..count`.
///
/// A runner may serve the indices sequentially or in parallel, but must
/// not return before every invocation has completed. A runner that skips
/// indices leaves the corresponding sections empty, which produces an
/// invalid stream; callers doing cooperative cancellation rely on exactly
/// that.
pub trait ParallelRunner {
    fn run(&self, count: usize, op: &(dyn Fn(usize) + Sync));
}

/// Runs every index on the calling thread, in order. Substituted when the
/// caller does not supply a runner.
pub struct SequentialRunner;

impl ParallelRunner for SequentialRunner {
    fn run(&self, count: usize, op: &(dyn Fn(usize) + Sync)) {
        for i in 0..count {
            op(i);
        }
    }
}

/// Fans indices out over the global rayon thread pool.
pub struct RayonRunner;

impl ParallelRunner for RayonRunner {
    fn run(&self, count: usize, op: &(dyn Fn(usize) + Sync)) {
        (0..count).into_par_iter().for_each(|i| op(i));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_sequential_runner_covers_all_indices() {
        let sum = AtomicUsize::new(0);
        SequentialRunner.run(10, &|i| {
            sum.fetch_add(i + 1, Ordering::Relaxed);
        });
        assert_eq!(sum.load(Ordering::Relaxed), 55);
    }

    #[test]
    fn test_rayon_runner_covers_all_indices() {
        let sum = AtomicUsize::new(0);
        RayonRunner.run(100, &|i| {
            sum.fetch_add(i, Ordering::Relaxed);
        });
        assert_eq!(sum.load(Ordering::Relaxed), 4950);
    }
}
