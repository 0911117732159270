use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use tracing::debug;

use crate::TrainingContext;

/// Logs elapsed and estimated remaining time as genomes of one generation finish.
///
/// Safe to share between worker threads.
#[derive(Debug)]
pub struct ProgressReporter {
    context: TrainingContext,
    total: usize,
    done: AtomicUsize,
    started: Instant,
}

/// Progress after a genome finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
    pub elapsed: Duration,
    pub remaining: Duration,
}

impl ProgressReporter {
    #[must_use]
    pub fn new(context: TrainingContext, total: usize) -> Self {
        Self {
            context,
            total,
            done: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    /// Records one finished genome and logs the new progress.
    pub fn genome_done(&self) -> Progress {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let progress = self.progress(done);
        debug!(
            round = self.context.round,
            side = ?self.context.side,
            generation = self.context.generation,
            "genome {}/{} evaluated, elapsed {:.1}s, remaining ~{:.1}s",
            progress.done,
            progress.total,
            progress.elapsed.as_secs_f32(),
            progress.remaining.as_secs_f32(),
        );
        progress
    }

    fn progress(&self, done: usize) -> Progress {
        let elapsed = self.started.elapsed();
        let left = self.total.saturating_sub(done);
        #[expect(clippy::cast_precision_loss)]
        let remaining = if done == 0 {
            Duration::ZERO
        } else {
            elapsed.mul_f64(left as f64 / done as f64)
        };
        Progress {
            done,
            total: self.total,
            elapsed,
            remaining,
        }
    }
}
