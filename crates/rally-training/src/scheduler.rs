//! Population-level fitness evaluation.
//!
//! A [`Scheduler`] assigns a fitness to every candidate of a generation. Each candidate
//! receives exactly the score of its own evaluation; the order in which evaluations run
//! or finish is not observable in the result.
//!
//! - [`ParallelScheduler`] - A fixed pool of scoped worker threads pulling candidates from
//!   a shared cursor. Sized to the number of CPUs by default.
//! - [`SequentialScheduler`] - Evaluates one candidate at a time on the calling thread.
//!
//! Both log progress after every finished genome through a [`ProgressReporter`].

use std::{
    panic,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread,
};

use rally_engine::CancelToken;
use rally_evaluator::EvaluationError;

use crate::{Candidate, GenomeFitness, ProgressReporter, TrainingContext};

pub trait Scheduler {
    /// Scores every candidate in `candidates`.
    ///
    /// On error no candidate is guaranteed to be scored.
    fn evaluate(
        &self,
        context: &TrainingContext,
        candidates: &mut [Candidate],
        fitness: &dyn GenomeFitness,
        cancel: &CancelToken,
    ) -> Result<(), EvaluationError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialScheduler;

impl Scheduler for SequentialScheduler {
    fn evaluate(
        &self,
        context: &TrainingContext,
        candidates: &mut [Candidate],
        fitness: &dyn GenomeFitness,
        cancel: &CancelToken,
    ) -> Result<(), EvaluationError> {
        let progress = ProgressReporter::new(*context, candidates.len());
        for candidate in candidates {
            let mut rng = context.genome_rng(candidate.id());
            let score = fitness.fitness(candidate.genome(), &mut rng, cancel)?;
            candidate.set_fitness(score);
            progress.genome_done();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParallelScheduler {
    workers: usize,
}

impl Default for ParallelScheduler {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

impl ParallelScheduler {
    /// Pool of `workers` threads; `0` is treated as `1`.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Scheduler for ParallelScheduler {
    fn evaluate(
        &self,
        context: &TrainingContext,
        candidates: &mut [Candidate],
        fitness: &dyn GenomeFitness,
        cancel: &CancelToken,
    ) -> Result<(), EvaluationError> {
        let workers = self.workers.min(candidates.len());
        if workers <= 1 {
            return SequentialScheduler.evaluate(context, candidates, fitness, cancel);
        }

        let progress = &ProgressReporter::new(*context, candidates.len());
        let cursor = &AtomicUsize::new(0);
        let failed = &AtomicBool::new(false);
        let shared: &[Candidate] = candidates;

        let results = thread::scope(|s| {
            let handles = (0..workers)
                .map(move |_| {
                    s.spawn(move || -> Result<Vec<(usize, f32)>, EvaluationError> {
                        let mut scores = vec![];
                        while !failed.load(Ordering::Relaxed) {
                            let index = cursor.fetch_add(1, Ordering::Relaxed);
                            let Some(candidate) = shared.get(index) else {
                                break;
                            };
                            let mut rng = context.genome_rng(candidate.id());
                            match fitness.fitness(candidate.genome(), &mut rng, cancel) {
                                Ok(score) => scores.push((index, score)),
                                Err(e) => {
                                    failed.store(true, Ordering::Relaxed);
                                    return Err(e);
                                }
                            }
                            progress.genome_done();
                        }
                        Ok(scores)
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| panic::resume_unwind(e)))
                .collect::<Vec<_>>()
        });

        let mut scores = Vec::with_capacity(candidates.len());
        for result in results {
            scores.extend(result?);
        }
        for (index, score) in scores {
            candidates[index].set_fitness(score);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rally_engine::Cancelled;
    use rand::Rng as _;
    use rand_pcg::Pcg32;

    use crate::{Genome, GenomeId};

    use super::*;

    fn population(n: u64) -> Vec<Candidate> {
        (0..n)
            .map(|i| {
                let param = f32::from(u16::try_from(i).unwrap());
                Candidate::new(Genome::new(GenomeId(i), vec![param]))
            })
            .collect()
    }

    fn constant(_: &Genome, _: &mut Pcg32, _: &CancelToken) -> Result<f32, EvaluationError> {
        Ok(1.0)
    }

    fn identity(genome: &Genome, _: &mut Pcg32, _: &CancelToken) -> Result<f32, EvaluationError> {
        Ok(genome.params[0])
    }

    fn noisy(_: &Genome, rng: &mut Pcg32, _: &CancelToken) -> Result<f32, EvaluationError> {
        Ok(rng.random())
    }

    fn schedulers() -> Vec<Box<dyn Scheduler>> {
        vec![
            Box::new(SequentialScheduler),
            Box::new(ParallelScheduler::new(1)),
            Box::new(ParallelScheduler::new(4)),
            Box::new(ParallelScheduler::new(64)),
        ]
    }

    #[test]
    fn test_constant_fitness_any_worker_count() {
        let ctx = TrainingContext::new(0);
        for scheduler in schedulers() {
            let mut candidates = population(23);
            scheduler
                .evaluate(&ctx, &mut candidates, &constant, &CancelToken::new())
                .unwrap();
            assert_eq!(candidates.len(), 23);
            assert!(candidates.iter().all(|c| c.fitness() == Some(1.0)));
        }
    }

    #[test]
    fn test_identity_preserved() {
        let ctx = TrainingContext::new(0);
        for scheduler in schedulers() {
            let mut candidates = population(50);
            scheduler
                .evaluate(&ctx, &mut candidates, &identity, &CancelToken::new())
                .unwrap();
            for (i, c) in candidates.iter().enumerate() {
                assert_eq!(c.id(), GenomeId(i as u64));
                assert_eq!(c.fitness(), Some(c.genome().params[0]));
            }
        }
    }

    #[test]
    fn test_seeding_independent_of_workers() {
        let ctx = TrainingContext::new(7).with_generation(2);
        let mut sequential = population(16);
        SequentialScheduler
            .evaluate(&ctx, &mut sequential, &noisy, &CancelToken::new())
            .unwrap();
        let mut parallel = population(16);
        ParallelScheduler::new(5)
            .evaluate(&ctx, &mut parallel, &noisy, &CancelToken::new())
            .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_cancellation_stops_all_workers() {
        let ctx = TrainingContext::new(0);
        let evaluated = AtomicUsize::new(0);
        let stop_at_third = |_: &Genome,
                             _: &mut Pcg32,
                             cancel: &CancelToken|
         -> Result<f32, EvaluationError> {
            if evaluated.fetch_add(1, Ordering::SeqCst) == 2 {
                cancel.cancel();
            }
            cancel.check()?;
            Ok(0.0)
        };
        for scheduler in schedulers() {
            evaluated.store(0, Ordering::SeqCst);
            let cancel = CancelToken::new();
            let mut candidates = population(200);
            let err = scheduler
                .evaluate(&ctx, &mut candidates, &stop_at_third, &cancel)
                .unwrap_err();
            assert!(err.is_cancelled());
            assert!(evaluated.load(Ordering::SeqCst) < 200);
        }
    }

    #[test]
    fn test_empty_population() {
        let ctx = TrainingContext::new(0);
        for scheduler in schedulers() {
            let mut candidates = vec![];
            scheduler
                .evaluate(&ctx, &mut candidates, &constant, &CancelToken::new())
                .unwrap();
        }
    }

    #[test]
    fn test_cancelled_error_type() {
        let ctx = TrainingContext::new(0);
        let failing = |_: &Genome, _: &mut Pcg32, _: &CancelToken| -> Result<f32, EvaluationError> {
            Err(Cancelled.into())
        };
        let mut candidates = population(8);
        let err = ParallelScheduler::new(3)
            .evaluate(&ctx, &mut candidates, &failing, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Cancelled(_)));
    }
}
