//! Parameter vector operators for the genetic optimizer.
//!
//! Network parameters are signed, so every operator works on the symmetric interval
//! `[-limit, limit]`:
//!
//! - **Initialization**: [`random`] draws each parameter uniformly from `[-range, range]`
//! - **Crossover**: [`blx_alpha`] blends two parents
//! - **Mutation**: [`mutate`] adds Gaussian noise
//!
//! # BLX-α Crossover
//!
//! For parents `x1` and `x2` at position `i`, with `d = |x2 - x1|`, the child is sampled
//! uniformly from `[min - α·d, max + α·d]`. `alpha = 0` keeps children strictly between
//! the parents; larger values explore beyond them.
//!
//! # Gaussian Mutation
//!
//! Each parameter is perturbed with probability `rate` by a sample of `N(0, σ²)`. Small
//! changes are much more likely than large jumps.

use rand::Rng;
use rand_distr::Normal;

/// Creates a parameter vector by applying a function to each index.
///
/// # Examples
///
/// ```
/// use rally_training::weights;
///
/// let ramp = weights::from_fn(|i| i as f32 * 0.5, 4);
/// assert_eq!(ramp, vec![0.0, 0.5, 1.0, 1.5]);
/// ```
pub fn from_fn<F>(mut f: F, len: usize) -> Vec<f32>
where
    F: FnMut(usize) -> f32,
{
    let mut values = Vec::with_capacity(len);
    for i in 0..len {
        values.push(f(i));
    }
    values
}

/// Uniformly random vector in `[-range, range]`.
pub fn random<R>(rng: &mut R, range: f32, len: usize) -> Vec<f32>
where
    R: Rng + ?Sized,
{
    let range = range.abs();
    from_fn(|_| rng.random_range(-range..=range), len)
}

/// BLX-α crossover, clamped to `[-limit, limit]`.
///
/// # Panics
///
/// Panics if the parents have different lengths.
pub fn blx_alpha<R>(p1: &[f32], p2: &[f32], alpha: f32, limit: f32, rng: &mut R) -> Vec<f32>
where
    R: Rng + ?Sized,
{
    assert_eq!(p1.len(), p2.len());
    from_fn(
        |i| {
            let x1 = p1[i];
            let x2 = p2[i];
            let min = f32::min(x1, x2);
            let max = f32::max(x1, x2);
            let d = max - min;
            let lower = min - alpha * d;
            let upper = max + alpha * d;
            rng.random_range(lower..=upper).clamp(-limit, limit)
        },
        p1.len(),
    )
}

/// Gaussian mutation in place, clamped to `[-limit, limit]`.
///
/// `rate` is the per-parameter mutation probability and must lie in `[0, 1]`.
pub fn mutate<R>(params: &mut [f32], noise: &Normal<f32>, limit: f32, rate: f32, rng: &mut R)
where
    R: Rng + ?Sized,
{
    for p in params {
        if rng.random_bool(rate.into()) {
            *p = (*p + rng.sample(noise)).clamp(-limit, limit);
        }
    }
}
