//! Multi-level single-linkage multistart over the unit cube.
//!
//! Each round draws uniform samples and starts a local Nelder–Mead search
//! from every sample that has no better neighbour within the critical
//! radius and is not close to an earlier start. Rounds continue until the
//! evaluator's budget is spent.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use super::budget::Evaluator;
use super::nelder_mead;
use super::OptimizerConfig;

/// Scale of the critical radius.
const SIGMA: f64 = 4.0;

/// `Γ(1 + n/2)`, the unit-ball volume denominator.
fn gamma_half(n: usize) -> f64 {
    let mut g = if n % 2 == 0 { 1.0 } else { PI.sqrt() / 2.0 };
    let mut k = if n % 2 == 0 { 1.0 } else { 1.5 };
    while k <= n as f64 / 2.0 + 1e-9 {
        g *= k;
        k += 1.0;
    }
    g
}

/// Distance below which a worse sample is shadowed by a better one after
/// `count` samples in `n` dimensions.
fn critical_radius(count: usize, n: usize) -> f64 {
    if count < 2 {
        return f64::INFINITY;
    }
    let count = count as f64;
    let volume = gamma_half(n) * SIGMA * count.ln() / count;
    volume.powf(1.0 / n as f64) / PI.sqrt()
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

pub(super) fn minimize<F: FnMut(&[f64]) -> f64>(
    ev: &mut Evaluator<F>,
    start: &[f64],
    config: &OptimizerConfig,
) {
    let n = start.len();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut samples: Vec<(Vec<f64>, f64)> = Vec::new();
    let mut used: Vec<bool> = Vec::new();
    let mut starts: Vec<Vec<f64>> = vec![start.to_vec()];

    let Some((first, value)) = nelder_mead::minimize(ev, start, config) else {
        return;
    };
    tracing::trace!(?first, value, "initial local search");

    let mut round = 0usize;
    loop {
        round += 1;
        for _ in 0..config.samples_per_round.max(1) {
            let p: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
            let Some(value) = ev.eval(&p) else {
                return;
            };
            samples.push((p, value));
            used.push(false);
        }

        let radius = critical_radius(samples.len(), n);
        let mut order: Vec<usize> = (0..samples.len()).collect();
        order.sort_by(|&a, &b| samples[a].1.total_cmp(&samples[b].1));

        let mut launched = 0;
        for i in order {
            if used[i] {
                continue;
            }
            let (p, value) = &samples[i];
            let shadowed = samples
                .iter()
                .any(|(q, v)| v < value && distance(p, q) <= radius);
            let near_start = starts.iter().any(|s| distance(p, s) <= radius);
            if shadowed || near_start {
                continue;
            }
            used[i] = true;
            let p = p.clone();
            let Some((local, local_value)) = nelder_mead::minimize(ev, &p, config) else {
                return;
            };
            tracing::trace!(round, ?local, local_value, "local search");
            starts.push(p);
            starts.push(local);
            launched += 1;
        }
        tracing::debug!(round, samples = samples.len(), radius, launched, "multistart round");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::time::Duration;

    #[test]
    fn gamma_matches_known_values() {
        assert_abs_diff_eq!(gamma_half(1), PI.sqrt() / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(gamma_half(2), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(gamma_half(3), 0.75 * PI.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(gamma_half(4), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn radius_shrinks_with_more_samples() {
        assert!(critical_radius(1, 2).is_infinite());
        assert!(critical_radius(100, 2) > critical_radius(1000, 2));
    }

    #[test]
    fn escapes_a_shallow_basin() {
        // Shallow well near the start, deep well in the far corner.
        let f = |u: &[f64]| {
            let shallow = -0.5 * (-((u[0] - 0.3).powi(2) + (u[1] - 0.3).powi(2)) / 0.01).exp();
            let deep = -1.0 * (-((u[0] - 0.85).powi(2) + (u[1] - 0.85).powi(2)) / 0.01).exp();
            shallow + deep
        };
        let mut ev = Evaluator::new(f, 3000, Duration::from_secs(10));
        minimize(&mut ev, &[0.3, 0.3], &OptimizerConfig::default());
        let (u, v) = ev.into_best().unwrap();
        assert!(v < -0.99, "stuck at {:?} = {}", u, v);
    }

    #[test]
    fn seeded_runs_repeat() {
        let f = |u: &[f64]| (7.0 * u[0]).sin() * (5.0 * u[1]).cos();
        let run = || {
            let mut ev = Evaluator::new(f, 500, Duration::from_secs(10));
            minimize(&mut ev, &[0.5, 0.5], &OptimizerConfig::default());
            ev.into_best().unwrap()
        };
        assert_eq!(run(), run());
    }
}
