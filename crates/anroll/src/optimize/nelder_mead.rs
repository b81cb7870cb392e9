//! Box-clamped Nelder–Mead simplex search in the unit cube.

use super::budget::Evaluator;
use super::OptimizerConfig;

const INITIAL_STEP: f64 = 0.1;
const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;
/// Simplex diameter below which the search is considered collapsed.
const MIN_DIAMETER: f64 = 1e-9;

type Vertex = (Vec<f64>, f64);

fn clamp_unit(p: Vec<f64>) -> Vec<f64> {
    p.into_iter().map(|v| v.clamp(0.0, 1.0)).collect()
}

/// `a + t (b - a)`, clamped to the cube.
fn along(a: &[f64], b: &[f64], t: f64) -> Vec<f64> {
    clamp_unit(a.iter().zip(b).map(|(x, y)| x + t * (y - x)).collect())
}

fn diameter(simplex: &[Vertex]) -> f64 {
    let best = &simplex[0].0;
    simplex[1..]
        .iter()
        .map(|(p, _)| {
            p.iter()
                .zip(best)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max)
        })
        .fold(0.0, f64::max)
}

/// Local search from `start`. Returns the best vertex, or `None` when the
/// budget ran out first.
pub(super) fn minimize<F: FnMut(&[f64]) -> f64>(
    ev: &mut Evaluator<F>,
    start: &[f64],
    config: &OptimizerConfig,
) -> Option<Vertex> {
    let n = start.len();
    let mut simplex: Vec<Vertex> = Vec::with_capacity(n + 1);
    let origin = clamp_unit(start.to_vec());
    simplex.push((origin.clone(), ev.eval(&origin)?));
    for i in 0..n {
        let mut p = origin.clone();
        p[i] = if p[i] + INITIAL_STEP <= 1.0 {
            p[i] + INITIAL_STEP
        } else {
            p[i] - INITIAL_STEP
        };
        let value = ev.eval(&p)?;
        simplex.push((p, value));
    }

    loop {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let spread = simplex[n].1 - simplex[0].1;
        if spread.abs() <= config.local_ftol_abs || diameter(&simplex) < MIN_DIAMETER {
            break;
        }

        let mut centroid = vec![0.0; n];
        for (p, _) in &simplex[..n] {
            for (c, v) in centroid.iter_mut().zip(p) {
                *c += v / n as f64;
            }
        }
        let worst = simplex[n].clone();

        let reflected = along(&centroid, &worst.0, -REFLECT);
        let f_reflected = ev.eval(&reflected)?;

        if f_reflected < simplex[0].1 {
            let expanded = along(&centroid, &worst.0, -EXPAND);
            let f_expanded = ev.eval(&expanded)?;
            simplex[n] = if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            };
            continue;
        }
        if f_reflected < simplex[n - 1].1 {
            simplex[n] = (reflected, f_reflected);
            continue;
        }

        let (contracted, limit) = if f_reflected < worst.1 {
            (along(&centroid, &reflected, CONTRACT), f_reflected)
        } else {
            (along(&centroid, &worst.0, CONTRACT), worst.1)
        };
        let f_contracted = ev.eval(&contracted)?;
        if f_contracted < limit {
            simplex[n] = (contracted, f_contracted);
            continue;
        }

        let best = simplex[0].0.clone();
        for vertex in simplex.iter_mut().skip(1) {
            let p = along(&best, &vertex.0, SHRINK);
            let value = ev.eval(&p)?;
            *vertex = (p, value);
        }
    }

    simplex.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn descends_a_skewed_bowl() {
        let mut ev = Evaluator::new(
            |u: &[f64]| (u[0] - 0.6).powi(2) + 10.0 * (u[1] - 0.35).powi(2) + (u[0] - 0.6) * (u[1] - 0.35),
            2000,
            Duration::from_secs(10),
        );
        let config = OptimizerConfig {
            local_ftol_abs: 1e-12,
            ..OptimizerConfig::default()
        };
        let (p, v) = minimize(&mut ev, &[0.1, 0.9], &config).unwrap();
        assert!((p[0] - 0.6).abs() < 1e-4 && (p[1] - 0.35).abs() < 1e-4, "{:?}", p);
        assert!(v < 1e-8);
    }

    #[test]
    fn stays_inside_the_cube() {
        let mut ev = Evaluator::new(|u: &[f64]| -u[0] - u[1], 500, Duration::from_secs(10));
        let config = OptimizerConfig {
            local_ftol_abs: 1e-12,
            ..OptimizerConfig::default()
        };
        let (p, _) = minimize(&mut ev, &[0.5, 0.5], &config).unwrap();
        assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(p[0] + p[1] > 1.98, "{:?}", p);
    }

    #[test]
    fn budget_exhaustion_returns_none() {
        let mut ev = Evaluator::new(|u: &[f64]| u[0], 2, Duration::from_secs(10));
        assert!(minimize(&mut ev, &[0.5, 0.5], &OptimizerConfig::default()).is_none());
    }
}
