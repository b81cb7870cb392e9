//! One-dimensional DIRECT (DIviding RECTangles) search on `[0, 1]`.

use std::collections::BTreeMap;

use super::budget::Evaluator;
use super::golden::golden_section_minimize;
use super::OptimizerConfig;

/// Balance between local and global selection.
const EPSILON: f64 = 1e-4;
/// Rounds without `local_ftol_abs` improvement before stopping.
const STALL_ROUNDS: usize = 8;
/// Finest trisection level (half-width `0.5 / 3^level`).
const MAX_LEVEL: u32 = 24;

#[derive(Debug, Clone, Copy)]
struct Cell {
    center: f64,
    level: u32,
    value: f64,
}

impl Cell {
    fn half_width(&self) -> f64 {
        0.5 / 3f64.powi(self.level as i32)
    }
}

/// Indices of potentially optimal cells: the lower-right convex hull of
/// `(half_width, value)` starting at the best cell, filtered by the
/// sufficient-decrease test.
fn potentially_optimal(cells: &[Cell], f_min: f64) -> Vec<usize> {
    let mut per_level: BTreeMap<u32, usize> = BTreeMap::new();
    for (i, c) in cells.iter().enumerate() {
        let entry = per_level.entry(c.level).or_insert(i);
        if c.value < cells[*entry].value {
            *entry = i;
        }
    }

    // Smallest half-width first.
    let points: Vec<(f64, f64, usize)> = per_level
        .values()
        .rev()
        .map(|&i| (cells[i].half_width(), cells[i].value, i))
        .collect();
    let start = points
        .iter()
        .enumerate()
        .fold(0, |best, (k, p)| if p.1 <= points[best].1 { k } else { best });

    let mut hull: Vec<(f64, f64, usize)> = Vec::new();
    for &p in &points[start..] {
        while hull.len() >= 2 {
            let a = hull[hull.len() - 2];
            let b = hull[hull.len() - 1];
            let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
            if cross <= 0.0 {
                hull.pop();
            } else {
                break;
            }
        }
        hull.push(p);
    }

    let threshold = f_min - EPSILON * f_min.abs();
    let last = hull.len() - 1;
    hull.iter()
        .enumerate()
        .filter(|(k, p)| {
            if *k == last {
                return true;
            }
            let next = hull[k + 1];
            let slope = (next.1 - p.1) / (next.0 - p.0);
            p.1 - slope * p.0 <= threshold
        })
        .map(|(_, p)| p.2)
        .collect()
}

/// Run DIRECT until it stalls, reaches the finest level or the budget is
/// spent, then polish the best cell with a golden-section search.
pub(super) fn minimize<F: FnMut(&[f64]) -> f64>(ev: &mut Evaluator<F>, config: &OptimizerConfig) {
    let Some(value) = ev.eval(&[0.5]) else {
        return;
    };
    let mut cells = vec![Cell {
        center: 0.5,
        level: 0,
        value,
    }];
    let mut f_min = value;
    let mut stall = 0;

    'search: loop {
        let selected = potentially_optimal(&cells, f_min);
        if selected.iter().all(|&i| cells[i].level >= MAX_LEVEL) {
            break;
        }
        for i in selected {
            let parent = cells[i];
            if parent.level >= MAX_LEVEL {
                continue;
            }
            let child_level = parent.level + 1;
            let offset = 2.0 * 0.5 / 3f64.powi(child_level as i32);
            for center in [parent.center - offset, parent.center + offset] {
                let Some(value) = ev.eval(&[center]) else {
                    break 'search;
                };
                cells.push(Cell {
                    center,
                    level: child_level,
                    value,
                });
            }
            cells[i].level = child_level;
        }

        let round_min = cells.iter().map(|c| c.value).fold(f64::INFINITY, f64::min);
        if f_min - round_min < config.local_ftol_abs {
            stall += 1;
        } else {
            stall = 0;
        }
        f_min = f_min.min(round_min);
        if stall >= STALL_ROUNDS {
            break;
        }
    }

    let Some(best) = cells
        .iter()
        .filter(|c| c.value == f_min)
        .min_by_key(|c| c.level)
        .copied()
    else {
        return;
    };
    if ev.best_value().is_none() {
        return;
    }
    let reach = 3.0 * best.half_width();
    let lo = (best.center - reach).max(0.0);
    let hi = (best.center + reach).min(1.0);
    golden_section_minimize(
        |u| ev.eval(&[u]).unwrap_or(f64::MAX),
        lo,
        hi,
        config.polish_evals,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_split_selects_the_root() {
        let cells = [Cell {
            center: 0.5,
            level: 0,
            value: 1.0,
        }];
        assert_eq!(potentially_optimal(&cells, 1.0), vec![0]);
    }

    #[test]
    fn large_cells_stay_eligible() {
        let cells = [
            Cell {
                center: 0.5,
                level: 1,
                value: 0.2,
            },
            Cell {
                center: 0.5 - 1.0 / 3.0,
                level: 1,
                value: 0.9,
            },
            Cell {
                center: 0.5 + 1.0 / 3.0,
                level: 1,
                value: 0.4,
            },
            Cell {
                center: 0.5,
                level: 3,
                value: 0.1,
            },
        ];
        let sel = potentially_optimal(&cells, 0.1);
        assert!(sel.contains(&3));
        assert!(sel.contains(&0));
    }

    #[test]
    fn converges_on_a_parabola() {
        let mut ev = Evaluator::new(
            |u: &[f64]| (u[0] - 0.123).powi(2),
            300,
            Duration::from_secs(10),
        );
        minimize(&mut ev, &OptimizerConfig::default());
        let (u, v) = ev.into_best().unwrap();
        assert!((u[0] - 0.123).abs() < 1e-4, "got {}", u[0]);
        assert!(v < 1e-8);
    }
}
