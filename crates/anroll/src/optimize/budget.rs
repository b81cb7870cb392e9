use std::time::{Duration, Instant};

use super::StopReason;

/// Objective wrapper that enforces the evaluation cap and the deadline and
/// remembers the best finite point.
///
/// The deadline is checked before each evaluation; an evaluation already
/// running is never interrupted.
pub(super) struct Evaluator<F> {
    f: F,
    max_evals: usize,
    started: Instant,
    deadline: Duration,
    evaluations: usize,
    best: Option<(Vec<f64>, f64)>,
    stop: Option<StopReason>,
}

impl<F: FnMut(&[f64]) -> f64> Evaluator<F> {
    pub fn new(f: F, max_evals: usize, deadline: Duration) -> Self {
        Self {
            f,
            max_evals,
            started: Instant::now(),
            deadline,
            evaluations: 0,
            best: None,
            stop: None,
        }
    }

    /// Whether the budget is spent; latches the reason.
    pub fn exhausted(&mut self) -> bool {
        if self.stop.is_some() {
            return true;
        }
        if self.evaluations >= self.max_evals {
            self.stop = Some(StopReason::MaxEvaluations);
        } else if self.started.elapsed() >= self.deadline {
            self.stop = Some(StopReason::Deadline);
        }
        self.stop.is_some()
    }

    /// Evaluate at `u`; `None` once the budget is spent. Non-finite values
    /// come back as `f64::MAX`.
    pub fn eval(&mut self, u: &[f64]) -> Option<f64> {
        if self.exhausted() {
            return None;
        }
        self.evaluations += 1;
        let value = (self.f)(u);
        if !value.is_finite() {
            return Some(f64::MAX);
        }
        if self.best.as_ref().map_or(true, |(_, b)| value < *b) {
            self.best = Some((u.to_vec(), value));
        }
        Some(value)
    }

    /// Best finite value seen so far.
    pub fn best_value(&self) -> Option<f64> {
        self.best.as_ref().map(|(_, v)| *v)
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    pub fn into_best(self) -> Option<(Vec<f64>, f64)> {
        self.best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_latches_and_best_skips_non_finite() {
        let mut calls = 0;
        let mut ev = Evaluator::new(
            |u: &[f64]| {
                calls += 1;
                if u[0] > 0.5 {
                    f64::INFINITY
                } else {
                    u[0]
                }
            },
            3,
            Duration::from_secs(60),
        );
        assert_eq!(ev.eval(&[0.4]), Some(0.4));
        assert_eq!(ev.eval(&[0.9]), Some(f64::MAX));
        assert_eq!(ev.eval(&[0.1]), Some(0.1));
        assert_eq!(ev.eval(&[0.0]), None);
        assert_eq!(ev.stop_reason(), Some(StopReason::MaxEvaluations));
        assert_eq!(ev.best_value(), Some(0.1));
        assert_eq!(ev.evaluations(), 3);
        drop(ev);
        assert_eq!(calls, 3);
    }

    #[test]
    fn zero_deadline_blocks_every_call() {
        let mut ev = Evaluator::new(|_: &[f64]| 1.0, 10, Duration::ZERO);
        assert_eq!(ev.eval(&[0.5]), None);
        assert_eq!(ev.stop_reason(), Some(StopReason::Deadline));
        assert!(ev.into_best().is_none());
    }
}
