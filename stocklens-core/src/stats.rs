//! Streaming summary statistics.
//!
//! `RunningStats` uses Welford's update so the variance never goes through a
//! `sum(x^2) - n * mean^2` cancellation, and Chan's pairwise combination so
//! per-partition or per-shard accumulators can be merged in any order.

use serde::{Deserialize, Serialize};

/// Count, sum, mean and second central moment of a stream of values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    count: usize,
    sum: f64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub const fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Push only defined values. Undefined inputs are excluded from every moment.
    pub fn push_opt(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.push(v);
        }
    }

    pub fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let n_a = self.count as f64;
        let n_b = other.count as f64;
        let n = n_a + n_b;
        let delta = other.mean - self.mean;
        self.mean += delta * n_b / n;
        self.m2 += other.m2 + delta * delta * n_a * n_b / n;
        self.sum += other.sum;
        self.count += other.count;
    }

    pub const fn count(&self) -> usize {
        self.count
    }

    pub const fn sum(&self) -> f64 {
        self.sum
    }

    /// `sum / count`; `None` for an empty stream.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Unbiased (N-1) sample variance; `None` with fewer than 2 values.
    pub fn sample_variance(&self) -> Option<f64> {
        (self.count >= 2).then(|| (self.m2 / (self.count - 1) as f64).max(0.0))
    }

    pub fn sample_std_dev(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Self::new();
        for v in iter {
            stats.push(v);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_sample_std(values: &[f64]) -> f64 {
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let var =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
        var.sqrt()
    }

    #[test]
    fn empty_stream_is_undefined() {
        let s = RunningStats::new();
        assert_eq!(s.mean(), None);
        assert_eq!(s.sample_variance(), None);
    }

    #[test]
    fn single_value_has_mean_but_no_variance() {
        let s: RunningStats = [4.0].into_iter().collect();
        assert_eq!(s.mean(), Some(4.0));
        assert_eq!(s.sample_std_dev(), None);
    }

    #[test]
    fn matches_two_pass_formula() {
        let values = [0.1, -0.18, 0.05, 0.02, -0.03];
        let s: RunningStats = values.iter().copied().collect();
        let expected = naive_sample_std(&values);
        assert!((s.sample_std_dev().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn stable_with_large_offset() {
        let values: Vec<f64> = (0..100).map(|i| 1e9 + (i % 3) as f64).collect();
        let s: RunningStats = values.iter().copied().collect();
        let expected = naive_sample_std(&values);
        assert!((s.sample_std_dev().unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn push_opt_skips_undefined() {
        let mut s = RunningStats::new();
        s.push_opt(None);
        s.push_opt(Some(1.0));
        s.push_opt(None);
        s.push_opt(Some(3.0));
        assert_eq!(s.count(), 2);
        assert_eq!(s.mean(), Some(2.0));
    }

    #[test]
    fn merge_equals_single_stream() {
        let values = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0];
        let whole: RunningStats = values.iter().copied().collect();

        let mut left: RunningStats = values[..3].iter().copied().collect();
        let right: RunningStats = values[3..].iter().copied().collect();
        left.merge(&right);

        assert_eq!(left.count(), whole.count());
        assert!((left.mean().unwrap() - whole.mean().unwrap()).abs() < 1e-12);
        assert!((left.sample_variance().unwrap() - whole.sample_variance().unwrap()).abs() < 1e-9);
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let mut a: RunningStats = [1.0, 2.0].into_iter().collect();
        let before = a;
        a.merge(&RunningStats::new());
        assert_eq!(a, before);

        let mut empty = RunningStats::new();
        empty.merge(&before);
        assert_eq!(empty, before);
    }
}
