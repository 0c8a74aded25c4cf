//! Streaming quantile estimation (the P² algorithm), used by histograms and
//! summaries so observing a value never grows unbounded memory.

/// Estimates a single quantile over a stream of `f64` observations in O(1)
/// space, using the P² ("Piecewise-Parabolic") algorithm (Jain & Chlamtac,
/// 1985). Accuracy is approximate but converges quickly and never stores
/// the full sample.
#[derive(Debug, Clone)]
pub struct P2Quantile {
    quantile: f64,
    /// Marker heights (observed values at the five tracked positions).
    heights: [f64; 5],
    /// Marker positions (integer counts).
    positions: [f64; 5],
    /// Desired (ideal, possibly fractional) marker positions.
    desired: [f64; 5],
    /// Per-observation increment to the desired positions.
    increments: [f64; 5],
    /// Buffer for the first five observations, before the markers initialize.
    init_buffer: Vec<f64>,
    count: u64,
}

impl P2Quantile {
    /// Creates an estimator for `quantile` (must be in `(0.0, 1.0)`).
    pub fn new(quantile: f64) -> Self {
        let q = quantile.clamp(0.0001, 0.9999);
        Self {
            quantile: q,
            heights: [0.0; 5],
            positions: [1.0, 2.0, 3.0, 4.0, 5.0],
            desired: [1.0, 1.0 + 2.0 * q, 1.0 + 4.0 * q, 3.0 + 2.0 * q, 5.0],
            increments: [0.0, q / 2.0, q, (1.0 + q) / 2.0, 1.0],
            init_buffer: Vec::with_capacity(5),
            count: 0,
        }
    }

    /// Feeds one observation into the estimator.
    pub fn observe(&mut self, value: f64) {
        self.count += 1;

        if self.init_buffer.len() < 5 {
            self.init_buffer.push(value);
            if self.init_buffer.len() == 5 {
                self.init_buffer
                    .sort_by(|a, b| a.partial_cmp(b).unwrap());
                self.heights.copy_from_slice(&self.init_buffer);
            }
            return;
        }

        // Find the cell k (0-indexed) that value falls into, clamping the
        // outer markers if value is a new extreme.
        let mut k;
        if value < self.heights[0] {
            self.heights[0] = value;
            k = 0;
        } else if value >= self.heights[4] {
            self.heights[4] = value;
            k = 3;
        } else {
            k = 0;
            while k < 3 && value >= self.heights[k + 1] {
                k += 1;
            }
        }

        for position in self.positions.iter_mut().skip(k + 1) {
            *position += 1.0;
        }
        for i in 0..5 {
            self.desired[i] += self.increments[i];
        }

        for i in 1..4 {
            let d = self.desired[i] - self.positions[i];
            let right_gap = self.positions[i + 1] - self.positions[i];
            let left_gap = self.positions[i - 1] - self.positions[i];

            if (d >= 1.0 && right_gap > 1.0) || (d <= -1.0 && left_gap < -1.0) {
                let sign = if d >= 0.0 { 1.0 } else { -1.0 };
                let parabolic = self.parabolic(i, sign);
                let new_height = if self.heights[i - 1] < parabolic && parabolic < self.heights[i + 1] {
                    parabolic
                } else {
                    self.linear(i, sign)
                };
                self.heights[i] = new_height;
                self.positions[i] += sign;
            }
        }
    }

    fn parabolic(&self, i: usize, sign: f64) -> f64 {
        let (q, qp, qm) = (self.heights[i], self.heights[i + 1], self.heights[i - 1]);
        let (n, np, nm) = (self.positions[i], self.positions[i + 1], self.positions[i - 1]);
        q + sign / (np - nm)
            * ((n - nm + sign) * (qp - q) / (np - n) + (np - n - sign) * (q - qm) / (n - nm))
    }

    fn linear(&self, i: usize, sign: f64) -> f64 {
        let d = if sign >= 0.0 { i + 1 } else { i - 1 };
        self.heights[i] + sign * (self.heights[d] - self.heights[i]) / (self.positions[d] - self.positions[i])
    }

    /// Returns the current quantile estimate, or `None` if fewer than five
    /// observations have been made.
    pub fn estimate(&self) -> Option<f64> {
        if self.count < 5 {
            if self.init_buffer.is_empty() {
                return None;
            }
            let mut sorted = self.init_buffer.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let rank = ((sorted.len() as f64 - 1.0) * self.quantile).round() as usize;
            return sorted.get(rank).copied();
        }
        Some(self.heights[2])
    }

    /// The number of observations fed so far.
    pub fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_than_five_observations_falls_back_to_exact_rank() {
        let mut est = P2Quantile::new(0.5);
        est.observe(3.0);
        est.observe(1.0);
        est.observe(2.0);
        assert_eq!(est.estimate(), Some(2.0));
    }

    #[test]
    fn converges_near_the_true_median_for_a_uniform_stream() {
        let mut est = P2Quantile::new(0.5);
        for i in 0..=1000 {
            est.observe(i as f64);
        }
        let median = est.estimate().unwrap();
        assert!((median - 500.0).abs() < 50.0, "median estimate was {median}");
    }

    #[test]
    fn p99_skews_high_for_a_uniform_stream() {
        let mut est = P2Quantile::new(0.99);
        for i in 0..=1000 {
            est.observe(i as f64);
        }
        let p99 = est.estimate().unwrap();
        assert!(p99 > 900.0, "p99 estimate was {p99}");
    }

    #[test]
    fn count_tracks_every_observation() {
        let mut est = P2Quantile::new(0.9);
        for i in 0..20 {
            est.observe(i as f64);
        }
        assert_eq!(est.count(), 20);
    }
}
