//! In-place fast Hartley transform and the tables the separator needs.
//!
//! The kernel expects its input in bit-reversed order and produces the
//! transform in natural order. Applying it twice (with the bit-reversal in
//! between) yields `n` times the original signal; the separator folds that
//! scale into its pre- and post-windows rather than normalizing here.

use std::f64::consts::{FRAC_1_SQRT_2, TAU};

use crate::error::CenterCutError;

/// Mean value of `(0.5 * (1 - cos))^p` over one period, indexed by `p`.
const POWER_INTEGRALS: [f64; 8] = [
    1.0,
    1.0 / 2.0,
    3.0 / 8.0,
    5.0 / 16.0,
    35.0 / 128.0,
    63.0 / 256.0,
    231.0 / 1024.0,
    429.0 / 2048.0,
];

/// Check a window/overlap pair without building tables.
///
/// # Errors
/// Returns [`CenterCutError::InvalidConfig`] naming the rejected size.
pub fn validate_sizes(window_size: usize, overlap_count: usize) -> Result<(), CenterCutError> {
    if window_size < 16 || !window_size.is_power_of_two() {
        return Err(CenterCutError::InvalidConfig(format!(
            "window size {} must be a power of two >= 16",
            window_size
        )));
    }
    if overlap_count < 2 || !overlap_count.is_power_of_two() || overlap_count > window_size / 8 {
        return Err(CenterCutError::InvalidConfig(format!(
            "overlap count {} must be a power of two in [2, {}]",
            overlap_count,
            window_size / 8
        )));
    }
    Ok(())
}

/// Precomputed permutation, sine and window tables for one window size.
///
/// Immutable after construction; a single instance can be shared between
/// separators through an `Arc`.
#[derive(Debug, Clone)]
pub struct TransformTables {
    window_size: usize,
    overlap_count: usize,
    bit_rev: Vec<usize>,
    sine: Vec<f64>,
    pre_window: Vec<f64>,
    post_window: Vec<f64>,
}

impl TransformTables {
    /// Build tables for `window_size` frames split into `overlap_count` hops.
    ///
    /// # Errors
    /// Returns [`CenterCutError::InvalidConfig`] unless `window_size` is a
    /// power of two of at least 16 and `overlap_count` is a power of two
    /// between 2 and `window_size / 8`.
    pub fn new(window_size: usize, overlap_count: usize) -> Result<Self, CenterCutError> {
        validate_sizes(window_size, overlap_count)?;

        let bit_rev = bit_reversal_table(window_size);
        let sine = half_sine_table(window_size);

        // The Hartley <-> Fourier conversion carries a 0.5 in each direction.
        // Both are omitted in the block math and folded in here instead.
        let raised = raised_cosine_window(window_size, 1.0);
        let pre_scale = 0.5 * (2.0 / overlap_count as f64);
        let pre_window = bit_rev
            .iter()
            .map(|&index| raised[index] * pre_scale)
            .collect();

        let post_window = post_window(window_size, post_window_power(overlap_count));

        Ok(Self {
            window_size,
            overlap_count,
            bit_rev,
            sine,
            pre_window,
            post_window,
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn overlap_count(&self) -> usize {
        self.overlap_count
    }

    /// Number of new input frames consumed per block.
    pub fn hop_size(&self) -> usize {
        self.window_size / self.overlap_count
    }

    pub fn bit_rev(&self) -> &[usize] {
        &self.bit_rev
    }

    pub fn sine(&self) -> &[f64] {
        &self.sine
    }

    pub fn pre_window(&self) -> &[f64] {
        &self.pre_window
    }

    pub fn post_window(&self) -> &[f64] {
        &self.post_window
    }
}

/// Run an in-place Hartley transform over `buffer`.
///
/// `buffer` must hold bit-reversed input and have the same power-of-two
/// length as `sine_table` (at least 8). The output is unscaled.
pub fn compute_fht(buffer: &mut [f64], sine_table: &[f64]) {
    let n_points = buffer.len();
    debug_assert!(n_points >= 8 && n_points.is_power_of_two());
    debug_assert_eq!(n_points, sine_table.len());
    let a = buffer;

    // Stages 1 and 2 (2 and 4 points).
    for i in (0..n_points).step_by(4) {
        let x0 = a[i];
        let x1 = a[i + 1];
        let x2 = a[i + 2];
        let x3 = a[i + 3];

        let y0 = x0 + x1;
        let y1 = x0 - x1;
        let y2 = x2 + x3;
        let y3 = x2 - x3;

        a[i] = y0 + y2;
        a[i + 2] = y0 - y2;
        a[i + 1] = y1 + y3;
        a[i + 3] = y1 - y3;
    }

    // Stage 3 (8 points).
    for i in (0..n_points).step_by(8) {
        let alpha = a[i];
        let beta = a[i + 4];
        a[i] = alpha + beta;
        a[i + 4] = alpha - beta;

        let alpha = a[i + 2];
        let beta = a[i + 6];
        a[i + 2] = alpha + beta;
        a[i + 6] = alpha - beta;

        let beta1 = FRAC_1_SQRT_2 * (a[i + 5] + a[i + 7]);
        let beta2 = FRAC_1_SQRT_2 * (a[i + 5] - a[i + 7]);

        let alpha = a[i + 1];
        a[i + 1] = alpha + beta1;
        a[i + 5] = alpha - beta1;

        let alpha = a[i + 3];
        a[i + 3] = alpha + beta2;
        a[i + 7] = alpha - beta2;
    }

    let quarter = n_points >> 2;
    let mut n = 16;
    let mut n2 = 8;
    let mut theta_inc = n_points >> 4;

    while n <= n_points {
        let n4 = n2 >> 1;
        for i in (0..n_points).step_by(n) {
            let alpha = a[i];
            let beta = a[i + n2];
            a[i] = alpha + beta;
            a[i + n2] = alpha - beta;

            let alpha = a[i + n4];
            let beta = a[i + n2 + n4];
            a[i + n4] = alpha + beta;
            a[i + n2 + n4] = alpha - beta;

            let mut theta = theta_inc;
            for j in 1..n4 {
                let sinval = sine_table[theta];
                let cosval = sine_table[theta + quarter];

                let alpha1 = a[i + j];
                let alpha2 = a[i + n2 - j];
                let beta1 = a[i + n2 + j] * cosval + a[i + n - j] * sinval;
                let beta2 = a[i + n2 + j] * sinval - a[i + n - j] * cosval;

                theta += theta_inc;

                a[i + j] = alpha1 + beta1;
                a[i + n2 + j] = alpha1 - beta1;
                a[i + n2 - j] = alpha2 + beta2;
                a[i + n - j] = alpha2 - beta2;
            }
        }

        n <<= 1;
        n2 <<= 1;
        theta_inc >>= 1;
    }
}

fn bit_reversal_table(n: usize) -> Vec<usize> {
    let bits = n.trailing_zeros();
    (0..n)
        .map(|i| i.reverse_bits() >> (usize::BITS - bits))
        .collect()
}

fn half_sine_table(n: usize) -> Vec<f64> {
    let step = TAU / n as f64;
    (0..n).map(|i| (step * i as f64).sin()).collect()
}

/// Raised-cosine window sampled at bin centers, scaled by `1/n`.
fn raised_cosine_window(n: usize, power: f64) -> Vec<f64> {
    let step = TAU / n as f64;
    let scale = 1.0 / n as f64;
    (0..n)
        .map(|i| scale * (0.5 * (1.0 - (step * (i as f64 + 0.5)).cos())).powf(power))
        .collect()
}

/// Highest post-window power that still overlap-adds to a constant.
fn post_window_power(overlap_count: usize) -> usize {
    overlap_count.saturating_sub(2).min(2)
}

fn post_window(n: usize, power: usize) -> Vec<f64> {
    let scale = n as f64 * (POWER_INTEGRALS[1] / POWER_INTEGRALS[power + 1]);
    raised_cosine_window(n, power as f64)
        .into_iter()
        .map(|value| value * scale)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_hartley(input: &[f64]) -> Vec<f64> {
        let n = input.len();
        (0..n)
            .map(|k| {
                input
                    .iter()
                    .enumerate()
                    .map(|(t, x)| {
                        let angle = TAU * (k * t) as f64 / n as f64;
                        x * (angle.cos() + angle.sin())
                    })
                    .sum()
            })
            .collect()
    }

    fn test_signal(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| ((i * 7 + 3) % 11) as f64 - 5.0 + (i as f64 * 0.37).sin())
            .collect()
    }

    #[test]
    fn rejects_unsupported_sizes() {
        assert!(TransformTables::new(1000, 4).is_err());
        assert!(TransformTables::new(8, 2).is_err());
        assert!(TransformTables::new(8192, 3).is_err());
        assert!(TransformTables::new(8192, 1).is_err());
        assert!(TransformTables::new(8192, 4).is_ok());
    }

    #[test]
    fn default_tables_hop_is_quarter_window() {
        let tables = TransformTables::new(8192, 4).expect("tables");
        assert_eq!(tables.hop_size(), 2048);
        assert_eq!(tables.bit_rev().len(), 8192);
        assert_eq!(tables.bit_rev()[1], 4096);
        assert_eq!(tables.bit_rev()[4096], 1);
    }

    #[test]
    fn bit_reversal_is_an_involution() {
        let tables = TransformTables::new(64, 4).expect("tables");
        for (i, &j) in tables.bit_rev().iter().enumerate() {
            assert_eq!(tables.bit_rev()[j], i);
        }
    }

    #[test]
    fn matches_naive_hartley_transform() {
        for n in [16_usize, 64, 256] {
            let tables = TransformTables::new(n, 2).expect("tables");
            let signal = test_signal(n);
            let mut buffer: Vec<f64> = tables.bit_rev().iter().map(|&j| signal[j]).collect();
            compute_fht(&mut buffer, tables.sine());

            let expected = naive_hartley(&signal);
            for (got, want) in buffer.iter().zip(expected.iter()) {
                assert!((got - want).abs() < 1e-9, "n={} got {} want {}", n, got, want);
            }
        }
    }

    #[test]
    fn transform_is_its_own_inverse_up_to_n() {
        let n = 8192;
        let tables = TransformTables::new(n, 4).expect("tables");
        let signal = test_signal(n);

        let mut forward: Vec<f64> = tables.bit_rev().iter().map(|&j| signal[j]).collect();
        compute_fht(&mut forward, tables.sine());
        let mut inverse: Vec<f64> = tables.bit_rev().iter().map(|&j| forward[j]).collect();
        compute_fht(&mut inverse, tables.sine());

        for (got, want) in inverse.iter().zip(signal.iter()) {
            assert!((got / n as f64 - want).abs() < 1e-9);
        }
    }

    #[test]
    fn windows_overlap_add_to_unity() {
        let tables = TransformTables::new(256, 4).expect("tables");
        let n = tables.window_size();
        let hop = tables.hop_size();
        let mut natural_pre = vec![0.0; n];
        for (i, &j) in tables.bit_rev().iter().enumerate() {
            natural_pre[j] = tables.pre_window()[i];
        }
        for offset in 0..hop {
            let mut sum = 0.0;
            let mut index = offset;
            while index < n {
                // A fully correlated bin doubles the windowed input.
                sum += 2.0 * natural_pre[index] * n as f64 * tables.post_window()[index];
                index += hop;
            }
            assert!((sum - 1.0).abs() < 1e-9, "offset {} sum {}", offset, sum);
        }
    }
}
