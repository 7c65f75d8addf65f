//! Small sample-buffer helpers shared by sources, the mixer and the CLI.

/// Split interleaved stereo into separate left and right buffers.
pub fn split_stereo(interleaved: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let frames = interleaved.len() / 2;
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    for frame in interleaved.chunks_exact(2) {
        left.push(frame[0]);
        right.push(frame[1]);
    }
    (left, right)
}

/// Interleave two channels, truncating to the shorter one.
pub fn combine_stereo(left: &[f32], right: &[f32]) -> Vec<f32> {
    left.iter()
        .zip(right.iter())
        .flat_map(|(&l, &r)| [l, r])
        .collect()
}

pub fn apply_amplitude_factor(samples: &mut [f32], factor: f32) {
    if factor == 1.0 {
        return;
    }
    for sample in samples.iter_mut() {
        *sample *= factor;
    }
}

/// Mono side signal `(left - right) / 2`.
pub fn phase_cancellation(left: &[f32], right: &[f32]) -> Vec<f32> {
    left.iter()
        .zip(right.iter())
        .map(|(&l, &r)| (l - r) * 0.5)
        .collect()
}

/// Zero-latency karaoke: replace both channels of each interleaved frame
/// with `(L - R) / 2`.
pub fn classic_karaoke(interleaved: &mut [f32]) {
    for frame in interleaved.chunks_exact_mut(2) {
        let side = (frame[0] - frame[1]) * 0.5;
        frame[0] = side;
        frame[1] = side;
    }
}

/// Scale `samples` so the loudest one reaches full scale.
///
/// Silent input is returned unchanged.
pub fn normalize(samples: &[f32]) -> Vec<f32> {
    let peak = samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
    if peak <= f32::EPSILON {
        return samples.to_vec();
    }
    samples.iter().map(|s| s / peak).collect()
}

/// Mean square of `samples`, or `0.0` for an empty slice.
pub fn average_power(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32
}

/// Convert a linear magnitude to decibels, floored at -180 dB.
pub fn magnitude_to_db(magnitude: f32) -> f32 {
    20.0 * magnitude.max(1e-9).log10()
}

/// Sample-wise sum of two buffers over their common length.
pub fn mix(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter().zip(b.iter()).map(|(x, y)| x + y).collect()
}

/// One-pole low-pass filter starting from rest.
pub fn low_pass_filter(samples: &[f32], beta: f32) -> Vec<f32> {
    low_pass_filter_with_initializer(samples, beta, 0.0)
}

/// One-pole low-pass filter `y += beta * (x - y)` seeded with `initial`.
pub fn low_pass_filter_with_initializer(samples: &[f32], beta: f32, initial: f32) -> Vec<f32> {
    let beta = beta.clamp(0.0, 1.0);
    let mut state = initial;
    samples
        .iter()
        .map(|&x| {
            state += beta * (x - state);
            state
        })
        .collect()
}

/// Indices of strict local maxima.
pub fn find_peaks(data: &[f32]) -> Vec<usize> {
    if data.len() < 3 {
        return Vec::new();
    }
    (1..data.len() - 1)
        .filter(|&i| data[i] > data[i - 1] && data[i] > data[i + 1])
        .collect()
}

pub fn fft_bin_to_frequency(bin: usize, sample_rate: u32, chunk_size: usize) -> f32 {
    if chunk_size == 0 {
        return 0.0;
    }
    bin as f32 * sample_rate as f32 / chunk_size as f32
}

pub fn frequency_to_bin_index(frequency: f32, sample_rate: u32, chunk_size: usize) -> usize {
    if sample_rate == 0 {
        return 0;
    }
    (frequency.max(0.0) * chunk_size as f32 / sample_rate as f32).round() as usize
}

pub fn time_to_sample_time(seconds: f64, sample_rate: u32) -> u64 {
    (seconds.max(0.0) * sample_rate as f64).round() as u64
}

pub fn sample_time_to_seconds(frames: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 / sample_rate as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_and_combine_are_inverse() {
        let interleaved = vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0];
        let (left, right) = split_stereo(&interleaved);
        assert_eq!(left, vec![1.0, 2.0, 3.0]);
        assert_eq!(right, vec![-1.0, -2.0, -3.0]);
        assert_eq!(combine_stereo(&left, &right), interleaved);
    }

    #[test]
    fn classic_karaoke_removes_identical_content() {
        let mut frames = vec![0.5, 0.5, 0.75, 0.25];
        classic_karaoke(&mut frames);
        assert_eq!(frames, vec![0.0, 0.0, 0.25, 0.25]);
        assert_eq!(phase_cancellation(&[1.0], &[0.0]), vec![0.5]);
    }

    #[test]
    fn normalize_scales_to_full_scale() {
        assert_eq!(normalize(&[0.25, -0.5]), vec![0.5, -1.0]);
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn power_and_decibels() {
        assert_eq!(average_power(&[]), 0.0);
        assert!((average_power(&[1.0, -1.0, 0.0, 0.0]) - 0.5).abs() < 1e-6);
        assert!((magnitude_to_db(1.0)).abs() < 1e-6);
        assert!((magnitude_to_db(0.1) + 20.0).abs() < 1e-4);
        assert!((magnitude_to_db(0.0) + 180.0).abs() < 1e-3);
    }

    #[test]
    fn low_pass_converges_and_resumes_from_a_seed() {
        let step = vec![1.0; 64];
        let filtered = low_pass_filter(&step, 0.25);
        assert!(filtered[0] > 0.2 && filtered[0] < 0.3);
        assert!(filtered[63] > 0.999);

        let resumed = low_pass_filter_with_initializer(&step[10..15], 0.5, 1.0);
        assert_eq!(resumed, vec![1.0; 5]);
    }

    #[test]
    fn peaks_are_strict_local_maxima() {
        assert_eq!(find_peaks(&[0.0, 1.0, 0.0, 2.0, 2.0, 0.0, 3.0, 1.0]), vec![1, 6]);
        assert!(find_peaks(&[1.0, 2.0]).is_empty());
    }

    #[test]
    fn conversions() {
        assert_eq!(fft_bin_to_frequency(64, 44_100, 2048), 1378.125);
        assert_eq!(frequency_to_bin_index(1378.125, 44_100, 2048), 64);
        assert_eq!(time_to_sample_time(1.5, 48_000), 72_000);
        assert_eq!(sample_time_to_seconds(22_050, 44_100), 0.5);
        assert_eq!(mix(&[1.0, 2.0, 3.0], &[1.0, 1.0]), vec![2.0, 3.0]);
    }
}
