//! Deterministic synthetic signals used by tests and benchmarks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sine wave of `frames` samples.
pub fn sine(frequency: f32, sample_rate: u32, frames: usize, amplitude: f32) -> Vec<f32> {
    let step = std::f64::consts::TAU * frequency as f64 / sample_rate.max(1) as f64;
    (0..frames)
        .map(|i| amplitude * (step * i as f64).sin() as f32)
        .collect()
}

/// Uniform noise in `[-amplitude, amplitude)`, reproducible from `seed`.
pub fn white_noise(frames: usize, seed: u64, amplitude: f32) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..frames)
        .map(|_| rng.gen_range(-1.0_f32..1.0_f32) * amplitude)
        .collect()
}

/// Interleave two equal-length channels.
pub fn interleave(left: &[f32], right: &[f32]) -> Vec<f32> {
    crate::dsp::utility::combine_stereo(left, right)
}

/// Convenience bundle of common stereo fixtures.
pub struct TestData {
    pub sample_rate: u32,
}

impl TestData {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Same tone on both channels: entirely center content.
    pub fn centered_tone(&self, frequency: f32, frames: usize) -> Vec<f32> {
        let tone = sine(frequency, self.sample_rate, frames, 0.5);
        interleave(&tone, &tone)
    }

    /// Tone on the left channel only: entirely side content.
    pub fn hard_left_tone(&self, frequency: f32, frames: usize) -> Vec<f32> {
        let tone = sine(frequency, self.sample_rate, frames, 0.5);
        interleave(&tone, &vec![0.0; frames])
    }

    /// Independent noise on each channel.
    pub fn stereo_noise(&self, frames: usize, seed: u64) -> Vec<f32> {
        let left = white_noise(frames, seed, 0.5);
        let right = white_noise(frames, seed.wrapping_add(1), 0.5);
        interleave(&left, &right)
    }
}
