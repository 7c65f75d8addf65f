//! Synthetic benchmark of separator throughput.

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dsp::center_cut::{CenterCut, CenterCutSettings};
use crate::dsp::fht::TransformTables;
use crate::error::CenterCutError;

/// Configuration parameters for a separator benchmark run.
#[derive(Debug, Clone, Copy)]
pub struct DspBenchConfig {
    pub sample_rate: u32,
    pub input_seconds: f32,
    pub window_size: usize,
    pub overlap_count: usize,
    pub iterations: usize,
}

/// Timing results from a benchmark run.
#[derive(Debug, Clone, Copy)]
pub struct DspBenchResult {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub audio_time_ms: f64,
    pub rt_factor: f64,
    pub blocks: usize,
}

/// Time pushing and draining random stereo input through one separator.
///
/// Tables are built once and shared by every iteration, so only block
/// processing is measured.
///
/// # Errors
/// Returns [`CenterCutError::InvalidConfig`] for unsupported sizes.
pub fn bench_center_cut(config: DspBenchConfig) -> Result<DspBenchResult, CenterCutError> {
    let frames = (config.sample_rate as f32 * config.input_seconds).max(1.0) as usize;
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let input: Vec<f32> = (0..frames * 2)
        .map(|_| rng.gen_range(-1.0_f32..1.0_f32))
        .collect();

    let tables = Arc::new(TransformTables::new(config.window_size, config.overlap_count)?);
    let settings = CenterCutSettings {
        window_size: config.window_size,
        overlap_count: config.overlap_count,
        sample_rate: config.sample_rate,
        ..CenterCutSettings::default()
    };
    let mut output = vec![0.0_f32; input.len()];
    let mut times: Vec<f64> = Vec::with_capacity(config.iterations.max(1));

    for _ in 0..config.iterations.max(1) {
        let mut separator = CenterCut::with_tables(Arc::clone(&tables), &settings);
        let start = Instant::now();
        separator.process_interleaved(&input, &mut output)?;
        times.push(start.elapsed().as_secs_f64() * 1000.0);
    }

    let min_ms = times
        .iter()
        .copied()
        .fold(f64::INFINITY, |a, b| a.min(b));
    let max_ms = times.iter().copied().fold(0.0_f64, |a, b| a.max(b));
    let avg_ms = times.iter().sum::<f64>() / times.len() as f64;
    let audio_time_ms = (frames as f64 / config.sample_rate as f64) * 1000.0;
    let rt_factor = if audio_time_ms > 0.0 {
        avg_ms / audio_time_ms
    } else {
        0.0
    };

    Ok(DspBenchResult {
        avg_ms,
        min_ms: if min_ms.is_finite() { min_ms } else { 0.0 },
        max_ms,
        audio_time_ms,
        rt_factor,
        blocks: frames / tables.hop_size(),
    })
}

/// Run a sweep of window sizes using a shared base configuration.
pub fn bench_center_cut_sweep(
    base: DspBenchConfig,
    window_sizes: &[usize],
) -> Result<Vec<(usize, DspBenchResult)>, CenterCutError> {
    let mut results = Vec::new();
    for &window_size in window_sizes {
        let config = DspBenchConfig { window_size, ..base };
        results.push((window_size, bench_center_cut(config)?));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_run_reports_sane_timings() {
        let result = bench_center_cut(DspBenchConfig {
            sample_rate: 44_100,
            input_seconds: 0.25,
            window_size: 1024,
            overlap_count: 4,
            iterations: 2,
        })
        .expect("bench");
        assert!(result.min_ms <= result.avg_ms && result.avg_ms <= result.max_ms);
        assert_eq!(result.blocks, 11_025 / 256);
        assert!(result.audio_time_ms > 249.0 && result.audio_time_ms < 251.0);
    }
}
