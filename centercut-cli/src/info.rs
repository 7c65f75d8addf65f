//! `centercut info`: levels and dominant frequencies of a WAV region.

use std::path::Path;

use centercut_lib::constants::CHUNK_SIZE;
use centercut_lib::dsp::spectrum::SpectrumAnalyzer;
use centercut_lib::dsp::utility::{
    apply_amplitude_factor, average_power, fft_bin_to_frequency, find_peaks,
    frequency_to_bin_index, low_pass_filter, low_pass_filter_with_initializer, magnitude_to_db,
    mix, phase_cancellation, sample_time_to_seconds, split_stereo, time_to_sample_time,
};
use centercut_lib::CenterCutError;
use clap::ArgMatches;
use log::info;
use serde_json::{json, Value};

use crate::error::CliError;
use crate::wav::read_wav;

/// Smoothing applied across bins before peak picking.
const SPECTRUM_SMOOTHING: f32 = 0.5;

pub fn run(args: &ArgMatches) -> Result<i32, CliError> {
    let input = args
        .get_one::<String>("INPUT")
        .map(Path::new)
        .ok_or_else(|| CliError::Usage("missing INPUT".to_string()))?;
    let start_seconds = args.get_one::<f64>("start").copied().unwrap_or(0.0);
    let duration = args.get_one::<f64>("duration").copied();
    let min_freq = args.get_one::<f32>("min-freq").copied().unwrap_or(20.0);
    let peak_count = args.get_one::<usize>("peaks").copied().unwrap_or(3);

    let audio = read_wav(input)?;
    let channels = audio.channels();
    if channels != 1 && channels != 2 {
        return Err(CenterCutError::InvalidFormat(format!(
            "{} has {} channels, expected 1 or 2",
            input.display(),
            channels
        ))
        .into());
    }
    let sample_rate = audio.spec.sample_rate;
    let total = audio.frames() as u64;

    let start = time_to_sample_time(start_seconds, sample_rate).min(total);
    let end = match duration {
        Some(seconds) => start
            .saturating_add(time_to_sample_time(seconds, sample_rate))
            .min(total),
        None => total,
    };
    let region = &audio.samples[start as usize * channels..end as usize * channels];
    let (left, right) = if channels == 2 {
        split_stereo(region)
    } else {
        (region.to_vec(), region.to_vec())
    };

    let mut mid = mix(&left, &right);
    apply_amplitude_factor(&mut mid, 0.5);
    let side = phase_cancellation(&left, &right);

    let spectrum = average_spectrum(&mid, CHUNK_SIZE)?;
    let min_bin = frequency_to_bin_index(min_freq, sample_rate, CHUNK_SIZE);
    let dominant: Vec<f32> = strongest_peaks(&smooth(&spectrum), min_bin, peak_count)
        .into_iter()
        .map(|bin| fft_bin_to_frequency(bin, sample_rate, CHUNK_SIZE))
        .collect();

    let report = json!({
        "sample_rate": sample_rate,
        "channels": channels,
        "duration_seconds": sample_time_to_seconds(total, sample_rate),
        "region": {
            "start_seconds": sample_time_to_seconds(start, sample_rate),
            "frames": end - start,
        },
        "levels_db": {
            "left": level(&left),
            "right": level(&right),
            "mid": level(&mid),
            "side": level(&side),
        },
        "dominant_hz": dominant,
    });
    let text = serde_json::to_string_pretty(&report).map_err(|err| CliError::Usage(err.to_string()))?;
    println!("{}", text);
    info!("analyzed {} frames of {}", end - start, input.display());
    Ok(0)
}

/// RMS and peak of `samples` in dBFS.
fn level(samples: &[f32]) -> Value {
    let peak = samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
    json!({
        "rms": magnitude_to_db(average_power(samples).sqrt()),
        "peak": magnitude_to_db(peak),
    })
}

/// Mean magnitude spectrum over consecutive `chunk_size` chunks.
///
/// A region shorter than one chunk is zero-padded.
pub fn average_spectrum(samples: &[f32], chunk_size: usize) -> Result<Vec<f32>, CliError> {
    let mut analyzer = SpectrumAnalyzer::new(chunk_size)?;
    let mut sum = vec![0.0_f32; analyzer.bins()];
    let mut magnitudes = vec![0.0_f32; analyzer.bins()];
    let mut padded = vec![0.0_f32; chunk_size];

    let mut chunks = 0;
    for chunk in samples.chunks(chunk_size) {
        if chunks > 0 && chunk.len() < chunk_size {
            break;
        }
        padded.fill(0.0);
        padded[..chunk.len()].copy_from_slice(chunk);
        analyzer.analyze(&padded, &mut magnitudes)?;
        for (total, value) in sum.iter_mut().zip(&magnitudes) {
            *total += value;
        }
        chunks += 1;
    }
    if chunks > 1 {
        apply_amplitude_factor(&mut sum, 1.0 / chunks as f32);
    }
    Ok(sum)
}

/// Zero-phase smoothing: one pass forward, one pass backward.
fn smooth(spectrum: &[f32]) -> Vec<f32> {
    let mut forward = low_pass_filter(spectrum, SPECTRUM_SMOOTHING);
    forward.reverse();
    let initial = forward.first().copied().unwrap_or(0.0);
    let mut smoothed = low_pass_filter_with_initializer(&forward, SPECTRUM_SMOOTHING, initial);
    smoothed.reverse();
    smoothed
}

/// Up to `count` local maxima at or above `min_bin`, loudest first.
pub fn strongest_peaks(spectrum: &[f32], min_bin: usize, count: usize) -> Vec<usize> {
    let mut peaks: Vec<usize> = find_peaks(spectrum)
        .into_iter()
        .filter(|&bin| bin >= min_bin)
        .collect();
    peaks.sort_by(|&a, &b| spectrum[b].total_cmp(&spectrum[a]));
    peaks.truncate(count);
    peaks
}
