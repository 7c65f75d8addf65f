//! Decaying feedback-delay tail rendered when a source pauses.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dsp::spectrum::SpectrumFeed;
use crate::error::CenterCutError;
use crate::live::{ChannelId, CircularAudioStorage, LiveAudioData, LiveStorageSettings};

const DEFAULT_DELAY_MS: f32 = 100.0;
const DEFAULT_DECAY_MS: f32 = 1500.0;
const MAX_FEEDBACK: f32 = 0.95;

/// Reverb tail played out after [`super::StereoSource::pause`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PauseReverbSettings {
    pub enabled: bool,
    /// Time for the tail to fall by 60 dB.
    pub decay_ms: f32,
    /// Wet share of the output. The dry share is silent once paused.
    #[serde(alias = "dry_wet", alias = "wet_dry")]
    pub dry_wet_mix: f32,
    /// Length of one pass through the delay line.
    pub delay_ms: f32,
}

impl Default for PauseReverbSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            decay_ms: DEFAULT_DECAY_MS,
            dry_wet_mix: 0.5,
            delay_ms: DEFAULT_DELAY_MS,
        }
    }
}

impl PauseReverbSettings {
    /// # Errors
    /// Returns [`CenterCutError::InvalidConfig`] naming the bad field.
    pub fn validate(&self) -> Result<(), CenterCutError> {
        if !self.decay_ms.is_finite() || self.decay_ms < 0.0 {
            return Err(CenterCutError::InvalidConfig(format!(
                "reverb decay {} ms must be >= 0",
                self.decay_ms
            )));
        }
        if !self.delay_ms.is_finite() || self.delay_ms <= 0.0 {
            return Err(CenterCutError::InvalidConfig(format!(
                "reverb delay {} ms must be > 0",
                self.delay_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.dry_wet_mix) {
            return Err(CenterCutError::InvalidConfig(format!(
                "reverb dry/wet mix {} must be in [0, 1]",
                self.dry_wet_mix
            )));
        }
        Ok(())
    }

    /// Gain per delay pass so the tail is down 60 dB after `decay_ms`.
    pub fn feedback(&self) -> f32 {
        if self.decay_ms <= 0.0 {
            return 0.0;
        }
        10_f32
            .powf(-3.0 * self.delay_ms / self.decay_ms)
            .min(MAX_FEEDBACK)
    }

    pub fn delay_frames(&self, sample_rate: u32) -> usize {
        ms_to_frames(self.delay_ms, sample_rate).max(1)
    }

    pub fn tail_frames(&self, sample_rate: u32) -> usize {
        ms_to_frames(self.decay_ms, sample_rate)
    }
}

pub fn ms_to_frames(ms: f32, sample_rate: u32) -> usize {
    (ms.max(0.0) as f64 * sample_rate as f64 / 1000.0).round() as usize
}

/// Mono feedback delay line.
#[derive(Debug, Clone)]
pub struct DelayLine {
    line: Vec<f32>,
    write_pos: usize,
    feedback: f32,
}

impl DelayLine {
    pub fn new(delay_frames: usize, feedback: f32) -> Self {
        Self {
            line: vec![0.0; delay_frames.max(1)],
            write_pos: 0,
            feedback,
        }
    }

    /// Run heard audio through the line without producing output.
    pub fn feed(&mut self, samples: &[f32]) {
        for &sample in samples {
            let delayed = self.line[self.write_pos];
            self.line[self.write_pos] = sample + delayed * self.feedback;
            self.step();
        }
    }

    /// Append `frames` of echo with silent input, scaled by `wet`.
    pub fn drain_into(&mut self, frames: usize, wet: f32, out: &mut Vec<f32>) {
        out.reserve(frames);
        for _ in 0..frames {
            let delayed = self.line[self.write_pos];
            out.push(delayed * wet);
            self.line[self.write_pos] = delayed * self.feedback;
            self.step();
        }
    }

    fn step(&mut self) {
        self.write_pos += 1;
        if self.write_pos >= self.line.len() {
            self.write_pos = 0;
        }
    }
}

/// Build a storage holding the tail that follows `history`.
///
/// `history` is what was heard up to the pause; the tail starts at
/// `start_frame` and has the same channels as `history`.
///
/// # Returns
/// `None` when there is nothing to reverberate.
///
/// # Errors
/// Propagates storage or spectrum failures.
pub fn render_tail(
    history: &LiveAudioData,
    start_frame: u64,
    tail_frames: usize,
    settings: &PauseReverbSettings,
    sample_rate: u32,
    storage: &LiveStorageSettings,
) -> Result<Option<CircularAudioStorage>, CenterCutError> {
    if tail_frames == 0 || !history.contains_data() {
        return Ok(None);
    }

    let hop = storage.effective_spectrum_hop();
    let tail_settings = LiveStorageSettings {
        samples_capacity: tail_frames,
        spectrum_capacity_chunks: tail_frames / hop + 1,
        amplitude_factor: 1.0,
        ..storage.clone()
    };
    let mut tail = CircularAudioStorage::new(&tail_settings)?;
    tail.reset(start_frame);

    let delay = settings.delay_frames(sample_rate);
    let mut rendered: [Vec<f32>; 3] = Default::default();
    for (id, out) in ChannelId::ALL.iter().zip(rendered.iter_mut()) {
        let channel = history.channel(*id);
        if !channel.contains_data {
            continue;
        }
        let mut line = DelayLine::new(delay, settings.feedback());
        line.feed(&channel.samples.data);
        line.drain_into(tail_frames, settings.dry_wet_mix, out);

        let mut chunks = Vec::new();
        SpectrumFeed::new(storage.chunk_size, hop)?.push(out, &mut chunks)?;
        tail.add_spectrum(*id, &chunks);
    }
    let [left, right, extracted] = &rendered;
    tail.add_stereo_samples(left, right);
    tail.add_extracted_samples(extracted);

    debug!(
        "reverb tail: {} frames from frame {}, feedback {:.3}",
        tail_frames,
        start_frame,
        settings.feedback()
    );
    Ok(Some(tail))
}
