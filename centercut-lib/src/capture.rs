//! Push-only live input, e.g. a microphone: raw channels and spectra, no
//! separator.
//!
//! A capture thread hands recorded frames to [`CaptureSource::push_interleaved`].
//! Frames pushed while not recording are dropped. The storage playhead
//! trails the newest frame by one snapshot window, so playhead snapshots
//! always show the most recent audio.

use std::sync::{Arc, Mutex};

use dasp_ring_buffer::Bounded;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::constants::{CHUNK_SIZE, SAMPLE_RATE};
use crate::dsp::spectrum::SpectrumFeed;
use crate::dsp::utility::apply_amplitude_factor;
use crate::error::CenterCutError;
use crate::live::{
    AudioSupplyMode, ChannelId, CircularAudioStorage, LiveAudioChannelData, LiveAudioData,
    LiveAudioSupplier, LiveSamples, LiveSpectrum, LiveStorageSettings,
};

/// Configuration for a [`CaptureSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub sample_rate: u32,
    /// 1 (mono, duplicated to both sides) or 2.
    pub channels: u16,
    /// Frames kept in the latest-chunk buffer.
    pub latest_chunk_frames: usize,
    pub storage: LiveStorageSettings,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: 1,
            latest_chunk_frames: CHUNK_SIZE,
            storage: LiveStorageSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Stopped,
    Recording,
    Paused,
}

/// The newest frames and spectral chunk per channel.
struct LatestChunk {
    samples: [Bounded<Vec<f32>>; 2],
    spectrum: [Vec<f32>; 2],
    spectrum_start: u64,
    bins: usize,
}

impl LatestChunk {
    fn new(frames: usize, bins: usize) -> Self {
        let ring = || Bounded::from(vec![0.0; frames.max(1)]);
        Self {
            samples: [ring(), ring()],
            spectrum: [Vec::with_capacity(bins), Vec::with_capacity(bins)],
            spectrum_start: 0,
            bins,
        }
    }

    fn clear(&mut self) {
        for (samples, spectrum) in self.samples.iter_mut().zip(self.spectrum.iter_mut()) {
            while samples.pop().is_some() {}
            spectrum.clear();
        }
        self.spectrum_start = 0;
    }

    fn channel(&self, index: usize, end_frame: u64) -> LiveAudioChannelData {
        let samples = &self.samples[index];
        if samples.is_empty() {
            return LiveAudioChannelData::empty();
        }
        let spectrum = &self.spectrum[index];
        LiveAudioChannelData {
            contains_data: true,
            samples: LiveSamples {
                time_in_frames: end_frame - samples.len() as u64,
                data: samples.iter().copied().collect(),
            },
            spectrum: LiveSpectrum {
                time_in_frames: self.spectrum_start,
                data: spectrum.clone(),
                chunk_count: usize::from(!spectrum.is_empty()),
                bins_per_chunk: self.bins,
            },
        }
    }
}

struct Recorder {
    state: CaptureState,
    gain: f32,
    feeds: [SpectrumFeed; 2],
    /// Absolute frame of the next recorded frame.
    position: u64,
    /// Spectral chunks emitted since the last restart.
    chunks_emitted: u64,
    left: Vec<f32>,
    right: Vec<f32>,
    chunks: [Vec<f32>; 2],
    latest: LatestChunk,
}

impl Recorder {
    fn restart(&mut self) {
        for feed in self.feeds.iter_mut() {
            feed.reset();
        }
        self.position = 0;
        self.chunks_emitted = 0;
        self.latest.clear();
    }
}

/// A recording input feeding its own live storage.
///
/// Only the left and right channels are filled; the extracted channel stays
/// empty. Reports [`AudioSupplyMode::Regular`] while recording.
pub struct CaptureSource {
    channels: usize,
    spectrum_hop: usize,
    snapshot_window: usize,
    recorder: Mutex<Recorder>,
    storage: Arc<Mutex<CircularAudioStorage>>,
}

impl CaptureSource {
    /// # Errors
    /// Returns [`CenterCutError::InvalidConfig`] for an unsupported channel
    /// count or invalid storage settings.
    pub fn new(settings: &CaptureSettings) -> Result<Self, CenterCutError> {
        if settings.channels != 1 && settings.channels != 2 {
            return Err(CenterCutError::InvalidConfig(format!(
                "{} capture channels unsupported, expected 1 or 2",
                settings.channels
            )));
        }
        if settings.latest_chunk_frames == 0 {
            return Err(CenterCutError::InvalidConfig(
                "latest chunk must hold at least one frame".to_string(),
            ));
        }

        let storage = CircularAudioStorage::new(&settings.storage)?;
        let chunk_size = settings.storage.chunk_size;
        let spectrum_hop = storage.spectrum_hop();
        let feeds = [
            SpectrumFeed::new(chunk_size, spectrum_hop)?,
            SpectrumFeed::new(chunk_size, spectrum_hop)?,
        ];

        info!(
            "capture source: {} Hz, {} channel(s)",
            settings.sample_rate, settings.channels
        );

        Ok(Self {
            channels: settings.channels as usize,
            spectrum_hop,
            snapshot_window: storage.snapshot_window(),
            recorder: Mutex::new(Recorder {
                state: CaptureState::Stopped,
                gain: 1.0,
                feeds,
                position: 0,
                chunks_emitted: 0,
                left: Vec::new(),
                right: Vec::new(),
                chunks: [Vec::new(), Vec::new()],
                latest: LatestChunk::new(settings.latest_chunk_frames, chunk_size / 2),
            }),
            storage: Arc::new(Mutex::new(storage)),
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn state(&self) -> CaptureState {
        self.recorder.lock().unwrap().state
    }

    pub fn is_recording(&self) -> bool {
        self.state() == CaptureState::Recording
    }

    /// Absolute frame the next recorded frame will get.
    pub fn position(&self) -> u64 {
        self.recorder.lock().unwrap().position
    }

    pub fn storage(&self) -> Arc<Mutex<CircularAudioStorage>> {
        Arc::clone(&self.storage)
    }

    /// Start a fresh recording at frame 0, discarding anything buffered.
    pub fn start_recording(&self) {
        let mut recorder = self.recorder.lock().unwrap();
        recorder.restart();
        recorder.state = CaptureState::Recording;
        self.storage.lock().unwrap().reset(0);
        debug!("capture started");
    }

    /// Stop recording. Buffered audio stays readable until the next start.
    pub fn stop_recording(&self) {
        self.recorder.lock().unwrap().state = CaptureState::Stopped;
        debug!("capture stopped");
    }

    pub fn pause_recording(&self) {
        let mut recorder = self.recorder.lock().unwrap();
        if recorder.state == CaptureState::Recording {
            recorder.state = CaptureState::Paused;
            debug!("capture paused");
        }
    }

    /// Continue recording after a pause or stop, keeping the timeline.
    pub fn resume_recording(&self) {
        let mut recorder = self.recorder.lock().unwrap();
        if recorder.state != CaptureState::Recording {
            recorder.state = CaptureState::Recording;
            debug!("capture resumed at frame {}", recorder.position);
        }
    }

    /// Hand recorded interleaved frames to the capture.
    ///
    /// # Returns
    /// Number of frames stored; `0` when not recording.
    ///
    /// # Errors
    /// Propagates spectrum failures.
    pub fn push_interleaved(&self, samples: &[f32]) -> Result<usize, CenterCutError> {
        let mut recorder = self.recorder.lock().unwrap();
        if recorder.state != CaptureState::Recording {
            return Ok(0);
        }

        let Recorder {
            gain,
            feeds,
            position,
            chunks_emitted,
            left,
            right,
            chunks,
            latest,
            ..
        } = &mut *recorder;

        left.clear();
        right.clear();
        if self.channels == 1 {
            left.extend_from_slice(samples);
            right.extend_from_slice(samples);
        } else {
            for frame in samples.chunks_exact(2) {
                left.push(frame[0]);
                right.push(frame[1]);
            }
        }
        apply_amplitude_factor(left, *gain);
        apply_amplitude_factor(right, *gain);

        let mut emitted = 0;
        for ((feed, chunk), input) in feeds.iter_mut().zip(chunks.iter_mut()).zip([&*left, &*right]) {
            chunk.clear();
            emitted = feed.push(input, chunk)?;
        }

        for ((ring, spectrum), (input, chunk)) in latest
            .samples
            .iter_mut()
            .zip(latest.spectrum.iter_mut())
            .zip([(&*left, &chunks[0]), (&*right, &chunks[1])])
        {
            for &sample in input.iter() {
                let _ = ring.push(sample);
            }
            if emitted > 0 {
                spectrum.clear();
                spectrum.extend_from_slice(&chunk[chunk.len() - latest.bins..]);
            }
        }
        if emitted > 0 {
            *chunks_emitted += emitted as u64;
            latest.spectrum_start = (*chunks_emitted - 1) * self.spectrum_hop as u64;
        }

        let frames = left.len();
        *position += frames as u64;

        let mut storage = self.storage.lock().unwrap();
        storage.add_stereo_samples(left, right);
        storage.add_spectrum(ChannelId::Left, &chunks[0]);
        storage.add_spectrum(ChannelId::Right, &chunks[1]);
        storage.set_playhead(position.saturating_sub(self.snapshot_window as u64));
        Ok(frames)
    }

    /// The newest recorded frames and spectral chunk of each channel.
    pub fn latest_chunk(&self) -> LiveAudioData {
        let recorder = self.recorder.lock().unwrap();
        let end = recorder.position;
        let channel1 = recorder.latest.channel(0, end);
        LiveAudioData {
            time_in_frames: channel1.samples.time_in_frames,
            channel1,
            channel2: recorder.latest.channel(1, end),
            extracted: LiveAudioChannelData::empty(),
        }
    }
}

impl LiveAudioSupplier for CaptureSource {
    fn live_audio_data(&self) -> LiveAudioData {
        self.storage.lock().unwrap().snapshot()
    }

    fn live_audio_window(&self, frames: usize) -> LiveAudioData {
        let storage = self.storage.lock().unwrap();
        storage.snapshot_range(storage.playhead(), frames)
    }

    fn live_audio_at(&self, frame: u64, frames: usize) -> LiveAudioData {
        self.storage.lock().unwrap().snapshot_range(frame, frames)
    }

    fn audio_supply_mode(&self) -> AudioSupplyMode {
        match self.state() {
            CaptureState::Recording => AudioSupplyMode::Regular,
            CaptureState::Paused | CaptureState::Stopped => AudioSupplyMode::NotSupplying,
        }
    }

    fn amplitude_factor(&self) -> f32 {
        self.recorder.lock().unwrap().gain
    }

    /// Scale applied to recorded frames from the next push on.
    fn set_amplitude_factor(&self, factor: f32) {
        self.recorder.lock().unwrap().gain = factor;
    }
}
