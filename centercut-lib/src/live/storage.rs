//! Three-channel live storage: left, right and the extracted center.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::{CHUNK_SIZE, SAMPLES_RING_CAPACITY, SPECTRUM_RING_CHUNKS};
use crate::dsp::utility::apply_amplitude_factor;
use crate::error::CenterCutError;
use crate::live::snapshot::{ChannelId, LiveAudioChannelData, LiveAudioData};
use crate::live::stream::CircularAudioStream;

/// Ring sizes and analysis parameters for a [`CircularAudioStorage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveStorageSettings {
    /// Frames kept per channel.
    pub samples_capacity: usize,
    /// Spectral chunks kept per channel.
    pub spectrum_capacity_chunks: usize,
    /// Samples per spectral chunk; each chunk has half as many bins.
    pub chunk_size: usize,
    /// Frames between consecutive chunk starts.
    pub spectrum_hop: usize,
    /// Frames returned by a playhead snapshot.
    pub snapshot_window: usize,
    /// Scale applied to the extracted channel as it is stored.
    pub amplitude_factor: f32,
}

impl Default for LiveStorageSettings {
    fn default() -> Self {
        Self {
            samples_capacity: SAMPLES_RING_CAPACITY,
            spectrum_capacity_chunks: SPECTRUM_RING_CHUNKS,
            chunk_size: CHUNK_SIZE,
            spectrum_hop: CHUNK_SIZE,
            snapshot_window: CHUNK_SIZE,
            amplitude_factor: 1.0,
        }
    }
}

impl LiveStorageSettings {
    /// Reject sizes the rings or the spectrum path cannot work with.
    ///
    /// # Errors
    /// Returns [`CenterCutError::InvalidConfig`] naming the bad field.
    pub fn validate(&self) -> Result<(), CenterCutError> {
        if self.samples_capacity == 0 || self.spectrum_capacity_chunks == 0 {
            return Err(CenterCutError::InvalidConfig(
                "live storage capacities must be non-zero".to_string(),
            ));
        }
        if self.chunk_size < 2 || self.chunk_size % 2 != 0 {
            return Err(CenterCutError::InvalidConfig(format!(
                "chunk size {} must be even and >= 2",
                self.chunk_size
            )));
        }
        if self.snapshot_window == 0 {
            return Err(CenterCutError::InvalidConfig(
                "snapshot window must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Spectral hop after clamping to `[1, chunk_size]`.
    pub fn effective_spectrum_hop(&self) -> usize {
        self.spectrum_hop.clamp(1, self.chunk_size.max(1))
    }
}

/// Live rings for one playing source.
///
/// Not synchronized itself; owners wrap it in a `Mutex` and keep every
/// critical section down to ring copies and flag updates.
#[derive(Debug, Clone)]
pub struct CircularAudioStorage {
    playhead: u64,
    spectrum_hop: usize,
    amplitude_factor: f32,
    snapshot_window: usize,
    /// Reused for amplitude-scaled appends.
    scaled: Vec<f32>,
    channel1: CircularAudioStream,
    channel2: CircularAudioStream,
    extracted: CircularAudioStream,
}

impl CircularAudioStorage {
    /// # Errors
    /// Returns [`CenterCutError::InvalidConfig`] for invalid settings.
    pub fn new(settings: &LiveStorageSettings) -> Result<Self, CenterCutError> {
        settings.validate()?;
        let hop = settings.effective_spectrum_hop();
        let stream = CircularAudioStream::new(
            settings.samples_capacity,
            settings.spectrum_capacity_chunks,
            settings.chunk_size / 2,
            hop,
        );
        Ok(Self {
            playhead: 0,
            spectrum_hop: hop,
            amplitude_factor: settings.amplitude_factor,
            snapshot_window: settings.snapshot_window,
            scaled: Vec::with_capacity(settings.chunk_size),
            channel1: stream.clone(),
            channel2: stream.clone(),
            extracted: stream,
        })
    }

    pub fn playhead(&self) -> u64 {
        self.playhead
    }

    pub fn set_playhead(&mut self, frame: u64) {
        self.playhead = frame;
    }

    pub fn advance_playhead(&mut self, frames: usize) {
        self.playhead = self.playhead.saturating_add(frames as u64);
    }

    pub fn spectrum_hop(&self) -> usize {
        self.spectrum_hop
    }

    pub fn snapshot_window(&self) -> usize {
        self.snapshot_window
    }

    pub fn amplitude_factor(&self) -> f32 {
        self.amplitude_factor
    }

    pub fn set_amplitude_factor(&mut self, factor: f32) {
        self.amplitude_factor = factor;
    }

    pub fn stream(&self, channel: ChannelId) -> &CircularAudioStream {
        match channel {
            ChannelId::Left => &self.channel1,
            ChannelId::Right => &self.channel2,
            ChannelId::Extracted => &self.extracted,
        }
    }

    fn stream_mut(&mut self, channel: ChannelId) -> &mut CircularAudioStream {
        match channel {
            ChannelId::Left => &mut self.channel1,
            ChannelId::Right => &mut self.channel2,
            ChannelId::Extracted => &mut self.extracted,
        }
    }

    /// Whether every channel has room for `frames` without overwriting.
    pub fn try_accept(&self, frames: usize) -> bool {
        ChannelId::ALL
            .iter()
            .all(|&channel| self.stream(channel).try_accept(frames))
    }

    /// Append raw left/right samples, truncated to the shorter side.
    pub fn add_stereo_samples(&mut self, left: &[f32], right: &[f32]) {
        let frames = left.len().min(right.len());
        self.channel1.add_samples(&left[..frames]);
        self.channel2.add_samples(&right[..frames]);
    }

    /// Append extracted-center samples, scaled by the amplitude factor.
    pub fn add_extracted_samples(&mut self, samples: &[f32]) {
        if self.amplitude_factor == 1.0 {
            self.extracted.add_samples(samples);
            return;
        }
        self.scaled.clear();
        self.scaled.extend_from_slice(samples);
        apply_amplitude_factor(&mut self.scaled, self.amplitude_factor);
        self.extracted.add_samples(&self.scaled);
    }

    /// Append precomputed spectral chunks for `channel`.
    ///
    /// Extracted-channel magnitudes get the same amplitude factor as its
    /// samples.
    pub fn add_spectrum(&mut self, channel: ChannelId, chunks: &[f32]) {
        if channel == ChannelId::Extracted && self.amplitude_factor != 1.0 {
            self.scaled.clear();
            self.scaled.extend_from_slice(chunks);
            apply_amplitude_factor(&mut self.scaled, self.amplitude_factor.abs());
            self.extracted.add_spectrum(&self.scaled);
            return;
        }
        self.stream_mut(channel).add_spectrum(chunks);
    }

    /// Empty all rings and restart them at `playhead`.
    pub fn reset(&mut self, playhead: u64) {
        for channel in ChannelId::ALL {
            self.stream_mut(channel).reset(playhead);
        }
        self.playhead = playhead;
        debug!("live storage reset to frame {}", playhead);
    }

    /// Move every ring's time reference to `frame` keeping buffered data.
    pub fn set_buffers_offset(&mut self, frame: u64) {
        for channel in ChannelId::ALL {
            self.stream_mut(channel).set_buffers_offset(frame);
        }
    }

    pub fn channel_snapshot(&self, channel: ChannelId, frame: u64, frames: usize) -> LiveAudioChannelData {
        self.stream(channel).snapshot(frame, frames)
    }

    /// Copy `[frame, frame + frames)` out of all three channels.
    pub fn snapshot_range(&self, frame: u64, frames: usize) -> LiveAudioData {
        LiveAudioData {
            time_in_frames: frame,
            channel1: self.channel1.snapshot(frame, frames),
            channel2: self.channel2.snapshot(frame, frames),
            extracted: self.extracted.snapshot(frame, frames),
        }
    }

    /// Snapshot of the default window starting at the playhead.
    pub fn snapshot(&self) -> LiveAudioData {
        self.snapshot_range(self.playhead, self.snapshot_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_settings() -> LiveStorageSettings {
        LiveStorageSettings {
            samples_capacity: 16,
            spectrum_capacity_chunks: 4,
            chunk_size: 4,
            spectrum_hop: 4,
            snapshot_window: 4,
            amplitude_factor: 1.0,
        }
    }

    #[test]
    fn rejects_invalid_settings() {
        let mut settings = small_settings();
        settings.chunk_size = 3;
        assert!(CircularAudioStorage::new(&settings).is_err());
        settings.chunk_size = 4;
        settings.samples_capacity = 0;
        assert!(CircularAudioStorage::new(&settings).is_err());
        assert!(CircularAudioStorage::new(&LiveStorageSettings::default()).is_ok());
    }

    #[test]
    fn try_accept_checks_every_channel() {
        let mut storage = CircularAudioStorage::new(&small_settings()).expect("storage");
        storage.add_extracted_samples(&[0.0; 10]);
        assert!(storage.stream(ChannelId::Left).try_accept(16));
        assert!(!storage.try_accept(7));
        assert!(storage.try_accept(6));
    }

    #[test]
    fn snapshot_follows_playhead() {
        let mut storage = CircularAudioStorage::new(&small_settings()).expect("storage");
        let left: Vec<f32> = (0..8).map(|v| v as f32).collect();
        let right: Vec<f32> = left.iter().map(|v| -v).collect();
        storage.add_stereo_samples(&left, &right);
        storage.add_extracted_samples(&left);
        storage.set_playhead(2);

        let data = storage.snapshot();
        assert_eq!(data.time_in_frames, 2);
        assert_eq!(data.channel1.samples.data, vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(data.channel2.samples.data, vec![-2.0, -3.0, -4.0, -5.0]);
        assert!(data.extracted.contains_data);
    }

    #[test]
    fn reset_is_complete() {
        let mut storage = CircularAudioStorage::new(&small_settings()).expect("storage");
        storage.add_stereo_samples(&[1.0; 8], &[1.0; 8]);
        storage.add_extracted_samples(&[1.0; 8]);
        storage.reset(500);

        assert_eq!(storage.playhead(), 500);
        assert!(!storage.snapshot().contains_data());
        for channel in ChannelId::ALL {
            assert!(storage.stream(channel).samples().is_empty());
            assert_eq!(storage.stream(channel).samples().offset(), 500);
        }
    }

    #[test]
    fn amplitude_factor_scales_only_extracted() {
        let mut settings = small_settings();
        settings.amplitude_factor = 0.5;
        let mut storage = CircularAudioStorage::new(&settings).expect("storage");
        storage.add_stereo_samples(&[1.0; 4], &[1.0; 4]);
        storage.add_extracted_samples(&[1.0; 4]);
        storage.add_spectrum(ChannelId::Extracted, &[2.0, 2.0]);

        let data = storage.snapshot_range(0, 4);
        assert_eq!(data.channel1.samples.data, vec![1.0; 4]);
        assert_eq!(data.extracted.samples.data, vec![0.5; 4]);
        assert_eq!(data.extracted.spectrum.data, vec![1.0, 1.0]);
    }

    #[test]
    fn scaled_appends_reuse_one_buffer() {
        let mut settings = small_settings();
        settings.amplitude_factor = -2.0;
        let mut storage = CircularAudioStorage::new(&settings).expect("storage");
        storage.add_extracted_samples(&[0.25; 4]);
        let capacity = storage.scaled.capacity();
        let buffer = storage.scaled.as_ptr();

        storage.add_extracted_samples(&[0.5; 4]);
        storage.add_spectrum(ChannelId::Extracted, &[1.0, 3.0]);
        assert_eq!(storage.scaled.capacity(), capacity);
        assert_eq!(storage.scaled.as_ptr(), buffer);

        let data = storage.snapshot_range(0, 8);
        assert_eq!(&data.extracted.samples.data[4..], &[-1.0; 4]);
        assert_eq!(data.extracted.spectrum.data, vec![2.0, 6.0]);
    }

    #[test]
    fn set_buffers_offset_keeps_data() {
        let mut storage = CircularAudioStorage::new(&small_settings()).expect("storage");
        storage.add_stereo_samples(&[1.0; 4], &[2.0; 4]);
        storage.set_buffers_offset(1000);
        let data = storage.snapshot_range(1000, 4);
        assert_eq!(data.channel2.samples.data, vec![2.0; 4]);
        assert!(!data.extracted.contains_data);
    }
}
