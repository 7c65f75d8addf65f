//! Leaf audio source: pushed frames -> optional separator -> live storage.

mod reverb;
mod seek;

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{CHUNK_SIZE, SAMPLE_RATE};
use crate::dsp::center_cut::{CenterCut, CenterCutSettings, OutputMode};
use crate::dsp::spectrum::SpectrumFeed;
use crate::error::CenterCutError;
use crate::live::{
    AudioSupplyMode, ChannelId, CircularAudioStorage, LiveAudioData, LiveAudioSupplier,
    LiveStorageSettings,
};

pub use reverb::{DelayLine, PauseReverbSettings};
pub use seek::{SeekStatus, SeekTicket};
use seek::SeekRequests;

/// Configuration for a [`StereoSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub sample_rate: u32,
    /// 1 (mono, duplicated to both sides) or 2.
    pub channels: u16,
    /// Run the separator and fill the extracted channel.
    pub extract_center: bool,
    pub center_cut: CenterCutSettings,
    pub storage: LiveStorageSettings,
    /// Silence played before the first frame after construction or a stop.
    pub time_delay_ms: f32,
    pub pause_reverb: PauseReverbSettings,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: 2,
            extract_center: true,
            center_cut: CenterCutSettings::default(),
            storage: LiveStorageSettings::default(),
            time_delay_ms: 0.0,
            pause_reverb: PauseReverbSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

struct Control {
    state: PlaybackState,
    role: AudioSupplyMode,
    seeks: SeekRequests,
    /// Bumped by every stop so in-flight pushes can notice it.
    stop_epoch: u64,
}

/// State touched only while processing a hop.
struct Producer {
    separator: Option<CenterCut>,
    feeds: [SpectrumFeed; 3],
    position: u64,
    /// Frames of start delay still to be played.
    pending_delay: usize,
    /// One hop of input-format zeros for the start delay.
    silence: Vec<f32>,
    left: Vec<f32>,
    right: Vec<f32>,
    extracted: Vec<f32>,
    /// Interleaved separator output, one hop long.
    scratch: Vec<f32>,
    chunks: [Vec<f32>; 3],
}

impl Producer {
    fn restart(&mut self, frame: u64) {
        if let Some(separator) = self.separator.as_mut() {
            separator.reset();
        }
        for feed in self.feeds.iter_mut() {
            feed.reset();
        }
        self.position = frame;
        self.pending_delay = 0;
    }
}

/// A playable stereo (or mono) source feeding its own live storage.
///
/// A decoder thread calls [`StereoSource::push_interleaved`]; consumers take
/// snapshots through [`LiveAudioSupplier`]. The separator and spectrum math
/// run under the producer lock only, so snapshot readers contend with a
/// producer just for the ring copies.
pub struct StereoSource {
    channels: usize,
    hop: usize,
    sample_rate: u32,
    delay_frames: usize,
    reverb: PauseReverbSettings,
    storage_settings: LiveStorageSettings,
    control: Mutex<Control>,
    producer: Mutex<Producer>,
    storage: Arc<Mutex<CircularAudioStorage>>,
    /// Reverb tail served in place of `storage` while paused.
    tail: Mutex<Option<CircularAudioStorage>>,
}

impl StereoSource {
    /// # Errors
    /// Returns [`CenterCutError::InvalidConfig`] for an unsupported channel
    /// count or invalid separator/storage settings.
    pub fn new(settings: &SourceSettings) -> Result<Self, CenterCutError> {
        if settings.channels != 1 && settings.channels != 2 {
            return Err(CenterCutError::InvalidConfig(format!(
                "{} channels unsupported, expected 1 or 2",
                settings.channels
            )));
        }
        if !settings.time_delay_ms.is_finite() || settings.time_delay_ms < 0.0 {
            return Err(CenterCutError::InvalidConfig(format!(
                "time delay {} ms must be >= 0",
                settings.time_delay_ms
            )));
        }
        settings.pause_reverb.validate()?;

        let separator = if settings.extract_center {
            let cut_settings = CenterCutSettings {
                output: OutputMode::Center,
                sample_rate: settings.sample_rate,
                ..settings.center_cut.clone()
            };
            Some(CenterCut::new(&cut_settings)?)
        } else {
            None
        };
        let hop = separator
            .as_ref()
            .map(CenterCut::hop_size)
            .unwrap_or(CHUNK_SIZE);

        let storage = CircularAudioStorage::new(&settings.storage)?;
        let chunk_size = settings.storage.chunk_size;
        let spectrum_hop = storage.spectrum_hop();
        let feeds = [
            SpectrumFeed::new(chunk_size, spectrum_hop)?,
            SpectrumFeed::new(chunk_size, spectrum_hop)?,
            SpectrumFeed::new(chunk_size, spectrum_hop)?,
        ];

        info!(
            "stereo source: {} Hz, {} channel(s), extract_center={}",
            settings.sample_rate, settings.channels, settings.extract_center
        );

        let channels = settings.channels as usize;
        let delay_frames = reverb::ms_to_frames(settings.time_delay_ms, settings.sample_rate);
        let silence = if delay_frames > 0 {
            vec![0.0; hop * channels]
        } else {
            Vec::new()
        };

        Ok(Self {
            channels,
            hop,
            sample_rate: settings.sample_rate,
            delay_frames,
            reverb: settings.pause_reverb.clone(),
            storage_settings: settings.storage.clone(),
            control: Mutex::new(Control {
                state: PlaybackState::Stopped,
                role: AudioSupplyMode::Regular,
                seeks: SeekRequests::default(),
                stop_epoch: 0,
            }),
            producer: Mutex::new(Producer {
                separator,
                feeds,
                position: 0,
                pending_delay: delay_frames,
                silence,
                left: Vec::with_capacity(hop),
                right: Vec::with_capacity(hop),
                extracted: Vec::with_capacity(hop),
                scratch: vec![0.0; hop * 2],
                chunks: [Vec::new(), Vec::new(), Vec::new()],
            }),
            storage: Arc::new(Mutex::new(storage)),
            tail: Mutex::new(None),
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames processed between stop/seek checks.
    pub fn hop_size(&self) -> usize {
        self.hop
    }

    pub fn storage(&self) -> Arc<Mutex<CircularAudioStorage>> {
        Arc::clone(&self.storage)
    }

    pub fn state(&self) -> PlaybackState {
        self.control.lock().unwrap().state
    }

    /// Absolute frame the next pushed frame is expected to be.
    pub fn position(&self) -> u64 {
        self.producer.lock().unwrap().position
    }

    pub fn playhead(&self) -> u64 {
        self.storage.lock().unwrap().playhead()
    }

    pub fn set_playhead(&self, frame: u64) {
        self.storage.lock().unwrap().set_playhead(frame);
    }

    /// Whether the rings can take `frames` more frames without overwriting.
    pub fn try_accept(&self, frames: usize) -> bool {
        self.storage.lock().unwrap().try_accept(frames)
    }

    /// Report `Secondary` instead of `Regular` while playing.
    pub fn set_secondary(&self, secondary: bool) {
        let mut control = self.control.lock().unwrap();
        control.role = if secondary {
            AudioSupplyMode::Secondary
        } else {
            AudioSupplyMode::Regular
        };
    }

    pub fn play(&self) {
        self.end_reverb_tail();
        self.control.lock().unwrap().state = PlaybackState::Playing;
        debug!("source playing");
    }

    /// Pause, rendering a reverb tail when pause reverb is enabled.
    ///
    /// The tail starts at the playhead and keeps the source supplying until
    /// it has been advanced past or playback resumes.
    pub fn pause(&self) {
        {
            let mut control = self.control.lock().unwrap();
            if control.state != PlaybackState::Playing {
                return;
            }
            control.state = PlaybackState::Paused;
        }
        debug!("source paused");
        if self.reverb.enabled {
            if let Err(err) = self.start_reverb_tail() {
                warn!("no reverb tail on pause: {}", err);
            }
        }
    }

    pub fn resume(&self) {
        self.end_reverb_tail();
        let mut control = self.control.lock().unwrap();
        if control.state == PlaybackState::Paused {
            control.state = PlaybackState::Playing;
            debug!("source resumed");
        }
    }

    /// Whether a pause reverb tail is still playing out.
    pub fn is_reverberating(&self) -> bool {
        self.tail.lock().unwrap().is_some()
    }

    fn start_reverb_tail(&self) -> Result<(), CenterCutError> {
        let tail_frames = self
            .reverb
            .tail_frames(self.sample_rate)
            .min(self.storage_settings.samples_capacity);
        let (playhead, history) = {
            let storage = self.storage.lock().unwrap();
            let playhead = storage.playhead();
            let start = playhead.saturating_sub(tail_frames as u64);
            (playhead, storage.snapshot_range(start, (playhead - start) as usize))
        };
        let tail = reverb::render_tail(
            &history,
            playhead,
            tail_frames,
            &self.reverb,
            self.sample_rate,
            &self.storage_settings,
        )?;
        *self.tail.lock().unwrap() = tail;
        Ok(())
    }

    fn end_reverb_tail(&self) {
        if self.tail.lock().unwrap().take().is_some() {
            debug!("reverb tail cut");
        }
    }

    /// Resume and re-time still-valid buffered data to start at `frame`.
    pub fn resume_at(&self, frame: u64) {
        self.storage.lock().unwrap().set_buffers_offset(frame);
        self.resume();
    }

    /// Stop and rewind to frame 0.
    ///
    /// An in-flight push finishes its current hop first, then returns.
    pub fn stop(&self) {
        {
            let mut control = self.control.lock().unwrap();
            control.state = PlaybackState::Stopped;
            control.stop_epoch += 1;
            control.seeks.clear();
        }
        self.end_reverb_tail();
        let mut producer = self.producer.lock().unwrap();
        producer.restart(0);
        producer.pending_delay = self.delay_frames;
        self.storage.lock().unwrap().reset(0);
        debug!("source stopped");
    }

    /// Ask the producer to continue from `frame`.
    ///
    /// The seek is applied at the next hop boundary of a push, or by
    /// [`Self::apply_pending_seek`]. A later request supersedes this one.
    pub fn request_seek(&self, frame: u64) -> SeekTicket {
        debug!("seek to frame {} requested", frame);
        self.control.lock().unwrap().seeks.request(frame)
    }

    /// Apply an outstanding seek now.
    ///
    /// # Returns
    /// The frame sought to, if a seek was pending.
    pub fn apply_pending_seek(&self) -> Option<u64> {
        let mut producer = self.producer.lock().unwrap();
        self.apply_seek_locked(&mut producer)
    }

    fn apply_seek_locked(&self, producer: &mut Producer) -> Option<u64> {
        let ticket = self.control.lock().unwrap().seeks.take()?;
        let frame = ticket.frame();
        producer.restart(frame);
        self.storage.lock().unwrap().reset(frame);
        self.end_reverb_tail();
        ticket.complete();
        debug!("seek to frame {} applied", frame);
        Some(frame)
    }

    /// Feed interleaved frames at the current position.
    ///
    /// Frames are processed one hop at a time. Before each hop a pending
    /// seek is applied or a stop honoured, ending the call early; the
    /// caller should then resume feeding from [`Self::position`]. Any start
    /// delay still owed is played as silence ahead of `samples`.
    ///
    /// # Returns
    /// Number of frames consumed.
    ///
    /// # Errors
    /// Propagates separator or spectrum failures.
    pub fn push_interleaved(&self, samples: &[f32]) -> Result<usize, CenterCutError> {
        let frames = samples.len() / self.channels;
        let epoch = self.control.lock().unwrap().stop_epoch;
        let mut consumed = 0;

        while consumed < frames {
            let (stopped, seek_pending) = {
                let control = self.control.lock().unwrap();
                (control.stop_epoch != epoch, control.seeks.has_pending())
            };
            if stopped {
                debug!("push interrupted by stop after {} frames", consumed);
                return Ok(consumed);
            }
            let mut producer = self.producer.lock().unwrap();
            if seek_pending && self.apply_seek_locked(&mut producer).is_some() {
                return Ok(consumed);
            }
            if producer.pending_delay > 0 {
                let count = self.hop.min(producer.pending_delay);
                let silence = std::mem::take(&mut producer.silence);
                let result = self.process_hop(&mut producer, &silence[..count * self.channels]);
                producer.silence = silence;
                result?;
                producer.pending_delay -= count;
                continue;
            }

            let count = self.hop.min(frames - consumed);
            let start = consumed * self.channels;
            let end = (consumed + count) * self.channels;
            self.process_hop(&mut producer, &samples[start..end])?;
            consumed += count;
        }
        Ok(consumed)
    }

    fn process_hop(&self, producer: &mut Producer, samples: &[f32]) -> Result<(), CenterCutError> {
        let Producer {
            separator,
            feeds,
            position,
            left,
            right,
            extracted,
            scratch,
            chunks,
            ..
        } = producer;

        left.clear();
        right.clear();
        extracted.clear();
        if self.channels == 1 {
            left.extend_from_slice(samples);
            right.extend_from_slice(samples);
        } else {
            for frame in samples.chunks_exact(2) {
                left.push(frame[0]);
                right.push(frame[1]);
            }
        }

        if let Some(separator) = separator.as_mut() {
            let mut offset = 0;
            while offset < left.len() {
                match separator.push(&left[offset..], &right[offset..]) {
                    Ok(accepted) => offset += accepted,
                    Err(CenterCutError::OutputQueueFull { accepted }) => {
                        warn!("separator queue full, draining");
                        offset += accepted;
                        drain_center(separator, scratch, extracted);
                    }
                    Err(err) => return Err(err),
                }
            }
            drain_center(separator, scratch, extracted);
        }

        for chunk in chunks.iter_mut() {
            chunk.clear();
        }
        feeds[0].push(left, &mut chunks[0])?;
        feeds[1].push(right, &mut chunks[1])?;
        if !extracted.is_empty() {
            feeds[2].push(extracted, &mut chunks[2])?;
        }
        *position += left.len() as u64;

        let mut storage = self.storage.lock().unwrap();
        storage.add_stereo_samples(left, right);
        storage.add_extracted_samples(extracted);
        storage.add_spectrum(ChannelId::Left, &chunks[0]);
        storage.add_spectrum(ChannelId::Right, &chunks[1]);
        storage.add_spectrum(ChannelId::Extracted, &chunks[2]);
        Ok(())
    }
}

/// Move finished center output into `out` as mono samples, staging it in
/// `scratch`.
fn drain_center(separator: &mut CenterCut, scratch: &mut [f32], out: &mut Vec<f32>) {
    loop {
        let frames = separator.read_interleaved(scratch);
        if frames == 0 {
            break;
        }
        out.extend(scratch[..frames * 2].chunks_exact(2).map(|frame| frame[0]));
    }
}

impl StereoSource {
    /// Read from the reverb tail while one plays, from the live storage
    /// otherwise.
    fn read_with<F>(&self, read: F) -> LiveAudioData
    where
        F: Fn(&CircularAudioStorage) -> LiveAudioData,
    {
        if let Some(tail) = self.tail.lock().unwrap().as_ref() {
            return read(tail);
        }
        let storage = self.storage.lock().unwrap();
        read(&*storage)
    }
}

impl LiveAudioSupplier for StereoSource {
    fn live_audio_data(&self) -> LiveAudioData {
        self.read_with(CircularAudioStorage::snapshot)
    }

    fn live_audio_window(&self, frames: usize) -> LiveAudioData {
        self.read_with(|storage| storage.snapshot_range(storage.playhead(), frames))
    }

    fn live_audio_at(&self, frame: u64, frames: usize) -> LiveAudioData {
        self.read_with(|storage| storage.snapshot_range(frame, frames))
    }

    fn audio_supply_mode(&self) -> AudioSupplyMode {
        let reverberating = self.is_reverberating();
        let control = self.control.lock().unwrap();
        match control.state {
            PlaybackState::Playing => control.role,
            PlaybackState::Paused if reverberating => control.role,
            PlaybackState::Paused | PlaybackState::Stopped => AudioSupplyMode::NotSupplying,
        }
    }

    fn advance(&self, frames: usize) {
        {
            let mut tail = self.tail.lock().unwrap();
            if let Some(storage) = tail.as_mut() {
                storage.advance_playhead(frames);
                let end = storage.stream(ChannelId::Left).samples().end_frame();
                if storage.playhead() >= end {
                    *tail = None;
                    debug!("reverb tail finished");
                }
                return;
            }
        }
        self.storage.lock().unwrap().advance_playhead(frames);
    }

    fn amplitude_factor(&self) -> f32 {
        self.storage.lock().unwrap().amplitude_factor()
    }

    fn set_amplitude_factor(&self, factor: f32) {
        self.storage.lock().unwrap().set_amplitude_factor(factor);
    }
}
