//! Fade-enveloped mixing of any number of live suppliers.
//!
//! The mixer lock only covers the channel list and envelopes. Snapshots of
//! the mixed sources are taken after releasing it, so a mixer can itself be
//! added to another mixer.

mod channel;
mod settings;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::CenterCutError;
use crate::live::{
    AudioSupplyMode, ChannelId, LiveAudioChannelData, LiveAudioData, LiveAudioSupplier,
    LiveSamples, LiveSpectrum,
};
use crate::tools::timer::Timer;

pub use channel::{ChannelKey, FadeState, MixerChannel};
pub use settings::MixerSettings;

struct MixerState {
    channels: Vec<MixerChannel>,
    /// Keys of channels still contributing, refreshed on every change.
    active: Vec<ChannelKey>,
    settings: MixerSettings,
    clock: Timer,
    next_key: ChannelKey,
}

impl MixerState {
    fn refresh_active(&mut self) {
        self.active = self
            .channels
            .iter()
            .filter(|channel| channel.is_active())
            .map(MixerChannel::key)
            .collect();
    }

    fn update(&mut self, now: Duration) -> usize {
        let before = self.channels.len();
        self.channels.retain_mut(|channel| channel.update(now));
        let removed = before - self.channels.len();
        if removed > 0 {
            debug!("mixer dropped {} faded-out channel(s)", removed);
        }
        self.refresh_active();
        removed
    }

    /// Sources to mix with their gains, after advancing envelopes to `now`.
    fn mix_plan(&mut self, now: Duration) -> (Vec<(Arc<dyn LiveAudioSupplier>, f32)>, usize) {
        self.update(now);
        let plan: Vec<_> = self
            .channels
            .iter()
            .filter(|channel| channel.is_active())
            .map(|channel| (Arc::clone(channel.source()), channel.effective_gain()))
            .collect();
        let limit = self.settings.per_channel_limit(plan.len());
        (plan, limit)
    }
}

/// Mixes supplier snapshots with per-channel volume envelopes.
pub struct Mixer {
    state: Mutex<MixerState>,
}

impl Mixer {
    /// Build a mixer whose clock starts running immediately.
    ///
    /// # Errors
    /// Returns [`CenterCutError::InvalidConfig`] for invalid settings.
    pub fn new(settings: MixerSettings) -> Result<Self, CenterCutError> {
        settings.validate()?;
        info!(
            "mixer: fade={}ms memory_limit={} chunk_size={}",
            settings.fade_in_out_ms, settings.memory_limit, settings.chunk_size
        );
        let mut clock = Timer::new();
        clock.start();
        Ok(Self {
            state: Mutex::new(MixerState {
                channels: Vec::new(),
                active: Vec::new(),
                settings,
                clock,
                next_key: 0,
            }),
        })
    }

    /// Current time on the mixer's own clock.
    pub fn now(&self) -> Duration {
        self.state.lock().unwrap().clock.get_time()
    }

    pub fn pause_clock(&self) {
        self.state.lock().unwrap().clock.pause();
    }

    pub fn resume_clock(&self) {
        self.state.lock().unwrap().clock.resume();
    }

    pub fn settings(&self) -> MixerSettings {
        self.state.lock().unwrap().settings.clone()
    }

    pub fn set_fade_in_out_ms(&self, fade_ms: f32) {
        self.state.lock().unwrap().settings.fade_in_out_ms = fade_ms.max(0.0);
    }

    pub fn set_memory_limit(&self, memory_limit: usize) {
        self.state.lock().unwrap().settings.memory_limit = memory_limit;
    }

    /// Channels held, including ones still fading out.
    pub fn channel_count(&self) -> usize {
        self.state.lock().unwrap().channels.len()
    }

    pub fn active_channel_count(&self) -> usize {
        self.state.lock().unwrap().active.len()
    }

    /// Samples each active channel may contribute per mixing pass.
    pub fn per_channel_limit(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.settings.per_channel_limit(state.active.len())
    }

    pub fn channel_volume(&self, key: ChannelKey) -> Option<f32> {
        let state = self.state.lock().unwrap();
        state
            .channels
            .iter()
            .find(|channel| channel.key() == key)
            .map(MixerChannel::volume)
    }

    pub fn channel_state(&self, key: ChannelKey) -> Option<FadeState> {
        let state = self.state.lock().unwrap();
        state
            .channels
            .iter()
            .find(|channel| channel.key() == key)
            .map(MixerChannel::state)
    }

    /// Set a static gain multiplied into the channel's envelope.
    ///
    /// # Returns
    /// `false` if no channel has `key`.
    pub fn set_channel_gain(&self, key: ChannelKey, gain: f32) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.channels.iter_mut().find(|channel| channel.key() == key) {
            Some(channel) => {
                channel.set_gain(gain);
                true
            }
            None => false,
        }
    }

    /// Add `source` fading in over the default fade duration.
    pub fn add_channel(&self, source: Arc<dyn LiveAudioSupplier>) -> ChannelKey {
        let now = self.now();
        self.add_channel_at(source, now)
    }

    /// Add `source` with its fade starting at `now`.
    ///
    /// Adding a source that is already mixed returns its existing key; one
    /// that is fading out is brought back from its current volume.
    pub fn add_channel_at(&self, source: Arc<dyn LiveAudioSupplier>, now: Duration) -> ChannelKey {
        let mut state = self.state.lock().unwrap();
        let fade = state.settings.fade_duration();
        if let Some(channel) = state.channels.iter_mut().find(|channel| channel.holds(&source)) {
            channel.fade_in(now, fade);
            let key = channel.key();
            debug!("mixer channel {} already present", key);
            return key;
        }

        let key = state.next_key;
        state.next_key += 1;
        state.channels.push(MixerChannel::new(key, source, now, fade));
        state.refresh_active();
        debug!("mixer channel {} added", key);
        key
    }

    /// Fade `source` out over `duration`; it is dropped once silent.
    ///
    /// # Returns
    /// `false` if `source` is not mixed.
    pub fn remove_channel(&self, source: &Arc<dyn LiveAudioSupplier>, duration: Duration) -> bool {
        let now = self.now();
        self.remove_channel_at(source, now, duration)
    }

    pub fn remove_channel_at(
        &self,
        source: &Arc<dyn LiveAudioSupplier>,
        now: Duration,
        duration: Duration,
    ) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.channels.iter_mut().find(|channel| channel.holds(source)) {
            Some(channel) => {
                channel.fade_out(now, duration);
                debug!("mixer channel {} fading out", channel.key());
                true
            }
            None => false,
        }
    }

    /// Advance every envelope to `now`, dropping silent channels.
    ///
    /// # Returns
    /// Number of channels removed.
    pub fn update(&self, now: Duration) -> usize {
        self.state.lock().unwrap().update(now)
    }

    /// Mix the sources' playhead snapshots at `now`.
    pub fn mixed_snapshot(&self, now: Duration) -> LiveAudioData {
        self.mix_with(now, |source| source.live_audio_data())
    }

    /// Mix `frames`-frame windows starting at each source's playhead.
    pub fn mixed_window(&self, now: Duration, frames: usize) -> LiveAudioData {
        self.mix_with(now, |source| source.live_audio_window(frames))
    }

    /// Mix windows starting at an absolute frame.
    pub fn mixed_at(&self, now: Duration, frame: u64, frames: usize) -> LiveAudioData {
        self.mix_with(now, |source| source.live_audio_at(frame, frames))
    }

    fn mix_with<F>(&self, now: Duration, snapshot: F) -> LiveAudioData
    where
        F: Fn(&dyn LiveAudioSupplier) -> LiveAudioData,
    {
        let (plan, limit) = self.state.lock().unwrap().mix_plan(now);
        let snapshots: Vec<(LiveAudioData, f32)> = plan
            .iter()
            .filter(|(source, _)| source.audio_supply_mode().is_supplying())
            .map(|(source, gain)| (snapshot(source.as_ref()), *gain))
            .collect();
        if snapshots.is_empty() {
            return LiveAudioData::empty();
        }

        let origin = snapshots[0].0.time_in_frames;
        let mut mixed = LiveAudioData::empty();
        mixed.time_in_frames = origin;
        for id in ChannelId::ALL {
            let inputs: Vec<MixView<'_>> = snapshots
                .iter()
                .map(|(data, gain)| MixView {
                    channel: data.channel(id),
                    origin: data.time_in_frames,
                    gain: *gain,
                })
                .filter(|view| view.channel.contains_data)
                .collect();
            *mixed.channel_mut(id) = mix_channel(&inputs, origin, limit);
        }
        mixed
    }

    /// Produce exactly `frames` interleaved stereo frames from the mixed
    /// sources' left/right channels, then advance each source by `frames`.
    ///
    /// # Errors
    /// Returns [`CenterCutError::Underrun`] when any mixed source (or the
    /// mix as a whole) cannot supply `frames` frames. Nothing is advanced.
    pub fn render(&self, now: Duration, frames: usize) -> Result<Vec<f32>, CenterCutError> {
        let (plan, _) = self.state.lock().unwrap().mix_plan(now);
        let plan: Vec<_> = plan
            .into_iter()
            .filter(|(source, _)| source.audio_supply_mode().is_supplying())
            .collect();
        if plan.is_empty() {
            return Err(CenterCutError::Underrun {
                requested: frames,
                available: 0,
            });
        }

        let windows: Vec<(LiveAudioData, f32)> = plan
            .iter()
            .map(|(source, gain)| (source.live_audio_window(frames), *gain))
            .collect();
        let available = windows
            .iter()
            .map(|(data, _)| data.channel1.samples.len().min(data.channel2.samples.len()))
            .min()
            .unwrap_or(0);
        if available < frames {
            warn!("mixer underrun: {} of {} frames", available, frames);
            return Err(CenterCutError::Underrun {
                requested: frames,
                available,
            });
        }

        let mut out = vec![0.0_f32; frames * 2];
        for (data, gain) in &windows {
            let left = &data.channel1.samples.data[..frames];
            let right = &data.channel2.samples.data[..frames];
            for (frame, (l, r)) in out.chunks_exact_mut(2).zip(left.iter().zip(right)) {
                frame[0] += l * gain;
                frame[1] += r * gain;
            }
        }
        for (source, _) in &plan {
            source.advance(frames);
        }
        Ok(out)
    }
}

/// One source's channel view and the frame its snapshot was requested at.
struct MixView<'a> {
    channel: &'a LiveAudioChannelData,
    origin: u64,
    gain: f32,
}

impl MixView<'_> {
    /// Frames between the requested start and the first sample present.
    fn sample_lead(&self) -> u64 {
        self.channel.samples.time_in_frames.saturating_sub(self.origin)
    }

    fn spectrum_lead(&self) -> u64 {
        self.channel.spectrum.time_in_frames.saturating_sub(self.origin)
    }
}

/// Sum channel views scaled by their gains.
///
/// Views are lined up relative to their requested start, so one clipped at
/// the front by its ring skips nothing while the others skip the frames it
/// lacks. The result covers the range every view shares and is stamped
/// `origin` plus that common lead. Spectra only enter the sum when their
/// first chunk starts at the common spectral lead.
fn mix_channel(inputs: &[MixView<'_>], origin: u64, limit: usize) -> LiveAudioChannelData {
    if inputs.is_empty() {
        return LiveAudioChannelData::empty();
    }

    let lead = inputs.iter().map(MixView::sample_lead).max().unwrap_or(0);
    let len = inputs
        .iter()
        .map(|view| {
            let skip = (lead - view.sample_lead()) as usize;
            view.channel.samples.len().saturating_sub(skip)
        })
        .min()
        .unwrap_or(0)
        .min(limit);
    let mut samples = vec![0.0_f32; len];
    for view in inputs {
        let skip = (lead - view.sample_lead()) as usize;
        let source = &view.channel.samples.data[skip..skip + len];
        for (dst, src) in samples.iter_mut().zip(source) {
            *dst += src * view.gain;
        }
    }

    let spectral: Vec<&MixView<'_>> = inputs
        .iter()
        .filter(|view| view.channel.spectrum.chunk_count > 0)
        .collect();
    let spectrum_lead = spectral
        .iter()
        .map(|view| view.spectrum_lead())
        .max()
        .unwrap_or(lead);
    let bins = spectral
        .iter()
        .find(|view| view.spectrum_lead() == spectrum_lead)
        .map(|view| view.channel.spectrum.bins_per_chunk)
        .unwrap_or(0);
    let spectra: Vec<_> = spectral
        .into_iter()
        .filter(|view| {
            view.spectrum_lead() == spectrum_lead && view.channel.spectrum.bins_per_chunk == bins
        })
        .collect();
    let chunk_count = spectra
        .iter()
        .map(|view| view.channel.spectrum.chunk_count)
        .min()
        .unwrap_or(0);
    let mut spectrum = vec![0.0_f32; chunk_count * bins];
    for view in &spectra {
        for (dst, src) in spectrum.iter_mut().zip(&view.channel.spectrum.data) {
            *dst += src * view.gain;
        }
    }

    LiveAudioChannelData {
        contains_data: true,
        samples: LiveSamples {
            time_in_frames: origin + lead,
            data: samples,
        },
        spectrum: LiveSpectrum {
            time_in_frames: origin + spectrum_lead,
            data: spectrum,
            chunk_count,
            bins_per_chunk: bins,
        },
    }
}

impl LiveAudioSupplier for Mixer {
    fn live_audio_data(&self) -> LiveAudioData {
        self.mixed_snapshot(self.now())
    }

    fn live_audio_window(&self, frames: usize) -> LiveAudioData {
        self.mixed_window(self.now(), frames)
    }

    fn live_audio_at(&self, frame: u64, frames: usize) -> LiveAudioData {
        self.mixed_at(self.now(), frame, frames)
    }

    fn audio_supply_mode(&self) -> AudioSupplyMode {
        let sources: Vec<Arc<dyn LiveAudioSupplier>> = {
            let state = self.state.lock().unwrap();
            state
                .channels
                .iter()
                .filter(|channel| channel.is_active())
                .map(|channel| Arc::clone(channel.source()))
                .collect()
        };
        AudioSupplyMode::aggregate(sources.iter().map(|source| source.audio_supply_mode()))
    }

    fn advance(&self, frames: usize) {
        let sources: Vec<Arc<dyn LiveAudioSupplier>> = {
            let state = self.state.lock().unwrap();
            state
                .channels
                .iter()
                .map(|channel| Arc::clone(channel.source()))
                .collect()
        };
        for source in sources {
            source.advance(frames);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::LiveStorageSettings;
    use crate::source::{SourceSettings, StereoSource};
    use crate::test_data::interleave;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn small_source() -> StereoSource {
        let settings = SourceSettings {
            extract_center: false,
            storage: LiveStorageSettings {
                samples_capacity: 4096,
                spectrum_capacity_chunks: 8,
                chunk_size: 64,
                spectrum_hop: 64,
                snapshot_window: 64,
                amplitude_factor: 1.0,
            },
            ..SourceSettings::default()
        };
        StereoSource::new(&settings).expect("source")
    }

    fn source_with(value: f32, frames: usize) -> Arc<StereoSource> {
        let source = small_source();
        let left = vec![value; frames];
        let right = vec![-value; frames];
        source
            .push_interleaved(&interleave(&left, &right))
            .expect("push");
        source.play();
        Arc::new(source)
    }

    fn instant_mixer() -> Mixer {
        Mixer::new(MixerSettings {
            fade_in_out_ms: 0.0,
            ..MixerSettings::default()
        })
        .expect("mixer")
    }

    #[test]
    fn empty_mixer_has_no_data() {
        let mixer = instant_mixer();
        assert!(!mixer.mixed_snapshot(ms(0)).contains_data());
        assert_eq!(
            mixer.render(ms(0), 16),
            Err(CenterCutError::Underrun {
                requested: 16,
                available: 0
            })
        );
        assert_eq!(mixer.audio_supply_mode(), AudioSupplyMode::NotSupplying);
    }

    #[test]
    fn equal_sources_sum_sample_wise() {
        let mixer = instant_mixer();
        let a: Arc<dyn LiveAudioSupplier> = source_with(0.25, 256);
        let b: Arc<dyn LiveAudioSupplier> = source_with(0.25, 256);
        mixer.add_channel_at(Arc::clone(&a), ms(0));
        mixer.add_channel_at(Arc::clone(&b), ms(0));

        let mixed = mixer.mixed_snapshot(ms(0));
        assert!(mixed.channel1.contains_data);
        assert_eq!(mixed.channel1.samples.data, vec![0.5; 64]);
        assert_eq!(mixed.channel2.samples.data, vec![-0.5; 64]);
        assert_eq!(mixed.channel1.spectrum.chunk_count, 1);
        assert_eq!(mixer.audio_supply_mode(), AudioSupplyMode::Regular);
    }

    #[test]
    fn shortest_source_constrains_the_mix() {
        let mixer = instant_mixer();
        let a: Arc<dyn LiveAudioSupplier> = source_with(0.1, 256);
        let b: Arc<dyn LiveAudioSupplier> = source_with(0.1, 40);
        mixer.add_channel_at(a, ms(0));
        mixer.add_channel_at(b, ms(0));

        let mixed = mixer.mixed_window(ms(0), 128);
        assert_eq!(mixed.channel1.samples.len(), 40);
    }

    #[test]
    fn sources_are_aligned_on_their_frame_times() {
        let mixer = instant_mixer();
        let ramp = small_source();
        let left: Vec<f32> = (0..256).map(|i| i as f32).collect();
        let right: Vec<f32> = left.iter().map(|v| -v).collect();
        ramp.push_interleaved(&interleave(&left, &right)).expect("push");
        ramp.play();

        let late = small_source();
        late.request_seek(100);
        assert_eq!(late.apply_pending_seek(), Some(100));
        late.push_interleaved(&interleave(&[1000.0; 156], &[-1000.0; 156]))
            .expect("push");
        late.play();

        mixer.add_channel_at(Arc::new(ramp), ms(0));
        mixer.add_channel_at(Arc::new(late), ms(0));

        let mixed = mixer.mixed_at(ms(0), 64, 128);
        assert_eq!(mixed.time_in_frames, 64);
        assert_eq!(mixed.channel1.samples.time_in_frames, 100);
        let expected: Vec<f32> = (100..192).map(|frame| frame as f32 + 1000.0).collect();
        assert_eq!(mixed.channel1.samples.data, expected);
    }

    #[test]
    fn adding_twice_returns_the_same_channel() {
        let mixer = instant_mixer();
        let a: Arc<dyn LiveAudioSupplier> = source_with(0.1, 64);
        let first = mixer.add_channel_at(Arc::clone(&a), ms(0));
        let second = mixer.add_channel_at(Arc::clone(&a), ms(5));
        assert_eq!(first, second);
        assert_eq!(mixer.channel_count(), 1);

        let absent: Arc<dyn LiveAudioSupplier> = source_with(0.1, 64);
        assert!(!mixer.remove_channel_at(&absent, ms(5), ms(10)));
    }

    #[test]
    fn fade_out_removes_channel_on_the_silent_tick() {
        let mixer = Mixer::new(MixerSettings {
            fade_in_out_ms: 100.0,
            ..MixerSettings::default()
        })
        .expect("mixer");
        let a: Arc<dyn LiveAudioSupplier> = source_with(1.0, 256);
        let key = mixer.add_channel_at(Arc::clone(&a), ms(0));

        let half = mixer.mixed_snapshot(ms(50));
        assert!((half.channel1.samples.data[0] - 0.5).abs() < 1e-6);
        mixer.update(ms(100));
        assert_eq!(mixer.channel_state(key), Some(FadeState::Idle));

        assert!(mixer.remove_channel_at(&a, ms(200), ms(40)));
        assert_eq!(mixer.update(ms(220)), 0);
        assert_eq!(mixer.channel_count(), 1);
        assert_eq!(mixer.update(ms(240)), 1);
        assert_eq!(mixer.channel_count(), 0);
        assert_eq!(Arc::strong_count(&a), 1);
        assert!(!mixer.mixed_snapshot(ms(240)).contains_data());
    }

    #[test]
    fn render_returns_exact_frames_and_advances() {
        let mixer = instant_mixer();
        let a = source_with(0.25, 256);
        let shared: Arc<dyn LiveAudioSupplier> = a.clone();
        mixer.add_channel_at(shared, ms(0));

        let out = mixer.render(ms(0), 100).expect("render");
        assert_eq!(out.len(), 200);
        assert_eq!(&out[..4], &[0.25, -0.25, 0.25, -0.25]);
        assert_eq!(a.playhead(), 100);

        mixer.render(ms(0), 150).expect("render");
        assert_eq!(
            mixer.render(ms(0), 10),
            Err(CenterCutError::Underrun {
                requested: 10,
                available: 6
            })
        );
        assert_eq!(a.playhead(), 250);
    }

    #[test]
    fn paused_sources_are_skipped() {
        let mixer = instant_mixer();
        let a = source_with(0.25, 128);
        let b = source_with(0.5, 128);
        mixer.add_channel_at(a.clone(), ms(0));
        mixer.add_channel_at(b.clone(), ms(0));
        b.pause();

        let mixed = mixer.mixed_snapshot(ms(0));
        assert_eq!(mixed.channel1.samples.data, vec![0.25; 64]);
        a.set_secondary(true);
        assert_eq!(mixer.audio_supply_mode(), AudioSupplyMode::Secondary);
    }

    #[test]
    fn mixers_nest() {
        let inner = Arc::new(instant_mixer());
        inner.add_channel_at(source_with(0.25, 128), ms(0));
        inner.add_channel_at(source_with(0.25, 128), ms(0));

        let outer = instant_mixer();
        outer.add_channel_at(inner.clone(), ms(0));
        outer.add_channel_at(source_with(0.25, 128), ms(0));

        let mixed = outer.mixed_window(ms(0), 32);
        assert_eq!(mixed.channel1.samples.data, vec![0.75; 32]);
    }

    #[test]
    fn per_channel_budget_caps_contributions() {
        let mixer = Mixer::new(MixerSettings {
            fade_in_out_ms: 0.0,
            memory_limit: 64,
            chunk_size: 16,
        })
        .expect("mixer");
        mixer.add_channel_at(source_with(0.1, 256), ms(0));
        mixer.add_channel_at(source_with(0.1, 256), ms(0));
        mixer.update(ms(0));
        assert_eq!(mixer.per_channel_limit(), 32);
        assert_eq!(mixer.mixed_window(ms(0), 200).channel1.samples.len(), 32);
    }
}
