//! One mixed source and its fade envelope.

use std::sync::Arc;
use std::time::Duration;

use log::trace;

use crate::live::LiveAudioSupplier;

pub type ChannelKey = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    Idle,
    FadingIn,
    FadingOut,
}

/// A source held by the mixer with its volume envelope.
///
/// Volume is a linear ramp over `fade_duration` from `fade_start`. A zero
/// duration completes on the first update. `fade_lead` is the part of the
/// ramp already covered when a fade was reversed midway.
pub struct MixerChannel {
    key: ChannelKey,
    source: Arc<dyn LiveAudioSupplier>,
    volume: f32,
    gain: f32,
    state: FadeState,
    fade_start: Duration,
    fade_lead: Duration,
    fade_duration: Duration,
    active: bool,
}

impl MixerChannel {
    /// New channel fading in from silence at `now`.
    pub fn new(
        key: ChannelKey,
        source: Arc<dyn LiveAudioSupplier>,
        now: Duration,
        fade_duration: Duration,
    ) -> Self {
        Self {
            key,
            source,
            volume: 0.0,
            gain: 1.0,
            state: FadeState::FadingIn,
            fade_start: now,
            fade_lead: Duration::ZERO,
            fade_duration,
            active: true,
        }
    }

    pub fn key(&self) -> ChannelKey {
        self.key
    }

    pub fn source(&self) -> &Arc<dyn LiveAudioSupplier> {
        &self.source
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.max(0.0);
    }

    /// Volume times per-channel gain.
    pub fn effective_gain(&self) -> f32 {
        self.volume * self.gain
    }

    pub fn state(&self) -> FadeState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether this channel wraps the same supplier allocation as `source`.
    pub fn holds(&self, source: &Arc<dyn LiveAudioSupplier>) -> bool {
        Arc::as_ptr(&self.source) as *const () == Arc::as_ptr(source) as *const ()
    }

    fn progress(&self, now: Duration) -> f32 {
        if self.fade_duration.is_zero() {
            return 1.0;
        }
        let elapsed = (now.saturating_sub(self.fade_start) + self.fade_lead).as_secs_f64();
        (elapsed / self.fade_duration.as_secs_f64()).clamp(0.0, 1.0) as f32
    }

    /// Advance the envelope to `now`.
    ///
    /// # Returns
    /// `false` once a fade-out has reached silence; the channel is then
    /// inactive and should be dropped.
    pub fn update(&mut self, now: Duration) -> bool {
        match self.state {
            FadeState::Idle => {}
            FadeState::FadingIn => {
                self.volume = self.progress(now);
                if self.volume >= 1.0 {
                    self.volume = 1.0;
                    self.state = FadeState::Idle;
                    trace!("channel {} faded in", self.key);
                }
            }
            FadeState::FadingOut => {
                self.volume = 1.0 - self.progress(now);
                if self.volume <= 0.0 {
                    self.volume = 0.0;
                    self.active = false;
                    trace!("channel {} faded out", self.key);
                }
            }
        }
        self.active
    }

    /// Begin fading out at `now` over `duration`.
    ///
    /// A channel caught mid fade-in starts from its current volume.
    pub fn fade_out(&mut self, now: Duration, duration: Duration) {
        if self.state == FadeState::FadingOut || !self.active {
            return;
        }
        self.update(now);
        self.fade_duration = duration;
        self.fade_start = now;
        self.fade_lead = duration.mul_f32(1.0 - self.volume);
        self.state = FadeState::FadingOut;
        trace!("channel {} fading out from {:.3}", self.key, self.volume);
    }

    /// Bring a fading-out channel back, continuing from its current volume.
    pub fn fade_in(&mut self, now: Duration, duration: Duration) {
        if self.state != FadeState::FadingOut || !self.active {
            return;
        }
        self.update(now);
        if !self.active {
            return;
        }
        self.fade_duration = duration;
        self.fade_start = now;
        self.fade_lead = duration.mul_f32(self.volume);
        self.state = FadeState::FadingIn;
        trace!("channel {} fading back in from {:.3}", self.key, self.volume);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::{AudioSupplyMode, LiveAudioData};

    struct Silent;

    impl LiveAudioSupplier for Silent {
        fn live_audio_data(&self) -> LiveAudioData {
            LiveAudioData::empty()
        }

        fn live_audio_window(&self, _frames: usize) -> LiveAudioData {
            LiveAudioData::empty()
        }

        fn live_audio_at(&self, _frame: u64, _frames: usize) -> LiveAudioData {
            LiveAudioData::empty()
        }

        fn audio_supply_mode(&self) -> AudioSupplyMode {
            AudioSupplyMode::Regular
        }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn channel(now: Duration, fade: Duration) -> MixerChannel {
        MixerChannel::new(1, Arc::new(Silent), now, fade)
    }

    #[test]
    fn fade_in_is_exact_at_both_ends() {
        let mut channel = channel(ms(1000), ms(200));
        assert!(channel.update(ms(1000)));
        assert_eq!(channel.volume(), 0.0);
        channel.update(ms(1100));
        assert!((channel.volume() - 0.5).abs() < 1e-6);
        assert_eq!(channel.state(), FadeState::FadingIn);
        channel.update(ms(1200));
        assert_eq!(channel.volume(), 1.0);
        assert_eq!(channel.state(), FadeState::Idle);
    }

    #[test]
    fn fade_out_deactivates_at_zero() {
        let mut channel = channel(ms(0), ms(0));
        channel.update(ms(0));
        assert_eq!(channel.state(), FadeState::Idle);

        channel.fade_out(ms(500), ms(100));
        assert!(channel.update(ms(500)));
        assert_eq!(channel.volume(), 1.0);
        assert!(channel.update(ms(550)));
        assert!(!channel.update(ms(600)));
        assert_eq!(channel.volume(), 0.0);
        assert!(!channel.is_active());
    }

    #[test]
    fn reversing_a_fade_keeps_volume_continuous() {
        let mut channel = channel(ms(0), ms(400));
        channel.update(ms(100));
        let before = channel.volume();
        channel.fade_out(ms(100), ms(400));
        channel.update(ms(100));
        assert!((channel.volume() - before).abs() < 1e-6);

        channel.update(ms(150));
        let before = channel.volume();
        channel.fade_in(ms(150), ms(400));
        channel.update(ms(150));
        assert!((channel.volume() - before).abs() < 1e-6);
        assert_eq!(channel.state(), FadeState::FadingIn);
    }

    #[test]
    fn zero_length_fade_out_removes_immediately() {
        let mut channel = channel(ms(0), ms(0));
        channel.update(ms(0));
        channel.fade_out(ms(10), Duration::ZERO);
        assert!(!channel.update(ms(10)));
    }

    #[test]
    fn holds_compares_allocations() {
        let source: Arc<dyn LiveAudioSupplier> = Arc::new(Silent);
        let other: Arc<dyn LiveAudioSupplier> = Arc::new(Silent);
        let channel = MixerChannel::new(7, Arc::clone(&source), ms(0), ms(0));
        assert!(channel.holds(&source));
        assert!(!channel.holds(&other));
    }
}
