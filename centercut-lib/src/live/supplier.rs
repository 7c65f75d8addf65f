//! The capability shared by leaf sources and mixers.

use serde::{Deserialize, Serialize};

use crate::live::snapshot::{ChannelId, LiveAudioChannelData, LiveAudioData};

/// Whether a supplier is currently producing audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioSupplyMode {
    NotSupplying,
    /// Primary playback.
    Regular,
    /// Auxiliary stream, e.g. a preview running next to the main source.
    Secondary,
}

impl AudioSupplyMode {
    pub fn is_supplying(self) -> bool {
        self != Self::NotSupplying
    }

    /// Combine modes of mixed suppliers: any `Regular` wins, then any
    /// `Secondary`.
    pub fn aggregate<I>(modes: I) -> Self
    where
        I: IntoIterator<Item = AudioSupplyMode>,
    {
        let mut result = Self::NotSupplying;
        for mode in modes {
            match mode {
                Self::Regular => return Self::Regular,
                Self::Secondary => result = Self::Secondary,
                Self::NotSupplying => {}
            }
        }
        result
    }
}

/// Anything that can hand out live snapshots: a single source or a mix.
///
/// Implementations must be cheap to call from a consumer context and must
/// return copies, never views into rings a producer is writing.
pub trait LiveAudioSupplier: Send + Sync {
    /// Snapshot at the supplier's own playhead.
    fn live_audio_data(&self) -> LiveAudioData;

    /// Snapshot of `frames` frames starting at the playhead.
    fn live_audio_window(&self, frames: usize) -> LiveAudioData;

    /// Snapshot of `frames` frames starting at an absolute frame.
    fn live_audio_at(&self, frame: u64, frames: usize) -> LiveAudioData;

    fn live_channel_data(&self, channel: ChannelId) -> LiveAudioChannelData {
        self.live_audio_data().channel(channel).clone()
    }

    fn live_channel_data_at(&self, frame: u64, frames: usize, channel: ChannelId) -> LiveAudioChannelData {
        self.live_audio_at(frame, frames).channel(channel).clone()
    }

    fn audio_supply_mode(&self) -> AudioSupplyMode;

    /// Move the playhead forward after `frames` were rendered.
    fn advance(&self, _frames: usize) {}

    fn amplitude_factor(&self) -> f32 {
        1.0
    }

    fn set_amplitude_factor(&self, _factor: f32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_outranks_secondary() {
        use AudioSupplyMode::*;
        assert_eq!(AudioSupplyMode::aggregate(Vec::new()), NotSupplying);
        assert_eq!(AudioSupplyMode::aggregate([NotSupplying, Secondary]), Secondary);
        assert_eq!(AudioSupplyMode::aggregate([Secondary, Regular, NotSupplying]), Regular);
        assert!(!NotSupplying.is_supplying());
    }
}
