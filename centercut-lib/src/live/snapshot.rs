//! Owned, timestamped views copied out of the live rings.

use serde::{Deserialize, Serialize};

/// The three logical channels a storage keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelId {
    Left,
    Right,
    Extracted,
}

impl ChannelId {
    pub const ALL: [ChannelId; 3] = [ChannelId::Left, ChannelId::Right, ChannelId::Extracted];
}

/// Raw samples starting at `time_in_frames`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveSamples {
    pub time_in_frames: u64,
    pub data: Vec<f32>,
}

impl LiveSamples {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Consecutive magnitude chunks, `bins_per_chunk` values each.
///
/// `time_in_frames` is the start frame of the first chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveSpectrum {
    pub time_in_frames: u64,
    pub data: Vec<f32>,
    pub chunk_count: usize,
    pub bins_per_chunk: usize,
}

impl LiveSpectrum {
    /// Borrow chunk `index`, if present.
    pub fn chunk(&self, index: usize) -> Option<&[f32]> {
        if index >= self.chunk_count {
            return None;
        }
        let start = index * self.bins_per_chunk;
        self.data.get(start..start + self.bins_per_chunk)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveAudioChannelData {
    pub contains_data: bool,
    pub samples: LiveSamples,
    pub spectrum: LiveSpectrum,
}

impl LiveAudioChannelData {
    /// The explicit "no data" value.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Snapshot of all three channels at one instant.
///
/// Each channel is clipped independently, so sample counts may differ
/// slightly between channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveAudioData {
    pub time_in_frames: u64,
    pub channel1: LiveAudioChannelData,
    pub channel2: LiveAudioChannelData,
    pub extracted: LiveAudioChannelData,
}

impl LiveAudioData {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains_data(&self) -> bool {
        self.channel1.contains_data || self.channel2.contains_data || self.extracted.contains_data
    }

    pub fn channel(&self, id: ChannelId) -> &LiveAudioChannelData {
        match id {
            ChannelId::Left => &self.channel1,
            ChannelId::Right => &self.channel2,
            ChannelId::Extracted => &self.extracted,
        }
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> &mut LiveAudioChannelData {
        match id {
            ChannelId::Left => &mut self.channel1,
            ChannelId::Right => &mut self.channel2,
            ChannelId::Extracted => &mut self.extracted,
        }
    }
}
