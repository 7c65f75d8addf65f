//! Bounded-latency buffers feeding visualization consumers.

pub mod ring;
pub mod snapshot;
pub mod storage;
pub mod stream;
pub mod supplier;

pub use snapshot::{ChannelId, LiveAudioChannelData, LiveAudioData, LiveSamples, LiveSpectrum};
pub use storage::{CircularAudioStorage, LiveStorageSettings};
pub use supplier::{AudioSupplyMode, LiveAudioSupplier};
