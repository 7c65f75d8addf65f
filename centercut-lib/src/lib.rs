//! # Centercut Audio Library
//!
//! Real-time center-channel separation for stereo audio, bounded live
//! buffers for visualization, and a fade-enveloped mixer over live sources.

pub mod capture;
pub mod constants;
#[cfg(feature = "bench")]
pub mod diagnostics;
pub mod dsp;
pub mod error;
pub mod live;
pub mod mixer;
pub mod settings;
pub mod source;
pub mod test_data;
pub mod tools;

pub use capture::{CaptureSettings, CaptureSource, CaptureState};
pub use dsp::center_cut::{CenterCut, CenterCutSettings, OutputMode};
pub use error::CenterCutError;
pub use live::{AudioSupplyMode, ChannelId, LiveAudioData, LiveAudioSupplier};
pub use mixer::{Mixer, MixerSettings};
pub use settings::EngineSettings;
pub use source::{PauseReverbSettings, PlaybackState, SourceSettings, StereoSource};
