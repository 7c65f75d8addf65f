//! Shared constants for DSP and playback defaults.

/// Default sample rate used by the library (Hz).
///
/// Used by synthetic benchmarks and as the separator's fallback rate until
/// a source reports its own.
pub const SAMPLE_RATE: u32 = 44_100;

/// Default analysis window of the center-cut separator, in frames.
pub const WINDOW_SIZE: usize = 8192;

/// Default number of overlapping windows per analysis block.
pub const OVERLAP_COUNT: usize = 4;

/// Frequency below which "bass to sides" keeps content out of the center (Hz).
pub const BASS_TO_SIDES_CUTOFF_HZ: f64 = 200.0;

/// Maximum number of finished separator blocks waiting to be read.
pub const OUTPUT_MAX_BUFFERS: usize = 32;

/// Samples per spectral chunk and default visualization window.
pub const CHUNK_SIZE: usize = 2048;

/// Default capacity of each raw sample ring, in frames.
pub const SAMPLES_RING_CAPACITY: usize = 1 << 17;

/// Default capacity of each spectral ring, in chunks.
pub const SPECTRUM_RING_CHUNKS: usize = 64;

/// Default mixer memory budget, in samples.
pub const MIXER_MEMORY_LIMIT: usize = 1 << 20;

/// Default mixer fade-in/fade-out length (ms).
pub const FADE_IN_OUT_MS: f32 = 250.0;
