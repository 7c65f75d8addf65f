//! Chunked magnitude spectra for the visualization rings.
//!
//! [`SpectrumAnalyzer`] turns one chunk of samples into `chunk_size / 2`
//! Hann-windowed magnitudes. [`SpectrumFeed`] keeps enough history to emit
//! a new chunk every `hop` frames, so chunk `j` covers frames
//! `[j * hop, j * hop + chunk_size)` counted from the last reset.

use crate::error::CenterCutError;

fn hann_window(size: usize) -> Vec<f32> {
    let step = std::f32::consts::TAU / size as f32;
    (0..size)
        .map(|i| 0.5 - 0.5 * (step * i as f32).cos())
        .collect()
}

/// Amplitude correction so a bin-centred sine reads as its peak amplitude.
fn magnitude_scale(window: &[f32]) -> f32 {
    let sum: f32 = window.iter().sum();
    if sum > 0.0 {
        2.0 / sum
    } else {
        0.0
    }
}

#[cfg(not(feature = "real-fft"))]
mod complex_fft {
    use std::sync::Arc;

    use rustfft::{num_complex::Complex, Fft, FftPlanner};

    use super::{hann_window, magnitude_scale};
    use crate::error::CenterCutError;

    #[derive(Clone)]
    pub struct SpectrumAnalyzer {
        chunk_size: usize,
        window: Vec<f32>,
        scale: f32,
        fft: Arc<dyn Fft<f32>>,
        buffer: Vec<Complex<f32>>,
        scratch: Vec<Complex<f32>>,
    }

    impl SpectrumAnalyzer {
        pub fn new(chunk_size: usize) -> Result<Self, CenterCutError> {
            if chunk_size < 2 || chunk_size % 2 != 0 {
                return Err(CenterCutError::InvalidConfig(format!(
                    "spectrum chunk size {} must be even and >= 2",
                    chunk_size
                )));
            }
            let mut planner = FftPlanner::<f32>::new();
            let fft = planner.plan_fft_forward(chunk_size);
            let scratch = vec![Complex { re: 0.0, im: 0.0 }; fft.get_inplace_scratch_len()];
            let window = hann_window(chunk_size);
            Ok(Self {
                chunk_size,
                scale: magnitude_scale(&window),
                window,
                fft,
                buffer: vec![Complex { re: 0.0, im: 0.0 }; chunk_size],
                scratch,
            })
        }

        pub fn chunk_size(&self) -> usize {
            self.chunk_size
        }

        pub fn bins(&self) -> usize {
            self.chunk_size / 2
        }

        pub fn analyze(&mut self, samples: &[f32], out: &mut [f32]) -> Result<(), CenterCutError> {
            if samples.len() != self.chunk_size || out.len() < self.bins() {
                return Err(CenterCutError::Fft(format!(
                    "expected {} samples and {} bins, got {} and {}",
                    self.chunk_size,
                    self.bins(),
                    samples.len(),
                    out.len()
                )));
            }
            for ((slot, &sample), &w) in self.buffer.iter_mut().zip(samples).zip(&self.window) {
                *slot = Complex {
                    re: sample * w,
                    im: 0.0,
                };
            }
            self.fft
                .process_with_scratch(&mut self.buffer, &mut self.scratch);
            let bins = self.bins();
            for (dst, value) in out[..bins].iter_mut().zip(&self.buffer) {
                *dst = value.norm() * self.scale;
            }
            Ok(())
        }
    }
}

#[cfg(feature = "real-fft")]
mod real_fft {
    use std::sync::Arc;

    use realfft::num_complex::Complex;
    use realfft::{RealFftPlanner, RealToComplex};

    use super::{hann_window, magnitude_scale};
    use crate::error::CenterCutError;

    #[derive(Clone)]
    pub struct SpectrumAnalyzer {
        chunk_size: usize,
        window: Vec<f32>,
        scale: f32,
        r2c: Arc<dyn RealToComplex<f32>>,
        input: Vec<f32>,
        spectrum: Vec<Complex<f32>>,
        scratch: Vec<Complex<f32>>,
    }

    impl SpectrumAnalyzer {
        pub fn new(chunk_size: usize) -> Result<Self, CenterCutError> {
            if chunk_size < 2 || chunk_size % 2 != 0 {
                return Err(CenterCutError::InvalidConfig(format!(
                    "spectrum chunk size {} must be even and >= 2",
                    chunk_size
                )));
            }
            let mut planner = RealFftPlanner::<f32>::new();
            let r2c = planner.plan_fft_forward(chunk_size);
            let window = hann_window(chunk_size);
            Ok(Self {
                chunk_size,
                scale: magnitude_scale(&window),
                window,
                input: r2c.make_input_vec(),
                spectrum: r2c.make_output_vec(),
                scratch: r2c.make_scratch_vec(),
                r2c,
            })
        }

        pub fn chunk_size(&self) -> usize {
            self.chunk_size
        }

        pub fn bins(&self) -> usize {
            self.chunk_size / 2
        }

        pub fn analyze(&mut self, samples: &[f32], out: &mut [f32]) -> Result<(), CenterCutError> {
            if samples.len() != self.chunk_size || out.len() < self.bins() {
                return Err(CenterCutError::Fft(format!(
                    "expected {} samples and {} bins, got {} and {}",
                    self.chunk_size,
                    self.bins(),
                    samples.len(),
                    out.len()
                )));
            }
            for ((slot, &sample), &w) in self.input.iter_mut().zip(samples).zip(&self.window) {
                *slot = sample * w;
            }
            self.r2c
                .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)?;
            let bins = self.bins();
            for (dst, value) in out[..bins].iter_mut().zip(&self.spectrum) {
                *dst = value.norm() * self.scale;
            }
            Ok(())
        }
    }
}

#[cfg(not(feature = "real-fft"))]
pub use complex_fft::SpectrumAnalyzer;

#[cfg(feature = "real-fft")]
pub use real_fft::SpectrumAnalyzer;

/// Streaming producer of spectral chunks for one channel.
#[derive(Clone)]
pub struct SpectrumFeed {
    analyzer: SpectrumAnalyzer,
    hop: usize,
    history: Vec<f32>,
}

impl SpectrumFeed {
    /// Create a feed emitting a chunk every `hop` frames.
    ///
    /// `hop` is clamped to `[1, chunk_size]` so no frame is skipped.
    ///
    /// # Errors
    /// Returns [`CenterCutError::InvalidConfig`] for an odd or tiny
    /// `chunk_size`.
    pub fn new(chunk_size: usize, hop: usize) -> Result<Self, CenterCutError> {
        let analyzer = SpectrumAnalyzer::new(chunk_size)?;
        Ok(Self {
            hop: hop.clamp(1, chunk_size),
            history: Vec::with_capacity(chunk_size * 2),
            analyzer,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.analyzer.chunk_size()
    }

    pub fn bins(&self) -> usize {
        self.analyzer.bins()
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Forget buffered history; the next chunk starts at the next frame.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Feed `samples` and append every completed chunk's bins to `out`.
    ///
    /// # Returns
    /// Number of chunks appended.
    ///
    /// # Errors
    /// Propagates FFT failures from the analyzer.
    pub fn push(&mut self, samples: &[f32], out: &mut Vec<f32>) -> Result<usize, CenterCutError> {
        let chunk_size = self.analyzer.chunk_size();
        let bins = self.analyzer.bins();
        self.history.extend_from_slice(samples);

        let mut start = 0;
        let mut emitted = 0;
        while start + chunk_size <= self.history.len() {
            let at = out.len();
            out.resize(at + bins, 0.0);
            self.analyzer
                .analyze(&self.history[start..start + chunk_size], &mut out[at..])?;
            start += self.hop;
            emitted += 1;
        }
        self.history.drain(..start.min(self.history.len()));
        Ok(emitted)
    }
}
