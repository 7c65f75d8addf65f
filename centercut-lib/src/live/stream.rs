//! Paired sample and spectrum rings for one logical channel.

use crate::live::ring::CircularRing;
use crate::live::snapshot::{LiveAudioChannelData, LiveSamples, LiveSpectrum};

#[derive(Debug, Clone)]
pub struct CircularAudioStream {
    samples: CircularRing,
    spectrum: CircularRing,
}

impl CircularAudioStream {
    /// # Arguments
    /// * `samples_capacity` - frames held by the sample ring.
    /// * `spectrum_chunks` - chunks held by the spectrum ring.
    /// * `bins_per_chunk` - magnitudes per chunk.
    /// * `spectrum_hop` - frames between consecutive chunk starts.
    pub fn new(
        samples_capacity: usize,
        spectrum_chunks: usize,
        bins_per_chunk: usize,
        spectrum_hop: usize,
    ) -> Self {
        Self {
            samples: CircularRing::new(samples_capacity, 1, 1),
            spectrum: CircularRing::new(spectrum_chunks, bins_per_chunk, spectrum_hop),
        }
    }

    pub fn samples(&self) -> &CircularRing {
        &self.samples
    }

    pub fn spectrum(&self) -> &CircularRing {
        &self.spectrum
    }

    pub fn try_accept(&self, frames: usize) -> bool {
        self.samples.try_accept(frames)
    }

    pub fn add_samples(&mut self, samples: &[f32]) -> usize {
        self.samples.append(samples)
    }

    pub fn add_spectrum(&mut self, chunks: &[f32]) -> usize {
        self.spectrum.append(chunks)
    }

    pub fn set_buffers_offset(&mut self, frame: u64) {
        self.samples.set_offset(frame);
        self.spectrum.set_offset(frame);
    }

    pub fn reset(&mut self, frame: u64) {
        self.samples.reset(frame);
        self.spectrum.reset(frame);
    }

    /// Copy out `[frame, frame + frames)` clipped to what is buffered.
    ///
    /// Spectral chunks are included when their start frame lies inside the
    /// requested range. Returns [`LiveAudioChannelData::empty`] when the
    /// sample ring has nothing in range.
    pub fn snapshot(&self, frame: u64, frames: usize) -> LiveAudioChannelData {
        let requested_end = frame.saturating_add(frames as u64);
        let start = frame.max(self.samples.offset());
        let end = requested_end.min(self.samples.end_frame());
        if start >= end {
            return LiveAudioChannelData::empty();
        }

        let samples = LiveSamples {
            time_in_frames: start,
            data: self
                .samples
                .copy_units((start - self.samples.offset()) as usize, (end - start) as usize),
        };

        LiveAudioChannelData {
            contains_data: true,
            samples,
            spectrum: self.spectrum_range(frame, requested_end),
        }
    }

    fn spectrum_range(&self, start: u64, end: u64) -> LiveSpectrum {
        let ring = &self.spectrum;
        let hop = ring.frames_per_unit();
        let bins = ring.unit_len();
        let base = ring.offset();

        let first = if start <= base {
            0
        } else {
            (start - base).div_ceil(hop)
        };
        let last = if end <= base {
            0
        } else {
            (end - base).div_ceil(hop)
        };
        let last = last.min(ring.len() as u64);
        if first >= last {
            return LiveSpectrum {
                time_in_frames: start,
                bins_per_chunk: bins,
                ..LiveSpectrum::default()
            };
        }

        let count = (last - first) as usize;
        LiveSpectrum {
            time_in_frames: base + first * hop,
            data: ring.copy_units(first as usize, count),
            chunk_count: count,
            bins_per_chunk: bins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(from: usize, to: usize) -> Vec<f32> {
        (from..to).map(|v| v as f32).collect()
    }

    #[test]
    fn snapshot_inside_range_is_exact() {
        let mut stream = CircularAudioStream::new(16, 4, 2, 4);
        stream.add_samples(&ramp(0, 12));
        let view = stream.snapshot(3, 5);
        assert!(view.contains_data);
        assert_eq!(view.samples.time_in_frames, 3);
        assert_eq!(view.samples.data, ramp(3, 8));
    }

    #[test]
    fn snapshot_is_clipped_to_buffered_range() {
        let mut stream = CircularAudioStream::new(8, 4, 2, 4);
        stream.add_samples(&ramp(0, 12));
        // Ring now holds frames [4, 12).
        let view = stream.snapshot(0, 6);
        assert_eq!(view.samples.time_in_frames, 4);
        assert_eq!(view.samples.data, ramp(4, 6));

        let view = stream.snapshot(10, 100);
        assert_eq!(view.samples.data, ramp(10, 12));
    }

    #[test]
    fn snapshot_outside_range_has_no_data() {
        let mut stream = CircularAudioStream::new(8, 4, 2, 4);
        stream.reset(100);
        stream.add_samples(&ramp(0, 8));
        assert!(!stream.snapshot(0, 100).contains_data);
        assert!(!stream.snapshot(108, 10).contains_data);
        assert_eq!(stream.snapshot(0, 100), LiveAudioChannelData::empty());
    }

    #[test]
    fn spectrum_chunks_are_selected_by_start_frame() {
        let mut stream = CircularAudioStream::new(64, 8, 2, 4);
        stream.add_samples(&ramp(0, 32));
        // Chunks start at frames 0, 4, 8, 12.
        stream.add_spectrum(&[0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);

        let view = stream.snapshot(3, 8);
        assert_eq!(view.spectrum.time_in_frames, 4);
        assert_eq!(view.spectrum.chunk_count, 2);
        assert_eq!(view.spectrum.data, vec![1.0, 1.0, 2.0, 2.0]);
        assert_eq!(view.spectrum.chunk(1), Some(&[2.0_f32, 2.0][..]));
    }
}
