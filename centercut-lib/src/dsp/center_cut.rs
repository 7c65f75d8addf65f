//! Center-channel separation by windowed, overlap-added Hartley blocks.
//!
//! Input frames accumulate in a circular window. Every `hop` new frames the
//! whole window is transformed, each frequency bin gets a similarity
//! coefficient `alpha` from the sum/difference energy of the two channels,
//! and the estimated center is transformed back and overlap-added into a
//! rolling accumulator. The first `overlap_count - 1` blocks are discarded,
//! so output lags input by exactly `window_size - hop` frames.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{
    BASS_TO_SIDES_CUTOFF_HZ, OUTPUT_MAX_BUFFERS, OVERLAP_COUNT, SAMPLE_RATE, WINDOW_SIZE,
};
use crate::dsp::fht::{compute_fht, validate_sizes, TransformTables};
use crate::dsp::output_queue::OutputQueue;
use crate::dsp::pcm;
use crate::error::CenterCutError;

/// Energy below which a bin is treated as silent (`alpha = 0`).
const NO_DIV_BY_ZERO: f64 = 0.000_000_000_000_001;

/// Which half of the separation is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputMode {
    /// Input with the center removed (karaoke).
    Sides,
    /// The isolated center on both channels.
    Center,
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::Sides
    }
}

/// Serialized configuration for a [`CenterCut`] instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterCutSettings {
    pub window_size: usize,
    pub overlap_count: usize,
    pub output: OutputMode,
    pub bass_to_sides: bool,
    pub bass_cutoff_hz: f64,
    pub sample_rate: u32,
}

impl Default for CenterCutSettings {
    fn default() -> Self {
        Self {
            window_size: WINDOW_SIZE,
            overlap_count: OVERLAP_COUNT,
            output: OutputMode::default(),
            bass_to_sides: false,
            bass_cutoff_hz: BASS_TO_SIDES_CUTOFF_HZ,
            sample_rate: SAMPLE_RATE,
        }
    }
}

impl CenterCutSettings {
    /// # Errors
    /// Returns [`CenterCutError::InvalidConfig`] for unsupported window or
    /// overlap sizes or a negative cutoff.
    pub fn validate(&self) -> Result<(), CenterCutError> {
        validate_sizes(self.window_size, self.overlap_count)?;
        if !(self.bass_cutoff_hz >= 0.0) {
            return Err(CenterCutError::InvalidConfig(format!(
                "bass cutoff {} Hz must be >= 0",
                self.bass_cutoff_hz
            )));
        }
        Ok(())
    }
}

/// Stereo center separator with its own tables, window and output queue.
#[derive(Debug, Clone)]
pub struct CenterCut {
    tables: Arc<TransformTables>,
    output: OutputMode,
    bass_to_sides: bool,
    bass_cutoff_hz: f64,
    sample_rate: u32,
    input: Vec<[f64; 2]>,
    input_pos: usize,
    samples_needed: usize,
    discard_blocks: usize,
    overlap: Vec<Vec<f64>>,
    temp_l: Vec<f64>,
    temp_r: Vec<f64>,
    temp_c: Vec<f64>,
    queue: OutputQueue,
    scratch: Vec<f64>,
}

impl CenterCut {
    /// Build a separator, computing fresh transform tables.
    ///
    /// # Errors
    /// Returns [`CenterCutError::InvalidConfig`] for unsupported window or
    /// overlap sizes.
    pub fn new(settings: &CenterCutSettings) -> Result<Self, CenterCutError> {
        let tables = Arc::new(TransformTables::new(
            settings.window_size,
            settings.overlap_count,
        )?);
        Ok(Self::with_tables(tables, settings))
    }

    /// Build a separator that shares already computed tables.
    ///
    /// Window and overlap come from `tables`; the rest from `settings`.
    pub fn with_tables(tables: Arc<TransformTables>, settings: &CenterCutSettings) -> Self {
        let window_size = tables.window_size();
        let hop = tables.hop_size();
        let overlap_rows = tables.overlap_count() - 1;
        info!(
            "center cut: window={} overlap={} output={:?} bass_to_sides={}",
            window_size,
            tables.overlap_count(),
            settings.output,
            settings.bass_to_sides
        );

        Self {
            output: settings.output,
            bass_to_sides: settings.bass_to_sides,
            bass_cutoff_hz: settings.bass_cutoff_hz.max(0.0),
            sample_rate: settings.sample_rate.max(1),
            input: vec![[0.0; 2]; window_size],
            input_pos: 0,
            samples_needed: hop,
            discard_blocks: overlap_rows,
            overlap: vec![vec![0.0; hop]; overlap_rows],
            temp_l: vec![0.0; window_size],
            temp_r: vec![0.0; window_size],
            temp_c: vec![0.0; window_size],
            queue: OutputQueue::new(OUTPUT_MAX_BUFFERS, hop),
            scratch: Vec::new(),
            tables,
        }
    }

    pub fn tables(&self) -> &Arc<TransformTables> {
        &self.tables
    }

    pub fn hop_size(&self) -> usize {
        self.tables.hop_size()
    }

    /// Frames withheld before the first output (`window_size - hop`).
    pub fn latency_frames(&self) -> usize {
        self.tables.window_size() - self.tables.hop_size()
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output
    }

    pub fn set_output_mode(&mut self, output: OutputMode) {
        self.output = output;
    }

    pub fn set_bass_to_sides(&mut self, enabled: bool) {
        self.bass_to_sides = enabled;
    }

    pub fn set_bass_cutoff_hz(&mut self, cutoff_hz: f64) {
        self.bass_cutoff_hz = cutoff_hz.max(0.0);
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate.max(1);
    }

    /// Number of finished blocks waiting in the output queue.
    pub fn pending_blocks(&self) -> usize {
        self.queue.len()
    }

    /// Frames ready to be read from the output queue.
    pub fn frames_available(&self) -> usize {
        self.queue.frames_available()
    }

    /// Clear all history and pending output, restarting the warm-up.
    pub fn reset(&mut self) {
        for frame in self.input.iter_mut() {
            *frame = [0.0; 2];
        }
        for row in self.overlap.iter_mut() {
            row.fill(0.0);
        }
        self.input_pos = 0;
        self.samples_needed = self.tables.hop_size();
        self.discard_blocks = self.tables.overlap_count() - 1;
        self.queue.clear();
        debug!("center cut reset");
    }

    /// Append stereo frames, running one block per completed hop.
    ///
    /// # Returns
    /// Number of frames consumed, which is `left.len().min(right.len())`
    /// unless the output queue filled up.
    ///
    /// # Errors
    /// Returns [`CenterCutError::OutputQueueFull`] when a finished block
    /// cannot be queued. The reported frames were consumed; drain with
    /// [`Self::pull_block`] or [`Self::read_interleaved`] and push the rest.
    pub fn push(&mut self, left: &[f32], right: &[f32]) -> Result<usize, CenterCutError> {
        let count = left.len().min(right.len());
        self.push_frames(count, |frame| [left[frame] as f64, right[frame] as f64])
    }

    /// Interleaved variant of [`Self::push`].
    ///
    /// # Errors
    /// See [`Self::push`].
    pub fn push_interleaved(&mut self, samples: &[f32]) -> Result<usize, CenterCutError> {
        self.push_frames(samples.len() / 2, |frame| {
            [samples[frame * 2] as f64, samples[frame * 2 + 1] as f64]
        })
    }

    /// Pop the oldest finished block as interleaved stereo.
    ///
    /// Allocates the returned buffer; real-time callers read through
    /// [`Self::read_interleaved`] into their own buffer instead.
    pub fn pull_block(&mut self) -> Option<Vec<f32>> {
        self.queue.pop_block()
    }

    /// Copy finished output into `out` (interleaved stereo).
    ///
    /// # Returns
    /// Number of frames written.
    pub fn read_interleaved(&mut self, out: &mut [f32]) -> usize {
        self.queue.read_interleaved(out)
    }

    /// Push `input` and read back up to as many frames into `output`.
    ///
    /// During warm-up fewer frames come back than went in.
    ///
    /// # Returns
    /// Number of frames written to `output`.
    ///
    /// # Errors
    /// See [`Self::push`].
    pub fn process_interleaved(
        &mut self,
        input: &[f32],
        output: &mut [f32],
    ) -> Result<usize, CenterCutError> {
        let frames = input.len() / 2;
        let mut consumed = 0;
        let mut written = 0;
        let out_frames = output.len() / 2;

        while consumed < frames {
            match self.push_interleaved(&input[consumed * 2..frames * 2]) {
                Ok(accepted) => consumed += accepted,
                Err(CenterCutError::OutputQueueFull { accepted }) => {
                    consumed += accepted;
                    if written == out_frames {
                        return Err(CenterCutError::OutputQueueFull { accepted: consumed });
                    }
                    written += self.read_interleaved(&mut output[written * 2..out_frames * 2]);
                }
                Err(err) => return Err(err),
            }
        }
        let limit = out_frames.min(frames).max(written);
        written += self.read_interleaved(&mut output[written * 2..limit * 2]);
        Ok(written)
    }

    /// Process packed little-endian PCM in place.
    ///
    /// Unsupported bit depths pass through untouched.
    ///
    /// # Returns
    /// Number of frames now valid at the start of `bytes`.
    ///
    /// # Errors
    /// See [`Self::push`].
    pub fn process_pcm(&mut self, bytes: &mut [u8], bits_per_sample: u16) -> Result<usize, CenterCutError> {
        if !pcm::bits_per_sample_is_valid(bits_per_sample) {
            let frames = bytes.len() / ((bits_per_sample as usize).div_ceil(8).max(1) * 2);
            warn!(
                "center cut: {} bits per sample unsupported, passing {} frames through",
                bits_per_sample, frames
            );
            return Ok(frames);
        }
        let width = pcm::bytes_per_sample(bits_per_sample)?;
        let frames = bytes.len() / (width * 2);

        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.resize(frames * 2, 0.0);
        pcm::decode(bytes, bits_per_sample, &mut scratch)?;
        let input: Vec<f32> = scratch.iter().map(|&sample| sample as f32).collect();
        let mut output = vec![0.0_f32; frames * 2];
        let result = self.process_interleaved(&input, &mut output);

        if let Ok(written) = result {
            for (dst, src) in scratch.iter_mut().zip(output[..written * 2].iter()) {
                *dst = *src as f64;
            }
            pcm::encode(&scratch[..written * 2], bits_per_sample, bytes)?;
        }
        self.scratch = scratch;
        result
    }

    fn push_frames<F>(&mut self, count: usize, frame_at: F) -> Result<usize, CenterCutError>
    where
        F: Fn(usize) -> [f64; 2],
    {
        let window_mask = self.tables.window_size() - 1;
        let mut consumed = 0;

        loop {
            if self.samples_needed == 0 {
                if !self.run_block() {
                    warn!("center cut output queue full after {} frames", consumed);
                    return Err(CenterCutError::OutputQueueFull { accepted: consumed });
                }
            }
            if consumed == count {
                return Ok(consumed);
            }

            let copy = self.samples_needed.min(count - consumed);
            for offset in 0..copy {
                self.input[(self.input_pos + offset) & window_mask] = frame_at(consumed + offset);
            }
            consumed += copy;
            self.input_pos = (self.input_pos + copy) & window_mask;
            self.samples_needed -= copy;
        }
    }

    fn bass_cutoff_bin(&self) -> usize {
        let bin_hz = self.sample_rate as f64 / self.tables.window_size() as f64;
        (self.bass_cutoff_hz / bin_hz + 0.5) as usize
    }

    /// Run one separation block over the current window.
    ///
    /// Returns `false` without touching any state when the finished block
    /// would not fit in the output queue.
    fn run_block(&mut self) -> bool {
        if self.discard_blocks == 0 && self.queue.is_full() {
            return false;
        }

        let tables = Arc::clone(&self.tables);
        let n = tables.window_size();
        let half = n / 2;
        let hop = tables.hop_size();
        let mask = n - 1;
        let bit_rev = tables.bit_rev();
        let bass_bins = if self.bass_to_sides {
            self.bass_cutoff_bin()
        } else {
            0
        };

        for (i, (&j, &w)) in bit_rev.iter().zip(tables.pre_window()).enumerate() {
            let frame = self.input[(j + self.input_pos) & mask];
            self.temp_l[i] = frame[0] * w;
            self.temp_r[i] = frame[1] * w;
        }

        compute_fht(&mut self.temp_l, tables.sine());
        compute_fht(&mut self.temp_r, tables.sine());

        // DC and Nyquist never carry center content.
        self.temp_c[bit_rev[0]] = 0.0;
        self.temp_c[bit_rev[half]] = 0.0;
        for i in 1..half {
            let l_re = self.temp_l[i] + self.temp_l[n - i];
            let l_im = self.temp_l[i] - self.temp_l[n - i];
            let r_re = self.temp_r[i] + self.temp_r[n - i];
            let r_im = self.temp_r[i] - self.temp_r[n - i];

            let sum_re = l_re + r_re;
            let sum_im = l_im + r_im;
            let diff_re = l_re - r_re;
            let diff_im = l_im - r_im;

            let sum_sq = sum_re * sum_re + sum_im * sum_im;
            let diff_sq = diff_re * diff_re + diff_im * diff_im;
            let alpha = if sum_sq > NO_DIV_BY_ZERO && i >= bass_bins {
                0.5 - (diff_sq / sum_sq).sqrt() * 0.5
            } else {
                0.0
            };

            let c_re = sum_re * alpha;
            let c_im = sum_im * alpha;
            self.temp_c[bit_rev[i]] = c_re + c_im;
            self.temp_c[bit_rev[n - i]] = c_re - c_im;
        }

        compute_fht(&mut self.temp_c, tables.sine());
        for (sample, &w) in self.temp_c.iter_mut().zip(tables.post_window()) {
            *sample *= w;
        }

        if self.discard_blocks > 0 {
            self.discard_blocks -= 1;
        } else if let Some(mut block) = self.queue.begin_write() {
            let rows = self.overlap.len();
            for i in 0..hop {
                let c = self.overlap[0][i] + self.temp_c[i];
                let frame = self.input[self.input_pos + i];
                match self.output {
                    OutputMode::Center => {
                        block[i * 2] = c;
                        block[i * 2 + 1] = c;
                    }
                    OutputMode::Sides => {
                        block[i * 2] = frame[0] - c;
                        block[i * 2 + 1] = frame[1] - c;
                    }
                }
            }

            // Row k holds the contribution due k + 1 hops from now.
            for row in 0..rows - 1 {
                let (head, tail) = self.overlap.split_at_mut(row + 1);
                let next = &tail[0];
                let block_offset = (row + 1) * hop;
                for (i, value) in head[row].iter_mut().enumerate() {
                    *value = next[i] + self.temp_c[block_offset + i];
                }
            }
            let last_offset = rows * hop;
            self.overlap[rows - 1].copy_from_slice(&self.temp_c[last_offset..last_offset + hop]);

            self.queue.commit(block);
        }

        self.samples_needed = hop;
        true
    }
}
