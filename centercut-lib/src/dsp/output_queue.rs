//! Bounded FIFO of finished separator blocks.

use std::collections::VecDeque;

/// Fixed pool of hop-length interleaved stereo blocks.
///
/// Every buffer is allocated up front; writing recycles a spare buffer and
/// reading returns it to the pool, so steady-state processing never
/// allocates. A full queue refuses further writes until it is drained.
#[derive(Debug, Clone)]
pub struct OutputQueue {
    ready: VecDeque<Vec<f64>>,
    spare: Vec<Vec<f64>>,
    block_frames: usize,
    read_offset: usize,
}

impl OutputQueue {
    /// Create a queue holding up to `max_blocks` blocks of `block_frames`.
    pub fn new(max_blocks: usize, block_frames: usize) -> Self {
        let max_blocks = max_blocks.max(1);
        Self {
            ready: VecDeque::with_capacity(max_blocks),
            spare: (0..max_blocks)
                .map(|_| vec![0.0; block_frames * 2])
                .collect(),
            block_frames,
            read_offset: 0,
        }
    }

    /// Return the number of finished blocks waiting to be read.
    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Return `true` when no spare buffer is left for writing.
    pub fn is_full(&self) -> bool {
        self.spare.is_empty()
    }

    /// Frames that can still be read, accounting for a partially read head.
    pub fn frames_available(&self) -> usize {
        (self.ready.len() * self.block_frames).saturating_sub(self.read_offset)
    }

    /// Take a spare buffer to fill, or `None` when the queue is full.
    pub fn begin_write(&mut self) -> Option<Vec<f64>> {
        self.spare.pop()
    }

    /// Publish a buffer previously obtained from [`Self::begin_write`].
    pub fn commit(&mut self, block: Vec<f64>) {
        self.ready.push_back(block);
    }

    /// Copy up to `out.len() / 2` frames into `out` as interleaved `f32`.
    ///
    /// # Returns
    /// Number of frames written.
    pub fn read_interleaved(&mut self, out: &mut [f32]) -> usize {
        let wanted = out.len() / 2;
        let mut written = 0;
        while written < wanted {
            let Some(block) = self.ready.front() else {
                break;
            };
            let take = (self.block_frames - self.read_offset).min(wanted - written);
            let source = &block[self.read_offset * 2..(self.read_offset + take) * 2];
            for (dst, src) in out[written * 2..(written + take) * 2].iter_mut().zip(source) {
                *dst = *src as f32;
            }
            written += take;
            self.read_offset += take;
            if self.read_offset == self.block_frames {
                self.read_complete();
            }
        }
        written
    }

    /// Pop the remainder of the oldest block as interleaved `f32`.
    pub fn pop_block(&mut self) -> Option<Vec<f32>> {
        let block = self.ready.front()?;
        let out = block[self.read_offset * 2..]
            .iter()
            .map(|&sample| sample as f32)
            .collect();
        self.read_complete();
        Some(out)
    }

    /// Drop every pending block and return the buffers to the pool.
    pub fn clear(&mut self) {
        while let Some(block) = self.ready.pop_front() {
            self.spare.push(block);
        }
        self.read_offset = 0;
    }

    fn read_complete(&mut self) {
        if let Some(block) = self.ready.pop_front() {
            self.spare.push(block);
        }
        self.read_offset = 0;
    }
}
