//! Fixed-capacity overwrite-on-full ring with an absolute frame offset.

use dasp_ring_buffer::Bounded;

/// Ring of fixed-length units (single samples or spectral chunks).
///
/// `offset` is the absolute frame of the oldest buffered unit; each unit
/// spans `frames_per_unit` frames. Writing past capacity discards the
/// oldest units and advances the offset accordingly, so readers can always
/// map a ring position back to playback time.
#[derive(Debug, Clone)]
pub struct CircularRing {
    buffer: Bounded<Vec<f32>>,
    unit_len: usize,
    frames_per_unit: u64,
    offset: u64,
}

impl CircularRing {
    pub fn new(capacity_units: usize, unit_len: usize, frames_per_unit: usize) -> Self {
        let unit_len = unit_len.max(1);
        Self {
            buffer: Bounded::from(vec![0.0; capacity_units.max(1) * unit_len]),
            unit_len,
            frames_per_unit: frames_per_unit.max(1) as u64,
            offset: 0,
        }
    }

    pub fn unit_len(&self) -> usize {
        self.unit_len
    }

    pub fn frames_per_unit(&self) -> u64 {
        self.frames_per_unit
    }

    /// Capacity in units.
    pub fn capacity(&self) -> usize {
        self.buffer.max_len() / self.unit_len
    }

    /// Buffered units.
    pub fn len(&self) -> usize {
        self.buffer.len() / self.unit_len
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn free(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Whether `units` more units fit without overwriting anything.
    pub fn try_accept(&self, units: usize) -> bool {
        units <= self.free()
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Absolute frame just past the newest buffered unit.
    pub fn end_frame(&self) -> u64 {
        self.offset + self.len() as u64 * self.frames_per_unit
    }

    /// Append whole units from `data`, discarding the oldest on overflow.
    ///
    /// A trailing partial unit is ignored.
    ///
    /// # Returns
    /// Number of units discarded (buffered or incoming) to make room.
    pub fn append(&mut self, data: &[f32]) -> usize {
        let units = data.len() / self.unit_len;
        let capacity = self.capacity();

        // Incoming units that can never be retained are dropped up front.
        let skipped = units.saturating_sub(capacity);
        let keep = &data[skipped * self.unit_len..units * self.unit_len];

        let free = self.free();
        let evicted = (units - skipped).saturating_sub(free);
        for _ in 0..evicted * self.unit_len {
            self.buffer.pop();
        }
        for &value in keep {
            let _ = self.buffer.push(value);
        }

        let discarded = evicted + skipped;
        self.offset += discarded as u64 * self.frames_per_unit;
        discarded
    }

    /// Reposition the time reference without touching buffered data.
    pub fn set_offset(&mut self, frame: u64) {
        self.offset = frame;
    }

    /// Drop everything and restart at `frame`.
    pub fn reset(&mut self, frame: u64) {
        while self.buffer.pop().is_some() {}
        self.offset = frame;
    }

    /// Copy `count` units starting `start` units after the oldest.
    pub fn copy_units(&self, start: usize, count: usize) -> Vec<f32> {
        let start = start.min(self.len());
        let count = count.min(self.len() - start);
        self.buffer
            .iter()
            .skip(start * self.unit_len)
            .take(count * self.unit_len)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_discards_exactly_the_excess() {
        let mut ring = CircularRing::new(8, 1, 1);
        assert_eq!(ring.append(&[1.0, 2.0, 3.0, 4.0, 5.0]), 0);
        assert!(ring.try_accept(3));
        assert!(!ring.try_accept(4));

        // 5 units, 3 free: exactly 2 of the oldest go.
        assert_eq!(ring.append(&[6.0, 7.0, 8.0, 9.0, 10.0]), 2);
        assert_eq!(ring.len(), ring.capacity());
        assert_eq!(ring.offset(), 2);
        assert_eq!(ring.copy_units(0, 8), vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
    }

    #[test]
    fn oversized_writes_keep_the_newest_units() {
        let mut ring = CircularRing::new(4, 1, 1);
        ring.append(&[1.0, 2.0]);
        let data: Vec<f32> = (10..20).map(|v| v as f32).collect();
        assert_eq!(ring.append(&data), 8);
        assert_eq!(ring.offset(), 8);
        assert_eq!(ring.end_frame(), 12);
        assert_eq!(ring.copy_units(0, 4), vec![16.0, 17.0, 18.0, 19.0]);
    }

    #[test]
    fn chunk_units_advance_offset_by_hop() {
        let mut ring = CircularRing::new(2, 3, 100);
        ring.append(&[1.0; 6]);
        assert_eq!(ring.end_frame(), 200);
        ring.append(&[2.0, 2.0, 2.0, 9.0]);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.offset(), 100);
        assert_eq!(ring.copy_units(1, 5), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn reset_and_set_offset() {
        let mut ring = CircularRing::new(4, 1, 1);
        ring.append(&[1.0, 2.0]);
        ring.set_offset(40);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.end_frame(), 42);

        ring.reset(1000);
        assert!(ring.is_empty());
        assert_eq!(ring.offset(), 1000);
        assert_eq!(ring.copy_units(0, 10), Vec::<f32>::new());
    }
}
