//! Pausable monotonic clock used as the mixer's time base.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct Timer {
    pub time: Duration,
    start_time: Option<Instant>,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            time: Duration::new(0, 0),
            start_time: None,
        }
    }

    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn start_at(&mut self, time: Duration) {
        self.start_time = Some(Instant::now());
        self.time = time;
    }

    pub fn resume(&mut self) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
    }

    pub fn pause(&mut self) {
        if let Some(start) = self.start_time {
            self.time += start.elapsed();
            self.start_time = None;
        }
    }

    pub fn is_running(&self) -> bool {
        self.start_time.is_some()
    }

    /// Elapsed running time, excluding paused spans.
    pub fn get_time(&self) -> Duration {
        if let Some(start) = self.start_time {
            self.time + start.elapsed()
        } else {
            self.time
        }
    }

    pub fn reset(&mut self) {
        self.start_time = None;
        self.time = Duration::new(0, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_timer_holds_its_time() {
        let mut timer = Timer::new();
        timer.start_at(Duration::from_millis(500));
        timer.pause();
        let held = timer.get_time();
        assert!(held >= Duration::from_millis(500));
        assert_eq!(timer.get_time(), held);
        assert!(!timer.is_running());

        timer.resume();
        assert!(timer.is_running());
        assert!(timer.get_time() >= held);

        timer.reset();
        assert_eq!(timer.get_time(), Duration::ZERO);
    }
}
