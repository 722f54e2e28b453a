//! Animation frame pacing
//!
//! Hosts without a compositor callback use a [`FrameClock`] to decide when the
//! next animation frame is due.
//!
//! # Target Frame Intervals
//! - 120 FPS (ProMotion): 8.33ms per frame
//! - 60 FPS (standard): 16.67ms per frame

use std::time::{Duration, Instant};

/// Frame interval for 60 FPS displays (16.67ms)
pub const FRAME_INTERVAL_60FPS: Duration = Duration::from_micros(16_667);

/// Frame interval for 120 FPS displays (8.33ms)
pub const FRAME_INTERVAL_120FPS: Duration = Duration::from_micros(8_333);

/// Fixed-interval frame clock
///
/// # Example
///
/// ```
/// use std::time::{Duration, Instant};
/// use viewport_scheduler::frame_clock::{FrameClock, FRAME_INTERVAL_60FPS};
///
/// let start = Instant::now();
/// let mut clock = FrameClock::new(FRAME_INTERVAL_60FPS);
///
/// // The first frame is always due
/// assert!(clock.tick(start));
/// assert!(!clock.tick(start + Duration::from_millis(5)));
/// assert!(clock.tick(start + Duration::from_millis(17)));
/// assert_eq!(clock.frame_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct FrameClock {
    interval: Duration,
    last_frame: Option<Instant>,
    frame_count: u64,
}

impl FrameClock {
    /// Create a clock that has not produced a frame yet
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_frame: None, frame_count: 0 }
    }

    /// Create a clock for 60 FPS displays
    pub fn for_60fps() -> Self {
        Self::new(FRAME_INTERVAL_60FPS)
    }

    /// Create a clock for 120 FPS displays
    pub fn for_120fps() -> Self {
        Self::new(FRAME_INTERVAL_120FPS)
    }

    /// Check whether a frame is due at `now` without consuming it
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_frame {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// Begin a frame at `now` if one is due
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.last_frame = Some(now);
        self.frame_count += 1;
        true
    }

    /// When the next frame becomes due, `None` before the first frame
    pub fn next_frame_at(&self) -> Option<Instant> {
        self.last_frame.map(|last| last + self.interval)
    }

    /// Frame interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of frames produced so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::for_60fps()
    }
}
