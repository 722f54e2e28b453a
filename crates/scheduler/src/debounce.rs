//! Cancellable fixed-delay task
//!
//! A debounce fires once after its input has been quiet for `delay`. Each
//! [`Debounce::arm`] restarts the countdown; [`Debounce::cancel`] disarms it.
//! Time is passed in by the caller so that hosts can drive the timer from
//! their own event loop and tests never sleep.

use std::time::{Duration, Instant};

/// Fixed-delay timer driven by explicit timestamps
///
/// # Example
///
/// ```
/// use std::time::{Duration, Instant};
/// use viewport_scheduler::Debounce;
///
/// let start = Instant::now();
/// let mut timer = Debounce::new(Duration::from_millis(100));
///
/// timer.arm(start);
/// // Another tick restarts the countdown
/// timer.arm(start + Duration::from_millis(80));
///
/// assert!(!timer.poll(start + Duration::from_millis(150)));
/// assert!(timer.poll(start + Duration::from_millis(180)));
/// // Fires only once
/// assert!(!timer.poll(start + Duration::from_millis(500)));
/// ```
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    /// Create a disarmed timer
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    /// Start or restart the countdown from `now`
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Disarm the timer
    ///
    /// Idempotent. Returns `true` if a pending deadline was dropped.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Fire the timer if its deadline has passed
    ///
    /// Returns `true` exactly once per arming.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Check whether a deadline is pending
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Pending deadline, if armed
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Configured delay
    pub fn delay(&self) -> Duration {
        self.delay
    }
}
