use crate::config::SwipeConfig;
use crate::events::{Observers, SubscriptionId};
use crate::gesture::{TouchInput, TouchPhase};
use doc_model::Point;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwipeDirection {
    RightToLeft,
    LeftToRight,
}

#[derive(Debug, Clone, Copy)]
struct SwipeStart {
    point: Point,
    time: Instant,
}

/// Recognizes quick horizontal one-finger flicks. Only active in
/// presentation mode.
pub struct SwipeDetector {
    config: SwipeConfig,
    enabled: bool,
    start: Option<SwipeStart>,
    observers: Observers<SwipeDirection>,
}

impl SwipeDetector {
    pub fn new(config: SwipeConfig) -> Self {
        Self { config, enabled: false, start: None, observers: Observers::new() }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SwipeDirection) + 'static) -> SubscriptionId {
        self.observers.subscribe(listener)
    }

    pub fn set_presentation_mode(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.start = None;
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.start.is_some()
    }

    pub fn handle_touch(&mut self, input: &TouchInput) -> Option<SwipeDirection> {
        if !self.enabled {
            return None;
        }

        match input.phase {
            TouchPhase::Start => {
                if self.start.is_some() || input.touches.len() != 1 {
                    self.start = None;
                } else {
                    self.start = Some(SwipeStart { point: input.touches[0], time: input.time });
                }
                None
            }
            TouchPhase::Move => {
                if input.touches.len() != 1 {
                    self.start = None;
                }
                None
            }
            TouchPhase::Cancel => {
                self.start = None;
                None
            }
            TouchPhase::End => self.on_touch_end(input),
        }
    }

    fn on_touch_end(&mut self, input: &TouchInput) -> Option<SwipeDirection> {
        let start = self.start.take()?;
        let [end] = input.changed_touches[..] else {
            return None;
        };
        if !input.touches.is_empty() {
            return None;
        }

        let elapsed = input.time.saturating_duration_since(start.time);
        let delta = start.point.delta_to(end);
        trace!(?elapsed, dx = delta.x, dy = delta.y, "swipe candidate");

        if elapsed > self.config.max_duration()
            || delta.x.abs() < self.config.min_horizontal_px
            || delta.y.abs() > self.config.max_vertical_px
        {
            return None;
        }

        let direction =
            if delta.x > 0.0 { SwipeDirection::LeftToRight } else { SwipeDirection::RightToLeft };
        self.observers.notify(&direction);
        Some(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn detector() -> SwipeDetector {
        let mut detector = SwipeDetector::new(SwipeConfig::default());
        detector.set_presentation_mode(true);
        detector
    }

    fn flick(detector: &mut SwipeDetector, dx: f64, dy: f64, ms: u64) -> Option<SwipeDirection> {
        let start = Instant::now();
        let origin = Point::new(300.0, 200.0);
        detector.handle_touch(&TouchInput::new(TouchPhase::Start, vec![origin], start));
        let end = Point::new(origin.x + dx, origin.y + dy);
        let lifted = TouchInput::new(TouchPhase::End, Vec::new(), start + Duration::from_millis(ms))
            .with_changed_touches(vec![end]);
        detector.handle_touch(&lifted)
    }

    #[test]
    fn quick_horizontal_flick_is_a_swipe() {
        let mut detector = detector();
        assert_eq!(flick(&mut detector, 200.0, 10.0, 150), Some(SwipeDirection::LeftToRight));
        assert_eq!(flick(&mut detector, -200.0, -10.0, 150), Some(SwipeDirection::RightToLeft));
    }

    #[test]
    fn slow_or_short_or_diagonal_flicks_are_ignored() {
        let mut detector = detector();
        assert_eq!(flick(&mut detector, 200.0, 10.0, 300), None);
        assert_eq!(flick(&mut detector, 149.0, 0.0, 100), None);
        assert_eq!(flick(&mut detector, 200.0, 101.0, 100), None);
        assert_eq!(flick(&mut detector, 150.0, 100.0, 200), Some(SwipeDirection::LeftToRight));
    }

    #[test]
    fn disabled_outside_presentation_mode() {
        let mut detector = SwipeDetector::new(SwipeConfig::default());
        assert_eq!(flick(&mut detector, 200.0, 0.0, 100), None);
    }

    #[test]
    fn second_finger_cancels_tracking() {
        let mut detector = detector();
        let now = Instant::now();
        detector.handle_touch(&TouchInput::new(TouchPhase::Start, vec![Point::ORIGIN], now));
        assert!(detector.is_tracking());

        let two = vec![Point::ORIGIN, Point::new(50.0, 0.0)];
        detector.handle_touch(&TouchInput::new(TouchPhase::Start, two, now));
        assert!(!detector.is_tracking());

        let lifted = TouchInput::new(TouchPhase::End, Vec::new(), now)
            .with_changed_touches(vec![Point::new(300.0, 0.0)]);
        assert_eq!(detector.handle_touch(&lifted), None);
    }

    #[test]
    fn listeners_see_swipes() {
        let mut detector = detector();
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = std::rc::Rc::clone(&seen);
        detector.subscribe(move |direction| sink.borrow_mut().push(*direction));
        flick(&mut detector, -180.0, 0.0, 50);
        assert_eq!(*seen.borrow(), vec![SwipeDirection::RightToLeft]);
    }
}
