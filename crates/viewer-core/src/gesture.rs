//! Touch and wheel input to pinch events.
//!
//! A two-finger touch opens a pinch. Each following move reports the scale
//! against the previous event and against the pinch start; the pinch ends
//! when the finger count drops below two or changes. Ctrl+wheel input, which
//! trackpads use to emulate pinches, is mapped onto the same events with a
//! debounce standing in for the missing end phase.

use crate::config::GestureConfig;
use crate::events::{Observers, SubscriptionId};
use doc_model::Point;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, trace};
use viewport_scheduler::Debounce;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TouchInput {
    pub phase: TouchPhase,
    /// Fingers on the surface after this event
    pub touches: Vec<Point>,
    /// Fingers that started, moved or lifted in this event
    pub changed_touches: Vec<Point>,
    pub time: Instant,
}

impl TouchInput {
    /// Input where every finger on the surface changed.
    pub fn new(phase: TouchPhase, touches: Vec<Point>, time: Instant) -> Self {
        let changed_touches = touches.clone();
        Self { phase, touches, changed_touches, time }
    }

    pub fn with_changed_touches(mut self, changed_touches: Vec<Point>) -> Self {
        self.changed_touches = changed_touches;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelInput {
    pub delta_y: f64,
    pub ctrl_key: bool,
    pub position: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinchDirection {
    In,
    Out,
}

impl PinchDirection {
    fn from_scale(scale_ratio: f64) -> Self {
        if scale_ratio > 1.0 {
            Self::In
        } else {
            Self::Out
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WheelDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    PinchStart {
        center: Point,
    },
    PinchUpdate {
        /// Scale against the previous event
        scale_ratio: f64,
        direction: PinchDirection,
        /// Scale against the start of the pinch
        start_scale_ratio: f64,
        center: Point,
    },
    PinchEnd {
        start_scale_ratio: f64,
        center: Point,
    },
    /// Plain wheel tick in presentation mode.
    Wheel {
        direction: WheelDirection,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WheelOutcome {
    pub events: Vec<GestureEvent>,
    /// The host should suppress its native wheel handling.
    pub prevent_default: bool,
}

pub struct GestureDetector {
    config: GestureConfig,
    presentation_mode: bool,
    pinch_start: Option<Vec<Point>>,
    last_touches: Vec<Point>,
    last_touch_start_count: usize,
    accumulated_wheel_scale: Option<f64>,
    wheel_center: Point,
    wheel_end: Debounce,
    observers: Observers<GestureEvent>,
}

impl GestureDetector {
    pub fn new(config: GestureConfig) -> Self {
        let wheel_end = Debounce::new(config.wheel_end_delay());
        Self {
            config,
            presentation_mode: false,
            pinch_start: None,
            last_touches: Vec::new(),
            last_touch_start_count: 0,
            accumulated_wheel_scale: None,
            wheel_center: Point::ORIGIN,
            wheel_end,
            observers: Observers::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&GestureEvent) + 'static) -> SubscriptionId {
        self.observers.subscribe(listener)
    }

    pub fn set_presentation_mode(&mut self, enabled: bool) {
        self.presentation_mode = enabled;
    }

    pub fn is_pinching(&self) -> bool {
        self.pinch_start.is_some() || self.accumulated_wheel_scale.is_some()
    }

    /// Whether the most recent touch start had exactly two fingers.
    pub fn was_two_finger_touch(&self) -> bool {
        self.last_touch_start_count == 2
    }

    /// Long-press context menus are suppressed unless the preceding touch
    /// start was a two-finger tap.
    pub fn should_suppress_context_menu(&self) -> bool {
        !self.was_two_finger_touch()
    }

    pub fn handle_touch(&mut self, input: &TouchInput) -> Vec<GestureEvent> {
        let event = match input.phase {
            TouchPhase::Start => self.on_touch_start(&input.touches),
            TouchPhase::Move | TouchPhase::End | TouchPhase::Cancel => self.on_touch(&input.touches),
        };
        event.into_iter().map(|event| self.emit(event)).collect()
    }

    fn on_touch_start(&mut self, touches: &[Point]) -> Option<GestureEvent> {
        self.last_touch_start_count = touches.len();
        if !self.was_two_finger_touch() {
            return None;
        }
        self.pinch_start = Some(touches.to_vec());
        self.last_touches = touches.to_vec();
        Some(GestureEvent::PinchStart { center: center(touches) })
    }

    fn on_touch(&mut self, touches: &[Point]) -> Option<GestureEvent> {
        let start = self.pinch_start.as_ref()?;

        if touches.len() < 2 || touches.len() != self.last_touches.len() {
            let start_scale_ratio = scale_ratio(&self.last_touches, start);
            let center = center(&self.last_touches);
            self.pinch_start = None;
            self.last_touches.clear();
            return Some(GestureEvent::PinchEnd { start_scale_ratio, center });
        }

        let step = scale_ratio(touches, &self.last_touches);
        let start_scale_ratio = scale_ratio(touches, start);
        self.last_touches = touches.to_vec();
        Some(GestureEvent::PinchUpdate {
            scale_ratio: step,
            direction: PinchDirection::from_scale(step),
            start_scale_ratio,
            center: center(touches),
        })
    }

    pub fn handle_wheel(&mut self, input: &WheelInput, now: Instant) -> WheelOutcome {
        if !input.ctrl_key {
            if !self.presentation_mode {
                return WheelOutcome::default();
            }
            let direction =
                if input.delta_y > 0.0 { WheelDirection::Down } else { WheelDirection::Up };
            let event = self.emit(GestureEvent::Wheel { direction });
            // Page turns leave native scrolling alone.
            return WheelOutcome { events: vec![event], prevent_default: false };
        }

        // Presentation mode does not zoom.
        if self.presentation_mode {
            return WheelOutcome::default();
        }

        let scale = (-input.delta_y / self.config.wheel_delta_divisor)
            .exp()
            .clamp(self.config.min_wheel_scale, self.config.max_wheel_scale);
        let center = input.position;
        let mut events = Vec::with_capacity(2);

        let accumulated = match self.accumulated_wheel_scale {
            Some(accumulated) => accumulated,
            None => {
                events.push(self.emit(GestureEvent::PinchStart { center }));
                1.0
            }
        } * scale;
        self.accumulated_wheel_scale = Some(accumulated);
        self.wheel_center = center;
        trace!(scale, accumulated, "ctrl+wheel pinch tick");

        events.push(self.emit(GestureEvent::PinchUpdate {
            scale_ratio: scale,
            direction: PinchDirection::from_scale(scale),
            start_scale_ratio: accumulated,
            center,
        }));
        self.wheel_end.arm(now);

        WheelOutcome { events, prevent_default: true }
    }

    /// Fires the wheel pinch end once ctrl+wheel input has been quiet long enough.
    pub fn poll(&mut self, now: Instant) -> Option<GestureEvent> {
        if !self.wheel_end.poll(now) {
            return None;
        }
        let start_scale_ratio = self.accumulated_wheel_scale.take()?;
        debug!(start_scale_ratio, "ctrl+wheel pinch ended");
        Some(self.emit(GestureEvent::PinchEnd { start_scale_ratio, center: self.wheel_center }))
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.wheel_end.deadline()
    }

    fn emit(&mut self, event: GestureEvent) -> GestureEvent {
        self.observers.notify(&event);
        event
    }
}

fn center(touches: &[Point]) -> Point {
    match touches {
        [first, second, ..] => first.midpoint(*second),
        [only] => *only,
        [] => Point::ORIGIN,
    }
}

fn spread(touches: &[Point]) -> f64 {
    match touches {
        [first, second, ..] => first.distance_to(*second),
        _ => 0.0,
    }
}

/// Ratio of finger spreads; a degenerate reference reports no scaling.
fn scale_ratio(current: &[Point], reference: &[Point]) -> f64 {
    let reference = spread(reference);
    if reference == 0.0 {
        return 1.0;
    }
    spread(current) / reference
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn fingers(spread: f64) -> Vec<Point> {
        vec![Point::new(100.0 - spread / 2.0, 50.0), Point::new(100.0 + spread / 2.0, 50.0)]
    }

    fn touch(phase: TouchPhase, touches: Vec<Point>) -> TouchInput {
        TouchInput::new(phase, touches, Instant::now())
    }

    fn ctrl_wheel(delta_y: f64) -> WheelInput {
        WheelInput { delta_y, ctrl_key: true, position: Point::new(10.0, 20.0) }
    }

    #[test]
    fn two_finger_touch_produces_pinch_stream() {
        let mut detector = GestureDetector::new(GestureConfig::default());

        let events = detector.handle_touch(&touch(TouchPhase::Start, fingers(100.0)));
        assert_eq!(events, vec![GestureEvent::PinchStart { center: Point::new(100.0, 50.0) }]);

        let events = detector.handle_touch(&touch(TouchPhase::Move, fingers(110.0)));
        let GestureEvent::PinchUpdate { scale_ratio, direction, start_scale_ratio, .. } = events[0]
        else {
            panic!("expected pinch update, got {events:?}");
        };
        assert!((scale_ratio - 1.1).abs() < 1e-9);
        assert!((start_scale_ratio - 1.1).abs() < 1e-9);
        assert_eq!(direction, PinchDirection::In);

        let events = detector.handle_touch(&touch(TouchPhase::Move, fingers(121.0)));
        let GestureEvent::PinchUpdate { scale_ratio, start_scale_ratio, .. } = events[0] else {
            panic!("expected pinch update");
        };
        assert!((scale_ratio - 1.1).abs() < 1e-9);
        assert!((start_scale_ratio - 1.21).abs() < 1e-9);

        let lifted = touch(TouchPhase::End, vec![Point::new(50.0, 50.0)]);
        let events = detector.handle_touch(&lifted);
        let GestureEvent::PinchEnd { start_scale_ratio, .. } = events[0] else {
            panic!("expected pinch end");
        };
        assert!((start_scale_ratio - 1.21).abs() < 1e-9);
        assert!(!detector.is_pinching());
    }

    #[test]
    fn pinch_ends_when_finger_count_changes() {
        let mut detector = GestureDetector::new(GestureConfig::default());
        detector.handle_touch(&touch(TouchPhase::Start, fingers(100.0)));

        let mut three = fingers(80.0);
        three.push(Point::new(0.0, 0.0));
        let events = detector.handle_touch(&touch(TouchPhase::Move, three));
        assert!(matches!(events[..], [GestureEvent::PinchEnd { .. }]));
    }

    #[test]
    fn single_finger_touch_does_not_pinch() {
        let mut detector = GestureDetector::new(GestureConfig::default());
        assert!(detector.handle_touch(&touch(TouchPhase::Start, vec![Point::ORIGIN])).is_empty());
        assert!(detector.handle_touch(&touch(TouchPhase::Move, vec![Point::ORIGIN])).is_empty());
        assert!(detector.should_suppress_context_menu());

        detector.handle_touch(&touch(TouchPhase::Start, fingers(10.0)));
        assert!(detector.was_two_finger_touch());
        assert!(!detector.should_suppress_context_menu());
    }

    #[test]
    fn context_menu_follows_latest_touch_start() {
        let mut detector = GestureDetector::new(GestureConfig::default());
        assert!(detector.should_suppress_context_menu());

        detector.handle_touch(&touch(TouchPhase::Start, vec![Point::new(5.0, 5.0)]));
        detector.handle_touch(&touch(TouchPhase::End, Vec::new()));
        assert!(!detector.was_two_finger_touch());

        detector.handle_touch(&touch(TouchPhase::Start, fingers(40.0)));
        assert!(detector.was_two_finger_touch());
        assert!(!detector.should_suppress_context_menu());
        detector.handle_touch(&touch(TouchPhase::End, Vec::new()));
        // Lifting the fingers keeps the last start count
        assert!(!detector.should_suppress_context_menu());

        let mut three = fingers(40.0);
        three.push(Point::new(100.0, 90.0));
        detector.handle_touch(&touch(TouchPhase::Start, three));
        assert!(!detector.was_two_finger_touch());
        assert!(detector.should_suppress_context_menu());
    }

    #[test]
    fn ctrl_wheel_emulates_pinch_with_debounced_end() {
        let mut detector = GestureDetector::new(GestureConfig::default());
        let start = Instant::now();

        let outcome = detector.handle_wheel(&ctrl_wheel(-1000.0), start);
        assert!(outcome.prevent_default);
        assert!(matches!(outcome.events[0], GestureEvent::PinchStart { .. }));
        // exp(10) is clamped to the per-tick maximum
        assert!(matches!(
            outcome.events[1],
            GestureEvent::PinchUpdate { scale_ratio, start_scale_ratio, direction: PinchDirection::In, .. }
                if scale_ratio == 1.25 && start_scale_ratio == 1.25
        ));

        let outcome = detector.handle_wheel(&ctrl_wheel(1000.0), start + Duration::from_millis(50));
        assert_eq!(outcome.events.len(), 1);
        assert!(matches!(
            outcome.events[0],
            GestureEvent::PinchUpdate { scale_ratio, start_scale_ratio, direction: PinchDirection::Out, .. }
                if scale_ratio == 0.75 && (start_scale_ratio - 0.9375).abs() < 1e-12
        ));

        assert_eq!(detector.poll(start + Duration::from_millis(100)), None);
        let end = detector.poll(start + Duration::from_millis(150));
        assert_eq!(
            end,
            Some(GestureEvent::PinchEnd { start_scale_ratio: 0.9375, center: Point::new(10.0, 20.0) })
        );
        assert!(!detector.is_pinching());
        assert_eq!(detector.next_deadline(), None);
    }

    #[test]
    fn cumulative_wheel_ratio_is_not_clamped() {
        let mut detector = GestureDetector::new(GestureConfig::default());
        let now = Instant::now();
        let mut last = 1.0;
        for _ in 0..10 {
            let outcome = detector.handle_wheel(&ctrl_wheel(-500.0), now);
            if let Some(GestureEvent::PinchUpdate { start_scale_ratio, .. }) = outcome.events.last() {
                last = *start_scale_ratio;
            }
        }
        assert!((last - 1.25f64.powi(10)).abs() < 1e-9);
    }

    #[test]
    fn presentation_mode_wheel() {
        let mut detector = GestureDetector::new(GestureConfig::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        detector.subscribe(move |event| sink.borrow_mut().push(*event));

        let plain = WheelInput { delta_y: 3.0, ctrl_key: false, position: Point::ORIGIN };
        assert_eq!(detector.handle_wheel(&plain, Instant::now()), WheelOutcome::default());

        detector.set_presentation_mode(true);
        let outcome = detector.handle_wheel(&plain, Instant::now());
        assert_eq!(outcome.events, vec![GestureEvent::Wheel { direction: WheelDirection::Down }]);
        assert!(!outcome.prevent_default);

        let up = WheelInput { delta_y: -3.0, ..plain };
        detector.handle_wheel(&up, Instant::now());
        assert!(detector.handle_wheel(&ctrl_wheel(-100.0), Instant::now()).events.is_empty());

        assert_eq!(
            *seen.borrow(),
            vec![
                GestureEvent::Wheel { direction: WheelDirection::Down },
                GestureEvent::Wheel { direction: WheelDirection::Up },
            ]
        );
    }
}
