//! Reconciles the document's internal zoom with the host (browser) zoom.
//!
//! Three policies decide who owns the zoom the user sees:
//!
//! - **Inactive**: host zoom is fixed at construction and never read again.
//! - **Active**: the viewer owns the combined zoom and pushes every change
//!   to the host. Pushes are asynchronous; a change made while one is in
//!   flight is re-evaluated once it settles instead of racing it.
//! - **Embedded**: the host owns its zoom and the viewer multiplies it in,
//!   rescaling its scroll position whenever the host zoom changes.

use crate::events::{Observers, SubscriptionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Absolute tolerance for zoom comparisons.
pub const ZOOM_EPSILON: f64 = 0.0001;

pub fn floating_point_equals(a: f64, b: f64) -> bool {
    (a - b).abs() <= ZOOM_EPSILON
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomBehavior {
    #[default]
    Inactive,
    Active,
    Embedded,
}

impl FromStr for ZoomBehavior {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "inactive" => Ok(Self::Inactive),
            "active" => Ok(Self::Active),
            "embedded" => Ok(Self::Embedded),
            other => Err(format!("unknown zoom behavior {other:?}")),
        }
    }
}

/// The host side of the Active policy.
pub trait BrowserZoomHost {
    fn browser_zoom(&self) -> f64;

    /// Starts an asynchronous zoom change. The host reports completion
    /// through `Viewport::browser_zoom_settled`.
    fn set_browser_zoom(&mut self, zoom: f64);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomManagerEvent {
    /// Host changed the zoom; the viewport should adopt it as its own.
    SetZoom(f64),
    /// Host zoom moved away from `old_browser_zoom`; the viewport should
    /// rescale its scroll position into the new zoom space.
    UpdateZoomFromBrowser { old_browser_zoom: f64 },
}

enum Strategy {
    Inactive { browser_zoom: f64 },
    Active(ActiveZoom),
    Embedded { browser_zoom: f64 },
}

struct ActiveZoom {
    host: Box<dyn BrowserZoomHost>,
    browser_zoom: f64,
    /// Zoom currently being pushed to the host
    in_flight: Option<f64>,
}

pub struct ZoomManager {
    strategy: Strategy,
    observers: Observers<ZoomManagerEvent>,
}

impl ZoomManager {
    pub fn inactive(browser_zoom: f64) -> Self {
        Self::with_strategy(Strategy::Inactive { browser_zoom })
    }

    pub fn active(host: Box<dyn BrowserZoomHost>) -> Self {
        let browser_zoom = host.browser_zoom();
        Self::with_strategy(Strategy::Active(ActiveZoom { host, browser_zoom, in_flight: None }))
    }

    pub fn embedded(browser_zoom: f64) -> Self {
        Self::with_strategy(Strategy::Embedded { browser_zoom })
    }

    /// Builds the manager for `behavior`. Active needs a host; without one
    /// the manager degrades to Inactive.
    pub fn create(
        behavior: ZoomBehavior,
        initial_browser_zoom: f64,
        host: Option<Box<dyn BrowserZoomHost>>,
    ) -> Self {
        match (behavior, host) {
            (ZoomBehavior::Inactive, _) => Self::inactive(initial_browser_zoom),
            (ZoomBehavior::Embedded, _) => Self::embedded(initial_browser_zoom),
            (ZoomBehavior::Active, Some(host)) => Self::active(host),
            (ZoomBehavior::Active, None) => {
                warn!("active zoom behavior requested without a host; falling back to inactive");
                Self::inactive(initial_browser_zoom)
            }
        }
    }

    fn with_strategy(strategy: Strategy) -> Self {
        Self { strategy, observers: Observers::new() }
    }

    pub fn behavior(&self) -> ZoomBehavior {
        match self.strategy {
            Strategy::Inactive { .. } => ZoomBehavior::Inactive,
            Strategy::Active(_) => ZoomBehavior::Active,
            Strategy::Embedded { .. } => ZoomBehavior::Embedded,
        }
    }

    pub fn browser_zoom(&self) -> f64 {
        match &self.strategy {
            Strategy::Inactive { browser_zoom } | Strategy::Embedded { browser_zoom } => {
                *browser_zoom
            }
            Strategy::Active(active) => active.browser_zoom,
        }
    }

    /// Total zoom the user sees for a given internal zoom.
    pub fn apply_browser_zoom(&self, zoom: f64) -> f64 {
        match &self.strategy {
            Strategy::Active(_) => zoom,
            Strategy::Inactive { browser_zoom } | Strategy::Embedded { browser_zoom } => {
                browser_zoom * zoom
            }
        }
    }

    /// Inverse of [`ZoomManager::apply_browser_zoom`].
    pub fn internal_zoom_component(&self, zoom: f64) -> f64 {
        match &self.strategy {
            Strategy::Active(_) => zoom,
            Strategy::Inactive { browser_zoom } | Strategy::Embedded { browser_zoom } => {
                zoom / browser_zoom
            }
        }
    }

    pub fn is_push_in_flight(&self) -> bool {
        matches!(&self.strategy, Strategy::Active(active) if active.in_flight.is_some())
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ZoomManagerEvent) + 'static) -> SubscriptionId {
        self.observers.subscribe(listener)
    }

    /// Host reported a new zoom factor.
    pub fn on_browser_zoom_change(&mut self, new_zoom: f64) -> Option<ZoomManagerEvent> {
        let event = match &mut self.strategy {
            Strategy::Inactive { .. } => None,
            Strategy::Active(active) => {
                if active.in_flight.is_some() {
                    debug!(new_zoom, "ignoring browser zoom echo while a push is in flight");
                    None
                } else if floating_point_equals(active.browser_zoom, new_zoom) {
                    None
                } else {
                    active.browser_zoom = new_zoom;
                    Some(ZoomManagerEvent::SetZoom(new_zoom))
                }
            }
            Strategy::Embedded { browser_zoom } => {
                if floating_point_equals(*browser_zoom, new_zoom) {
                    None
                } else {
                    let old_browser_zoom = std::mem::replace(browser_zoom, new_zoom);
                    Some(ZoomManagerEvent::UpdateZoomFromBrowser { old_browser_zoom })
                }
            }
        };

        if let Some(event) = &event {
            debug!(?event, "browser zoom changed");
            self.observers.notify(event);
        }
        event
    }

    /// The viewport finished a zoom mutation; `zoom` is its total zoom.
    pub fn on_pdf_zoom_change(&mut self, zoom: f64) {
        let Strategy::Active(active) = &mut self.strategy else {
            return;
        };
        if active.in_flight.is_some() || floating_point_equals(active.browser_zoom, zoom) {
            return;
        }
        debug!(zoom, "pushing zoom to host");
        active.in_flight = Some(zoom);
        active.host.set_browser_zoom(zoom);
    }

    /// Host completed the in-flight push. `current_zoom` is the viewport's
    /// total zoom now, which may have moved on while the push was pending.
    pub fn on_browser_zoom_settled(&mut self, current_zoom: f64) -> bool {
        let Strategy::Active(active) = &mut self.strategy else {
            return false;
        };
        let Some(pushed) = active.in_flight.take() else {
            warn!("browser zoom settled with no push in flight");
            return false;
        };
        active.browser_zoom = pushed;
        self.on_pdf_zoom_change(current_zoom);
        true
    }
}

impl fmt::Debug for ZoomManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoomManager")
            .field("behavior", &self.behavior())
            .field("browser_zoom", &self.browser_zoom())
            .field("push_in_flight", &self.is_push_in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct HostLog {
        zoom: f64,
        pushes: Vec<f64>,
    }

    struct RecordingHost(Rc<RefCell<HostLog>>);

    impl BrowserZoomHost for RecordingHost {
        fn browser_zoom(&self) -> f64 {
            self.0.borrow().zoom
        }

        fn set_browser_zoom(&mut self, zoom: f64) {
            self.0.borrow_mut().pushes.push(zoom);
        }
    }

    fn active_manager(initial: f64) -> (ZoomManager, Rc<RefCell<HostLog>>) {
        let log = Rc::new(RefCell::new(HostLog { zoom: initial, pushes: Vec::new() }));
        (ZoomManager::active(Box::new(RecordingHost(Rc::clone(&log)))), log)
    }

    #[test]
    fn active_pushes_once_and_coalesces_until_settled() {
        let (mut manager, log) = active_manager(1.0);

        manager.on_pdf_zoom_change(1.5);
        manager.on_pdf_zoom_change(2.0);
        assert_eq!(log.borrow().pushes, vec![1.5]);
        assert!(manager.is_push_in_flight());

        // The zoom moved on to 2.0 while 1.5 was pending
        assert!(manager.on_browser_zoom_settled(2.0));
        assert_eq!(log.borrow().pushes, vec![1.5, 2.0]);

        assert!(manager.on_browser_zoom_settled(2.0));
        assert_eq!(log.borrow().pushes.len(), 2);
        assert!(!manager.is_push_in_flight());
        assert_eq!(manager.browser_zoom(), 2.0);
    }

    #[test]
    fn active_ignores_browser_changes_during_push() {
        let (mut manager, _log) = active_manager(1.0);
        manager.on_pdf_zoom_change(1.5);

        assert_eq!(manager.on_browser_zoom_change(1.5), None);
        manager.on_browser_zoom_settled(1.5);

        assert_eq!(manager.on_browser_zoom_change(3.0), Some(ZoomManagerEvent::SetZoom(3.0)));
        assert_eq!(manager.browser_zoom(), 3.0);
    }

    #[test]
    fn active_skips_push_within_tolerance() {
        let (mut manager, log) = active_manager(1.0);
        manager.on_pdf_zoom_change(1.00005);
        assert!(log.borrow().pushes.is_empty());
        assert_eq!(manager.on_browser_zoom_change(1.00009), None);
    }

    #[test]
    fn embedded_reports_previous_browser_zoom() {
        let mut manager = ZoomManager::embedded(1.0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        manager.subscribe(move |event| sink.borrow_mut().push(*event));

        let event = manager.on_browser_zoom_change(2.0);
        assert_eq!(event, Some(ZoomManagerEvent::UpdateZoomFromBrowser { old_browser_zoom: 1.0 }));
        assert_eq!(manager.apply_browser_zoom(1.5), 3.0);
        assert_eq!(manager.internal_zoom_component(3.0), 1.5);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn inactive_keeps_construction_factor() {
        let mut manager = ZoomManager::inactive(1.25);
        assert_eq!(manager.on_browser_zoom_change(2.0), None);
        assert_eq!(manager.apply_browser_zoom(2.0), 2.5);
        assert_eq!(manager.browser_zoom(), 1.25);
        assert!(!manager.on_browser_zoom_settled(1.0));
    }

    #[test]
    fn create_falls_back_without_host() {
        let manager = ZoomManager::create(ZoomBehavior::Active, 1.0, None);
        assert_eq!(manager.behavior(), ZoomBehavior::Inactive);
        assert_eq!("Embedded".parse::<ZoomBehavior>(), Ok(ZoomBehavior::Embedded));
        assert!("sideways".parse::<ZoomBehavior>().is_err());
    }
}
