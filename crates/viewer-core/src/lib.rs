//! Viewport Core Library
//!
//! Zoom, scroll, fitting and gesture coordination for a paged document
//! viewer.

pub mod config;
pub mod error;
pub mod events;
pub mod fitting;
pub mod gesture;
pub mod keys;
pub mod layout;
pub mod scroll_content;
pub mod swipe;
pub mod viewport;
pub mod zoom_manager;

pub use config::{
    ConfigError, GestureConfig, KeyboardConfig, SwipeConfig, ViewportConfig,
    DEFAULT_PRESET_ZOOM_FACTORS,
};
pub use error::{Result, ScrollError, ViewportError};
pub use events::{Observers, SubscriptionId};
pub use fitting::Scrollbars;
pub use gesture::{
    GestureDetector, GestureEvent, PinchDirection, TouchInput, TouchPhase, WheelDirection,
    WheelInput, WheelOutcome,
};
pub use keys::{Key, KeyAction, KeyContext, KeyHandling, KeyInput, Modifiers};
pub use scroll_content::{ContentHandle, RemoteSurface, ScrollContent};
pub use swipe::{SwipeDetector, SwipeDirection};
pub use viewport::{
    FitToBoundingBoxDimensionParams, FitToBoundingBoxParams, FitToHeightParams, FitToPageParams,
    FitToWidthParams, FittingRequest, Viewport,
};
pub use zoom_manager::{BrowserZoomHost, ZoomBehavior, ZoomManager, ZoomManagerEvent};
