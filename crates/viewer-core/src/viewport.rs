//! The viewport: owner of zoom, scroll position, fitting policy and pinch
//! state for one document viewing session.
//!
//! Every change to the zoom or to the zoom-to-scroll mapping runs inside
//! [`Viewport::might_zoom`]. The outermost bracket fires the before-zoom
//! callback, lets the body mutate, flushes at most one viewport-changed
//! notification, fires the after-zoom callback and finally tells the zoom
//! manager about the new total zoom.

use crate::config::{self, ViewportConfig};
use crate::error::{Result, ViewportError};
use crate::fitting::{self, Scrollbars};
use crate::gesture::{
    GestureDetector, GestureEvent, PinchDirection, TouchInput, WheelDirection, WheelInput,
    WheelOutcome,
};
use crate::keys::{resolve_key, KeyAction, KeyContext, KeyHandling, KeyInput};
use crate::layout;
use crate::scroll_content::{ContentHandle, RemoteSurface, ScrollContent};
use crate::swipe::{SwipeDetector, SwipeDirection};
use crate::zoom_manager::{BrowserZoomHost, ZoomManager, ZoomManagerEvent};
use doc_model::{
    DocumentDimensions, FittingType, InboundMessage, LayoutOptions, PinchPhase, Point, Rect, Size,
    TextDirection, ViewportChangedPayload, PAGE_SHADOW,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info, trace};
use viewport_scheduler::{Coalesce, FrameQueue};

/// Page points are 1/72 inch, screen pixels 1/96 inch.
const POINTS_TO_PIXELS: f64 = 96.0 / 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FitToPageParams {
    pub page: Option<usize>,
    /// Scroll to the top of the page. Ignored when `page` is given.
    pub scroll_to_top: bool,
}

impl Default for FitToPageParams {
    fn default() -> Self {
        Self { page: None, scroll_to_top: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FitToWidthParams {
    pub page: Option<usize>,
    /// Vertical offset into the page, in document coordinates
    pub view_position: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FitToHeightParams {
    pub page: Option<usize>,
    /// Horizontal offset into the page, in document coordinates
    pub view_position: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitToBoundingBoxParams {
    pub bounding_box: Rect,
    pub page: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitToBoundingBoxDimensionParams {
    pub bounding_box: Rect,
    pub page: usize,
    #[serde(default)]
    pub view_position: Option<f64>,
    pub fit_to_width: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FittingRequest {
    None,
    FitToPage(FitToPageParams),
    FitToWidth(FitToWidthParams),
    FitToHeight(FitToHeightParams),
    FitToBoundingBox(FitToBoundingBoxParams),
    FitToBoundingBoxDimension(FitToBoundingBoxDimensionParams),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PinchTask {
    Start { center: Point },
    Update { direction: PinchDirection, start_scale_ratio: f64, center: Point },
    End { start_scale_ratio: f64, center: Point },
}

impl Coalesce for PinchTask {
    fn coalesces_with(&self, pending: &Self) -> bool {
        matches!((self, pending), (PinchTask::Update { .. }, PinchTask::Update { .. }))
    }
}

#[derive(Debug, Clone, Copy)]
struct PinchState {
    phase: PinchPhase,
    prev_scale: f64,
    old_center_in_content: Option<Point>,
    keep_content_centered: bool,
    first_center_in_frame: Option<Point>,
    pan_vector: Option<Point>,
    center: Option<Point>,
}

impl Default for PinchState {
    fn default() -> Self {
        Self {
            phase: PinchPhase::None,
            prev_scale: 1.0,
            old_center_in_content: None,
            keep_content_centered: false,
            first_center_in_frame: None,
            pan_vector: None,
            center: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SavedZoom {
    zoom: f64,
    fitting_type: FittingType,
}

/// Zoom and document-space scroll position a fit settles on.
#[derive(Debug, Clone, Copy)]
struct ZoomTarget {
    zoom: f64,
    position: Point,
}

#[derive(Default)]
struct Callbacks {
    viewport_changed: Option<Box<dyn FnMut()>>,
    before_zoom: Option<Box<dyn FnMut()>>,
    after_zoom: Option<Box<dyn FnMut()>>,
    user_initiated: Option<Box<dyn FnMut(bool)>>,
}

pub struct Viewport {
    config: ViewportConfig,
    window: Size,
    scroll: ScrollContent,
    zoom_manager: ZoomManager,
    gestures: GestureDetector,
    swipes: SwipeDetector,
    document: Option<DocumentDimensions>,
    internal_zoom: f64,
    preset_zoom_factors: Vec<f64>,
    fitting_type: FittingType,
    smooth_scrolling: bool,
    presentation_mode: bool,
    pinch: PinchState,
    pinch_tasks: FrameQueue<PinchTask>,
    saved_zoom: Option<SavedZoom>,
    zoom_depth: u32,
    viewport_changed_pending: bool,
    callbacks: Callbacks,
}

impl Viewport {
    pub fn new(config: ViewportConfig, window: Size, zoom_manager: ZoomManager) -> Result<Self> {
        check_zoom_factors(&config.preset_zoom_factors)?;

        let direction = TextDirection::from_rtl(config.right_to_left);
        Ok(Self {
            window,
            scroll: ScrollContent::new(window, config.scrollbar_width, direction),
            zoom_manager,
            gestures: GestureDetector::new(config.gesture.clone()),
            swipes: SwipeDetector::new(config.swipe.clone()),
            document: None,
            internal_zoom: 1.0,
            preset_zoom_factors: config.preset_zoom_factors.clone(),
            fitting_type: FittingType::None,
            smooth_scrolling: config.smooth_scrolling,
            presentation_mode: false,
            pinch: PinchState::default(),
            pinch_tasks: FrameQueue::new(),
            saved_zoom: None,
            zoom_depth: 0,
            viewport_changed_pending: false,
            callbacks: Callbacks::default(),
            config,
        })
    }

    /// Builds the zoom manager named by `config.zoom_behavior`.
    pub fn from_config(
        config: ViewportConfig,
        window: Size,
        host: Option<Box<dyn BrowserZoomHost>>,
    ) -> Result<Self> {
        let zoom_manager =
            ZoomManager::create(config.zoom_behavior, config.initial_browser_zoom, host);
        Self::new(config, window, zoom_manager)
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn set_viewport_changed_callback(&mut self, callback: impl FnMut() + 'static) {
        self.callbacks.viewport_changed = Some(Box::new(callback));
    }

    pub fn set_before_zoom_callback(&mut self, callback: impl FnMut() + 'static) {
        self.callbacks.before_zoom = Some(Box::new(callback));
    }

    pub fn set_after_zoom_callback(&mut self, callback: impl FnMut() + 'static) {
        self.callbacks.after_zoom = Some(Box::new(callback));
    }

    pub fn set_user_initiated_callback(&mut self, callback: impl FnMut(bool) + 'static) {
        self.callbacks.user_initiated = Some(Box::new(callback));
    }

    pub fn set_zoom_manager(&mut self, manager: ZoomManager) {
        debug!(behavior = ?manager.behavior(), "zoom manager replaced");
        self.zoom_manager = manager;
    }

    pub fn zoom_manager(&self) -> &ZoomManager {
        &self.zoom_manager
    }

    pub fn zoom_manager_mut(&mut self) -> &mut ZoomManager {
        &mut self.zoom_manager
    }

    pub fn gesture_detector_mut(&mut self) -> &mut GestureDetector {
        &mut self.gestures
    }

    pub fn swipe_detector_mut(&mut self) -> &mut SwipeDetector {
        &mut self.swipes
    }

    pub fn scroll_content(&self) -> &ScrollContent {
        &self.scroll
    }

    pub fn set_presentation_mode(&mut self, enabled: bool) {
        debug!(enabled, "presentation mode");
        self.presentation_mode = enabled;
        self.gestures.set_presentation_mode(enabled);
        self.swipes.set_presentation_mode(enabled);
    }

    pub fn is_presentation_mode(&self) -> bool {
        self.presentation_mode
    }

    pub fn set_smooth_scrolling(&mut self, smooth: bool) {
        self.smooth_scrolling = smooth;
    }

    // Content attachment

    pub fn set_content(&mut self, content: Option<ContentHandle>) {
        if self.scroll.set_content(content) {
            self.update_viewport();
        }
    }

    pub fn set_remote_content(&mut self, surface: Box<dyn RemoteSurface>) -> Result<()> {
        self.scroll.set_remote_content(surface)?;
        Ok(())
    }

    pub fn sync_scroll_from_remote(&mut self, position: Point) {
        if self.scroll.sync_scroll_from_remote(position) {
            self.update_viewport();
        }
    }

    pub fn ack_scroll_to_remote(&mut self, position: Point) -> Result<()> {
        self.scroll.ack_scroll_to_remote(position)?;
        if self.scroll.unacked_scrolls() == 0 {
            self.update_viewport();
        }
        Ok(())
    }

    /// Routes a message from the rendering surface.
    pub fn handle_message(&mut self, message: InboundMessage) -> Result<()> {
        match message {
            InboundMessage::AckScrollToRemote { x, y } => self.ack_scroll_to_remote(Point::new(x, y)),
            InboundMessage::SyncScrollFromRemote { x, y } => {
                self.sync_scroll_from_remote(Point::new(x, y));
                Ok(())
            }
            InboundMessage::DocumentDimensions(dimensions) => self.set_document_dimensions(dimensions),
        }
    }

    // Zoom

    /// Total zoom the user sees.
    pub fn zoom(&self) -> f64 {
        self.zoom_manager.apply_browser_zoom(self.internal_zoom)
    }

    pub fn internal_zoom(&self) -> f64 {
        self.internal_zoom
    }

    pub fn preset_zoom_factors(&self) -> &[f64] {
        &self.preset_zoom_factors
    }

    pub fn set_zoom_factor_range(&mut self, factors: Vec<f64>) -> Result<()> {
        check_zoom_factors(&factors)?;
        self.preset_zoom_factors = factors;
        Ok(())
    }

    /// Clamps to the first and last preset factors.
    pub fn clamp_zoom(&self, factor: f64) -> f64 {
        let (Some(min), Some(max)) =
            (self.preset_zoom_factors.first(), self.preset_zoom_factors.last())
        else {
            return factor;
        };
        factor.min(*max).max(*min)
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.fitting_type = FittingType::None;
        self.might_zoom(|viewport| {
            let zoom = viewport.clamp_zoom(zoom);
            viewport.set_zoom_internal(zoom, None);
            viewport.update_viewport();
        });
    }

    pub fn zoom_in(&mut self) {
        self.might_zoom(|viewport| {
            viewport.fitting_type = FittingType::None;
            let current = viewport.internal_zoom;
            let factors = &viewport.preset_zoom_factors;
            let next = factors
                .iter()
                .copied()
                .find(|factor| *factor > current)
                .or_else(|| factors.last().copied())
                .unwrap_or(current);
            debug!(from = current, to = next, "zoom in");
            viewport.set_zoom_internal(next, None);
            viewport.update_viewport();
        });
    }

    pub fn zoom_out(&mut self) {
        self.might_zoom(|viewport| {
            viewport.fitting_type = FittingType::None;
            let current = viewport.internal_zoom;
            let factors = &viewport.preset_zoom_factors;
            let next = factors
                .iter()
                .copied()
                .rev()
                .find(|factor| *factor < current)
                .or_else(|| factors.first().copied())
                .unwrap_or(current);
            debug!(from = current, to = next, "zoom out");
            viewport.set_zoom_internal(next, None);
            viewport.update_viewport();
        });
    }

    /// Host reported a new browser zoom factor.
    pub fn browser_zoom_changed(&mut self, browser_zoom: f64) {
        match self.zoom_manager.on_browser_zoom_change(browser_zoom) {
            Some(ZoomManagerEvent::SetZoom(zoom)) => self.set_zoom(zoom),
            Some(ZoomManagerEvent::UpdateZoomFromBrowser { old_browser_zoom }) => {
                self.update_zoom_from_browser_change(old_browser_zoom);
            }
            None => {}
        }
    }

    /// Host finished applying a zoom pushed by the Active policy.
    pub fn browser_zoom_settled(&mut self) {
        let zoom = self.zoom();
        self.zoom_manager.on_browser_zoom_settled(zoom);
    }

    fn update_zoom_from_browser_change(&mut self, old_browser_zoom: f64) {
        self.might_zoom(|viewport| {
            let old_zoom = old_browser_zoom * viewport.internal_zoom;
            let anchor = scale_point(viewport.position(), old_zoom);
            viewport.content_size_changed();
            let zoom = viewport.zoom();
            viewport.set_position(Point::new(anchor.x * zoom, anchor.y * zoom), false);
            viewport.update_viewport();
        });
    }

    /// Remembers the zoom and fitting for [`Viewport::restore_zoom_state`].
    /// Bounding-box fits are remembered as plain zoom.
    pub fn save_zoom_state(&mut self) {
        let fitting_type = match self.fitting_type {
            FittingType::FitToBoundingBox
            | FittingType::FitToBoundingBoxWidth
            | FittingType::FitToBoundingBoxHeight => FittingType::None,
            other => other,
        };
        if self.saved_zoom.is_some() {
            debug!("overwriting unconsumed saved zoom state");
        }
        self.saved_zoom = Some(SavedZoom { zoom: self.internal_zoom, fitting_type });
    }

    pub fn restore_zoom_state(&mut self) -> Result<()> {
        let Some(saved) = self.saved_zoom.take() else {
            error!("restore requested with no saved zoom state");
            return Err(ViewportError::NoSavedZoomState);
        };
        match saved.fitting_type {
            FittingType::FitToPage => self.fit_to_page(FitToPageParams::default()),
            FittingType::FitToWidth => self.fit_to_width(FitToWidthParams::default()),
            FittingType::FitToHeight => self.fit_to_height(FitToHeightParams::default()),
            _ => {
                self.set_zoom(saved.zoom);
                Ok(())
            }
        }
    }

    // Bracketed mutation

    /// Runs `f` as one zoom transition. Brackets nest; only the outermost
    /// one notifies.
    fn might_zoom<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.zoom_depth += 1;
        if self.zoom_depth == 1 {
            if let Some(callback) = self.callbacks.before_zoom.as_mut() {
                callback();
            }
        }

        let result = f(self);

        self.zoom_depth -= 1;
        if self.zoom_depth == 0 {
            if std::mem::take(&mut self.viewport_changed_pending) {
                self.fire_viewport_changed();
            }
            if let Some(callback) = self.callbacks.after_zoom.as_mut() {
                callback();
            }
            let zoom = self.zoom();
            self.zoom_manager.on_pdf_zoom_change(zoom);
        }
        result
    }

    /// Sets the internal zoom, keeping `scroll_position` (document space,
    /// defaulting to the current one) at the top-left of the window.
    fn set_zoom_internal(&mut self, zoom: f64, scroll_position: Option<Point>) {
        assert!(self.zoom_depth > 0, "zoom changed outside of a might_zoom bracket");
        let anchor = scroll_position.unwrap_or_else(|| self.document_position());

        self.internal_zoom = zoom;
        self.content_size_changed();
        let zoom = self.zoom();
        self.set_position(Point::new(anchor.x * zoom, anchor.y * zoom), false);
    }

    /// Scales the internal zoom by `scale_delta`, keeping the content point
    /// recorded at pinch start under `center`.
    fn set_pinch_zoom_internal(&mut self, scale_delta: f64, center: Point) {
        assert!(self.zoom_depth > 0, "pinch zoom changed outside of a might_zoom bracket");
        self.internal_zoom = self.clamp_zoom(self.internal_zoom * scale_delta);

        let Some(old_center) = self.pinch.old_center_in_content else {
            return;
        };
        let delta = old_center.delta_to(self.plugin_to_content(center));
        let zoom = self.zoom();
        let position = self.position();
        let target = Point::new(position.x - delta.x * zoom, position.y - delta.y * zoom);

        self.content_size_changed();
        self.set_position(target, false);
    }

    fn content_size_changed(&mut self) {
        let Some(document) = &self.document else {
            return;
        };
        let zoomed = fitting::zoomed_size(document.size(), self.zoom());
        if self.scroll.set_size(zoomed) {
            self.update_viewport();
        }
    }

    fn update_viewport(&mut self) {
        if self.zoom_depth > 0 {
            self.viewport_changed_pending = true;
        } else {
            self.fire_viewport_changed();
        }
    }

    fn fire_viewport_changed(&mut self) {
        trace!("viewport changed");
        if let Some(callback) = self.callbacks.viewport_changed.as_mut() {
            callback();
        }
    }

    // Geometry

    pub fn size(&self) -> Size {
        self.window
    }

    pub fn content_size(&self) -> Size {
        self.scroll.size()
    }

    pub fn position(&self) -> Point {
        self.scroll.position()
    }

    pub fn set_position(&mut self, position: Point, smooth: bool) {
        if self.scroll.scroll_to(position.x, position.y, smooth) {
            self.update_viewport();
        }
    }

    /// Scrolls the axes that are given and differ from the current position.
    pub fn scroll_to(&mut self, x: Option<f64>, y: Option<f64>) {
        let current = self.position();
        let mut target = current;
        let mut changed = false;
        if let Some(x) = x.filter(|x| *x != current.x) {
            target.x = x;
            changed = true;
        }
        if let Some(y) = y.filter(|y| *y != current.y) {
            target.y = y;
            changed = true;
        }
        if changed {
            self.set_position(target, false);
        }
    }

    pub fn scroll_by(&mut self, delta: Point) {
        let current = self.position();
        self.scroll_to(Some(current.x + delta.x), Some(current.y + delta.y));
    }

    pub fn scrollbar_width(&self) -> f64 {
        self.scroll.scrollbar_width()
    }

    pub fn overlay_scrollbar_width(&self) -> f64 {
        self.scroll.overlay_scrollbar_width()
    }

    /// Scroll position in document coordinates.
    fn document_position(&self) -> Point {
        scale_point(self.position(), self.zoom())
    }

    fn plugin_to_content(&self, point: Point) -> Point {
        let position = self.position();
        scale_point(Point::new(point.x + position.x, point.y + position.y), self.zoom())
    }

    /// Visible area in document coordinates. Zero while the zoom is zero,
    /// e.g. for a viewer in a hidden frame.
    pub fn viewport_rect(&self) -> Rect {
        let zoom = self.zoom();
        if zoom == 0.0 {
            return Rect::ZERO;
        }
        let position = self.position();
        Rect::new(
            position.x / zoom,
            position.y / zoom,
            self.window.width / zoom,
            self.window.height / zoom,
        )
    }

    pub fn document_needs_scrollbars(&self, zoom: f64) -> Scrollbars {
        match &self.document {
            Some(document) => fitting::needs_scrollbars(document.size(), zoom, self.window),
            None => Scrollbars::default(),
        }
    }

    pub fn document_has_scrollbars(&self) -> Scrollbars {
        self.document_needs_scrollbars(self.zoom())
    }

    // Document

    pub fn document_dimensions(&self) -> Option<&DocumentDimensions> {
        self.document.as_ref()
    }

    pub fn layout_options(&self) -> Option<&LayoutOptions> {
        self.document.as_ref().and_then(|document| document.layout_options.as_ref())
    }

    pub fn clockwise_rotations(&self) -> u8 {
        self.layout_options().map_or(0, |options| options.default_page_orientation)
    }

    pub fn two_up_view_enabled(&self) -> bool {
        self.layout_options().is_some_and(|options| options.two_up_view_enabled)
    }

    fn pages(&self) -> &[Rect] {
        self.document.as_ref().map_or(&[], |document| document.page_dimensions.as_slice())
    }

    fn page(&self, page: usize) -> Result<Rect> {
        let pages = self.pages();
        if pages.is_empty() {
            error!(page, "page requested with no pages loaded");
            return Err(ViewportError::NoPages);
        }
        pages.get(page).copied().ok_or_else(|| {
            error!(page, page_count = pages.len(), "page out of range");
            ViewportError::PageOutOfRange { page, page_count: pages.len() }
        })
    }

    pub fn set_document_dimensions(&mut self, mut dimensions: DocumentDimensions) -> Result<()> {
        let paged = self.presentation_mode || self.fitting_type.is_paged();
        if paged && dimensions.page_dimensions.is_empty() {
            error!(fitting_type = ?self.fitting_type, "paged fitting needs at least one page");
            return Err(ViewportError::NoPages);
        }

        if let Some(options) = dimensions.layout_options.as_mut() {
            options.direction = TextDirection::from_rtl(self.config.right_to_left);
        }

        let initial = self.document.is_none();
        let initial_rotations = self.clockwise_rotations();
        debug!(pages = dimensions.page_dimensions.len(), initial, "document dimensions");

        let result = self.might_zoom(|viewport| {
            viewport.document = Some(dimensions);
            if initial {
                let fit_width = viewport.fit_to_width_zoom();
                let zoom = viewport.config.default_zoom.min(fit_width);
                viewport.set_zoom_internal(zoom, None);
                viewport.set_position(Point::ORIGIN, false);
            }
            viewport.content_size_changed();
            viewport.resize_internal()
        });

        let rotations = self.clockwise_rotations();
        if rotations != initial_rotations {
            info!(degrees = u32::from(rotations) * 90, "document rotated");
        }
        result
    }

    pub fn page_inset_dimensions(&self, page: usize) -> Result<Rect> {
        let rect = self.page(page)?;
        Ok(Rect::new(
            rect.x + PAGE_SHADOW.left,
            rect.y + PAGE_SHADOW.top,
            rect.width - PAGE_SHADOW.left - PAGE_SHADOW.right,
            rect.height - PAGE_SHADOW.top - PAGE_SHADOW.bottom,
        ))
    }

    /// Screen rectangle of a page's visible area, relative to the window.
    pub fn page_screen_rect(&self, page: usize) -> Rect {
        let Some(document) = &self.document else {
            return Rect::ZERO;
        };
        let Some(last) = document.page_dimensions.len().checked_sub(1) else {
            return Rect::ZERO;
        };
        let page = page.min(last);
        let rect = document.page_dimensions[page];
        let Ok(inset) = self.page_inset_dimensions(page) else {
            return Rect::ZERO;
        };

        let x = (document.width - rect.width) / 2.0 + PAGE_SHADOW.left;
        let zoom = self.zoom();
        let scrollbar_width =
            if self.document_has_scrollbars().vertical { self.scrollbar_width() } else { 0.0 };
        let space_on_left =
            ((self.window.width - scrollbar_width - document.width * zoom) / 2.0).max(0.0);
        let position = self.position();

        Rect::new(
            x * zoom + space_on_left - position.x,
            inset.y * zoom - position.y,
            inset.width * zoom,
            inset.height * zoom,
        )
    }

    /// Converts a point on `page` (PDF points, origin bottom-left) to
    /// pixels relative to the page's top-left corner including its shadow.
    pub fn convert_page_to_screen(&self, page: usize, point: Point) -> Result<Point> {
        let inset = self.page_inset_dimensions(page)?;
        let (width, height) = (inset.width, inset.height);
        let x = point.x * POINTS_TO_PIXELS;
        let y = point.y * POINTS_TO_PIXELS;

        let rotated = match self.clockwise_rotations() % 4 {
            1 => Point::new(width - (height - y), x),
            2 => Point::new(width - x, y),
            3 => Point::new(height - y, height - x),
            _ => Point::new(x, height - y),
        };
        Ok(Point::new(rotated.x + PAGE_SHADOW.left, rotated.y + PAGE_SHADOW.top))
    }

    /// Whether a window point lies horizontally within the page under it.
    pub fn is_point_inside_page(&self, point: Point) -> Result<bool> {
        let Some(document) = &self.document else {
            return Err(ViewportError::NoPages);
        };
        let zoom = self.zoom();
        let position = self.position();
        let page = layout::page_at_y(self.pages(), (position.y + point.y) / zoom)?;
        let page_width = self.pages()[page].width * zoom;
        let outer_width = self.window.width.max(document.width * zoom);

        if page_width >= outer_width {
            return Ok(true);
        }
        let x = point.x + position.x;
        let min_x = (outer_width - page_width) / 2.0;
        let max_x = outer_width - min_x;
        Ok(x >= min_x && x <= max_x)
    }

    pub fn page_at_y(&self, y: f64) -> Result<usize> {
        layout::page_at_y(self.pages(), y)
    }

    pub fn most_visible_page(&self) -> Result<usize> {
        layout::most_visible_page(self.pages(), &self.viewport_rect(), self.two_up_view_enabled())
            .inspect_err(|error| error!(%error, "most visible page lookup failed"))
    }

    /// Payload the controller forwards to the renderer on viewport changes.
    pub fn viewport_changed_payload(&self) -> Option<ViewportChangedPayload> {
        let page = self.most_visible_page().ok()?;
        let rect = self.page_screen_rect(page);
        Some(ViewportChangedPayload {
            page_x: rect.x,
            page_y: rect.y,
            page_width: rect.width,
            viewport_width: self.window.width,
            viewport_height: self.window.height,
        })
    }

    // Resize and fitting

    /// Window resized by the host. The refit is reported as not user
    /// initiated.
    pub fn resize(&mut self, size: Size) -> Result<()> {
        self.window = size;
        if self.scroll.set_container_size(size) {
            self.update_viewport();
        }
        self.notify_user_initiated(false);
        let result = self.resize_internal();
        self.notify_user_initiated(true);
        result
    }

    fn notify_user_initiated(&mut self, user_initiated: bool) {
        if let Some(callback) = self.callbacks.user_initiated.as_mut() {
            callback(user_initiated);
        }
    }

    fn resize_internal(&mut self) -> Result<()> {
        if self.presentation_mode {
            self.fitting_type = FittingType::FitToHeight;
        }
        match self.fitting_type {
            FittingType::FitToPage => {
                self.fit_to_page(FitToPageParams { page: None, scroll_to_top: false })
            }
            FittingType::FitToWidth => self.fit_to_width(FitToWidthParams::default()),
            FittingType::FitToHeight => self.fit_to_height(FitToHeightParams::default()),
            _ if self.internal_zoom == 0.0 => {
                self.fit_to_none();
                Ok(())
            }
            _ => {
                self.update_viewport();
                Ok(())
            }
        }
    }

    pub fn fitting_type(&self) -> FittingType {
        self.fitting_type
    }

    pub fn set_fitting_type(&mut self, request: FittingRequest) -> Result<()> {
        match request {
            FittingRequest::None => {
                self.fitting_type = FittingType::None;
                Ok(())
            }
            FittingRequest::FitToPage(params) => self.fit_to_page(params),
            FittingRequest::FitToWidth(params) => self.fit_to_width(params),
            FittingRequest::FitToHeight(params) => self.fit_to_height(params),
            FittingRequest::FitToBoundingBox(params) => self.fit_to_bounding_box(params),
            FittingRequest::FitToBoundingBoxDimension(params) => {
                self.fit_to_bounding_box_dimension(params)
            }
        }
    }

    /// Internal zoom fitting `page` into the window, compensating for the
    /// scrollbars that zoom brings in.
    fn compute_fitting_zoom(&self, page: Size, fit_width: bool, fit_height: bool) -> f64 {
        let document = self.document.as_ref().map(DocumentDimensions::size);
        let zoom = fitting::fitting_zoom(
            self.window,
            document,
            page,
            fit_width,
            fit_height,
            self.scrollbar_width(),
        );
        self.zoom_manager.internal_zoom_component(zoom)
    }

    fn fit_to_width_zoom(&self) -> f64 {
        match &self.document {
            Some(document) => self.compute_fitting_zoom(document.size(), true, false),
            None => self.internal_zoom,
        }
    }

    pub fn fit_to_width(&mut self, params: FitToWidthParams) -> Result<()> {
        let target = match &self.document {
            // An empty document has no width to fit; keep the current zoom.
            Some(document) if document.page_dimensions.is_empty() => None,
            None => None,
            Some(document) => {
                let mut position = self.document_position();
                if let Some(page) = params.page {
                    position.y = self.page(page)?.y;
                }
                if let Some(view_position) = params.view_position {
                    if params.page.is_none() {
                        position.y = self.page(self.most_visible_page()?)?.y;
                    }
                    position.y += view_position;
                }
                let zoom = self.compute_fitting_zoom(document.size(), true, false);
                Some(ZoomTarget { zoom, position })
            }
        };
        self.apply_fit(FittingType::FitToWidth, target);
        Ok(())
    }

    pub fn fit_to_height(&mut self, params: FitToHeightParams) -> Result<()> {
        let target = match &self.document {
            None => None,
            Some(_) => {
                let page = match params.page {
                    Some(page) => page,
                    None => self.most_visible_page()?,
                };
                let rect = self.page(page)?;
                let mut position = self.document_position();
                if params.page.is_some() || self.presentation_mode {
                    position.y = rect.y;
                }
                if let Some(view_position) = params.view_position {
                    position.x = rect.x + view_position;
                }
                let zoom = self.compute_fitting_zoom(Size::new(0.0, rect.height), false, true);
                Some(ZoomTarget { zoom, position })
            }
        };
        self.apply_fit(FittingType::FitToHeight, target);
        Ok(())
    }

    /// Fits the page height exactly, using the document width so that the
    /// widest page is never clipped.
    pub fn fit_to_page(&mut self, params: FitToPageParams) -> Result<()> {
        let target = match &self.document {
            None => None,
            Some(document) => {
                let page = match params.page {
                    Some(page) => page,
                    None => self.most_visible_page()?,
                };
                let rect = self.page(page)?;
                let mut position = self.document_position();
                if params.page.is_some() || params.scroll_to_top {
                    position = Point::new(0.0, rect.y);
                }
                let fit = Size::new(document.width, rect.height);
                let zoom = self.compute_fitting_zoom(fit, true, true);
                Some(ZoomTarget { zoom, position })
            }
        };
        self.apply_fit(FittingType::FitToPage, target);
        Ok(())
    }

    /// Default zoom, shrunk to fit the width when the document is wider.
    pub fn fit_to_none(&mut self) {
        let target = self.document.as_ref().map(|_| ZoomTarget {
            zoom: self.config.default_zoom.min(self.fit_to_width_zoom()),
            position: self.document_position(),
        });
        self.apply_fit(FittingType::None, target);
    }

    fn apply_fit(&mut self, fitting_type: FittingType, target: Option<ZoomTarget>) {
        debug!(?fitting_type, zoom = target.map(|target| target.zoom), "fitting");
        self.might_zoom(|viewport| {
            viewport.fitting_type = fitting_type;
            if let Some(ZoomTarget { zoom, position }) = target {
                viewport.set_zoom_internal(zoom, Some(position));
                viewport.update_viewport();
            }
        });
    }

    pub fn fit_to_bounding_box(&mut self, params: FitToBoundingBoxParams) -> Result<()> {
        let bounding_box = params.bounding_box;
        if bounding_box.is_empty() {
            debug!("ignoring empty bounding box");
            return Ok(());
        }
        let inset = self.page_inset_dimensions(params.page)?;

        let zoom_fit_width = self.compute_fitting_zoom(bounding_box.size(), true, false);
        let zoom_fit_height = self.compute_fitting_zoom(bounding_box.size(), false, true);
        let zoom = self.clamp_zoom(zoom_fit_width.min(zoom_fit_height));

        let mut position = Point::new(inset.x + bounding_box.x, inset.y + bounding_box.y);
        if zoom != zoom_fit_width {
            position.x -= (self.window.width / zoom - bounding_box.width) / 2.0;
        }
        if zoom != zoom_fit_height {
            position.y -= (self.window.height / zoom - bounding_box.height) / 2.0;
        }

        self.apply_fit(FittingType::FitToBoundingBox, Some(ZoomTarget { zoom, position }));
        Ok(())
    }

    pub fn fit_to_bounding_box_dimension(
        &mut self,
        params: FitToBoundingBoxDimensionParams,
    ) -> Result<()> {
        let bounding_box = params.bounding_box;
        if bounding_box.is_empty() {
            debug!("ignoring empty bounding box");
            return Ok(());
        }
        let inset = self.page_inset_dimensions(params.page)?;

        let fit_width = params.fit_to_width;
        let zoom_fit = self.compute_fitting_zoom(bounding_box.size(), fit_width, !fit_width);
        let zoom = self.clamp_zoom(zoom_fit);
        let view_position = params.view_position.unwrap_or(0.0);

        let (position, fitting_type) = if fit_width {
            let mut position = Point::new(inset.x + bounding_box.x, inset.y + view_position);
            if zoom != zoom_fit {
                position.x -= (self.window.width / zoom - bounding_box.width) / 2.0;
            }
            (position, FittingType::FitToBoundingBoxWidth)
        } else {
            let mut position = Point::new(inset.x + view_position, inset.y + bounding_box.y);
            if zoom != zoom_fit {
                position.y -= (self.window.height / zoom - bounding_box.height) / 2.0;
            }
            (position, FittingType::FitToBoundingBoxHeight)
        };

        self.apply_fit(fitting_type, Some(ZoomTarget { zoom, position }));
        Ok(())
    }

    // Navigation

    pub fn go_to_next_page(&mut self) -> Result<()> {
        let current = self.most_visible_page()?;
        let step = if self.two_up_view_enabled() && current % 2 == 0 { 2 } else { 1 };
        self.go_to_page(current + step)
    }

    pub fn go_to_previous_page(&mut self) -> Result<()> {
        let current = self.most_visible_page()?;
        let step = match (self.two_up_view_enabled(), current % 2 == 0) {
            (false, _) => 1,
            (true, true) => 2,
            (true, false) => 3,
        };
        self.go_to_page(current.saturating_sub(step))
    }

    pub fn go_to_page(&mut self, page: usize) -> Result<()> {
        self.go_to_page_and_xy(page, Some(0.0), Some(0.0))
    }

    /// Scrolls to `(x, y)` within `page`. A missing or NaN coordinate keeps
    /// the current offset into the most visible page. Out of range pages
    /// clamp to the last one.
    pub fn go_to_page_and_xy(&mut self, page: usize, x: Option<f64>, y: Option<f64>) -> Result<()> {
        let Some(last) = self.pages().len().checked_sub(1) else {
            return Ok(());
        };
        let page = page.min(last);
        let rect = self.pages()[page];

        let x = x.filter(|x| !x.is_nan());
        let y = y.filter(|y| !y.is_nan());
        let current = match (x, y) {
            (Some(_), Some(_)) => Point::ORIGIN,
            _ => self.current_page_offset()?,
        };
        let offset = Point::new(x.unwrap_or(current.x), y.unwrap_or(current.y));
        debug!(page, x = offset.x, y = offset.y, "go to page");

        self.might_zoom(|viewport| {
            let zoom = viewport.zoom();
            let target = Point::new((rect.x + offset.x) * zoom, (rect.y + offset.y) * zoom);
            viewport.set_position(target, false);
            viewport.update_viewport();
        });
        Ok(())
    }

    /// Offset of the scroll position into the most visible page.
    fn current_page_offset(&self) -> Result<Point> {
        let rect = self.page(self.most_visible_page()?)?;
        let position = self.document_position();
        Ok(Point::new(position.x - rect.x, position.y - rect.y))
    }

    pub fn handle_navigate_to_destination(
        &mut self,
        page: usize,
        x: Option<f64>,
        y: Option<f64>,
        zoom: Option<f64>,
    ) -> Result<()> {
        if let Some(zoom) = zoom.filter(|zoom| *zoom != 0.0 && !zoom.is_nan()) {
            self.set_zoom(zoom);
        }
        self.go_to_page_and_xy(page, x, y)
    }

    // Input

    pub fn handle_directional_key(&mut self, input: &KeyInput) -> Result<KeyHandling> {
        let context = KeyContext {
            paged: self.fitting_type.is_paged(),
            presentation_mode: self.presentation_mode,
            horizontal_scrollbar: self.document_has_scrollbars().horizontal,
            viewport_height: self.window.height,
            smooth_scrolling: self.smooth_scrolling,
        };
        let action = resolve_key(input, &context, &self.config.keyboard);
        trace!(?input, ?action, "directional key");

        match action {
            KeyAction::NextPage => self.go_to_next_page()?,
            KeyAction::PreviousPage => self.go_to_previous_page()?,
            KeyAction::ScrollBy { dx, dy, smooth } => {
                let position = self.position();
                self.set_position(Point::new(position.x + dx, position.y + dy), smooth);
            }
            KeyAction::Unhandled | KeyAction::Consumed => {}
        }
        Ok(action.handling())
    }

    pub fn handle_touch(&mut self, input: &TouchInput) -> Result<()> {
        for event in self.gestures.handle_touch(input) {
            self.dispatch_gesture(event)?;
        }
        if let Some(direction) = self.swipes.handle_touch(input) {
            self.dispatch_swipe(direction)?;
        }
        Ok(())
    }

    pub fn handle_wheel(&mut self, input: &WheelInput, now: Instant) -> Result<WheelOutcome> {
        let outcome = self.gestures.handle_wheel(input, now);
        for event in &outcome.events {
            self.dispatch_gesture(*event)?;
        }
        Ok(outcome)
    }

    /// Fires due timers, such as the inferred end of a ctrl+wheel pinch.
    pub fn poll_timers(&mut self, now: Instant) -> Result<()> {
        if let Some(event) = self.gestures.poll(now) {
            self.dispatch_gesture(event)?;
        }
        Ok(())
    }

    pub fn next_timer_deadline(&self) -> Option<Instant> {
        self.gestures.next_deadline()
    }

    pub fn should_suppress_context_menu(&self) -> bool {
        self.gestures.should_suppress_context_menu()
    }

    /// Feeds a gesture as if a detector had produced it. Pinch work is
    /// deferred to the next animation frame.
    pub fn dispatch_gesture(&mut self, event: GestureEvent) -> Result<()> {
        match event {
            GestureEvent::PinchStart { center } => {
                if self.presentation_mode {
                    return Ok(());
                }
                self.pinch_tasks.push(PinchTask::Start { center });
            }
            GestureEvent::PinchUpdate { direction, start_scale_ratio, center, .. } => {
                self.pinch_tasks.push(PinchTask::Update { direction, start_scale_ratio, center });
            }
            GestureEvent::PinchEnd { start_scale_ratio, center } => {
                self.pinch_tasks.push(PinchTask::End { start_scale_ratio, center });
            }
            GestureEvent::Wheel { direction: WheelDirection::Down } => self.go_to_next_page()?,
            GestureEvent::Wheel { direction: WheelDirection::Up } => self.go_to_previous_page()?,
        }
        Ok(())
    }

    pub fn dispatch_swipe(&mut self, direction: SwipeDirection) -> Result<()> {
        if !self.presentation_mode {
            return Ok(());
        }
        let rtl = self.config.right_to_left;
        match direction {
            SwipeDirection::RightToLeft if !rtl => self.go_to_next_page(),
            SwipeDirection::LeftToRight if rtl => self.go_to_next_page(),
            _ => self.go_to_previous_page(),
        }
    }

    pub fn needs_animation_frame(&self) -> bool {
        !self.pinch_tasks.is_empty()
    }

    /// Runs the pinch work queued since the last frame. Returns how many
    /// tasks ran.
    pub fn on_animation_frame(&mut self) -> usize {
        let tasks = self.pinch_tasks.drain();
        let count = tasks.len();
        for task in tasks {
            match task {
                PinchTask::Start { center } => self.on_pinch_start(center),
                PinchTask::Update { direction, start_scale_ratio, center } => {
                    self.on_pinch_update(direction, start_scale_ratio, center)
                }
                PinchTask::End { start_scale_ratio, center } => {
                    self.on_pinch_end(start_scale_ratio, center)
                }
            }
        }
        count
    }

    pub fn pinch_phase(&self) -> PinchPhase {
        self.pinch.phase
    }

    pub fn pinch_pan_vector(&self) -> Option<Point> {
        self.pinch.pan_vector
    }

    pub fn pinch_center(&self) -> Option<Point> {
        self.pinch.center
    }

    fn on_pinch_start(&mut self, center: Point) {
        debug!(x = center.x, y = center.y, "pinch start");
        self.pinch.phase = PinchPhase::Start;
        self.pinch.prev_scale = 1.0;
        self.pinch.old_center_in_content = Some(self.plugin_to_content(center));
        self.pinch.keep_content_centered = !self.document_has_scrollbars().horizontal;
        self.pinch.first_center_in_frame = Some(center);
    }

    fn on_pinch_update(&mut self, direction: PinchDirection, start_scale_ratio: f64, center: Point) {
        if self.pinch.old_center_in_content.is_none() {
            debug!("ignoring pinch update without a pinch start");
            return;
        }

        self.might_zoom(|viewport| {
            viewport.pinch.phase = match direction {
                PinchDirection::Out => PinchPhase::UpdateZoomOut,
                PinchDirection::In => PinchPhase::UpdateZoomIn,
            };
            let scale_delta = start_scale_ratio / viewport.pinch.prev_scale;
            if let Some(first) = viewport.pinch.first_center_in_frame {
                viewport.pinch.pan_vector = Some(center.delta_to(first));
            }

            let candidate = viewport.clamp_zoom(viewport.internal_zoom * scale_delta);
            let needs_scrollbars =
                viewport.document_needs_scrollbars(viewport.zoom_manager.apply_browser_zoom(candidate));

            let mut pinch_center = center;
            if !needs_scrollbars.horizontal {
                // Narrow content stays centered rather than following the fingers.
                pinch_center = Point::new(viewport.window.width / 2.0, viewport.window.height / 2.0);
            } else if viewport.pinch.keep_content_centered {
                viewport.pinch.old_center_in_content = Some(viewport.plugin_to_content(pinch_center));
                viewport.pinch.keep_content_centered = false;
            }
            viewport.pinch.center = Some(pinch_center);

            viewport.fitting_type = FittingType::None;
            viewport.set_pinch_zoom_internal(scale_delta, center);
            viewport.update_viewport();
            viewport.pinch.prev_scale = start_scale_ratio;
        });
        trace!(zoom = self.internal_zoom, start_scale_ratio, "pinch update");
    }

    fn on_pinch_end(&mut self, start_scale_ratio: f64, center: Point) {
        if self.pinch.old_center_in_content.is_some() {
            self.might_zoom(|viewport| {
                viewport.pinch.phase = PinchPhase::End;
                let scale_delta = start_scale_ratio / viewport.pinch.prev_scale;
                viewport.pinch.center = Some(center);
                viewport.set_pinch_zoom_internal(scale_delta, center);
                viewport.update_viewport();
            });
        } else {
            debug!("ignoring pinch end without a pinch start");
        }
        debug!(zoom = self.internal_zoom, "pinch end");
        self.pinch = PinchState::default();
    }
}

fn check_zoom_factors(factors: &[f64]) -> Result<()> {
    if factors.is_empty() {
        error!("empty zoom factor range");
        return Err(ViewportError::EmptyZoomFactors);
    }
    if let Some(reason) = config::zoom_factors_problem(factors) {
        error!(?factors, reason, "rejected zoom factor range");
        return Err(ViewportError::InvalidZoomFactors(reason));
    }
    Ok(())
}

/// `point` divided by `zoom`, or the origin when the zoom is zero.
fn scale_point(point: Point, zoom: f64) -> Point {
    if zoom == 0.0 {
        return Point::ORIGIN;
    }
    Point::new(point.x / zoom, point.y / zoom)
}

impl fmt::Debug for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewport")
            .field("window", &self.window)
            .field("internal_zoom", &self.internal_zoom)
            .field("zoom", &self.zoom())
            .field("fitting_type", &self.fitting_type)
            .field("position", &self.position())
            .field("pages", &self.pages().len())
            .field("pinch_phase", &self.pinch.phase)
            .field("presentation_mode", &self.presentation_mode)
            .finish()
    }
}
