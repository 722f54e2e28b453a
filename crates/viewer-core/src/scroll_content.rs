//! Scrolling substrate behind the viewport.
//!
//! Content is either local (the viewport scrolls it directly) or remote (it
//! lives behind a message boundary and is scrolled by request). In remote mode
//! every `syncScrollToRemote` increments an unacknowledged counter; remote
//! position reports are ignored while it is non-zero, and only the ack that
//! brings it back to zero commits the remote's clamped position.

use crate::error::ScrollError;
use doc_model::{Point, RendererMessage, Size, TextDirection};
use std::fmt;
use tracing::{debug, error, trace, warn};

/// Overlay scrollbar thickness assumed for local content.
pub const LOCAL_OVERLAY_SCROLLBAR_WIDTH: f64 = 16.0;

/// Message sink for a remotely rendered surface.
pub trait RemoteSurface {
    fn post_message(&mut self, message: RendererMessage);
}

/// Opaque handle for locally attached content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHandle(pub u64);

enum ScrollMode {
    Local(LocalScroll),
    Remote(RemoteScroll),
}

struct LocalScroll {
    content: Option<ContentHandle>,
    sizer_visible: bool,
    offset: Point,
}

struct RemoteScroll {
    surface: Box<dyn RemoteSurface>,
    /// Last requested or acknowledged offset
    offset: Point,
    unacked: u32,
}

pub struct ScrollContent {
    mode: ScrollMode,
    container: Size,
    content_size: Size,
    scrollbar_width: f64,
    direction: TextDirection,
}

impl ScrollContent {
    pub fn new(container: Size, scrollbar_width: f64, direction: TextDirection) -> Self {
        Self {
            mode: ScrollMode::Local(LocalScroll {
                content: None,
                sizer_visible: true,
                offset: Point::ORIGIN,
            }),
            container,
            content_size: Size::ZERO,
            scrollbar_width,
            direction,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.mode, ScrollMode::Remote(_))
    }

    pub fn unacked_scrolls(&self) -> u32 {
        match &self.mode {
            ScrollMode::Remote(remote) => remote.unacked,
            ScrollMode::Local(_) => 0,
        }
    }

    pub fn local_content(&self) -> Option<ContentHandle> {
        match &self.mode {
            ScrollMode::Local(local) => local.content,
            ScrollMode::Remote(_) => None,
        }
    }

    /// Whether the local sizer element that gives the container its scroll
    /// extent is shown. Always false in remote mode.
    pub fn sizer_visible(&self) -> bool {
        match &self.mode {
            ScrollMode::Local(local) => local.sizer_visible,
            ScrollMode::Remote(_) => false,
        }
    }

    /// Attaches local content. `None` only hides the sizer. Switching away
    /// from remote content carries the last remote offset over and discards
    /// any unacknowledged requests; an ack arriving afterwards is rejected
    /// as [`ScrollError::UnexpectedAck`].
    ///
    /// Returns `true` when the scroll position changed.
    pub fn set_content(&mut self, content: Option<ContentHandle>) -> bool {
        let Some(handle) = content else {
            if let ScrollMode::Local(local) = &mut self.mode {
                local.sizer_visible = false;
            }
            return false;
        };

        match &mut self.mode {
            ScrollMode::Local(local) => {
                local.content = Some(handle);
                local.sizer_visible = true;
                false
            }
            ScrollMode::Remote(remote) => {
                let carried = remote.offset;
                if remote.unacked > 0 {
                    debug!(unacked = remote.unacked, "dropping unacknowledged remote scrolls");
                }
                self.mode = ScrollMode::Local(LocalScroll {
                    content: Some(handle),
                    sizer_visible: true,
                    offset: Point::ORIGIN,
                });
                debug!(x = carried.x, y = carried.y, "switched to local content");
                self.scroll_to(carried.x, carried.y, false)
            }
        }
    }

    /// Attaches a remote surface, publishes the content size to it and
    /// requests the current offset so the switch is seamless.
    pub fn set_remote_content(&mut self, surface: Box<dyn RemoteSurface>) -> Result<(), ScrollError> {
        let previous = match &self.mode {
            ScrollMode::Local(local) => local.offset,
            ScrollMode::Remote(_) => {
                error!("remote content attached twice");
                return Err(ScrollError::AlreadyRemote);
            }
        };

        self.mode = ScrollMode::Remote(RemoteScroll { surface, offset: previous, unacked: 0 });
        debug!(x = previous.x, y = previous.y, "switched to remote content");
        self.publish_size();
        self.scroll_to(previous.x, previous.y, false);
        Ok(())
    }

    /// Unsolicited position report from the remote side.
    ///
    /// Returns `true` when the report was accepted and changed the position.
    pub fn sync_scroll_from_remote(&mut self, position: Point) -> bool {
        let ScrollMode::Remote(remote) = &mut self.mode else {
            warn!("remote scroll report received for local content");
            return false;
        };
        if remote.unacked > 0 {
            trace!(unacked = remote.unacked, "ignoring remote scroll report");
            return false;
        }
        if remote.offset == position {
            return false;
        }
        remote.offset = position;
        true
    }

    /// Remote acknowledged one scroll request with its actual position.
    pub fn ack_scroll_to_remote(&mut self, position: Point) -> Result<(), ScrollError> {
        let remote = match &mut self.mode {
            ScrollMode::Remote(remote) if remote.unacked > 0 => remote,
            _ => {
                error!(x = position.x, y = position.y, "scroll ack without outstanding request");
                return Err(ScrollError::UnexpectedAck);
            }
        };

        remote.unacked -= 1;
        if remote.unacked == 0 {
            remote.offset = position;
        }
        Ok(())
    }

    pub fn scrollbar_width(&self) -> f64 {
        self.scrollbar_width
    }

    pub fn overlay_scrollbar_width(&self) -> f64 {
        if self.is_remote() {
            self.scrollbar_width
        } else {
            LOCAL_OVERLAY_SCROLLBAR_WIDTH
        }
    }

    pub fn direction(&self) -> TextDirection {
        self.direction
    }

    pub fn set_direction(&mut self, direction: TextDirection) {
        self.direction = direction;
    }

    pub fn container_size(&self) -> Size {
        self.container
    }

    /// Resizes the scroll container. Local content is re-clamped like a
    /// native container would; returns `true` if that moved it.
    pub fn set_container_size(&mut self, size: Size) -> bool {
        self.container = size;
        self.reclamp_local()
    }

    fn reclamp_local(&mut self) -> bool {
        match &self.mode {
            ScrollMode::Local(local) => {
                let offset = local.offset;
                self.scroll_to(offset.x, offset.y, false)
            }
            ScrollMode::Remote(_) => false,
        }
    }

    /// Logical content size.
    pub fn size(&self) -> Size {
        self.content_size
    }

    /// Sets the logical content size, re-clamping local content and
    /// forwarding the size to a remote surface.
    pub fn set_size(&mut self, size: Size) -> bool {
        self.content_size = size;
        self.publish_size();
        self.reclamp_local()
    }

    fn publish_size(&mut self) {
        let size = self.content_size;
        if let ScrollMode::Remote(remote) = &mut self.mode {
            remote
                .surface
                .post_message(RendererMessage::UpdateSize { width: size.width, height: size.height });
        }
    }

    pub fn position(&self) -> Point {
        match &self.mode {
            ScrollMode::Local(local) => local.offset,
            ScrollMode::Remote(remote) => remote.offset,
        }
    }

    pub fn scroll_left(&self) -> f64 {
        self.position().x
    }

    pub fn scroll_top(&self) -> f64 {
        self.position().y
    }

    /// Scrolls to `(x, y)` after clamping to the scrollable range.
    ///
    /// Local content moves immediately and the return value says whether it
    /// moved. Remote content records the intended offset, sends a request and
    /// returns `false`; the scroll is observable once acknowledged.
    pub fn scroll_to(&mut self, x: f64, y: f64, is_smooth: bool) -> bool {
        let target = self.clamp(x, y);
        match &mut self.mode {
            ScrollMode::Local(local) => {
                if local.offset == target {
                    return false;
                }
                trace!(x = target.x, y = target.y, "local scroll");
                local.offset = target;
                true
            }
            ScrollMode::Remote(remote) => {
                remote.offset = target;
                remote.unacked += 1;
                trace!(x = target.x, y = target.y, unacked = remote.unacked, "remote scroll request");
                remote.surface.post_message(RendererMessage::SyncScrollToRemote {
                    x: target.x,
                    y: target.y,
                    is_smooth,
                });
                false
            }
        }
    }

    /// Largest scroll offset per axis, following native container rules.
    pub fn max_scroll(&self) -> Point {
        let vertical_overflow = self.content_size.height > self.container.height;
        let horizontal_overflow = self.content_size.width > self.container.width;
        Point {
            x: self.axis_max(self.content_size.width, self.container.width, vertical_overflow),
            y: self.axis_max(self.content_size.height, self.container.height, horizontal_overflow),
        }
    }

    fn axis_max(&self, content: f64, container: f64, orthogonal_scrollbar: bool) -> f64 {
        let available =
            if orthogonal_scrollbar { container - self.scrollbar_width } else { container };
        (content - available).max(0.0)
    }

    fn clamp(&self, x: f64, y: f64) -> Point {
        let x = if x.is_nan() { 0.0 } else { x };
        let y = if y.is_nan() { 0.0 } else { y };
        let max = self.max_scroll();

        let x = if self.direction.is_rtl() { x.clamp(-max.x, 0.0) } else { x.clamp(0.0, max.x) };
        Point { x, y: y.clamp(0.0, max.y) }
    }
}

impl fmt::Debug for ScrollContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollContent")
            .field("remote", &self.is_remote())
            .field("position", &self.position())
            .field("unacked", &self.unacked_scrolls())
            .field("container", &self.container)
            .field("content_size", &self.content_size)
            .finish()
    }
}
