use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Vector from `self` to `other`.
    pub fn delta_to(self, other: Point) -> Point {
        Point { x: other.x - self.x, y: other.y - self.y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        let delta = self.delta_to(other);
        delta.x.hypot(delta.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point { x: (self.x + other.x) / 2.0, y: (self.y + other.y) / 2.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Self = Self { width: 0.0, height: 0.0 };

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn area(self) -> f64 {
        self.width * self.height
    }
}

/// Axis-aligned rectangle; used for page rectangles in document space and
/// for viewport rectangles in either space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn origin(&self) -> Point {
        Point { x: self.x, y: self.y }
    }

    pub fn size(&self) -> Size {
        Size { width: self.width, height: self.height }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// True unless both dimensions are positive; NaN counts as empty.
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Area shared by both rectangles, zero when they only touch.
    pub fn intersection_area(&self, other: &Rect) -> f64 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if left >= right || top >= bottom {
            return 0.0;
        }
        (right - left) * (bottom - top)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insets {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

/// Drop shadow drawn around every page; page rectangles include it.
pub const PAGE_SHADOW: Insets = Insets { top: 3.0, bottom: 7.0, left: 5.0, right: 5.0 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Rtl,
    #[default]
    Ltr,
}

impl TextDirection {
    pub fn from_rtl(right_to_left: bool) -> Self {
        if right_to_left {
            Self::Rtl
        } else {
            Self::Ltr
        }
    }

    pub fn is_rtl(self) -> bool {
        self == Self::Rtl
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOptions {
    pub direction: TextDirection,
    /// Clockwise quarter turns applied to every page, 0..=3.
    pub default_page_orientation: u8,
    pub two_up_view_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDimensions {
    pub width: f64,
    pub height: f64,
    pub page_dimensions: Vec<Rect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_options: Option<LayoutOptions>,
}

impl DocumentDimensions {
    pub fn size(&self) -> Size {
        Size { width: self.width, height: self.height }
    }

    /// Stacks pages vertically, centered horizontally, with no gaps.
    pub fn stacked(page_sizes: &[Size]) -> Self {
        let width = page_sizes.iter().map(|size| size.width).fold(0.0, f64::max);
        let mut y = 0.0;
        let page_dimensions = page_sizes
            .iter()
            .map(|size| {
                let rect = Rect::new((width - size.width) / 2.0, y, size.width, size.height);
                y += size.height;
                rect
            })
            .collect();
        Self { width, height: y, page_dimensions, layout_options: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FittingType {
    #[default]
    None,
    FitToPage,
    FitToWidth,
    FitToHeight,
    FitToBoundingBox,
    FitToBoundingBoxWidth,
    FitToBoundingBoxHeight,
}

impl FittingType {
    /// Fitting types where directional keys step whole pages.
    pub fn is_paged(self) -> bool {
        matches!(self, Self::FitToPage | Self::FitToHeight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PinchPhase {
    #[default]
    None,
    Start,
    UpdateZoomOut,
    UpdateZoomIn,
    End,
}

/// Messages posted from the viewport to a remote rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RendererMessage {
    UpdateSize { width: f64, height: f64 },
    SyncScrollToRemote { x: f64, y: f64, is_smooth: bool },
}

/// Messages a rendering surface sends back to the viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InboundMessage {
    AckScrollToRemote { x: f64, y: f64 },
    SyncScrollFromRemote { x: f64, y: f64 },
    DocumentDimensions(DocumentDimensions),
}

/// Screen rectangle of the most visible page plus the window size, as
/// consumed by the renderer-facing controller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportChangedPayload {
    pub page_x: f64,
    pub page_y: f64,
    pub page_width: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn intersection_area_is_zero_for_touching_rects() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersection_area(&b), 0.0);
        assert_eq!(a.intersection_area(&Rect::new(5.0, 5.0, 10.0, 10.0)), 25.0);
    }

    #[test]
    fn rect_without_positive_area_is_empty() {
        assert!(Rect::new(0.0, 0.0, 0.0, 10.0).is_empty());
        assert!(Rect::new(0.0, 0.0, f64::NAN, 10.0).is_empty());
        assert!(Rect::new(0.0, 0.0, 10.0, f64::NAN).is_empty());
        assert!(!Rect::new(3.0, 4.0, 10.0, 10.0).is_empty());
        assert_eq!(PAGE_SHADOW.left + PAGE_SHADOW.right, 10.0);
    }

    #[test]
    fn stacked_document_centers_narrow_pages() {
        let doc = DocumentDimensions::stacked(&[Size::new(100.0, 50.0), Size::new(60.0, 40.0)]);
        assert_eq!(doc.width, 100.0);
        assert_eq!(doc.height, 90.0);
        assert_eq!(doc.page_dimensions[1], Rect::new(20.0, 50.0, 60.0, 40.0));
    }

    #[test]
    fn renderer_messages_use_camel_case_wire_names() {
        let message = RendererMessage::SyncScrollToRemote { x: 1.0, y: 2.0, is_smooth: true };
        assert_eq!(
            serde_json::to_value(message).unwrap(),
            json!({"type": "syncScrollToRemote", "x": 1.0, "y": 2.0, "isSmooth": true})
        );
    }

    #[test]
    fn inbound_document_dimensions_parse_from_wire_shape() {
        let message: InboundMessage = serde_json::from_value(json!({
            "type": "documentDimensions",
            "width": 100.0,
            "height": 200.0,
            "pageDimensions": [{"x": 0.0, "y": 0.0, "width": 100.0, "height": 200.0}],
            "layoutOptions": {"direction": "ltr", "defaultPageOrientation": 1, "twoUpViewEnabled": false}
        }))
        .unwrap();

        let InboundMessage::DocumentDimensions(dimensions) = message else {
            panic!("expected document dimensions");
        };
        assert_eq!(dimensions.page_dimensions.len(), 1);
        assert_eq!(dimensions.layout_options.map(|o| o.default_page_orientation), Some(1));
    }

    #[test]
    fn paged_fitting_types() {
        assert!(FittingType::FitToPage.is_paged());
        assert!(FittingType::FitToHeight.is_paged());
        assert!(!FittingType::FitToWidth.is_paged());
        assert!(!FittingType::None.is_paged());
    }
}
