use doc_model::Size;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scrollbars {
    pub horizontal: bool,
    pub vertical: bool,
}

/// Document size at `zoom`, rounded to whole pixels like the renderer does.
pub fn zoomed_size(document: Size, zoom: f64) -> Size {
    Size::new((document.width * zoom).round(), (document.height * zoom).round())
}

pub fn needs_scrollbars(document: Size, zoom: f64, window: Size) -> Scrollbars {
    let zoomed = zoomed_size(document, zoom);
    Scrollbars { horizontal: zoomed.width > window.width, vertical: zoomed.height > window.height }
}

/// Zoom that fits `page` into `window` along the requested axes. Fitting
/// both axes takes the tighter one.
pub fn zoom_for_dimensions(fit_width: bool, fit_height: bool, window: Size, page: Size) -> f64 {
    let zoom_width = window.width / page.width;
    let zoom_height = window.height / page.height;
    let zoom = match (fit_width, fit_height) {
        (false, true) => zoom_height,
        (true, false) => zoom_width,
        _ => zoom_width.min(zoom_height),
    };
    zoom.max(0.0)
}

/// Total zoom fitting `page` into `window`, taking into account that the
/// chosen zoom may bring in scrollbars which shrink the usable area.
///
/// A first candidate ignores scrollbars. If the document needs none at that
/// zoom it is final. Otherwise a horizontal scrollbar may force a vertical
/// one (and vice versa), and the zoom is recomputed against the window minus
/// the scrollbars that end up shown.
pub fn fitting_zoom(
    window: Size,
    document: Option<Size>,
    page: Size,
    fit_width: bool,
    fit_height: bool,
    scrollbar_width: f64,
) -> f64 {
    debug_assert!(fit_width || fit_height, "at least one axis must be fitted");

    let zoom = zoom_for_dimensions(fit_width, fit_height, window, page);
    let Some(document) = document else {
        return zoom;
    };

    let mut scrollbars = needs_scrollbars(document, zoom, window);
    if !scrollbars.horizontal && !scrollbars.vertical {
        return zoom;
    }

    let zoomed = zoomed_size(document, zoom);
    if scrollbars.horizontal && zoomed.height > window.height - scrollbar_width {
        scrollbars.vertical = true;
    }
    if scrollbars.vertical && zoomed.width > window.width - scrollbar_width {
        scrollbars.horizontal = true;
    }

    let mut usable = window;
    if scrollbars.horizontal {
        usable.height -= scrollbar_width;
    }
    if scrollbars.vertical {
        usable.width -= scrollbar_width;
    }
    zoom_for_dimensions(fit_width, fit_height, usable, page)
}
