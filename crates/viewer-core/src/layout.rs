//! Page lookup over the stacked page rectangles of a document.

use crate::error::{Result, ViewportError};
use doc_model::Rect;
use tracing::warn;

/// Page covering document-space `y`.
///
/// A page spans from the previous page's bottom to its own bottom, so gaps
/// between pages belong to the following page. Positions past the end map to
/// the last page.
pub fn page_at_y(pages: &[Rect], y: f64) -> Result<usize> {
    let last = pages.len().checked_sub(1).ok_or(ViewportError::NoPages)?;
    if last == 0 {
        return Ok(0);
    }

    let y = y.max(0.0).floor();
    let (mut min, mut max) = (0, last);
    while min <= max {
        let page = min + (max - min) / 2;
        let top = if page > 0 { pages[page - 1].bottom() } else { 0.0 };
        let bottom = pages[page].bottom();

        if top <= y && y <= bottom {
            return Ok(page);
        }
        if page == last {
            return Ok(page);
        }
        if top > y {
            max = page - 1;
        } else {
            min = page + 1;
        }
    }

    warn!(y, "page rectangles are not sorted; falling back to last page");
    Ok(last)
}

/// Last page that can be visible in `viewport`. In two-up layouts the right
/// page of a row counts when any part of it is visible.
pub fn last_page_in_viewport(pages: &[Rect], viewport: &Rect, two_up: bool) -> Result<usize> {
    let page = page_at_y(pages, viewport.bottom())?;
    if !two_up || page % 2 == 1 || page + 1 >= pages.len() {
        return Ok(page);
    }
    if pages[page + 1].intersection_area(viewport) > 0.0 {
        Ok(page + 1)
    } else {
        Ok(page)
    }
}

/// Page with the largest fraction of its own area inside `viewport`.
pub fn most_visible_page(pages: &[Rect], viewport: &Rect, two_up: bool) -> Result<usize> {
    let first = page_at_y(pages, viewport.y)?;
    let last = last_page_in_viewport(pages, viewport, two_up)?;
    if first >= last {
        return Ok(first);
    }

    let mut best = first;
    let mut best_fraction = 0.0;
    for (index, page) in pages.iter().enumerate().take(last + 1).skip(first) {
        let area = page.area();
        if area <= 0.0 {
            continue;
        }
        let fraction = page.intersection_area(viewport) / area;
        if fraction > best_fraction {
            best = index;
            best_fraction = fraction;
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{DocumentDimensions, Size};

    fn stacked(heights: &[f64]) -> Vec<Rect> {
        let sizes: Vec<Size> = heights.iter().map(|h| Size::new(100.0, *h)).collect();
        DocumentDimensions::stacked(&sizes).page_dimensions
    }

    #[test]
    fn page_at_y_binary_search() {
        let pages = stacked(&[100.0, 100.0, 100.0]);
        assert_eq!(page_at_y(&pages, 0.0), Ok(0));
        assert_eq!(page_at_y(&pages, 150.0), Ok(1));
        assert_eq!(page_at_y(&pages, 299.0), Ok(2));
        assert_eq!(page_at_y(&pages, 1000.0), Ok(2));
        assert_eq!(page_at_y(&pages, 150.9), Ok(1));
    }

    #[test]
    fn gaps_belong_to_following_page() {
        let pages = vec![Rect::new(0.0, 0.0, 100.0, 100.0), Rect::new(0.0, 120.0, 100.0, 100.0)];
        assert_eq!(page_at_y(&pages, 110.0), Ok(1));
    }

    #[test]
    fn empty_document_has_no_pages() {
        assert_eq!(page_at_y(&[], 0.0), Err(ViewportError::NoPages));
        assert_eq!(most_visible_page(&[], &Rect::ZERO, false), Err(ViewportError::NoPages));
    }

    #[test]
    fn most_visible_prefers_fraction_over_area() {
        let pages = stacked(&[100.0, 100.0]);
        // 30% of page 0 and 80% of page 1
        let viewport = Rect::new(0.0, 70.0, 100.0, 110.0);
        assert_eq!(most_visible_page(&pages, &viewport, false), Ok(1));
    }

    #[test]
    fn most_visible_with_mixed_page_sizes() {
        let pages = vec![
            Rect::new(0.0, 0.0, 50.0, 100.0),
            Rect::new(0.0, 100.0, 100.0, 100.0),
            Rect::new(0.0, 200.0, 100.0, 200.0),
        ];
        let at = |y: f64| most_visible_page(&pages, &Rect::new(0.0, y, 100.0, 100.0), false);
        assert_eq!(at(50.0), Ok(0));
        assert_eq!(at(51.0), Ok(1));
        assert_eq!(at(180.0), Ok(2));
        assert_eq!(at(160.0), Ok(1));
    }

    #[test]
    fn two_up_includes_visible_right_page() {
        let pages = vec![
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::new(100.0, 0.0, 100.0, 100.0),
            Rect::new(0.0, 100.0, 100.0, 100.0),
            Rect::new(100.0, 100.0, 100.0, 100.0),
        ];
        let both = Rect::new(0.0, 0.0, 200.0, 50.0);
        assert_eq!(last_page_in_viewport(&pages, &both, true), Ok(1));
        assert_eq!(last_page_in_viewport(&pages, &both, false), Ok(0));

        let left_only = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(last_page_in_viewport(&pages, &left_only, true), Ok(0));
    }
}
