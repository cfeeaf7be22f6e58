//! Scroll geometry over the mounted pages.
//!
//! Only mounted pages occupy space in the scroll container, so slots are laid
//! out for those pages alone, stacked in page order with a fixed gap.

pub const DEFAULT_PAGE_SPACING_PX: f32 = 16.0;

/// One mounted page's vertical extent in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSlot {
    /// 1-based page number.
    pub page: u32,
    pub top_px: f32,
    pub height_px: f32,
}

impl PageSlot {
    pub fn bottom_px(&self) -> f32 {
        self.top_px + self.height_px
    }

    pub fn center_px(&self) -> f32 {
        self.top_px + self.height_px / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollViewport {
    pub scroll_top_px: f32,
    pub height_px: f32,
}

impl ScrollViewport {
    pub fn new(scroll_top_px: f32, height_px: f32) -> Self {
        Self { scroll_top_px, height_px }
    }
}

/// Stacks `(page, height)` pairs top to bottom.
pub fn layout_slots(
    pages: impl IntoIterator<Item = (u32, f32)>,
    spacing_px: f32,
) -> Vec<PageSlot> {
    let mut cursor = 0.0;
    let mut slots = Vec::new();

    for (page, height_px) in pages {
        slots.push(PageSlot { page, top_px: cursor, height_px });
        cursor += height_px + spacing_px;
    }

    slots
}

pub fn content_height(slots: &[PageSlot]) -> f32 {
    slots.last().map(PageSlot::bottom_px).unwrap_or(0.0)
}

/// Pages whose extent intersects the viewport.
pub fn visible_slots<'a>(
    slots: &'a [PageSlot],
    viewport: &ScrollViewport,
) -> impl Iterator<Item = &'a PageSlot> {
    let top = viewport.scroll_top_px;
    let bottom = top + viewport.height_px;
    slots.iter().filter(move |slot| slot.top_px < bottom && slot.bottom_px() > top)
}

/// First intersecting page whose center lies strictly inside the viewport.
pub fn current_page(slots: &[PageSlot], viewport: &ScrollViewport) -> Option<u32> {
    let top = viewport.scroll_top_px;
    let bottom = top + viewport.height_px;

    visible_slots(slots, viewport)
        .find(|slot| {
            let center = slot.center_px();
            center > top && center < bottom
        })
        .map(|slot| slot.page)
}

/// Fraction of the content height above the bottom edge of the viewport.
pub fn scroll_ratio(slots: &[PageSlot], viewport: &ScrollViewport) -> f32 {
    let total = content_height(slots);
    if total <= 0.0 {
        return 1.0;
    }

    ((viewport.scroll_top_px + viewport.height_px) / total).clamp(0.0, 1.0)
}

pub fn page_offset(slots: &[PageSlot], page: u32) -> Option<f32> {
    slots.iter().find(|slot| slot.page == page).map(|slot| slot.top_px)
}
