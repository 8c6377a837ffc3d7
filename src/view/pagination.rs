use std::fmt;

use serde::Serialize;

use crate::api::PaginationMeta;

pub const WINDOW_RADIUS: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageItem {
    Page { number: u32, active: bool },
    Ellipsis,
}

impl PageItem {
    pub fn page_number(&self) -> Option<u32> {
        match self {
            PageItem::Page { number, .. } => Some(*number),
            PageItem::Ellipsis => None,
        }
    }
}

/// Page-number controls for `current` out of `total` pages: a window of
/// `current ± 2`, plus the first/last page and an ellipsis wherever pages
/// are skipped.
pub fn page_window(current: u32, total: u32) -> Vec<PageItem> {
    let total = total.max(1);
    let current = current.clamp(1, total);
    let start = current.saturating_sub(WINDOW_RADIUS).max(1);
    let end = current.saturating_add(WINDOW_RADIUS).min(total);

    let page = |number: u32| PageItem::Page {
        number,
        active: number == current,
    };

    let mut items = Vec::with_capacity(9);
    if start > 1 {
        items.push(page(1));
        if start > 2 {
            items.push(PageItem::Ellipsis);
        }
    }
    items.extend((start..=end).map(page));
    if end < total {
        if end < total - 1 {
            items.push(PageItem::Ellipsis);
        }
        items.push(page(total));
    }
    items
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DisplayRange {
    pub start: u64,
    pub end: u64,
}

impl DisplayRange {
    pub fn is_empty(&self) -> bool {
        self.end == 0
    }
}

impl fmt::Display for DisplayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// `[(page-1)*per_page + 1, min(page*per_page, total_records)]`. A page past
/// the last record yields the empty range `0-0`.
pub fn display_range(current_page: u32, per_page: u32, total_records: u64) -> DisplayRange {
    let page = u64::from(current_page.max(1));
    let per_page = u64::from(per_page.max(1));
    let start = (page - 1) * per_page + 1;
    if start > total_records {
        return DisplayRange { start: 0, end: 0 };
    }
    DisplayRange {
        start,
        end: (page * per_page).min(total_records),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaginationView {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_records: u64,
    pub range: DisplayRange,
    pub items: Vec<PageItem>,
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

impl PaginationView {
    pub fn from_meta(meta: &PaginationMeta) -> Self {
        let total_pages = meta.total_pages.max(1);
        Self {
            current_page: meta.current_page,
            total_pages,
            total_records: meta.total_records,
            range: display_range(meta.current_page, meta.per_page, meta.total_records),
            items: page_window(meta.current_page, total_pages),
            prev_enabled: meta.has_prev,
            next_enabled: meta.has_next,
        }
    }
}
