//! This modules defines the common functionality for paging records.

use serde::Deserialize;

/// The config for pagination
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// The number of records per page before the user picks a page size.
    pub default_page_size: usize,
    /// The page sizes the user can choose from.
    pub page_size_options: Vec<usize>,
    /// The maximum number of page numbers to show in the pagination indicator.
    pub max_pages: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            page_size_options: vec![10, 25, 50, 100],
            max_pages: 5,
        }
    }
}

/// Where the current page sits within the full, unpaginated collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    /// The 1-indexed page number that was requested.
    pub page: usize,
    /// The maximum number of items per page.
    pub page_size: usize,
    /// The number of items across all pages.
    pub total_items: usize,
    /// `ceil(total_items / page_size)`, zero when there are no items.
    pub total_pages: usize,
    /// The 1-indexed position of the first item on the page, zero if the page
    /// is empty.
    pub first_item: usize,
    /// The 1-indexed position of the last item on the page, zero if the page
    /// is empty.
    pub last_item: usize,
}

impl PageInfo {
    /// Text such as "Showing 11-20 of 45 expenses".
    pub fn showing_label(&self) -> String {
        format!(
            "Showing {}-{} of {} expenses",
            self.first_item, self.last_item, self.total_items
        )
    }
}

/// Slice out page `page` of `items`.
///
/// The slice covers `[(page - 1) * page_size, page * page_size)` clipped to the
/// bounds of `items`. Out of range pages, page zero and a zero page size all
/// give an empty slice rather than an error.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> (&[T], PageInfo) {
    let total_items = items.len();
    let total_pages = if page_size == 0 {
        0
    } else {
        total_items.div_ceil(page_size)
    };

    let slice = match page.checked_sub(1) {
        Some(page_index) if page_size > 0 => {
            let start = page_index.saturating_mul(page_size).min(total_items);
            let end = start.saturating_add(page_size).min(total_items);
            &items[start..end]
        }
        _ => &items[0..0],
    };

    let (first_item, last_item) = if slice.is_empty() {
        (0, 0)
    } else {
        let first_item = (page - 1) * page_size + 1;
        (first_item, first_item + slice.len() - 1)
    };

    let info = PageInfo {
        page,
        page_size,
        total_items,
        total_pages,
        first_item,
        last_item,
    };

    (slice, info)
}

/// One element of a pager, the numbers are the page each element links to.
#[derive(Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PaginationIndicator {
    FirstButton,
    BackButton(usize),
    Page(usize),
    CurrPage(usize),
    Ellipsis,
    NextButton(usize),
    LastButton(usize),
}

/// Build the page links for a pager.
///
/// At most `max_pages` page numbers are shown. When there are more pages than
/// that, the first and last pages stay reachable with ellipses marking the
/// skipped ranges. Nothing is shown when there is at most one page.
pub fn create_pagination_indicators(
    curr_page: usize,
    page_count: usize,
    max_pages: usize,
) -> Vec<PaginationIndicator> {
    if page_count <= 1 {
        return Vec::new();
    }

    let max_pages = max_pages.max(3);
    let half = max_pages / 2;

    let map_page = |page| {
        if page == curr_page {
            PaginationIndicator::CurrPage(page)
        } else {
            PaginationIndicator::Page(page)
        }
    };

    let mut indicators: Vec<PaginationIndicator> = if page_count <= max_pages {
        (1..=page_count).map(map_page).collect()
    } else if curr_page <= half + 1 {
        let mut pages: Vec<_> = (1..=max_pages).map(map_page).collect();
        pages.push(PaginationIndicator::Ellipsis);
        pages.push(map_page(page_count));
        pages
    } else if curr_page >= page_count - half {
        let mut pages = vec![map_page(1), PaginationIndicator::Ellipsis];
        pages.extend((page_count - max_pages + 1..=page_count).map(map_page));
        pages
    } else {
        let spread = (max_pages - 2) / 2;
        let mut pages = vec![map_page(1), PaginationIndicator::Ellipsis];
        pages.extend((curr_page - spread..=curr_page + spread).map(map_page));
        pages.push(PaginationIndicator::Ellipsis);
        pages.push(map_page(page_count));
        pages
    };

    if curr_page > 1 {
        indicators.insert(0, PaginationIndicator::BackButton(curr_page - 1));
        indicators.insert(0, PaginationIndicator::FirstButton);
    }

    if curr_page < page_count {
        indicators.push(PaginationIndicator::NextButton(curr_page + 1));
        indicators.push(PaginationIndicator::LastButton(page_count));
    }

    indicators
}
