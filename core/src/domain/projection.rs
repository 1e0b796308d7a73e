//! View projection: filtered and paginated rows plus summary metrics,
//! derived from a snapshot and the current query state.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use serde::Serialize;

use super::{PortRecord, QueryState};

/// Rows visible on the current page together with list totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortView {
    pub rows: Vec<PortRecord>,
    pub total_count: usize,
    pub filtered_count: usize,
    pub page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    /// 1-based span of items on this page, `None` when nothing matches.
    /// Serialized as `{"start": s, "end": e}`.
    pub range: Option<RangeInclusive<usize>>,
}

impl PortView {

    pub fn is_empty(&self) -> bool {
        self.filtered_count == 0
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Number of pages for `filtered` items, never less than one.
pub fn total_pages(filtered: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    filtered.div_ceil(page_size).max(1)
}

/// Items `[(page-1)*size, page*size)` clamped to the available length.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// Project a snapshot through the query.
///
/// The page is clamped to the last page so a refresh that shrinks the list
/// never leaves the consumer looking at an empty page past the end.
pub fn project(snapshot: &[PortRecord], query: &QueryState) -> PortView {
    let filtered: Vec<&PortRecord> = snapshot
        .iter()
        .filter(|r| r.matches(query.search()))
        .collect();
    let page_size = query.page_size().get();
    let pages = total_pages(filtered.len(), page_size);
    let page = query.page().clamp(1, pages);

    let rows: Vec<PortRecord> = paginate(&filtered, page, page_size)
        .iter()
        .map(|r| (*r).clone())
        .collect();
    let start = (page - 1) * page_size + 1;
    let range = (!rows.is_empty()).then(|| start..=start + rows.len() - 1);

    PortView {
        rows,
        total_count: snapshot.len(),
        filtered_count: filtered.len(),
        page,
        total_pages: pages,
        page_size,
        range,
    }
}

/// An entry of the compact page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

/// Compact page list: all pages when there are at most five, otherwise the
/// first and last page with a window around the current one.
pub fn page_numbers(current: usize, total: usize) -> Vec<PageItem> {
    const MAX_VISIBLE: usize = 5;
    let total = total.max(1);

    if total <= MAX_VISIBLE {
        return (1..=total).map(PageItem::Page).collect();
    }

    let mut items = Vec::with_capacity(7);
    if current <= 3 {
        items.extend((1..=4).map(PageItem::Page));
        items.push(PageItem::Ellipsis);
        items.push(PageItem::Page(total));
    } else if current >= total - 2 {
        items.push(PageItem::Page(1));
        items.push(PageItem::Ellipsis);
        items.extend((total - 3..=total).map(PageItem::Page));
    } else {
        items.push(PageItem::Page(1));
        items.push(PageItem::Ellipsis);
        items.extend((current - 1..=current + 1).map(PageItem::Page));
        items.push(PageItem::Ellipsis);
        items.push(PageItem::Page(total));
    }
    items
}

// ============================================================================
// Metrics
// ============================================================================

/// Summary counters for the status bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortMetrics {
    pub total: usize,
    pub filtered: usize,
    pub active_filter: Option<String>,
}

impl PortMetrics {
    pub fn from_view(view: &PortView, query: &QueryState) -> Self {
        Self {
            total: view.total_count,
            filtered: view.filtered_count,
            active_filter: query.active_filter_label(),
        }
    }

    /// "Showing 1 of 2 listening ports".
    pub fn summary(&self) -> String {
        format!(
            "Showing {} of {} listening port{}",
            self.filtered,
            self.total,
            if self.total == 1 { "" } else { "s" }
        )
    }
}

/// Ports held by one process name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub process_name: String,
    pub port_count: usize,
    pub pids: Vec<u32>,
}

/// Group a snapshot by process name, busiest first.
pub fn summarize_processes(snapshot: &[PortRecord]) -> Vec<ProcessSummary> {
    let mut groups: HashMap<String, ProcessSummary> = HashMap::new();
    for record in snapshot {
        let name = record.display_name();
        let entry = groups
            .entry(name.clone())
            .or_insert_with(|| ProcessSummary {
                process_name: name,
                port_count: 0,
                pids: Vec::new(),
            });
        entry.port_count += 1;
        if !entry.pids.contains(&record.pid) {
            entry.pids.push(record.pid);
        }
    }

    let mut summaries: Vec<ProcessSummary> = groups.into_values().collect();
    summaries.sort_by(|a, b| {
        b.port_count
            .cmp(&a.port_count)
            .then_with(|| a.process_name.cmp(&b.process_name))
    });
    summaries
}
