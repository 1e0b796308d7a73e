//! Transient query state owned by the consumer: search text, quick filter,
//! pagination, and the pending kill confirmation.

use serde::{Deserialize, Serialize};

// ============================================================================
// PageSize
// ============================================================================

/// Allowed page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "usize", into = "usize")]
pub enum PageSize {
    Ten,
    #[default]
    TwentyFive,
    Fifty,
    Hundred,
}

impl PageSize {
    /// All page sizes, smallest first.
    pub const ALL: [PageSize; 4] = [
        PageSize::Ten,
        PageSize::TwentyFive,
        PageSize::Fifty,
        PageSize::Hundred,
    ];

    /// Number of rows per page.
    pub fn get(self) -> usize {
        match self {
            PageSize::Ten => 10,
            PageSize::TwentyFive => 25,
            PageSize::Fifty => 50,
            PageSize::Hundred => 100,
        }
    }

    /// Next larger size, saturating at the largest.
    pub fn larger(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1).min(Self::ALL.len() - 1)]
    }

    /// Next smaller size, saturating at the smallest.
    pub fn smaller(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[idx.saturating_sub(1)]
    }
}

impl TryFrom<usize> for PageSize {
    type Error = crate::Error;

    fn try_from(value: usize) -> crate::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.get() == value)
            .ok_or_else(|| {
                crate::Error::Config(format!(
                    "Unsupported page size {}, expected one of 10, 25, 50, 100",
                    value
                ))
            })
    }
}

impl From<PageSize> for usize {
    fn from(size: PageSize) -> Self {
        size.get()
    }
}

impl std::fmt::Display for PageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

// ============================================================================
// QuickFilter
// ============================================================================

/// A predefined one-click filter token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickFilter {
    pub label: &'static str,
    pub token: &'static str,
}

/// Built-in developer tool shortcuts.
pub const QUICK_FILTERS: [QuickFilter; 7] = [
    QuickFilter { label: "Node.js", token: "node" },
    QuickFilter { label: "Java", token: "java" },
    QuickFilter { label: "Angular", token: "ng" },
    QuickFilter { label: "Python", token: "python" },
    QuickFilter { label: "Dotnet", token: "dotnet" },
    QuickFilter { label: "Chrome", token: "chrome" },
    QuickFilter { label: "VS Code", token: "code" },
];

impl QuickFilter {
    /// Look up a built-in quick filter by its token.
    pub fn by_token(token: &str) -> Option<QuickFilter> {
        QUICK_FILTERS.iter().copied().find(|f| f.token == token)
    }
}

// ============================================================================
// QueryState
// ============================================================================

/// Search, quick filter and pagination state.
///
/// The quick filter and free text share `search`; selecting a quick filter
/// overwrites the text and typing clears the selected quick filter. Every
/// change to the filter or page size moves back to page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    search: String,
    active_filter: Option<String>,
    page: usize,
    page_size: PageSize,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            search: String::new(),
            active_filter: None,
            page: 1,
            page_size: PageSize::default(),
        }
    }
}

impl QueryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(page_size: PageSize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn active_filter(&self) -> Option<&str> {
        self.active_filter.as_deref()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Whether any filter narrows the list.
    pub fn has_filter(&self) -> bool {
        !self.search.trim().is_empty()
    }

    /// Label describing the filter in effect, if any.
    pub fn active_filter_label(&self) -> Option<String> {
        if let Some(token) = &self.active_filter {
            return Some(
                QuickFilter::by_token(token)
                    .map(|f| f.label.to_string())
                    .unwrap_or_else(|| token.clone()),
            );
        }
        let trimmed = self.search.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Replace the free-text search. Clears the quick filter unless the text
    /// still equals it.
    pub fn set_search(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.active_filter.as_deref() != Some(text.as_str()) {
            self.active_filter = None;
        }
        self.search = text;
        self.page = 1;
    }

    /// Select a quick-filter token, or deselect it when it is already active.
    pub fn toggle_quick_filter(&mut self, token: &str) {
        if self.active_filter.as_deref() == Some(token) {
            self.active_filter = None;
            self.search.clear();
        } else {
            self.active_filter = Some(token.to_string());
            self.search = token.to_string();
        }
        self.page = 1;
    }

    /// Drop both the search text and the quick filter.
    pub fn clear_filter(&mut self) {
        self.search.clear();
        self.active_filter = None;
        self.page = 1;
    }

    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
        self.page = 1;
    }

    /// Move to `page`, clamped to `[1, total_pages]`.
    pub fn set_page(&mut self, page: usize, total_pages: usize) {
        self.page = page.clamp(1, total_pages.max(1));
    }

    pub fn next_page(&mut self, total_pages: usize) {
        self.set_page(self.page.saturating_add(1), total_pages);
    }

    pub fn prev_page(&mut self, total_pages: usize) {
        self.set_page(self.page.saturating_sub(1), total_pages);
    }
}

// ============================================================================
// KillIntent
// ============================================================================

/// A termination awaiting user confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KillIntent {
    pub pid: u32,
    pub display_name: String,
}

impl KillIntent {
    pub fn new(pid: u32, display_name: impl Into<String>) -> Self {
        Self {
            pid,
            display_name: display_name.into(),
        }
    }
}
