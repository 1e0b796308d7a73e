//! Domain layer - Pure business logic and data models.
//!
//! This module contains domain entities that represent core business concepts.
//! These types have no I/O dependencies and can be tested in isolation.

mod layout;
mod port;
mod presets;
pub mod projection;
mod query;

// Re-export all domain types
pub use layout::{PanelLayout, SidebarMode, Theme, MIN_SIDEBAR};
pub use port::{filter_records, parse_pid, validate_pid, PortRecord};
pub use presets::{FavoritePreset, PresetList};
pub use projection::{project, PageItem, PortMetrics, PortView, ProcessSummary};
pub use query::{KillIntent, PageSize, QueryState, QuickFilter, QUICK_FILTERS};
