//! PortPilot Core Library
//!
//! Keeps an in-memory snapshot of listening TCP ports in step with the
//! operating system's process table. Provides functionality to:
//! - Refresh the snapshot on demand or on a fixed cadence
//! - Terminate the process that owns a port
//! - Filter and paginate the snapshot for display
//! - Persist user preferences (refresh cadence, presets, layout)
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure business logic and data models
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: External system implementations
//! - `application`: Use case services
//!
//! # Platform Support
//! - macOS: Uses `lsof` and `ps` commands
//! - Linux: Uses `ss` and `/proc`
//! - Windows: Uses `netstat` and `tasklist` commands

// Hexagonal architecture layers
pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub mod config;
pub mod engine;
pub mod error;

// Re-export domain types (primary API)
pub use domain::{
    filter_records, FavoritePreset, KillIntent, PageSize, PanelLayout, PortMetrics, PortRecord,
    PortView, QueryState, SidebarMode, Theme,
};

// Re-export other commonly used types
pub use adapters::{JsonFileRepository, MemoryRepository, SystemBackend};
pub use application::{PortRegistry, RefreshScheduler, Snapshot};
pub use config::{Settings, SettingsStore};
pub use engine::PortPilotEngine;
pub use error::{Error, FailureKind, Result};
pub use ports::{PortBackend, SettingsMap, SettingsRepository};
