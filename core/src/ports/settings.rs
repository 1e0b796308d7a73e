//! Settings repository port (interface).

use std::future::Future;

use serde_json::{Map, Value};

use crate::error::Result;

/// Persisted key-value settings.
pub type SettingsMap = Map<String, Value>;

/// Port for settings persistence.
///
/// Values are last-write-wins JSON blobs keyed by name; the repository does
/// no interpretation of them. Typed access lives in `config::SettingsStore`.
pub trait SettingsRepository: Send + Sync {
    /// Load every stored key. A missing store loads as an empty map.
    fn load(&self) -> impl Future<Output = Result<SettingsMap>> + Send;

    /// Persist the full map, replacing what was stored.
    fn save(&self, values: &SettingsMap) -> impl Future<Output = Result<()>> + Send;
}
