//! Settings management.
//!
//! Typed accessors over a flat key-value map persisted through a
//! `SettingsRepository`. Every key is optional: a missing or malformed value
//! reads as its default, and every write goes straight through to the
//! repository (last write wins).

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::domain::{FavoritePreset, PageSize, PanelLayout, SidebarMode, Theme};
use crate::error::{Error, Result};
use crate::ports::{SettingsMap, SettingsRepository};

/// Persisted setting names.
pub mod keys {
    pub const AUTO_REFRESH_ENABLED: &str = "auto-refresh-enabled";
    pub const AUTO_REFRESH_INTERVAL: &str = "auto-refresh-interval";
    pub const STATUS_BAR_VISIBLE: &str = "status-bar-visible";
    pub const FAVORITE_PRESETS: &str = "favorite-presets-v1";
    pub const SIDEBAR_LAYOUT: &str = "sidebar-layout-v1";
    pub const SIDEBAR_MODE: &str = "sidebar-mode";
    pub const THEME: &str = "theme";
    pub const LANGUAGE: &str = "language";
    pub const PAGE_SIZE: &str = "page-size";
}

/// Auto-refresh interval bounds, in milliseconds.
pub const MIN_INTERVAL_MS: u64 = 500;
pub const MAX_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_INTERVAL_MS: u64 = 2_000;

pub const DEFAULT_LANGUAGE: &str = "en";

/// Clamp an interval to `[MIN_INTERVAL_MS, MAX_INTERVAL_MS]`.
pub fn clamp_interval(ms: u64) -> u64 {
    ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS)
}

/// Every setting resolved to its effective value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub auto_refresh_enabled: bool,
    pub auto_refresh_interval_ms: u64,
    pub status_bar_visible: bool,
    pub favorite_presets: Vec<FavoritePreset>,
    pub sidebar_layout: PanelLayout,
    pub sidebar_mode: SidebarMode,
    pub theme: Theme,
    pub language: String,
    pub page_size: PageSize,
}

/// Settings store for managing app preferences.
///
/// Values are loaded once by `open` and cached; reads never touch the
/// repository.
pub struct SettingsStore<R: SettingsRepository> {
    repo: R,
    values: RwLock<SettingsMap>,
}

impl<R: SettingsRepository> SettingsStore<R> {
    /// Load the stored settings. A repository that cannot be read starts
    /// the store empty, so every key reads as its default.
    pub async fn open(repo: R) -> Self {
        let values = match repo.load().await {
            Ok(values) => values,
            Err(e) => {
                warn!(error = %e, "could not load settings, using defaults");
                SettingsMap::new()
            }
        };

        Self {
            repo,
            values: RwLock::new(values),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Resolve every key at once.
    pub fn snapshot(&self) -> Settings {
        Settings {
            auto_refresh_enabled: self.auto_refresh_enabled(),
            auto_refresh_interval_ms: self.auto_refresh_interval(),
            status_bar_visible: self.status_bar_visible(),
            favorite_presets: self.favorite_presets(),
            sidebar_layout: self.sidebar_layout(),
            sidebar_mode: self.sidebar_mode(),
            theme: self.theme(),
            language: self.language(),
            page_size: self.page_size(),
        }
    }

    fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let raw = match self.values.read().get(key) {
            Some(value) => value.clone(),
            None => return default,
        };

        match serde_json::from_value(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "malformed setting, using default");
                default
            }
        }
    }

    async fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let values = {
            let mut values = self.values.write();
            values.insert(key.to_string(), value);
            values.clone()
        };
        self.repo.save(&values).await
    }

    // =========================================================================
    // Auto refresh
    // =========================================================================

    pub fn auto_refresh_enabled(&self) -> bool {
        self.get(keys::AUTO_REFRESH_ENABLED, true)
    }

    pub async fn set_auto_refresh_enabled(&self, enabled: bool) -> Result<()> {
        self.set(keys::AUTO_REFRESH_ENABLED, enabled).await
    }

    /// Refresh interval in milliseconds, always within bounds.
    pub fn auto_refresh_interval(&self) -> u64 {
        clamp_interval(self.get(keys::AUTO_REFRESH_INTERVAL, DEFAULT_INTERVAL_MS))
    }

    /// Store a refresh interval, clamped. Returns the value stored.
    pub async fn set_auto_refresh_interval(&self, ms: u64) -> Result<u64> {
        let ms = clamp_interval(ms);
        self.set(keys::AUTO_REFRESH_INTERVAL, ms).await?;
        Ok(ms)
    }

    // =========================================================================
    // View preferences
    // =========================================================================

    pub fn status_bar_visible(&self) -> bool {
        self.get(keys::STATUS_BAR_VISIBLE, true)
    }

    pub async fn set_status_bar_visible(&self, visible: bool) -> Result<()> {
        self.set(keys::STATUS_BAR_VISIBLE, visible).await
    }

    /// Stored presets. Entries without a string `label` and `query` are
    /// skipped; a value that is not a list reads as the defaults.
    pub fn favorite_presets(&self) -> Vec<FavoritePreset> {
        let entries = match self.values.read().get(keys::FAVORITE_PRESETS) {
            Some(Value::Array(entries)) => entries.clone(),
            Some(_) => {
                warn!(key = keys::FAVORITE_PRESETS, "malformed setting, using default");
                return FavoritePreset::defaults();
            }
            None => return FavoritePreset::defaults(),
        };

        let total = entries.len();
        let presets: Vec<FavoritePreset> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();
        if presets.len() < total {
            warn!(
                skipped = total - presets.len(),
                "malformed favorite presets, keeping the valid ones"
            );
        }
        presets
    }

    pub async fn set_favorite_presets(&self, presets: &[FavoritePreset]) -> Result<()> {
        self.set(keys::FAVORITE_PRESETS, presets).await
    }

    /// Stored split with the sidebar minimum applied.
    pub fn sidebar_layout(&self) -> PanelLayout {
        let mut layout: PanelLayout = self.get(keys::SIDEBAR_LAYOUT, PanelLayout::default());
        layout.layout = PanelLayout::normalize(layout.layout);
        layout
    }

    pub async fn set_sidebar_layout(&self, layout: PanelLayout) -> Result<()> {
        self.set(keys::SIDEBAR_LAYOUT, layout).await
    }

    pub fn sidebar_mode(&self) -> SidebarMode {
        self.get(keys::SIDEBAR_MODE, SidebarMode::default())
    }

    pub async fn set_sidebar_mode(&self, mode: SidebarMode) -> Result<()> {
        self.set(keys::SIDEBAR_MODE, mode).await
    }

    pub fn theme(&self) -> Theme {
        self.get(keys::THEME, Theme::default())
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.set(keys::THEME, theme).await
    }

    pub fn language(&self) -> String {
        let language: String = self.get(keys::LANGUAGE, DEFAULT_LANGUAGE.to_string());
        if language.trim().is_empty() {
            DEFAULT_LANGUAGE.to_string()
        } else {
            language
        }
    }

    pub async fn set_language(&self, code: &str) -> Result<()> {
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::Config("Language code cannot be empty".to_string()));
        }
        self.set(keys::LANGUAGE, Value::String(code.to_string())).await
    }

    pub fn page_size(&self) -> PageSize {
        self.get(keys::PAGE_SIZE, PageSize::default())
    }

    pub async fn set_page_size(&self, size: PageSize) -> Result<()> {
        self.set(keys::PAGE_SIZE, size).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{JsonFileRepository, MemoryRepository};
    use serde_json::json;
    use tempfile::tempdir;

    fn seeded(pairs: &[(&str, Value)]) -> MemoryRepository {
        let values = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        MemoryRepository::with_values(values)
    }

    #[tokio::test]
    async fn test_defaults_when_empty() {
        let store = SettingsStore::open(MemoryRepository::new()).await;
        let settings = store.snapshot();

        assert!(settings.auto_refresh_enabled);
        assert_eq!(settings.auto_refresh_interval_ms, 2000);
        assert!(settings.status_bar_visible);
        assert_eq!(settings.favorite_presets, FavoritePreset::defaults());
        assert_eq!(settings.sidebar_layout, PanelLayout::default());
        assert_eq!(settings.sidebar_mode, SidebarMode::Favorites);
        assert_eq!(settings.theme, Theme::System);
        assert_eq!(settings.language, "en");
        assert_eq!(settings.page_size, PageSize::TwentyFive);
    }

    #[tokio::test]
    async fn test_interval_is_clamped() {
        let store = SettingsStore::open(seeded(&[(keys::AUTO_REFRESH_INTERVAL, json!(100))])).await;
        assert_eq!(store.auto_refresh_interval(), 500);

        assert_eq!(store.set_auto_refresh_interval(60_000).await.unwrap(), 30_000);
        assert_eq!(store.auto_refresh_interval(), 30_000);
        assert_eq!(
            store.repository().snapshot().get(keys::AUTO_REFRESH_INTERVAL),
            Some(&json!(30_000))
        );
    }

    #[tokio::test]
    async fn test_malformed_values_fall_back() {
        let store = SettingsStore::open(seeded(&[
            (keys::AUTO_REFRESH_ENABLED, json!("yes")),
            (keys::AUTO_REFRESH_INTERVAL, json!(-5)),
            (keys::FAVORITE_PRESETS, json!({"label": "x"})),
            (keys::SIDEBAR_LAYOUT, json!([1, 2])),
            (keys::THEME, json!("sepia")),
            (keys::PAGE_SIZE, json!(33)),
        ]))
        .await;

        assert!(store.auto_refresh_enabled());
        assert_eq!(store.auto_refresh_interval(), DEFAULT_INTERVAL_MS);
        assert_eq!(store.favorite_presets().len(), 3);
        assert_eq!(store.sidebar_layout(), PanelLayout::default());
        assert_eq!(store.theme(), Theme::System);
        assert_eq!(store.page_size(), PageSize::TwentyFive);
    }

    #[tokio::test]
    async fn test_malformed_preset_entries_are_skipped() {
        let store = SettingsStore::open(seeded(&[(
            keys::FAVORITE_PRESETS,
            json!([
                {"label": "Vite", "query": "5173"},
                {"label": "broken"},
                {"label": 7, "query": "7"},
                "redis",
                {"label": "Redis", "query": "6379"}
            ]),
        )]))
        .await;

        assert_eq!(
            store.favorite_presets(),
            vec![
                FavoritePreset::new("Vite", "5173"),
                FavoritePreset::new("Redis", "6379"),
            ]
        );

        let store = SettingsStore::open(seeded(&[(keys::FAVORITE_PRESETS, json!([]))])).await;
        assert!(store.favorite_presets().is_empty());
    }

    #[tokio::test]
    async fn test_stored_layout_is_normalized() {
        let store = SettingsStore::open(seeded(&[(
            keys::SIDEBAR_LAYOUT,
            json!({"layout": [4.0, 96.0], "collapsed": true}),
        )]))
        .await;

        let layout = store.sidebar_layout();
        assert_eq!(layout.layout, [18.0, 82.0]);
        assert!(layout.collapsed);
    }

    #[tokio::test]
    async fn test_writes_go_through() {
        let store = SettingsStore::open(MemoryRepository::new()).await;

        store.set_auto_refresh_enabled(false).await.unwrap();
        store.set_status_bar_visible(false).await.unwrap();
        store.set_theme(Theme::Dark).await.unwrap();
        store.set_sidebar_mode(SidebarMode::Stats).await.unwrap();
        store.set_page_size(PageSize::Fifty).await.unwrap();
        store
            .set_favorite_presets(&[FavoritePreset::new("Redis", "6379")])
            .await
            .unwrap();

        let stored = store.repository().snapshot();
        assert_eq!(stored.get(keys::AUTO_REFRESH_ENABLED), Some(&json!(false)));
        assert_eq!(stored.get(keys::STATUS_BAR_VISIBLE), Some(&json!(false)));
        assert_eq!(stored.get(keys::THEME), Some(&json!("dark")));
        assert_eq!(stored.get(keys::SIDEBAR_MODE), Some(&json!("stats")));
        assert_eq!(stored.get(keys::PAGE_SIZE), Some(&json!(50)));
        assert_eq!(
            stored.get(keys::FAVORITE_PRESETS),
            Some(&json!([{"label": "Redis", "query": "6379"}]))
        );
    }

    #[tokio::test]
    async fn test_language() {
        let store = SettingsStore::open(MemoryRepository::new()).await;
        store.set_language(" fr ").await.unwrap();
        assert_eq!(store.language(), "fr");
        assert!(store.set_language("  ").await.is_err());
        assert_eq!(store.language(), "fr");
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::open(JsonFileRepository::with_path(path.clone())).await;
        store.set_auto_refresh_interval(5000).await.unwrap();
        store.set_theme(Theme::Light).await.unwrap();

        let reopened = SettingsStore::open(JsonFileRepository::with_path(path)).await;
        assert_eq!(reopened.auto_refresh_interval(), 5000);
        assert_eq!(reopened.theme(), Theme::Light);
        assert!(reopened.auto_refresh_enabled());
    }
}
