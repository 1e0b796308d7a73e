//! PortPilot Engine - Central state and the operations a UI drives.
//!
//! The engine composes the port registry, the refresh scheduler and the
//! settings store with the consumer-side state: query, pending kill,
//! favorite presets and panel layout. Frontends (the TUI, the one-shot CLI
//! commands) only call into this type and render what it returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::application::{PortRegistry, RefreshScheduler, Snapshot};
use crate::config::SettingsStore;
use crate::domain::projection::summarize_processes;
use crate::domain::{
    project, FavoritePreset, KillIntent, PageSize, PanelLayout, PortMetrics, PortView,
    PresetList, ProcessSummary, QueryState, SidebarMode, Theme,
};
use crate::error::Result;
use crate::ports::{PortBackend, SettingsRepository};

/// The main PortPilot engine.
///
/// # Usage Pattern
/// Call `start_auto_refresh()` once inside a tokio runtime, then read
/// `view()` / `metrics()` whenever `subscribe()` signals a new snapshot or
/// the user changes the query.
pub struct PortPilotEngine<B: PortBackend + 'static, R: SettingsRepository> {
    registry: Arc<PortRegistry<B>>,
    settings: SettingsStore<R>,
    scheduler: Mutex<RefreshScheduler>,
    auto_refresh_armed: AtomicBool,
    query: RwLock<QueryState>,
    kill_intent: RwLock<Option<KillIntent>>,
    presets: RwLock<PresetList>,
    layout: RwLock<PanelLayout>,
}

impl<B: PortBackend + 'static, R: SettingsRepository> PortPilotEngine<B, R> {
    /// Create an engine, restoring persisted preferences from `repo`.
    pub async fn new(backend: B, repo: R) -> Self {
        let settings = SettingsStore::open(repo).await;
        let query = QueryState::with_page_size(settings.page_size());
        let presets = PresetList::new(settings.favorite_presets());
        let layout = settings.sidebar_layout();

        Self {
            registry: Arc::new(PortRegistry::new(backend)),
            settings,
            scheduler: Mutex::new(RefreshScheduler::new()),
            auto_refresh_armed: AtomicBool::new(false),
            query: RwLock::new(query),
            kill_intent: RwLock::new(None),
            presets: RwLock::new(presets),
            layout: RwLock::new(layout),
        }
    }

    pub fn registry(&self) -> &Arc<PortRegistry<B>> {
        &self.registry
    }

    pub fn settings(&self) -> &SettingsStore<R> {
        &self.settings
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Refresh the snapshot now.
    pub async fn refresh(&self) -> Result<()> {
        self.registry.refresh().await
    }

    /// Arm the scheduler from the persisted auto-refresh settings.
    ///
    /// Fires one refresh immediately even when auto refresh is disabled.
    pub fn start_auto_refresh(&self) {
        self.auto_refresh_armed.store(true, Ordering::SeqCst);
        self.rearm();
    }

    pub fn stop_auto_refresh(&self) {
        self.auto_refresh_armed.store(false, Ordering::SeqCst);
        self.scheduler.lock().stop();
    }

    fn rearm(&self) {
        let interval = self.settings.auto_refresh_interval();
        let enabled = self.settings.auto_refresh_enabled();
        let registry = Arc::clone(&self.registry);

        self.scheduler.lock().start(
            move || {
                let registry = Arc::clone(&registry);
                async move {
                    // Failures are recorded on the registry.
                    let _ = registry.refresh().await;
                }
            },
            Duration::from_millis(interval),
            enabled,
        );
    }

    fn rearm_if_running(&self) {
        if self.auto_refresh_armed.load(Ordering::SeqCst) {
            self.rearm();
        }
    }

    pub fn is_auto_refresh_running(&self) -> bool {
        self.scheduler.lock().is_active()
    }

    pub fn auto_refresh_enabled(&self) -> bool {
        self.settings.auto_refresh_enabled()
    }

    /// Refresh interval in milliseconds.
    pub fn auto_refresh_interval(&self) -> u64 {
        self.settings.auto_refresh_interval()
    }

    pub async fn set_auto_refresh_enabled(&self, enabled: bool) -> Result<()> {
        self.settings.set_auto_refresh_enabled(enabled).await?;
        info!(enabled, "auto refresh changed");
        self.rearm_if_running();
        Ok(())
    }

    pub async fn toggle_auto_refresh(&self) -> Result<bool> {
        let enabled = !self.auto_refresh_enabled();
        self.set_auto_refresh_enabled(enabled).await?;
        Ok(enabled)
    }

    /// Store a new interval (clamped) and re-arm. Returns the stored value.
    pub async fn set_auto_refresh_interval(&self, ms: u64) -> Result<u64> {
        let ms = self.settings.set_auto_refresh_interval(ms).await?;
        info!(interval_ms = ms, "auto refresh interval changed");
        self.rearm_if_running();
        Ok(ms)
    }

    // =========================================================================
    // Snapshot state
    // =========================================================================

    pub fn snapshot(&self) -> Snapshot {
        self.registry.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.registry.subscribe()
    }

    pub fn error(&self) -> Option<String> {
        self.registry.error()
    }

    pub fn clear_error(&self) {
        self.registry.clear_error();
    }

    pub fn is_loading(&self) -> bool {
        self.registry.is_loading()
    }

    pub fn killing_pid(&self) -> Option<u32> {
        self.registry.killing_pid()
    }

    // =========================================================================
    // Query
    // =========================================================================

    pub fn query(&self) -> QueryState {
        self.query.read().clone()
    }

    /// Filtered rows for the current page.
    pub fn view(&self) -> PortView {
        project(&self.registry.snapshot(), &self.query.read())
    }

    pub fn metrics(&self) -> PortMetrics {
        let query = self.query.read();
        let view = project(&self.registry.snapshot(), &query);
        PortMetrics::from_view(&view, &query)
    }

    pub fn process_summary(&self) -> Vec<ProcessSummary> {
        summarize_processes(&self.registry.snapshot())
    }

    pub fn set_search(&self, text: impl Into<String>) {
        self.query.write().set_search(text);
    }

    pub fn toggle_quick_filter(&self, token: &str) {
        self.query.write().toggle_quick_filter(token);
    }

    pub fn clear_filter(&self) {
        self.query.write().clear_filter();
    }

    pub fn set_page(&self, page: usize) {
        let pages = self.view().total_pages;
        self.query.write().set_page(page, pages);
    }

    pub fn next_page(&self) {
        let view = self.view();
        let mut query = self.query.write();
        query.set_page(view.page, view.total_pages);
        query.next_page(view.total_pages);
    }

    pub fn prev_page(&self) {
        let view = self.view();
        let mut query = self.query.write();
        query.set_page(view.page, view.total_pages);
        query.prev_page(view.total_pages);
    }

    /// Change the page size, back to page 1, and remember it.
    pub async fn set_page_size(&self, size: PageSize) -> Result<()> {
        self.query.write().set_page_size(size);
        self.settings.set_page_size(size).await
    }

    // =========================================================================
    // Kill flow
    // =========================================================================

    /// Ask for confirmation before terminating `pid`. Replaces any pending
    /// request.
    pub fn request_kill(&self, pid: u32) -> KillIntent {
        let display_name = self
            .registry
            .find_by_pid(pid)
            .first()
            .map(|record| record.display_name())
            .unwrap_or_else(|| format!("PID {}", pid));
        let intent = KillIntent::new(pid, display_name);
        *self.kill_intent.write() = Some(intent.clone());
        intent
    }

    pub fn kill_intent(&self) -> Option<KillIntent> {
        self.kill_intent.read().clone()
    }

    pub fn cancel_kill(&self) {
        *self.kill_intent.write() = None;
    }

    /// Terminate the pending request.
    ///
    /// Returns `Ok(false)` when nothing is pending. On failure the request is
    /// kept so the consumer can retry or cancel.
    pub async fn confirm_kill(&self) -> Result<bool> {
        let Some(intent) = self.kill_intent() else {
            return Ok(false);
        };

        debug!(pid = intent.pid, name = %intent.display_name, "kill confirmed");
        self.registry.terminate(intent.pid).await?;

        let mut pending = self.kill_intent.write();
        if pending.as_ref() == Some(&intent) {
            *pending = None;
        }
        Ok(true)
    }

    // =========================================================================
    // Favorite presets
    // =========================================================================

    pub fn presets(&self) -> Vec<FavoritePreset> {
        self.presets.read().items().to_vec()
    }

    /// Run a preset's query as the search text.
    pub fn apply_preset(&self, index: usize) -> Option<FavoritePreset> {
        let preset = self.presets.read().items().get(index).cloned()?;
        self.set_search(preset.query.clone());
        Some(preset)
    }

    /// Returns `false` when the preset is blank or already saved.
    pub async fn add_preset(&self, label: &str, query: &str) -> Result<bool> {
        let added = self.presets.write().add(FavoritePreset::new(label, query));
        if added {
            self.save_presets().await?;
        }
        Ok(added)
    }

    pub async fn update_preset(&self, index: usize, label: &str, query: &str) -> Result<bool> {
        let updated = self
            .presets
            .write()
            .update(index, FavoritePreset::new(label, query));
        if updated {
            self.save_presets().await?;
        }
        Ok(updated)
    }

    pub async fn remove_preset(&self, index: usize) -> Result<Option<FavoritePreset>> {
        let removed = self.presets.write().remove(index);
        if removed.is_some() {
            self.save_presets().await?;
        }
        Ok(removed)
    }

    async fn save_presets(&self) -> Result<()> {
        let presets = self.presets();
        self.settings.set_favorite_presets(&presets).await
    }

    // =========================================================================
    // Layout & view preferences
    // =========================================================================

    pub fn layout(&self) -> PanelLayout {
        *self.layout.read()
    }

    pub async fn resize_sidebar(&self, split: [f64; 2]) -> Result<PanelLayout> {
        let layout = {
            let mut layout = self.layout.write();
            layout.resize(split);
            *layout
        };
        self.settings.set_sidebar_layout(layout).await?;
        Ok(layout)
    }

    pub async fn toggle_sidebar(&self) -> Result<PanelLayout> {
        let layout = {
            let mut layout = self.layout.write();
            layout.toggle_collapsed();
            *layout
        };
        self.settings.set_sidebar_layout(layout).await?;
        Ok(layout)
    }

    pub fn status_bar_visible(&self) -> bool {
        self.settings.status_bar_visible()
    }

    pub async fn toggle_status_bar(&self) -> Result<bool> {
        let visible = !self.status_bar_visible();
        self.settings.set_status_bar_visible(visible).await?;
        Ok(visible)
    }

    pub fn sidebar_mode(&self) -> SidebarMode {
        self.settings.sidebar_mode()
    }

    pub async fn toggle_sidebar_mode(&self) -> Result<SidebarMode> {
        let mode = self.sidebar_mode().toggle();
        self.settings.set_sidebar_mode(mode).await?;
        Ok(mode)
    }

    pub fn theme(&self) -> Theme {
        self.settings.theme()
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.settings.set_theme(theme).await
    }

    pub fn language(&self) -> String {
        self.settings.language()
    }

    pub async fn set_language(&self, code: &str) -> Result<()> {
        self.settings.set_language(code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryRepository;
    use crate::config::keys;
    use crate::domain::PortRecord;
    use crate::error::Error;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct FakeBackend {
        ports: Mutex<Vec<PortRecord>>,
        protected: Vec<u32>,
        list_calls: AtomicUsize,
    }

    impl FakeBackend {
        fn with_ports(ports: Vec<PortRecord>) -> Self {
            Self {
                ports: Mutex::new(ports),
                ..Self::default()
            }
        }
    }

    impl PortBackend for FakeBackend {
        async fn list_listening_ports(&self) -> Result<Vec<PortRecord>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.ports.lock().clone())
        }

        async fn kill_process(&self, pid: u32) -> Result<()> {
            if self.protected.contains(&pid) {
                return Err(Error::PermissionDenied(format!("pid {}", pid)));
            }
            self.ports.lock().retain(|p| p.pid != pid);
            Ok(())
        }
    }

    fn dev_ports() -> Vec<PortRecord> {
        vec![
            PortRecord::new(3000, 111, "node"),
            PortRecord::new(5173, 112, "node"),
            PortRecord::new(8080, 222, "java"),
        ]
    }

    async fn engine_with(
        ports: Vec<PortRecord>,
    ) -> PortPilotEngine<FakeBackend, MemoryRepository> {
        let engine = PortPilotEngine::new(FakeBackend::with_ports(ports), MemoryRepository::new()).await;
        engine.refresh().await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_quick_filter_and_metrics() {
        let engine = engine_with(dev_ports()).await;

        engine.toggle_quick_filter("node");
        let view = engine.view();
        assert_eq!(view.filtered_count, 2);
        let metrics = engine.metrics();
        assert_eq!(metrics.total, 3);
        assert_eq!(metrics.active_filter.as_deref(), Some("Node.js"));

        // Second toggle clears
        engine.toggle_quick_filter("node");
        assert_eq!(engine.view().filtered_count, 3);
        assert_eq!(engine.metrics().active_filter, None);
    }

    #[tokio::test]
    async fn test_page_navigation_clamps() {
        let ports = (1..=60).map(|i| PortRecord::new(3000 + i, i as u32, "svc")).collect();
        let engine = engine_with(ports).await;

        engine.next_page();
        engine.next_page();
        engine.next_page();
        assert_eq!(engine.view().page, 3);
        assert_eq!(engine.view().rows.len(), 10);

        engine.set_page(99);
        assert_eq!(engine.query().page(), 3);

        engine.prev_page();
        assert_eq!(engine.view().rows[0].port, 3026);

        engine.set_search("svc");
        assert_eq!(engine.query().page(), 1);
    }

    #[tokio::test]
    async fn test_page_size_persists() {
        let engine = engine_with(dev_ports()).await;
        engine.set_page(2);
        engine.set_page_size(PageSize::Ten).await.unwrap();

        assert_eq!(engine.query().page(), 1);
        assert_eq!(
            engine.settings().repository().snapshot().get(keys::PAGE_SIZE),
            Some(&json!(10))
        );
    }

    #[tokio::test]
    async fn test_confirm_kill_success_clears_intent() {
        let engine = engine_with(dev_ports()).await;

        let intent = engine.request_kill(222);
        assert_eq!(intent.display_name, "java");

        assert!(engine.confirm_kill().await.unwrap());
        assert_eq!(engine.kill_intent(), None);
        assert_eq!(engine.view().filtered_count, 2);
        assert_eq!(engine.registry().backend().list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_confirm_kill_failure_keeps_intent() {
        let backend = FakeBackend {
            ports: Mutex::new(dev_ports()),
            protected: vec![111],
            ..FakeBackend::default()
        };
        let engine = PortPilotEngine::new(backend, MemoryRepository::new()).await;
        engine.refresh().await.unwrap();

        engine.request_kill(111);
        assert!(engine.confirm_kill().await.is_err());
        assert_eq!(engine.kill_intent(), Some(KillIntent::new(111, "node")));
        assert!(engine.error().unwrap().starts_with("Failed to kill process 111"));

        engine.cancel_kill();
        assert_eq!(engine.kill_intent(), None);
        assert!(!engine.confirm_kill().await.unwrap());
    }

    #[tokio::test]
    async fn test_request_kill_unknown_pid() {
        let engine = engine_with(dev_ports()).await;
        assert_eq!(engine.request_kill(999).display_name, "PID 999");
    }

    #[tokio::test]
    async fn test_presets_are_persisted() {
        let engine = engine_with(Vec::new()).await;
        assert_eq!(engine.presets().len(), 3);

        assert!(engine.add_preset("Redis", "6379").await.unwrap());
        assert!(!engine.add_preset("Redis", "6379").await.unwrap());
        assert!(!engine.add_preset("  ", "1").await.unwrap());
        assert!(engine.update_preset(0, "Web", "3001").await.unwrap());
        assert!(!engine.update_preset(10, "Web", "3001").await.unwrap());
        assert!(engine.remove_preset(1).await.unwrap().is_some());
        assert!(engine.remove_preset(10).await.unwrap().is_none());

        let stored = engine.settings().favorite_presets();
        assert_eq!(
            stored,
            vec![
                FavoritePreset::new("Web", "3001"),
                FavoritePreset::new("Database (5432)", "5432"),
                FavoritePreset::new("Redis", "6379"),
            ]
        );

        let applied = engine.apply_preset(2).unwrap();
        assert_eq!(applied.query, "6379");
        assert_eq!(engine.query().search(), "6379");
    }

    #[tokio::test]
    async fn test_layout_and_preferences() {
        let engine = engine_with(Vec::new()).await;

        let layout = engine.resize_sidebar([10.0, 90.0]).await.unwrap();
        assert_eq!(layout.layout, [18.0, 82.0]);

        let layout = engine.toggle_sidebar().await.unwrap();
        assert!(layout.collapsed);
        assert_eq!(engine.settings().sidebar_layout(), layout);

        assert!(!engine.toggle_status_bar().await.unwrap());
        assert_eq!(engine.toggle_sidebar_mode().await.unwrap(), SidebarMode::Stats);
        engine.set_theme(Theme::Dark).await.unwrap();
        assert_eq!(engine.theme(), Theme::Dark);
    }

    #[tokio::test]
    async fn test_preferences_restored_on_new() {
        let mut values = crate::ports::SettingsMap::new();
        values.insert(keys::PAGE_SIZE.into(), json!(50));
        values.insert(
            keys::FAVORITE_PRESETS.into(),
            json!([{"label": "Mongo", "query": "27017"}]),
        );
        let engine =
            PortPilotEngine::new(FakeBackend::default(), MemoryRepository::with_values(values)).await;

        assert_eq!(engine.query().page_size(), PageSize::Fifty);
        assert_eq!(engine.presets(), vec![FavoritePreset::new("Mongo", "27017")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_refresh_follows_settings() {
        let engine = PortPilotEngine::new(FakeBackend::with_ports(dev_ports()), MemoryRepository::new()).await;
        let calls = || engine.registry().backend().list_calls.load(Ordering::SeqCst);

        engine.start_auto_refresh();
        tokio::time::sleep(Duration::from_millis(4100)).await;
        // t=0, 2000, 4000
        assert_eq!(calls(), 3);
        assert_eq!(engine.snapshot().len(), 3);

        // Re-arm: immediate refresh, then the new cadence.
        assert_eq!(engine.set_auto_refresh_interval(100).await.unwrap(), 500);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(calls(), 4);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(calls(), 5);

        // Disabled: one immediate refresh and nothing after.
        assert!(!engine.toggle_auto_refresh().await.unwrap());
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(calls(), 6);
        assert!(!engine.is_auto_refresh_running());

        engine.stop_auto_refresh();
        engine.set_auto_refresh_enabled(true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(calls(), 6);
    }
}
