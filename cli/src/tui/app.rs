//! TUI application state and key handling.

use anyhow::Result;
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use portpilot_core::domain::QUICK_FILTERS;
use portpilot_core::{KillIntent, PortBackend, PortPilotEngine, PortRecord, SettingsRepository};
use tracing::{debug, warn};

/// Step used by `+`/`-` to change the refresh interval.
const INTERVAL_STEP_MS: u64 = 500;
/// Step used by `<`/`>` to resize the sidebar, in percent.
const SIDEBAR_STEP: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Search,
    Detail,
    ConfirmKill,
}

/// Work that waits on the backend. The event loop polls it alongside input
/// so the screen keeps updating while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Refresh,
    Kill(KillIntent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Refreshed,
    Killed { intent: KillIntent, ok: bool },
}

/// Run a task against the engine. Failures land in the registry error.
pub async fn run_task<B: PortBackend + 'static, R: SettingsRepository>(
    engine: &PortPilotEngine<B, R>,
    task: Task,
) -> Outcome {
    match task {
        Task::Refresh => {
            let _ = engine.refresh().await;
            Outcome::Refreshed
        }
        Task::Kill(intent) => {
            let ok = matches!(engine.confirm_kill().await, Ok(true));
            Outcome::Killed { intent, ok }
        }
    }
}

pub struct App<'a, B: PortBackend + 'static, R: SettingsRepository> {
    pub engine: &'a PortPilotEngine<B, R>,
    pub mode: Mode,
    pub selected: usize,
    pub last_updated: Option<DateTime<Local>>,
    pub should_quit: bool,
    status: Option<String>,
    preset_cursor: usize,
    queued: Option<Task>,
    kill_pending: bool,
}

impl<'a, B: PortBackend + 'static, R: SettingsRepository> App<'a, B, R> {
    pub fn new(engine: &'a PortPilotEngine<B, R>) -> Self {
        Self {
            engine,
            mode: Mode::Normal,
            selected: 0,
            last_updated: None,
            should_quit: false,
            status: None,
            preset_cursor: 0,
            queued: None,
            kill_pending: false,
        }
    }

    pub fn is_searching(&self) -> bool {
        self.mode == Mode::Search
    }

    pub fn get_status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// True between confirming a kill and its outcome arriving.
    pub fn is_kill_pending(&self) -> bool {
        self.kill_pending
    }

    /// Task queued by the last key, to be run by the event loop.
    pub fn take_task(&mut self) -> Option<Task> {
        self.queued.take()
    }

    /// Apply the result of a task started from `take_task`.
    pub fn finish(&mut self, outcome: Outcome) {
        if let Outcome::Killed { intent, ok } = outcome {
            self.kill_pending = false;
            // On failure the dialog stays open with the registry error
            if ok {
                self.set_status(format!(
                    "Killed {} (PID {})",
                    intent.display_name, intent.pid
                ));
                if self.mode == Mode::ConfirmKill {
                    self.mode = Mode::Normal;
                }
            }
        }
        self.clamp_selection();
    }

    /// Called whenever the registry publishes a new snapshot.
    pub fn on_snapshot(&mut self) {
        self.last_updated = Some(Local::now());
        self.clamp_selection();
    }

    pub fn selected_record(&self) -> Option<PortRecord> {
        self.engine.view().rows.get(self.selected).cloned()
    }

    fn clamp_selection(&mut self) {
        let len = self.engine.view().rows.len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    /// Handle one key press. Settings that fail to save are reported in the
    /// status line; the session keeps running.
    pub async fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.mode {
            Mode::Normal => {
                if let Err(e) = self.handle_normal(key).await {
                    warn!(error = %e, "failed to save setting");
                    self.set_status(format!("Error: {}", e));
                }
            }
            Mode::Search => self.handle_search(key),
            Mode::Detail => self.handle_detail(key),
            Mode::ConfirmKill => self.handle_confirm(key),
        }
        self.clamp_selection();
    }

    fn request_kill(&mut self) {
        if let Some(record) = self.selected_record() {
            let intent = self.engine.request_kill(record.pid);
            debug!(pid = intent.pid, "kill requested");
            self.mode = Mode::ConfirmKill;
        }
    }

    async fn handle_normal(&mut self, key: KeyEvent) -> Result<()> {
        let engine = self.engine;

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.selected = self.selected.saturating_add(1),
            KeyCode::Char('k') | KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => {
                engine.next_page();
                self.selected = 0;
            }
            KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => {
                engine.prev_page();
                self.selected = 0;
            }
            KeyCode::Char(']') => {
                let size = engine.query().page_size().larger();
                engine.set_page_size(size).await?;
                self.selected = 0;
            }
            KeyCode::Char('[') => {
                let size = engine.query().page_size().smaller();
                engine.set_page_size(size).await?;
                self.selected = 0;
            }
            KeyCode::Char('/') => self.mode = Mode::Search,
            KeyCode::Char('c') => {
                engine.clear_filter();
                self.selected = 0;
            }
            KeyCode::Char(c @ '1'..='7') => {
                let idx = c as usize - '1' as usize;
                if let Some(filter) = QUICK_FILTERS.get(idx) {
                    engine.toggle_quick_filter(filter.token);
                    self.selected = 0;
                }
            }
            KeyCode::Char('F') => {
                let presets = engine.presets();
                if presets.is_empty() {
                    self.set_status("No favorite presets");
                } else {
                    let idx = self.preset_cursor % presets.len();
                    if let Some(preset) = engine.apply_preset(idx) {
                        self.set_status(format!("Preset: {}", preset.label));
                    }
                    self.preset_cursor = idx + 1;
                    self.selected = 0;
                }
            }
            KeyCode::Char('A') => {
                let search = engine.query().search().trim().to_string();
                if engine.add_preset(&search, &search).await? {
                    self.set_status(format!("Saved preset \"{}\"", search));
                } else {
                    self.set_status("Nothing to save");
                }
            }
            KeyCode::Char('x') | KeyCode::Delete => self.request_kill(),
            KeyCode::Enter => {
                if self.selected_record().is_some() {
                    self.mode = Mode::Detail;
                }
            }
            KeyCode::Char('r') => self.queued = Some(Task::Refresh),
            KeyCode::Char('a') => {
                let enabled = engine.toggle_auto_refresh().await?;
                self.set_status(if enabled {
                    "Auto refresh on"
                } else {
                    "Auto refresh paused"
                });
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let ms = engine
                    .set_auto_refresh_interval(engine.auto_refresh_interval() + INTERVAL_STEP_MS)
                    .await?;
                self.set_status(format!("Interval {}ms", ms));
            }
            KeyCode::Char('-') => {
                let current = engine.auto_refresh_interval();
                let ms = engine
                    .set_auto_refresh_interval(current.saturating_sub(INTERVAL_STEP_MS))
                    .await?;
                self.set_status(format!("Interval {}ms", ms));
            }
            KeyCode::Char('s') => {
                engine.toggle_status_bar().await?;
            }
            KeyCode::Tab => {
                engine.toggle_sidebar_mode().await?;
            }
            KeyCode::Char('b') => {
                engine.toggle_sidebar().await?;
            }
            KeyCode::Char('<') | KeyCode::Char('>') => {
                let layout = engine.layout();
                if !layout.collapsed {
                    let delta = if key.code == KeyCode::Char('<') {
                        -SIDEBAR_STEP
                    } else {
                        SIDEBAR_STEP
                    };
                    let sidebar = layout.layout[0] + delta;
                    engine.resize_sidebar([sidebar, 100.0 - sidebar]).await?;
                }
            }
            KeyCode::Esc => {
                engine.clear_error();
                self.status = None;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_search(&mut self, key: KeyEvent) {
        let engine = self.engine;
        let mut search = engine.query().search().to_string();

        match key.code {
            KeyCode::Char(c) => {
                search.push(c);
                engine.set_search(search);
            }
            KeyCode::Backspace => {
                search.pop();
                engine.set_search(search);
            }
            KeyCode::Enter => self.mode = Mode::Normal,
            KeyCode::Esc => {
                engine.clear_filter();
                self.mode = Mode::Normal;
            }
            _ => return,
        }
        self.selected = 0;
    }

    fn handle_detail(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('x') | KeyCode::Delete => self.request_kill(),
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => self.mode = Mode::Normal,
            _ => {}
        }
    }

    fn handle_confirm(&mut self, key: KeyEvent) {
        let engine = self.engine;
        if self.kill_pending {
            return;
        }

        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => match engine.kill_intent() {
                Some(intent) => {
                    self.kill_pending = true;
                    self.queued = Some(Task::Kill(intent));
                }
                None => self.mode = Mode::Normal,
            },
            KeyCode::Char('n') | KeyCode::Esc => {
                engine.cancel_kill();
                engine.clear_error();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portpilot_core::{Error, MemoryRepository, SettingsMap};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    /// Backend over a fixed list; pids listed in `protected` refuse to die.
    /// With a gate set, kills wait for it to open.
    struct FakeBackend {
        ports: Mutex<Vec<PortRecord>>,
        protected: Vec<u32>,
        gate: Option<Arc<Notify>>,
    }

    impl PortBackend for FakeBackend {
        async fn list_listening_ports(&self) -> portpilot_core::Result<Vec<PortRecord>> {
            Ok(self.ports.lock().unwrap().clone())
        }

        async fn kill_process(&self, pid: u32) -> portpilot_core::Result<()> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.protected.contains(&pid) {
                return Err(Error::PermissionDenied(format!("pid {}", pid)));
            }
            self.ports.lock().unwrap().retain(|p| p.pid != pid);
            Ok(())
        }
    }

    /// Repository that loads empty and refuses every write.
    struct ReadOnlyRepository;

    impl SettingsRepository for ReadOnlyRepository {
        async fn load(&self) -> portpilot_core::Result<SettingsMap> {
            Ok(SettingsMap::new())
        }

        async fn save(&self, _values: &SettingsMap) -> portpilot_core::Result<()> {
            Err(Error::Config("read-only file system".to_string()))
        }
    }

    fn press(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn backend(protected: Vec<u32>, gate: Option<Arc<Notify>>) -> FakeBackend {
        FakeBackend {
            ports: Mutex::new(vec![
                PortRecord::new(3000, 111, "node"),
                PortRecord::new(5432, 222, "postgres").with_path("/usr/lib/postgresql/bin/postgres"),
                PortRecord::new(8080, 333, "java"),
            ]),
            protected,
            gate,
        }
    }

    async fn engine_with<R: SettingsRepository>(
        backend: FakeBackend,
        repo: R,
    ) -> PortPilotEngine<FakeBackend, R> {
        let engine = PortPilotEngine::new(backend, repo).await;
        engine.refresh().await.unwrap();
        engine
    }

    async fn engine(protected: Vec<u32>) -> PortPilotEngine<FakeBackend, MemoryRepository> {
        engine_with(backend(protected, None), MemoryRepository::new()).await
    }

    /// Handle a key and run whatever task it queued, as the event loop does.
    async fn send<R: SettingsRepository>(app: &mut App<'_, FakeBackend, R>, key: KeyEvent) {
        app.handle_key(key).await;
        if let Some(task) = app.take_task() {
            let outcome = run_task(app.engine, task).await;
            app.finish(outcome);
        }
    }

    #[tokio::test]
    async fn test_navigation_is_clamped() {
        let engine = engine(vec![]).await;
        let mut app = App::new(&engine);

        for _ in 0..5 {
            send(&mut app, press('j')).await;
        }
        assert_eq!(app.selected, 2);
        send(&mut app, key(KeyCode::Up)).await;
        assert_eq!(app.selected_record().unwrap().port, 5432);
    }

    #[tokio::test]
    async fn test_search_mode() {
        let engine = engine(vec![]).await;
        let mut app = App::new(&engine);

        send(&mut app, press('/')).await;
        assert!(app.is_searching());
        for c in "post".chars() {
            send(&mut app, press(c)).await;
        }
        assert_eq!(engine.view().filtered_count, 1);

        send(&mut app, key(KeyCode::Backspace)).await;
        assert_eq!(engine.query().search(), "pos");

        send(&mut app, key(KeyCode::Esc)).await;
        assert!(!app.is_searching());
        assert_eq!(engine.view().filtered_count, 3);
    }

    #[tokio::test]
    async fn test_quick_filter_keys() {
        let engine = engine(vec![]).await;
        let mut app = App::new(&engine);

        // 2 = Java
        send(&mut app, press('2')).await;
        assert_eq!(engine.view().rows[0].process_name, "java");
        send(&mut app, press('2')).await;
        assert_eq!(engine.view().filtered_count, 3);
    }

    #[tokio::test]
    async fn test_refresh_key_queues_task() {
        let engine = engine(vec![]).await;
        let mut app = App::new(&engine);

        app.handle_key(press('r')).await;
        assert_eq!(app.take_task(), Some(Task::Refresh));
        assert_eq!(app.take_task(), None);
    }

    #[tokio::test]
    async fn test_kill_confirmed() {
        let engine = engine(vec![]).await;
        let mut app = App::new(&engine);

        send(&mut app, press('j')).await;
        send(&mut app, press('x')).await;
        assert_eq!(app.mode, Mode::ConfirmKill);
        assert_eq!(engine.kill_intent().unwrap().pid, 222);

        send(&mut app, press('y')).await;
        assert_eq!(app.mode, Mode::Normal);
        assert!(!app.is_kill_pending());
        assert_eq!(app.get_status(), Some("Killed postgres (PID 222)"));
        assert_eq!(engine.view().filtered_count, 2);
    }

    #[tokio::test]
    async fn test_kill_failure_keeps_dialog_open() {
        let engine = engine(vec![111]).await;
        let mut app = App::new(&engine);

        send(&mut app, press('x')).await;
        send(&mut app, press('y')).await;
        assert_eq!(app.mode, Mode::ConfirmKill);
        assert!(!app.is_kill_pending());
        assert!(engine.error().is_some());

        send(&mut app, press('n')).await;
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(engine.kill_intent(), None);
        assert_eq!(engine.error(), None);
    }

    #[tokio::test]
    async fn test_kill_in_flight_is_visible_and_locks_dialog() {
        let gate = Arc::new(Notify::new());
        let engine = engine_with(backend(vec![], Some(Arc::clone(&gate))), MemoryRepository::new()).await;
        let mut app = App::new(&engine);

        send(&mut app, press('x')).await;
        app.handle_key(press('y')).await;
        let task = app.take_task().unwrap();
        assert!(app.is_kill_pending());

        let mut kill = Box::pin(run_task(&engine, task));
        assert!(futures::poll!(kill.as_mut()).is_pending());
        assert_eq!(engine.killing_pid(), Some(111));

        // Keys keep being handled but cannot confirm or cancel twice.
        app.handle_key(press('y')).await;
        app.handle_key(press('n')).await;
        assert_eq!(app.take_task(), None);
        assert_eq!(app.mode, Mode::ConfirmKill);
        assert!(engine.kill_intent().is_some());

        gate.notify_one();
        let outcome = kill.await;
        app.finish(outcome);
        assert_eq!(engine.killing_pid(), None);
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.get_status(), Some("Killed node (PID 111)"));
    }

    #[tokio::test]
    async fn test_detail_view_and_kill_from_it() {
        let engine = engine(vec![]).await;
        let mut app = App::new(&engine);

        send(&mut app, press('j')).await;
        send(&mut app, key(KeyCode::Enter)).await;
        assert_eq!(app.mode, Mode::Detail);
        assert_eq!(app.selected_record().unwrap().pid, 222);

        send(&mut app, key(KeyCode::Esc)).await;
        assert_eq!(app.mode, Mode::Normal);

        send(&mut app, key(KeyCode::Enter)).await;
        send(&mut app, press('x')).await;
        assert_eq!(app.mode, Mode::ConfirmKill);
        assert_eq!(engine.kill_intent().unwrap().display_name, "postgres");
    }

    #[tokio::test]
    async fn test_failed_setting_write_is_reported() {
        let engine = engine_with(backend(vec![], None), ReadOnlyRepository).await;
        let mut app = App::new(&engine);

        send(&mut app, press('s')).await;
        assert!(!app.should_quit);
        assert!(app.get_status().unwrap().starts_with("Error:"));

        send(&mut app, press('+')).await;
        assert!(app.get_status().unwrap().contains("read-only"));

        send(&mut app, press('j')).await;
        assert_eq!(app.selected, 1);
    }

    #[tokio::test]
    async fn test_interval_keys_clamp() {
        let engine = engine(vec![]).await;
        let mut app = App::new(&engine);

        for _ in 0..5 {
            send(&mut app, press('-')).await;
        }
        assert_eq!(engine.auto_refresh_interval(), 500);
        send(&mut app, press('+')).await;
        assert_eq!(engine.auto_refresh_interval(), 1000);
    }

    #[tokio::test]
    async fn test_quit() {
        let engine = engine(vec![]).await;
        let mut app = App::new(&engine);
        send(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)).await;
        assert!(app.should_quit);
    }
}
