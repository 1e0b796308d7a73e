//! Interactive terminal UI.

mod app;
mod ui;

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyEventKind};
use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use portpilot_core::{PortBackend, PortPilotEngine, SettingsRepository};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

use app::{App, Outcome};

/// Redraw cadence for loading and kill indicators between snapshots.
const UI_TICK: Duration = Duration::from_millis(250);

type Term = Terminal<CrosstermBackend<Stdout>>;

pub async fn run<B: PortBackend + 'static, R: SettingsRepository>(
    engine: &PortPilotEngine<B, R>,
) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, engine).await;
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Term> {
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(
        io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::cursor::Hide,
    )?;
    Ok(Terminal::new(CrosstermBackend::new(io::stdout()))?)
}

fn restore_terminal(terminal: &mut Term) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show,
    )?;
    Ok(())
}

async fn event_loop<B: PortBackend + 'static, R: SettingsRepository>(
    terminal: &mut Term,
    engine: &PortPilotEngine<B, R>,
) -> Result<()> {
    let mut app = App::new(engine);
    let mut snapshots = engine.subscribe();
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(UI_TICK);
    // Refreshes and kills started from the keyboard, polled with input
    let mut tasks: FuturesUnordered<LocalBoxFuture<'_, Outcome>> = FuturesUnordered::new();

    engine.start_auto_refresh();
    info!(
        interval_ms = engine.auto_refresh_interval(),
        enabled = engine.auto_refresh_enabled(),
        "tui started"
    );

    loop {
        terminal.draw(|f| ui::draw(f, &app))?;
        if app.should_quit {
            break;
        }

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key).await;
                    if let Some(task) = app.take_task() {
                        tasks.push(app::run_task(engine, task).boxed_local());
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            Some(outcome) = tasks.next(), if !tasks.is_empty() => app.finish(outcome),
            changed = snapshots.changed() => {
                if changed.is_ok() {
                    app.on_snapshot();
                }
            }
            _ = ticker.tick() => {}
        }
    }

    engine.stop_auto_refresh();
    info!("tui stopped");
    Ok(())
}
