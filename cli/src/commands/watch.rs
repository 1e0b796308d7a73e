//! Watch command - reprint the port list on every refresh until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use portpilot_core::config::clamp_interval;
use portpilot_core::{PortBackend, PortPilotEngine, RefreshScheduler, SettingsRepository};

use super::list::print_view;

pub async fn run<B: PortBackend + 'static, R: SettingsRepository>(
    engine: &PortPilotEngine<B, R>,
    interval: Option<u64>,
    filter: Option<String>,
    json: bool,
) -> Result<()> {
    let interval = clamp_interval(interval.unwrap_or_else(|| engine.auto_refresh_interval()));
    if let Some(filter) = filter {
        engine.set_search(filter);
    }

    let mut snapshots = engine.subscribe();

    // The --interval override is not persisted, so drive a scheduler here
    // instead of the engine's own.
    let registry = Arc::clone(engine.registry());
    let mut scheduler = RefreshScheduler::new();
    scheduler.start(
        move || {
            let registry = Arc::clone(&registry);
            async move {
                if registry.refresh().await.is_err() {
                    if let Some(message) = registry.error() {
                        eprintln!("{}", message);
                    }
                }
            }
        },
        Duration::from_millis(interval),
        true,
    );

    if !json {
        eprintln!("Refreshing every {}ms. Press Ctrl-C to stop.", interval);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = engine.view();
                if json {
                    println!("{}", serde_json::to_string(&view)?);
                } else {
                    println!("\n[{}]", Local::now().format("%H:%M:%S"));
                    print_view(&view, &engine.metrics());
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    scheduler.stop();
    Ok(())
}
