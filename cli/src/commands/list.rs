//! List command - show listening ports one page at a time.

use anyhow::Result;
use portpilot_core::domain::projection::total_pages;
use portpilot_core::{
    domain::project, PageSize, PortBackend, PortMetrics, PortPilotEngine, PortView, QueryState,
    SettingsRepository,
};
use serde::Serialize;

#[derive(Serialize)]
struct ListOutput<'a> {
    #[serde(flatten)]
    view: &'a PortView,
    metrics: &'a PortMetrics,
}

pub async fn run<B: PortBackend + 'static, R: SettingsRepository>(
    engine: &PortPilotEngine<B, R>,
    filter: Option<String>,
    page: usize,
    page_size: Option<usize>,
    json: bool,
) -> Result<()> {
    if let Err(e) = engine.refresh().await {
        anyhow::bail!(engine.error().unwrap_or_else(|| e.to_string()));
    }

    let page_size = match page_size {
        Some(size) => PageSize::try_from(size)?,
        None => engine.settings().page_size(),
    };

    let mut query = QueryState::with_page_size(page_size);
    if let Some(filter) = filter {
        query.set_search(filter);
    }

    let snapshot = engine.snapshot();
    let filtered = snapshot.iter().filter(|r| r.matches(query.search())).count();
    query.set_page(page, total_pages(filtered, page_size.get()));

    let view = project(&snapshot, &query);
    let metrics = PortMetrics::from_view(&view, &query);

    if json {
        let output = ListOutput {
            view: &view,
            metrics: &metrics,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_view(&view, &metrics);
    Ok(())
}

/// Print a page of ports as a table, followed by the pagination footer.
pub fn print_view(view: &PortView, metrics: &PortMetrics) {
    if view.total_count == 0 {
        println!("No listening ports found.");
        return;
    }
    if view.is_empty() {
        println!(
            "No ports match \"{}\".",
            metrics.active_filter.as_deref().unwrap_or_default()
        );
        println!("\n{}", metrics.summary());
        return;
    }

    // Table header
    println!("{:<6} {:<8} {:<24} PATH", "PORT", "PID", "PROCESS");
    println!("{}", "-".repeat(80));

    for record in &view.rows {
        let name = truncate(&record.display_name(), 24);
        let path = record.display_path().unwrap_or("");

        println!(
            "{:<6} {:<8} {:<24} {}",
            record.port,
            record.pid,
            name,
            truncate(path, 40)
        );
    }

    println!();
    if let Some(range) = &view.range {
        println!(
            "Showing {}-{} of {} (page {}/{})",
            range.start(),
            range.end(),
            view.filtered_count,
            view.page,
            view.total_pages
        );
    }
    let filter = metrics
        .active_filter
        .as_ref()
        .map(|f| format!(" | Filter: {}", f))
        .unwrap_or_default();
    println!("{}{}", metrics.summary(), filter);
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}
