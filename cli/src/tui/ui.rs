//! TUI rendering.

use portpilot_core::domain::projection::{page_numbers, PageItem};
use portpilot_core::domain::QUICK_FILTERS;
use portpilot_core::{PortBackend, PortView, SettingsRepository, SidebarMode, Theme};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, TableState, Wrap},
};

use super::app::{App, Mode};
use crate::commands::list::truncate;

/// Colours derived from the theme preference.
struct Palette {
    accent: Color,
    muted: Color,
    selected_bg: Color,
    selected_fg: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                accent: Color::Blue,
                muted: Color::Gray,
                selected_bg: Color::LightBlue,
                selected_fg: Color::Black,
            },
            Theme::Dark | Theme::System => Self {
                accent: Color::Cyan,
                muted: Color::DarkGray,
                selected_bg: Color::DarkGray,
                selected_fg: Color::White,
            },
        }
    }
}

pub fn draw<B: PortBackend + 'static, R: SettingsRepository>(f: &mut Frame, app: &App<'_, B, R>) {
    let engine = app.engine;
    let palette = Palette::for_theme(engine.theme());
    let view = engine.view();
    let status_bar = engine.status_bar_visible();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                              // Header
            Constraint::Min(0),                                 // Body
            Constraint::Length(if status_bar { 4 } else { 3 }), // Footer
        ])
        .split(f.area());

    draw_header(f, app, &palette, chunks[0]);

    let layout = engine.layout();
    if layout.collapsed {
        draw_table(f, app, &view, &palette, chunks[1]);
    } else {
        let [sidebar, content] = layout.effective();
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(sidebar.round() as u16),
                Constraint::Percentage(content.round() as u16),
            ])
            .split(chunks[1]);
        draw_sidebar(f, app, &palette, body[0]);
        draw_table(f, app, &view, &palette, body[1]);
    }

    draw_footer(f, app, &view, &palette, status_bar, chunks[2]);

    match app.mode {
        Mode::Detail => draw_detail(f, app, &palette),
        Mode::ConfirmKill => draw_confirm(f, app, &palette),
        Mode::Normal | Mode::Search => {}
    }
}

fn draw_header<B: PortBackend + 'static, R: SettingsRepository>(
    f: &mut Frame,
    app: &App<'_, B, R>,
    palette: &Palette,
    area: Rect,
) {
    let engine = app.engine;
    let query = engine.query();

    let title = if app.is_searching() {
        format!("PortPilot | Search: {}_", query.search())
    } else {
        let refresh = if engine.auto_refresh_enabled() {
            format!("auto {}ms", engine.auto_refresh_interval())
        } else {
            "auto refresh paused".to_string()
        };
        let loading = if engine.is_loading() { " | refreshing…" } else { "" };
        format!(
            "PortPilot | {} ports | {}{}",
            engine.snapshot().len(),
            refresh,
            loading
        )
    };

    let header = Paragraph::new(title)
        .style(Style::default().fg(palette.accent).bold())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.muted)),
        );

    f.render_widget(header, area);
}

fn draw_sidebar<B: PortBackend + 'static, R: SettingsRepository>(
    f: &mut Frame,
    app: &App<'_, B, R>,
    palette: &Palette,
    area: Rect,
) {
    let engine = app.engine;
    let mode = engine.sidebar_mode();

    let items: Vec<ListItem> = match mode {
        SidebarMode::Favorites => {
            let query = engine.query();
            let mut items = vec![ListItem::new("Quick filters").style(Style::default().bold())];
            for (i, filter) in QUICK_FILTERS.iter().enumerate() {
                let active = query.active_filter() == Some(filter.token);
                let style = if active {
                    Style::default().fg(palette.accent).bold()
                } else {
                    Style::default()
                };
                items.push(ListItem::new(format!(" {} {}", i + 1, filter.label)).style(style));
            }
            items.push(ListItem::new(""));
            items.push(ListItem::new("Favorites (F)").style(Style::default().bold()));
            for preset in engine.presets() {
                let active = query.search() == preset.query;
                let style = if active {
                    Style::default().fg(palette.accent).bold()
                } else {
                    Style::default()
                };
                items.push(ListItem::new(format!(" ★ {}", preset.label)).style(style));
            }
            items
        }
        SidebarMode::Stats => {
            let metrics = engine.metrics();
            let mut items = vec![
                ListItem::new(format!("Total ports: {}", metrics.total)),
                ListItem::new(format!("Shown: {}", metrics.filtered)),
                ListItem::new(format!(
                    "Filter: {}",
                    metrics.active_filter.as_deref().unwrap_or("none")
                )),
                ListItem::new(""),
                ListItem::new("Top processes").style(Style::default().bold()),
            ];
            for summary in engine.process_summary().iter().take(10) {
                items.push(ListItem::new(format!(
                    " {:<14} {}",
                    truncate(&summary.process_name, 14),
                    summary.port_count
                )));
            }
            items
        }
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.muted))
            .title(format!(" {} ", mode.title())),
    );

    f.render_widget(list, area);
}

fn draw_table<B: PortBackend + 'static, R: SettingsRepository>(
    f: &mut Frame,
    app: &App<'_, B, R>,
    view: &PortView,
    palette: &Palette,
    area: Rect,
) {
    let engine = app.engine;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.muted))
        .title(" Listening Ports ");

    if view.is_empty() {
        let message = if view.total_count == 0 {
            "No listening ports found.".to_string()
        } else {
            format!(
                "No ports match \"{}\". Press c to clear the filter.",
                engine.query().search().trim()
            )
        };
        let empty = Paragraph::new(message)
            .style(Style::default().fg(palette.muted))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let header_cells = ["PORT", "PID", "PROCESS", "PATH"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).bold()));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let killing = engine.killing_pid();
    let rows = view.rows.iter().enumerate().map(|(i, record)| {
        let is_selected = i == app.selected;
        let is_killing = killing == Some(record.pid);

        let name = if is_killing {
            format!("{} (killing…)", record.display_name())
        } else {
            record.display_name()
        };

        let cells = vec![
            Cell::from(record.port.to_string()),
            Cell::from(record.pid.to_string()),
            Cell::from(truncate(&name, 28)),
            Cell::from(record.display_path().unwrap_or("").to_string())
                .style(Style::default().fg(palette.muted)),
        ];

        let style = if is_selected {
            Style::default().bg(palette.selected_bg).fg(palette.selected_fg)
        } else if is_killing {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };

        Row::new(cells).style(style)
    });

    let widths = [
        Constraint::Length(6),
        Constraint::Length(8),
        Constraint::Length(28),
        Constraint::Min(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD));

    let mut state = TableState::default();
    state.select(Some(app.selected));

    f.render_stateful_widget(table, area, &mut state);
}

fn draw_footer<B: PortBackend + 'static, R: SettingsRepository>(
    f: &mut Frame,
    app: &App<'_, B, R>,
    view: &PortView,
    palette: &Palette,
    status_bar: bool,
    area: Rect,
) {
    let engine = app.engine;
    let mut lines = vec![pagination_line(view, palette)];

    if status_bar {
        let metrics = engine.metrics();
        let mut spans = vec![Span::raw(metrics.summary())];
        if let Some(filter) = metrics.active_filter {
            spans.push(Span::raw(format!(" | Filter: {}", filter)));
        }
        if let Some(updated) = app.last_updated {
            spans.push(Span::styled(
                format!(" | Updated {}", updated.format("%H:%M:%S")),
                Style::default().fg(palette.muted),
            ));
        }
        if let Some(error) = engine.error() {
            spans.push(Span::styled(
                format!(" | {}", error),
                Style::default().fg(Color::Red),
            ));
        } else if let Some(status) = app.get_status() {
            spans.push(Span::styled(
                format!(" | {}", status),
                Style::default().fg(palette.accent),
            ));
        }
        lines.push(Line::from(spans));
    }

    let help = if app.is_searching() {
        "Type to search | Enter: done | Esc: clear"
    } else {
        "j/k: move | Enter: details | n/p: page | [ ]: size | /: search | 1-7: filters | F: favorite | x: kill | r: refresh | a: auto | +/-: interval | s: status | Tab: sidebar | q: quit"
    };
    lines.push(Line::from(Span::styled(help, Style::default().fg(palette.muted))));

    let footer = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(palette.muted)),
    );

    f.render_widget(footer, area);
}

fn pagination_line(view: &PortView, palette: &Palette) -> Line<'static> {
    let mut spans = Vec::new();

    let range = match &view.range {
        Some(range) => format!("{}-{} of {}", range.start(), range.end(), view.filtered_count),
        None => format!("0 of {}", view.filtered_count),
    };
    spans.push(Span::raw(format!("{} | ", range)));

    for item in page_numbers(view.page, view.total_pages) {
        match item {
            PageItem::Page(n) if n == view.page => spans.push(Span::styled(
                format!("[{}] ", n),
                Style::default().fg(palette.accent).bold(),
            )),
            PageItem::Page(n) => spans.push(Span::raw(format!("{} ", n))),
            PageItem::Ellipsis => spans.push(Span::raw("… ")),
        }
    }
    spans.push(Span::styled(
        format!("| {}/page", view.page_size),
        Style::default().fg(palette.muted),
    ));

    Line::from(spans)
}

fn draw_confirm<B: PortBackend + 'static, R: SettingsRepository>(
    f: &mut Frame,
    app: &App<'_, B, R>,
    palette: &Palette,
) {
    let engine = app.engine;
    let Some(intent) = engine.kill_intent() else {
        return;
    };

    let area = centered_rect(50, 7, f.area());
    let mut lines = vec![
        Line::from(format!(
            "Kill {} (PID {})?",
            intent.display_name, intent.pid
        )),
        Line::from(""),
    ];
    if let Some(error) = engine.error() {
        lines.push(Line::from(Span::styled(error, Style::default().fg(Color::Red))));
    }
    let hint = if app.is_kill_pending() {
        "Killing…"
    } else {
        "y: kill | n: cancel"
    };
    lines.push(Line::from(Span::styled(hint, Style::default().fg(palette.muted))));

    let dialog = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Confirm "),
    );

    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn draw_detail<B: PortBackend + 'static, R: SettingsRepository>(
    f: &mut Frame,
    app: &App<'_, B, R>,
    palette: &Palette,
) {
    let Some(record) = app.selected_record() else {
        return;
    };

    let label = |name: &'static str| {
        Span::styled(format!("{:<10}", name), Style::default().fg(palette.muted))
    };
    let mut lines = vec![
        Line::from(vec![label("Port"), Span::raw(record.port.to_string())]),
        Line::from(vec![label("PID"), Span::raw(record.pid.to_string())]),
        Line::from(vec![label("Process"), Span::raw(record.display_name())]),
    ];
    if let Some(path) = record.display_path() {
        lines.push(Line::from(vec![label("Path"), Span::raw(path.to_string())]));
    }
    lines.push(Line::from(vec![label("Protocol"), Span::raw("TCP")]));
    lines.push(Line::from(vec![label("State"), Span::raw("LISTENING")]));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "x: kill | Esc: close",
        Style::default().fg(palette.muted),
    )));

    let height = lines.len() as u16 + 2;
    let area = centered_rect(60, height, f.area());
    let dialog = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent))
            .title(" Port details "),
    );

    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

/// A rectangle `percent_x` wide and `height` rows tall, centered in `area`.
fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x.min(100)) / 100) as u16;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 100, 40);
        let rect = centered_rect(50, 7, area);
        assert_eq!(rect, Rect::new(25, 16, 50, 7));

        let tiny = centered_rect(50, 7, Rect::new(0, 0, 10, 3));
        assert_eq!(tiny.height, 3);
    }
}
