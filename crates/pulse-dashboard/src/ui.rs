use crate::app::{App, UNITS_PER_ROW};
use crate::theme;
use pulse_core::markup::Markup;
use pulse_core::render::MISSING_VALUE;
use pulse_core::view::region;
use pulse_core::{Filter, RefreshOutcome, RegionStore};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

const KEY_HINT: &str = "1-4/f filter  c quick filter  r refresh  drag down to pull  q quit";

pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.size();
    let pull_rows = pull_rows(&app.store);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(pull_rows + 1),
            Constraint::Length(6),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    frame.render_widget(render_header(app), layout[0]);
    frame.render_widget(render_pull(&app.store, pull_rows), layout[1]);
    render_system(frame, &app.store, layout[2]);
    frame.render_widget(render_stats(&app.store), layout[3]);
    render_body(frame, app, layout[4]);
}

fn panel(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::new().fg(theme::BORDER))
        .style(Style::new().bg(theme::SURFACE))
        .title(Span::styled(title, theme::HEADER_STYLE))
}

fn pull_rows(store: &RegionStore) -> u16 {
    let offset = store
        .view(region::PULL_INDICATOR)
        .map(|view| view.transform)
        .unwrap_or_default();
    (offset / UNITS_PER_ROW).round().clamp(0.0, 8.0) as u16
}

fn render_header(app: &App) -> Paragraph<'static> {
    let mut tabs = Vec::new();
    for filter in Filter::ALL {
        let style = if filter == app.session.filter() {
            theme::SELECTED_STYLE
        } else {
            Style::new().fg(theme::MUTED)
        };
        tabs.push(Span::styled(format!(" {filter} "), style));
        tabs.push(Span::raw(" "));
    }
    tabs.push(Span::styled(
        format!("| {}", app.session.quick_filter().label()),
        Style::new().fg(theme::ACCENT),
    ));
    tabs.push(Span::styled(
        format!("  {}", app.store.text(region::CURRENT_TIME)),
        Style::new().fg(theme::MUTED),
    ));

    let (note, color) = outcome_note(app.last_outcome.as_ref(), app.in_flight);
    Paragraph::new(Text::from(vec![
        Line::from(tabs),
        Line::from(vec![
            Span::styled(note, Style::new().fg(color)),
            Span::styled(format!("  {KEY_HINT}"), Style::new().fg(theme::BORDER)),
        ]),
    ]))
    .style(Style::new().fg(theme::TEXT).bg(theme::BG))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::new().fg(theme::BORDER))
            .style(Style::new().bg(theme::BG))
            .title(Span::styled("Agent Pulse", theme::HEADER_STYLE)),
    )
}

fn outcome_note(outcome: Option<&RefreshOutcome>, in_flight: usize) -> (String, Color) {
    let (mut note, color) = match outcome {
        None => ("waiting for first snapshot".to_string(), theme::MUTED),
        Some(RefreshOutcome::Applied {
            sequence,
            malformed: 0,
            ..
        }) => (format!("refresh #{sequence} applied"), theme::OK),
        Some(RefreshOutcome::Applied {
            sequence,
            malformed,
            ..
        }) => (
            format!("refresh #{sequence} applied, {malformed} malformed fields"),
            theme::WARN,
        ),
        Some(RefreshOutcome::Failed { sequence, error }) => {
            (format!("refresh #{sequence} failed: {error}"), theme::CRITICAL)
        }
        Some(RefreshOutcome::Stale {
            sequence,
            last_applied,
        }) => (
            format!("refresh #{sequence} dropped, #{last_applied} is newer"),
            theme::MUTED,
        ),
    };
    if in_flight > 0 {
        note = format!("⟳ {note}");
    }
    (note, color)
}

fn render_pull(store: &RegionStore, rows: u16) -> Paragraph<'static> {
    let color = if rows > 0 { theme::ACCENT } else { theme::BORDER };
    let mut lines = vec![Line::default(); rows as usize];
    lines.push(Line::from(Span::styled(
        store.text(region::PULL_INDICATOR).to_string(),
        Style::new().fg(color),
    )));
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::new().bg(theme::BG))
}

fn indicator_line(store: &RegionStore, label: &str, indicator: &str, value: &str) -> Line<'static> {
    let class = store
        .view(indicator)
        .map(|view| view.class.as_str())
        .unwrap_or_default();
    Line::from(vec![
        Span::styled("● ", Style::new().fg(theme::indicator_color(class))),
        Span::styled(format!("{label:<10}"), Style::new().fg(theme::MUTED)),
        Span::styled(store.text(value).to_string(), Style::new().fg(theme::TEXT)),
    ])
}

fn field_line(store: &RegionStore, fields: &[(&str, &str)]) -> Line<'static> {
    let mut spans = Vec::new();
    for (label, id) in fields {
        spans.push(Span::styled(format!("{label} "), Style::new().fg(theme::MUTED)));
        spans.push(Span::styled(
            format!("{}   ", store.text(id)),
            Style::new().fg(theme::TEXT),
        ));
    }
    Line::from(spans)
}

fn render_system(frame: &mut Frame, store: &RegionStore, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let lines = vec![
        indicator_line(store, "Agent", region::AGENT_INDICATOR, region::AGENT_VERSION),
        indicator_line(store, "Gateway", region::GATEWAY_INDICATOR, region::GATEWAY_STATUS),
        indicator_line(
            store,
            "Messaging",
            region::MESSAGING_INDICATOR,
            region::MESSAGING_STATUS,
        ),
        field_line(
            store,
            &[
                ("Model", region::MODEL_INFO),
                ("Uptime", region::UPTIME),
                ("Tokens", region::TOKENS_TOTAL),
            ],
        ),
    ];
    frame.render_widget(Paragraph::new(lines).block(panel("System")), columns[0]);

    let block = panel("Load");
    let inner = block.inner(columns[1]);
    frame.render_widget(block, columns[1]);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(2)])
        .split(inner);
    frame.render_widget(gauge(store, "CPU", region::CPU_GAUGE), rows[0]);
    frame.render_widget(gauge(store, "Memory", region::MEMORY_GAUGE), rows[1]);
}

fn gauge_ratio(fill: Option<f64>) -> f64 {
    match fill {
        Some(percent) if percent.is_finite() => (percent / 100.0).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

fn gauge(store: &RegionStore, title: &'static str, id: &str) -> Gauge<'static> {
    let (ratio, class, label) = match store.view(id) {
        Some(view) => (gauge_ratio(view.fill), view.class.clone(), view.text.clone()),
        None => (0.0, String::new(), String::new()),
    };
    let label = if label.is_empty() {
        MISSING_VALUE.to_string()
    } else {
        label
    };
    Gauge::default()
        .block(Block::default().title(Span::styled(title, Style::new().fg(theme::MUTED))))
        .gauge_style(
            Style::new()
                .fg(theme::tier_color(&class))
                .bg(theme::BG)
                .add_modifier(Modifier::BOLD),
        )
        .ratio(ratio)
        .label(label)
}

fn render_stats(store: &RegionStore) -> Paragraph<'static> {
    Paragraph::new(field_line(
        store,
        &[
            ("✅", region::STAT_COMPLETED),
            ("❌", region::STAT_FAILED),
            ("🔄", region::STAT_RUNNING),
            ("💬", region::STAT_INTERACTIONS),
            ("📄", region::STAT_FILES),
            ("⏱", region::STAT_AVG_TIME),
        ],
    ))
    .block(panel("Stats"))
}

fn markup_lines(markup: Option<&Markup>) -> Vec<Line<'static>> {
    let Some(markup) = markup else {
        return vec![Line::from(Span::styled(
            MISSING_VALUE,
            Style::new().fg(theme::MUTED),
        ))];
    };
    markup
        .lines()
        .into_iter()
        .map(|line| {
            let mut spans = Vec::with_capacity(line.spans.len() + 1);
            if let Some(color) = theme::status_color(&line.block_classes) {
                spans.push(Span::styled("▎", Style::new().fg(color)));
            }
            spans.extend(line.spans.into_iter().map(|span| {
                let style = theme::span_style(span.class.as_deref());
                Span::styled(span.text, style)
            }));
            Line::from(spans)
        })
        .collect()
}

fn render_body(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(35),
            Constraint::Percentage(25),
        ])
        .split(area);
    let panels = [
        ("Tasks", region::TASKS_LIST),
        ("Interactions", region::INTERACTIONS_LIST),
        ("Reflection", region::REFLECTION_CONTENT),
    ];
    for ((title, id), column) in panels.into_iter().zip(columns.iter()) {
        let paragraph = Paragraph::new(markup_lines(app.store.markup(id)))
            .block(panel(title))
            .wrap(Wrap { trim: false })
            .scroll((app.scroll, 0));
        frame.render_widget(paragraph, *column);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use pulse_core::{RefreshError, Session};
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).expect("test terminal");
        terminal
            .draw(|frame| render(frame, app))
            .expect("draw frame");
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn draws_regions_from_an_applied_snapshot() {
        let mut app = App::new(Session::new(Filter::Week));
        app.on_timer();
        let ticket = app.take_tickets().remove(0);
        let body = json!({
            "system": {"openclaw_version": "3.1.4", "gateway_status": "running", "cpu_percent": 64},
            "stats": {"completed": 5},
            "tasks": [{"status": "running", "description": "crawl feeds"}],
            "interactions": [],
            "reflection": {}
        });
        app.finish_refresh(&ticket, Ok(body), Local::now());

        let text = screen(&app);
        assert!(text.contains("3.1.4"));
        assert!(text.contains("crawl feeds"));
        assert!(text.contains("64%"));
        assert!(text.contains("No interactions yet"));
        assert!(text.contains("refresh #1 applied"));
    }

    #[test]
    fn missing_content_draws_placeholders() {
        let app = App::new(Session::new(Filter::Today));
        let text = screen(&app);
        assert!(text.contains("waiting for first snapshot"));
        assert!(text.contains("pull to refresh"));
    }

    #[test]
    fn failures_and_in_flight_are_called_out() {
        let failed = RefreshOutcome::Failed {
            sequence: 4,
            error: RefreshError::Status { status: 502 },
        };
        let (note, color) = outcome_note(Some(&failed), 1);
        assert_eq!(note, "⟳ refresh #4 failed: http status 502");
        assert_eq!(color, theme::CRITICAL);
    }

    #[test]
    fn gauge_ratio_is_bounded() {
        assert_eq!(gauge_ratio(Some(250.0)), 1.0);
        assert_eq!(gauge_ratio(Some(f64::NAN)), 0.0);
        assert_eq!(gauge_ratio(None), 0.0);
        assert_eq!(gauge_ratio(Some(42.0)), 0.42);
    }
}
