use ratatui::style::{Color, Modifier, Style};

pub const BG: Color = Color::Rgb(11, 18, 32);
pub const SURFACE: Color = Color::Rgb(17, 26, 46);
pub const BORDER: Color = Color::Rgb(71, 85, 105);
pub const TITLE: Color = Color::Rgb(191, 219, 254);
pub const TEXT: Color = Color::Rgb(226, 232, 240);
pub const MUTED: Color = Color::Rgb(148, 163, 184);
pub const ACCENT: Color = Color::Rgb(56, 189, 248);
pub const OK: Color = Color::Rgb(34, 197, 94);
pub const WARN: Color = Color::Rgb(245, 158, 11);
pub const CRITICAL: Color = Color::Rgb(239, 68, 68);
pub const INFO: Color = Color::Rgb(59, 130, 246);

pub const HEADER_STYLE: Style = Style::new().fg(TITLE).add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(ACCENT)
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);

/// Gauge fill color for a tier class.
pub fn tier_color(class: &str) -> Color {
    match class {
        "critical" => CRITICAL,
        "warning" => WARN,
        _ => OK,
    }
}

pub fn indicator_color(class: &str) -> Color {
    match class {
        "online" => OK,
        "offline" => CRITICAL,
        _ => MUTED,
    }
}

/// Style for a span of rendered markup, keyed by the innermost class.
pub fn span_style(class: Option<&str>) -> Style {
    let Some(class) = class else {
        return Style::new().fg(TEXT);
    };
    match class {
        "task-time" | "interaction-time" => Style::new().fg(MUTED),
        "task-type" => Style::new().fg(ACCENT).add_modifier(Modifier::ITALIC),
        "bot-response" => Style::new().fg(INFO),
        "reflection-title" => HEADER_STYLE,
        "empty-state" => Style::new().fg(MUTED).add_modifier(Modifier::ITALIC),
        _ => Style::new().fg(TEXT),
    }
}

/// Accent for the block a task line belongs to.
pub fn status_color(block_classes: &[String]) -> Option<Color> {
    block_classes.iter().find_map(|class| match class.as_str() {
        "status-completed" => Some(OK),
        "status-failed" => Some(CRITICAL),
        "status-running" => Some(INFO),
        "status-scheduled" => Some(WARN),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_and_indicators_map_to_palette() {
        assert_eq!(tier_color("critical"), CRITICAL);
        assert_eq!(tier_color("warning"), WARN);
        assert_eq!(tier_color("nominal"), OK);
        assert_eq!(indicator_color("online"), OK);
        assert_eq!(indicator_color("offline"), CRITICAL);
        assert_eq!(indicator_color(""), MUTED);
    }

    #[test]
    fn unknown_classes_fall_back_to_plain_text() {
        assert_eq!(span_style(Some("mystery")), Style::new().fg(TEXT));
        assert_eq!(span_style(None), Style::new().fg(TEXT));
        assert_eq!(span_style(Some("reflection-title")), HEADER_STYLE);
    }

    #[test]
    fn task_blocks_pick_up_status_color() {
        let classes = vec!["task-item".to_string(), "status-failed".to_string()];
        assert_eq!(status_color(&classes), Some(CRITICAL));
        assert_eq!(status_color(&["task-item".to_string()]), None);
    }
}
