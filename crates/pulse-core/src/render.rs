use crate::markup::{Element, Markup, Node};
use crate::model::{GatewayState, Interaction, Reflection, Stats, SystemStatus, Task, TaskStatus, TaskType};
use crate::timefmt::format_time_at;
use crate::view::region;
use chrono::{DateTime, Local};

pub const MAX_INTERACTIONS: usize = 10;
pub const MAX_MESSAGE_CHARS: usize = 80;
pub const ELLIPSIS: &str = "...";

pub const NO_TASKS: &str = "No tasks yet";
pub const NO_INTERACTIONS: &str = "No interactions yet";
pub const NO_REFLECTION: &str = "No reflection yet";
pub const NO_DESCRIPTION: &str = "No description";

pub const MISSING_VALUE: &str = "--";
pub const EMPTY_STATE_CLASS: &str = "empty-state";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeTier {
    Nominal,
    Warning,
    Critical,
}

impl GaugeTier {
    pub fn as_class(self) -> &'static str {
        match self {
            GaugeTier::Nominal => "nominal",
            GaugeTier::Warning => "warning",
            GaugeTier::Critical => "critical",
        }
    }
}

pub fn gauge_tier(percent: f64) -> GaugeTier {
    if percent > 80.0 {
        GaugeTier::Critical
    } else if percent > 50.0 {
        GaugeTier::Warning
    } else {
        GaugeTier::Nominal
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gauge {
    pub fill: f64,
    pub tier: GaugeTier,
    pub label: String,
}

impl Gauge {
    pub fn from_percent(percent: f64) -> Self {
        Self {
            fill: percent.clamp(0.0, 100.0),
            tier: gauge_tier(percent),
            label: format!("{}%", format_number(percent)),
        }
    }
}

/// What the view updater writes into one region.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Class(String),
    Gauge(Gauge),
    Markup(Markup),
}

/// Millions keep one decimal; everything below rounds to whole thousands,
/// so 500 already reads "1K" and 999_999 reads "1000K".
///
/// The decimal rounds the nearest `f64`, so 1_150_000 reads "1.1M". Exact
/// binary halves (2_250_000) round up rather than to even.
pub fn format_tokens(total: u64) -> String {
    if total >= 1_000_000 {
        if total % 100_000 == 50_000 && (total / 50_000) % 5 == 0 {
            let tenths = total / 100_000 + 1;
            return format!("{}.{}M", tenths / 10, tenths % 10);
        }
        format!("{:.1}M", total as f64 / 1_000_000.0)
    } else {
        format!("{}K", (total + 500) / 1_000)
    }
}

pub fn format_number(value: f64) -> String {
    format!("{value}")
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let prefix: String = text.chars().take(max_chars).collect();
    format!("{prefix}{ELLIPSIS}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLook {
    pub icon: &'static str,
    pub class: &'static str,
}

pub fn task_look(status: &TaskStatus) -> StatusLook {
    match status {
        TaskStatus::Completed => StatusLook {
            icon: "✅",
            class: "status-completed",
        },
        TaskStatus::Failed => StatusLook {
            icon: "❌",
            class: "status-failed",
        },
        TaskStatus::Running => StatusLook {
            icon: "🔄",
            class: "status-running",
        },
        TaskStatus::Scheduled => StatusLook {
            icon: "🕐",
            class: "status-scheduled",
        },
        TaskStatus::Other(_) => StatusLook {
            icon: "⏸️",
            class: "",
        },
    }
}

fn indicator(online: bool) -> Content {
    Content::Class(if online { "online" } else { "offline" }.to_string())
}

fn text_or_missing(value: Option<&str>) -> Content {
    Content::Text(value.unwrap_or(MISSING_VALUE).to_string())
}

pub fn render_system(system: &SystemStatus) -> Vec<(&'static str, Content)> {
    let messaging_label = if system.messaging_connected {
        "connected"
    } else {
        "disconnected"
    };
    vec![
        (region::AGENT_VERSION, text_or_missing(system.agent_version.as_deref())),
        (region::AGENT_INDICATOR, indicator(system.agent_version.is_some())),
        (region::GATEWAY_STATUS, Content::Text(system.gateway.as_str().to_string())),
        (
            region::GATEWAY_INDICATOR,
            indicator(system.gateway == GatewayState::Running),
        ),
        (region::MESSAGING_STATUS, Content::Text(messaging_label.to_string())),
        (region::MESSAGING_INDICATOR, indicator(system.messaging_connected)),
        (region::MODEL_INFO, text_or_missing(system.model.as_deref())),
        (region::CPU_GAUGE, Content::Gauge(Gauge::from_percent(system.cpu_percent))),
        (
            region::MEMORY_GAUGE,
            Content::Gauge(Gauge::from_percent(system.memory_percent)),
        ),
        (region::UPTIME, text_or_missing(system.uptime.as_deref())),
        (region::TOKENS_TOTAL, Content::Text(format_tokens(system.tokens_total))),
    ]
}

pub fn render_stats(stats: &Stats) -> Vec<(&'static str, Content)> {
    vec![
        (region::STAT_COMPLETED, Content::Text(stats.completed.to_string())),
        (region::STAT_FAILED, Content::Text(stats.failed.to_string())),
        (region::STAT_RUNNING, Content::Text(stats.running.to_string())),
        (region::STAT_INTERACTIONS, Content::Text(stats.interactions.to_string())),
        (region::STAT_FILES, Content::Text(stats.files_created.to_string())),
        (
            region::STAT_AVG_TIME,
            Content::Text(format!("{}s", format_number(stats.avg_response_time_secs))),
        ),
    ]
}

pub fn empty_state(message: &str) -> Markup {
    Markup::element(Element::new("div").class(EMPTY_STATE_CLASS).text(message))
}

/// One fragment per task, in backend order.
pub fn render_tasks(tasks: &[Task], now: DateTime<Local>) -> Markup {
    if tasks.is_empty() {
        return empty_state(NO_TASKS);
    }
    let nodes = tasks
        .iter()
        .map(|task| Node::Element(render_task(task, now)))
        .collect();
    Markup::new(nodes)
}

fn render_task(task: &Task, now: DateTime<Local>) -> Element {
    let look = task_look(&task.status);
    let header = Element::new("div")
        .class("task-header")
        .child(
            Element::new("span")
                .class("task-time")
                .text(format_time_at(task.created_at.as_ref(), now)),
        )
        .child(Element::new("span").class("task-status").text(format!(" {}", look.icon)));
    let description = task.description.as_deref().unwrap_or(NO_DESCRIPTION);
    let mut item = Element::new("div")
        .class("task-item")
        .class(look.class)
        .attr("data-status", task.status.as_str())
        .child(header)
        .child(Element::new("div").class("task-description").text(description));
    let badge = match task.task_type {
        TaskType::User => Some("user"),
        TaskType::System => Some("system"),
        TaskType::Other => None,
    };
    if let Some(badge) = badge {
        item = item.child(Element::new("div").class("task-type").text(badge));
    }
    item
}

pub fn render_interactions(interactions: &[Interaction], now: DateTime<Local>) -> Markup {
    if interactions.is_empty() {
        return empty_state(NO_INTERACTIONS);
    }
    let nodes = interactions
        .iter()
        .take(MAX_INTERACTIONS)
        .map(|interaction| {
            let mut item = Element::new("div").class("interaction-item").child(
                Element::new("div")
                    .class("interaction-time")
                    .text(format_time_at(interaction.timestamp.as_ref(), now)),
            );
            if let Some(message) = interaction.user_message.as_deref() {
                item = item.child(
                    Element::new("div")
                        .class("user-message")
                        .text(format!("💬 {}", truncate(message, MAX_MESSAGE_CHARS))),
                );
            }
            if let Some(response) = interaction.bot_response.as_deref() {
                item = item.child(
                    Element::new("div")
                        .class("bot-response")
                        .text(format!("🤖 {}", truncate(response, MAX_MESSAGE_CHARS))),
                );
            }
            Node::Element(item)
        })
        .collect();
    Markup::new(nodes)
}

pub fn render_reflection(reflection: &Reflection) -> Markup {
    let sections = [
        ("📚 Learnings", &reflection.learnings),
        ("📅 Tomorrow", &reflection.tomorrow),
        ("💡 Improvements", &reflection.improvements),
    ];
    let nodes: Vec<_> = sections
        .into_iter()
        .filter(|(_, items)| !items.is_empty())
        .map(|(title, items)| {
            let list = items
                .iter()
                .fold(Element::new("ul"), |list, item| {
                    list.child(Element::new("li").text(item.as_str()))
                });
            Node::Element(
                Element::new("div")
                    .class("reflection-section")
                    .child(Element::new("h4").class("reflection-title").text(title))
                    .child(list),
            )
        })
        .collect();
    if nodes.is_empty() {
        return empty_state(NO_REFLECTION);
    }
    Markup::new(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 10, 19, 12, 0, 0)
            .single()
            .expect("unambiguous local time")
    }

    fn task(status: TaskStatus, description: Option<&str>, task_type: TaskType) -> Task {
        Task {
            status,
            created_at: Some(now() - Duration::minutes(5)),
            description: description.map(str::to_string),
            task_type,
        }
    }

    #[test]
    fn gauge_tiers_use_exclusive_lower_bounds() {
        assert_eq!(gauge_tier(0.0), GaugeTier::Nominal);
        assert_eq!(gauge_tier(50.0), GaugeTier::Nominal);
        assert_eq!(gauge_tier(50.1), GaugeTier::Warning);
        assert_eq!(gauge_tier(80.0), GaugeTier::Warning);
        assert_eq!(gauge_tier(80.5), GaugeTier::Critical);
        assert_eq!(gauge_tier(100.0), GaugeTier::Critical);
    }

    #[test]
    fn token_totals_keep_rounding_quirks() {
        assert_eq!(format_tokens(0), "0K");
        assert_eq!(format_tokens(499), "0K");
        assert_eq!(format_tokens(500), "1K");
        assert_eq!(format_tokens(999), "1K");
        assert_eq!(format_tokens(999_999), "1000K");
        assert_eq!(format_tokens(1_000_000), "1.0M");
        assert_eq!(format_tokens(2_250_000), "2.3M");
        assert_eq!(format_tokens(2_500_000), "2.5M");
    }

    #[test]
    fn million_decimals_follow_binary_halves() {
        assert_eq!(format_tokens(1_150_000), "1.1M");
        assert_eq!(format_tokens(1_250_000), "1.3M");
        assert_eq!(format_tokens(1_050_000), "1.1M");
        assert_eq!(format_tokens(1_750_000), "1.8M");
    }

    #[test]
    fn gauge_label_and_fill_come_from_one_value() {
        let gauge = Gauge::from_percent(42.5);
        assert_eq!(gauge.label, "42.5%");
        assert_eq!(gauge.fill, 42.5);
        assert_eq!(Gauge::from_percent(81.0).label, "81%");
        assert_eq!(Gauge::from_percent(120.0).fill, 100.0);
    }

    #[test]
    fn empty_task_list_renders_only_the_placeholder() {
        let markup = render_tasks(&[], now());
        assert_eq!(markup, empty_state(NO_TASKS));
        assert_eq!(markup.plain_text(), NO_TASKS);
    }

    #[test]
    fn tasks_keep_backend_order_and_status_table() {
        let tasks = vec![
            task(TaskStatus::Running, Some("newest"), TaskType::System),
            task(TaskStatus::Completed, Some("older"), TaskType::User),
            task(TaskStatus::Other("paused".into()), None, TaskType::Other),
        ];
        let html = render_tasks(&tasks, now()).to_html();
        let newest = html.find("newest").expect("newest rendered");
        let older = html.find("older").expect("older rendered");
        assert!(newest < older);
        assert!(html.contains("class=\"task-item status-running\" data-status=\"running\""));
        assert!(html.contains("class=\"task-item\" data-status=\"paused\""));
        assert!(html.contains("⏸️"));
        assert!(html.contains(NO_DESCRIPTION));
        assert!(html.contains("5 minutes ago"));
        assert_eq!(html.matches("class=\"task-type\"").count(), 2);
    }

    #[test]
    fn free_text_is_escaped_everywhere() {
        let payload = "<script>alert(1)</script>";
        let tasks = [task(TaskStatus::Failed, Some(payload), TaskType::User)];
        let interactions = [Interaction {
            timestamp: None,
            user_message: Some(payload.to_string()),
            bot_response: Some(payload.to_string()),
        }];
        let reflection = Reflection {
            learnings: vec![payload.to_string()],
            ..Reflection::default()
        };
        for html in [
            render_tasks(&tasks, now()).to_html(),
            render_interactions(&interactions, now()).to_html(),
            render_reflection(&reflection).to_html(),
        ] {
            assert!(!html.contains("<script>"), "{html}");
            assert!(html.contains("&lt;script&gt;"), "{html}");
        }
    }

    #[test]
    fn interactions_cap_at_ten_and_truncate_each_field() {
        let long = "x".repeat(81);
        let interactions: Vec<_> = (0..12)
            .map(|i| Interaction {
                timestamp: Some(now() - Duration::seconds(10)),
                user_message: Some(format!("message {i}")),
                bot_response: Some(long.clone()),
            })
            .collect();
        let markup = render_interactions(&interactions, now());
        assert_eq!(markup.nodes.len(), MAX_INTERACTIONS);
        let html = markup.to_html();
        assert!(html.contains(&format!("🤖 {}...", "x".repeat(80))));
        assert!(!html.contains("message 10"));
        assert!(html.contains("just now"));
    }

    #[test]
    fn interaction_without_messages_keeps_only_its_time() {
        let markup = render_interactions(&[Interaction::default()], now());
        assert_eq!(markup.plain_text(), "--");
        assert_eq!(render_interactions(&[], now()).plain_text(), NO_INTERACTIONS);
    }

    #[test]
    fn reflection_combines_present_sections_only() {
        let reflection = Reflection {
            learnings: Vec::new(),
            tomorrow: vec!["ship it".to_string()],
            improvements: vec!["sleep".to_string()],
        };
        let text = render_reflection(&reflection).plain_text();
        assert!(!text.contains("Learnings"));
        assert!(text.contains("Tomorrow"));
        assert!(text.contains("- ship it"));
        assert!(text.contains("- sleep"));
        assert_eq!(
            render_reflection(&Reflection::default()).plain_text(),
            NO_REFLECTION
        );
    }

    #[test]
    fn system_defaults_fall_back_to_placeholders() {
        let contents = render_system(&SystemStatus::default());
        let lookup = |id: &str| {
            contents
                .iter()
                .find(|(region, _)| *region == id)
                .map(|(_, content)| content.clone())
                .expect("region rendered")
        };
        assert_eq!(lookup(region::AGENT_VERSION), Content::Text("--".into()));
        assert_eq!(lookup(region::AGENT_INDICATOR), Content::Class("offline".into()));
        assert_eq!(lookup(region::GATEWAY_STATUS), Content::Text("unknown".into()));
        assert_eq!(lookup(region::MESSAGING_STATUS), Content::Text("disconnected".into()));
        assert_eq!(lookup(region::TOKENS_TOTAL), Content::Text("0K".into()));
    }

    #[test]
    fn stats_render_counts_and_average_seconds() {
        let stats = Stats {
            completed: 7,
            avg_response_time_secs: 2.5,
            ..Stats::default()
        };
        let contents = render_stats(&stats);
        assert!(contents.contains(&(region::STAT_COMPLETED, Content::Text("7".into()))));
        assert!(contents.contains(&(region::STAT_AVG_TIME, Content::Text("2.5s".into()))));
        assert!(contents.contains(&(region::STAT_FAILED, Content::Text("0".into()))));
    }
}
