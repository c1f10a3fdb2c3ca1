use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

pub type Timestamp = DateTime<Local>;

/// A sub-field of the payload that was present but could not be read. The
/// field falls back to its default and sibling fields keep rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity}.{field}: {reason}")]
pub struct MalformedField {
    pub entity: &'static str,
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatewayState {
    Running,
    Stopped,
    #[default]
    Unknown,
}

impl GatewayState {
    pub fn as_str(self) -> &'static str {
        match self {
            GatewayState::Running => "running",
            GatewayState::Stopped => "stopped",
            GatewayState::Unknown => "unknown",
        }
    }

    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "running" => GatewayState::Running,
            "stopped" => GatewayState::Stopped,
            _ => GatewayState::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemStatus {
    pub agent_version: Option<String>,
    pub gateway: GatewayState,
    pub messaging_connected: bool,
    pub model: Option<String>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub uptime: Option<String>,
    pub tokens_total: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub completed: u64,
    pub failed: u64,
    pub running: u64,
    pub interactions: u64,
    pub files_created: u64,
    pub avg_response_time_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Completed,
    Failed,
    Running,
    Scheduled,
    /// Anything the backend sends outside the closed set, kept verbatim.
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Running => "running",
            TaskStatus::Scheduled => "scheduled",
            TaskStatus::Other(raw) => raw.as_str(),
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = std::convert::Infallible;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Ok(match input {
            "completed" => TaskStatus::Completed,
            "failed" => TaskStatus::Failed,
            "running" => TaskStatus::Running,
            "scheduled" => TaskStatus::Scheduled,
            other => TaskStatus::Other(other.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskType {
    User,
    System,
    #[default]
    Other,
}

impl TaskType {
    fn parse(raw: &str) -> Self {
        match raw {
            "user_task" | "user" => TaskType::User,
            "system_task" | "system" => TaskType::System,
            _ => TaskType::Other,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    pub status: TaskStatus,
    pub created_at: Option<Timestamp>,
    pub description: Option<String>,
    pub task_type: TaskType,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interaction {
    pub timestamp: Option<Timestamp>,
    pub user_message: Option<String>,
    pub bot_response: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reflection {
    pub learnings: Vec<String>,
    pub tomorrow: Vec<String>,
    pub improvements: Vec<String>,
}

impl Reflection {
    pub fn is_empty(&self) -> bool {
        self.learnings.is_empty() && self.tomorrow.is_empty() && self.improvements.is_empty()
    }
}

/// One complete payload from a single successful fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub system: SystemStatus,
    pub stats: Stats,
    pub tasks: Vec<Task>,
    pub interactions: Vec<Interaction>,
    pub reflection: Reflection,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSnapshot {
    pub snapshot: Snapshot,
    pub malformed: Vec<MalformedField>,
}

impl Snapshot {
    /// Reads a response body entity by entity. Only a non-object body is an
    /// error; anything below the top level degrades to defaults.
    pub fn from_value(body: &Value) -> Result<ParsedSnapshot, MalformedField> {
        let Some(root) = body.as_object() else {
            return Err(MalformedField {
                entity: "body",
                field: String::new(),
                reason: format!("expected object, found {}", kind_of(body)),
            });
        };

        let mut malformed = Vec::new();
        let system = parse_system(root.get("system"), &mut malformed);
        let stats = parse_stats(root.get("stats"), &mut malformed);
        let tasks = parse_list(root.get("tasks"), "tasks", &mut malformed, parse_task);
        let interactions = parse_list(
            root.get("interactions"),
            "interactions",
            &mut malformed,
            parse_interaction,
        );
        let reflection = parse_reflection(root.get("reflection"), &mut malformed);

        for field in &malformed {
            warn!("malformed_field: {field}");
        }

        Ok(ParsedSnapshot {
            snapshot: Snapshot {
                system,
                stats,
                tasks,
                interactions,
                reflection,
            },
            malformed,
        })
    }
}

struct FieldReader<'a> {
    entity: &'static str,
    map: Option<&'a Map<String, Value>>,
    malformed: &'a mut Vec<MalformedField>,
}

impl<'a> FieldReader<'a> {
    fn new(
        entity: &'static str,
        value: Option<&'a Value>,
        required: bool,
        malformed: &'a mut Vec<MalformedField>,
    ) -> Self {
        let map = match value {
            Some(Value::Object(map)) => Some(map),
            None | Some(Value::Null) => {
                if required {
                    malformed.push(MalformedField {
                        entity,
                        field: String::new(),
                        reason: "missing".to_string(),
                    });
                }
                None
            }
            Some(other) => {
                malformed.push(MalformedField {
                    entity,
                    field: String::new(),
                    reason: format!("expected object, found {}", kind_of(other)),
                });
                None
            }
        };
        Self {
            entity,
            map,
            malformed,
        }
    }

    /// First key holding a value; null and `""` count as absent.
    fn lookup(&self, keys: &[&str]) -> Option<(&'a str, &'a Value)> {
        let map = self.map?;
        keys.iter().find_map(|key| {
            map.get_key_value(*key)
                .filter(|(_, value)| !value.is_null() && value.as_str() != Some(""))
                .map(|(k, v)| (k.as_str(), v))
        })
    }

    fn reject(&mut self, field: &str, value: &Value, expected: &str) {
        self.malformed.push(MalformedField {
            entity: self.entity,
            field: field.to_string(),
            reason: format!("expected {expected}, found {}", kind_of(value)),
        });
    }

    fn text(&mut self, keys: &[&str]) -> Option<String> {
        let (key, value) = self.lookup(keys)?;
        match value {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            other => {
                self.reject(key, other, "string");
                None
            }
        }
    }

    fn number(&mut self, key: &str) -> f64 {
        let Some((key, value)) = self.lookup(&[key]) else {
            return 0.0;
        };
        let parsed = match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(number) if number.is_finite() => number,
            _ => {
                self.reject(key, value, "number");
                0.0
            }
        }
    }

    fn count(&mut self, key: &str) -> u64 {
        let value = self.number(key);
        if value <= 0.0 {
            0
        } else {
            value as u64
        }
    }

    fn flag(&mut self, keys: &[&str]) -> bool {
        let Some((key, value)) = self.lookup(keys) else {
            return false;
        };
        match value {
            Value::Bool(flag) => *flag,
            Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
            other => {
                self.reject(key, other, "bool");
                false
            }
        }
    }

    fn timestamp(&mut self, keys: &[&str]) -> Option<Timestamp> {
        let (key, value) = self.lookup(keys)?;
        match parse_timestamp(value) {
            Some(ts) => Some(ts),
            None => {
                self.malformed.push(MalformedField {
                    entity: self.entity,
                    field: key.to_string(),
                    reason: format!("unreadable timestamp {value}"),
                });
                None
            }
        }
    }

    fn strings(&mut self, key: &str) -> Vec<String> {
        let Some((key, value)) = self.lookup(&[key]) else {
            return Vec::new();
        };
        let Some(items) = value.as_array() else {
            self.reject(key, value, "array");
            return Vec::new();
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::String(text) => out.push(text.clone()),
                Value::Null => {}
                Value::Number(_) | Value::Bool(_) => out.push(item.to_string()),
                other => self.reject(key, other, "string item"),
            }
        }
        out
    }
}

fn parse_system(value: Option<&Value>, malformed: &mut Vec<MalformedField>) -> SystemStatus {
    let mut reader = FieldReader::new("system", value, true, malformed);
    let gateway = reader
        .text(&["gateway_status", "gateway_state"])
        .map(|raw| GatewayState::parse(&raw))
        .unwrap_or_default();
    SystemStatus {
        agent_version: reader.text(&["openclaw_version", "agent_version"]),
        gateway,
        messaging_connected: reader.flag(&["telegram_connected", "messaging_connected"]),
        model: reader.text(&["model"]),
        cpu_percent: reader.number("cpu_percent"),
        memory_percent: reader.number("memory_percent"),
        uptime: reader.text(&["uptime"]),
        tokens_total: reader.count("tokens_total"),
    }
}

fn parse_stats(value: Option<&Value>, malformed: &mut Vec<MalformedField>) -> Stats {
    let mut reader = FieldReader::new("stats", value, true, malformed);
    Stats {
        completed: reader.count("completed"),
        failed: reader.count("failed"),
        running: reader.count("running"),
        interactions: reader.count("interactions"),
        files_created: reader.count("files_created"),
        avg_response_time_secs: reader.number("avg_response_time").max(0.0),
    }
}

fn parse_task(value: &Value, malformed: &mut Vec<MalformedField>) -> Task {
    let mut reader = FieldReader::new("task", Some(value), true, malformed);
    let status = reader
        .text(&["status"])
        .map(|raw| raw.parse().unwrap_or_default())
        .unwrap_or_default();
    Task {
        status,
        created_at: reader.timestamp(&["created_at", "start_time", "timestamp"]),
        description: reader.text(&["description"]),
        task_type: reader
            .text(&["task_type"])
            .map(|raw| TaskType::parse(&raw))
            .unwrap_or_default(),
    }
}

fn parse_interaction(value: &Value, malformed: &mut Vec<MalformedField>) -> Interaction {
    let mut reader = FieldReader::new("interaction", Some(value), true, malformed);
    Interaction {
        timestamp: reader.timestamp(&["timestamp"]),
        user_message: reader.text(&["user_message"]),
        bot_response: reader.text(&["bot_response"]),
    }
}

fn parse_reflection(value: Option<&Value>, malformed: &mut Vec<MalformedField>) -> Reflection {
    let mut reader = FieldReader::new("reflection", value, false, malformed);
    Reflection {
        learnings: reader.strings("learnings"),
        tomorrow: reader.strings("tomorrow"),
        improvements: reader.strings("improvements"),
    }
}

fn parse_list<T>(
    value: Option<&Value>,
    entity: &'static str,
    malformed: &mut Vec<MalformedField>,
    parse_item: fn(&Value, &mut Vec<MalformedField>) -> T,
) -> Vec<T> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(|item| parse_item(item, malformed)).collect(),
        Some(other) => {
            malformed.push(MalformedField {
                entity,
                field: String::new(),
                reason: format!("expected array, found {}", kind_of(other)),
            });
            Vec::new()
        }
    }
}

/// Accepts RFC 3339, naive ISO 8601 (read as local time) and epoch millis.
pub fn parse_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::String(raw) => parse_timestamp_str(raw),
        Value::Number(number) => {
            let millis = number.as_f64()?;
            if !millis.is_finite() {
                return None;
            }
            Local.timestamp_millis_opt(millis as i64).single()
        }
        _ => None,
    }
}

fn parse_timestamp_str(raw: &str) -> Option<Timestamp> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Local));
    }
    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
    NAIVE_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(trimmed, format)
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).earliest())
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
