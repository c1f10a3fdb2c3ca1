use crate::markup::Markup;
use crate::model::Snapshot;
use crate::quick_filter::QuickFilter;
use crate::render::{
    render_interactions, render_reflection, render_stats, render_system, render_tasks, Content,
};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use tracing::debug;

/// Stable identifiers of the dashboard's display regions.
pub mod region {
    pub const AGENT_VERSION: &str = "agent-version";
    pub const AGENT_INDICATOR: &str = "agent-indicator";
    pub const GATEWAY_STATUS: &str = "gateway-status";
    pub const GATEWAY_INDICATOR: &str = "gateway-indicator";
    pub const MESSAGING_STATUS: &str = "messaging-status";
    pub const MESSAGING_INDICATOR: &str = "messaging-indicator";
    pub const MODEL_INFO: &str = "model-info";
    pub const CPU_GAUGE: &str = "cpu-gauge";
    pub const MEMORY_GAUGE: &str = "memory-gauge";
    pub const UPTIME: &str = "uptime";
    pub const TOKENS_TOTAL: &str = "tokens-total";

    pub const STAT_COMPLETED: &str = "stat-completed";
    pub const STAT_FAILED: &str = "stat-failed";
    pub const STAT_RUNNING: &str = "stat-running";
    pub const STAT_INTERACTIONS: &str = "stat-interactions";
    pub const STAT_FILES: &str = "stat-files";
    pub const STAT_AVG_TIME: &str = "stat-avg-time";

    pub const TASKS_LIST: &str = "tasks-list";
    pub const INTERACTIONS_LIST: &str = "interactions-list";
    pub const REFLECTION_CONTENT: &str = "reflection-content";

    pub const CURRENT_TIME: &str = "current-time";
    pub const PULL_INDICATOR: &str = "pull-to-refresh";

    pub const ALL: [&str; 22] = [
        AGENT_VERSION,
        AGENT_INDICATOR,
        GATEWAY_STATUS,
        GATEWAY_INDICATOR,
        MESSAGING_STATUS,
        MESSAGING_INDICATOR,
        MODEL_INFO,
        CPU_GAUGE,
        MEMORY_GAUGE,
        UPTIME,
        TOKENS_TOTAL,
        STAT_COMPLETED,
        STAT_FAILED,
        STAT_RUNNING,
        STAT_INTERACTIONS,
        STAT_FILES,
        STAT_AVG_TIME,
        TASKS_LIST,
        INTERACTIONS_LIST,
        REFLECTION_CONTENT,
        CURRENT_TIME,
        PULL_INDICATOR,
    ];
}

/// A writable display slot.
pub trait ViewHandle {
    fn set_text(&mut self, text: &str);
    fn set_class(&mut self, class: &str);
    fn set_fill(&mut self, percent: f64);
    fn set_markup(&mut self, markup: Markup);
    fn set_transform(&mut self, offset: f64);
    fn markup_mut(&mut self) -> Option<&mut Markup>;
}

/// Lookup of display slots by identifier.
pub trait Regions {
    fn get(&mut self, id: &str) -> Option<&mut dyn ViewHandle>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionView {
    pub text: String,
    pub class: String,
    pub fill: Option<f64>,
    pub markup: Option<Markup>,
    pub transform: f64,
}

impl ViewHandle for RegionView {
    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn set_class(&mut self, class: &str) {
        self.class = class.to_string();
    }

    fn set_fill(&mut self, percent: f64) {
        self.fill = Some(percent);
    }

    fn set_markup(&mut self, markup: Markup) {
        self.markup = Some(markup);
    }

    fn set_transform(&mut self, offset: f64) {
        self.transform = offset;
    }

    fn markup_mut(&mut self) -> Option<&mut Markup> {
        self.markup.as_mut()
    }
}

/// Headless region set: records whatever is applied so a frontend, or a
/// test, can read it back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionStore {
    views: BTreeMap<String, RegionView>,
}

impl RegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_regions<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let mut store = Self::new();
        for id in ids {
            store.insert(id);
        }
        store
    }

    /// Every region the dashboard knows about.
    pub fn dashboard() -> Self {
        Self::with_regions(region::ALL)
    }

    pub fn insert(&mut self, id: &str) {
        self.views.entry(id.to_string()).or_default();
    }

    pub fn remove(&mut self, id: &str) -> Option<RegionView> {
        self.views.remove(id)
    }

    pub fn view(&self, id: &str) -> Option<&RegionView> {
        self.views.get(id)
    }

    pub fn text(&self, id: &str) -> &str {
        self.view(id).map(|view| view.text.as_str()).unwrap_or_default()
    }

    pub fn markup(&self, id: &str) -> Option<&Markup> {
        self.view(id).and_then(|view| view.markup.as_ref())
    }
}

impl Regions for RegionStore {
    fn get(&mut self, id: &str) -> Option<&mut dyn ViewHandle> {
        self.views
            .get_mut(id)
            .map(|view| view as &mut dyn ViewHandle)
    }
}

/// Writes one piece of content. A missing region is skipped and reported as
/// `false`; a gauge sets fill, tier class and label together.
pub fn apply(regions: &mut dyn Regions, id: &str, content: &Content) -> bool {
    let Some(handle) = regions.get(id) else {
        debug!("region_missing: {id}");
        return false;
    };
    match content {
        Content::Text(text) => handle.set_text(text),
        Content::Class(class) => handle.set_class(class),
        Content::Gauge(gauge) => {
            handle.set_fill(gauge.fill);
            handle.set_class(gauge.tier.as_class());
            handle.set_text(&gauge.label);
        }
        Content::Markup(markup) => handle.set_markup(markup.clone()),
    }
    true
}

fn apply_all(regions: &mut dyn Regions, contents: &[(&'static str, Content)]) -> usize {
    contents
        .iter()
        .filter(|(id, content)| apply(regions, id, content))
        .count()
}

/// Applies a snapshot in fixed order: system, stats, tasks, interactions,
/// reflection. Returns how many regions were written.
pub fn apply_snapshot(
    regions: &mut dyn Regions,
    snapshot: &Snapshot,
    quick_filter: QuickFilter,
    now: DateTime<Local>,
) -> usize {
    let mut written = apply_all(regions, &render_system(&snapshot.system));
    written += apply_all(regions, &render_stats(&snapshot.stats));
    let tasks = Content::Markup(render_tasks(&snapshot.tasks, now));
    if apply(regions, region::TASKS_LIST, &tasks) {
        written += 1;
        quick_filter.apply(regions);
    }
    let interactions = Content::Markup(render_interactions(&snapshot.interactions, now));
    if apply(regions, region::INTERACTIONS_LIST, &interactions) {
        written += 1;
    }
    let reflection = Content::Markup(render_reflection(&snapshot.reflection));
    if apply(regions, region::REFLECTION_CONTENT, &reflection) {
        written += 1;
    }
    written
}
