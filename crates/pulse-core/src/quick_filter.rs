use crate::view::{region, Regions};

/// Client-side task visibility filter. Works on the already rendered task
/// fragments and never triggers a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuickFilter {
    #[default]
    All,
    Completed,
    Running,
    Scheduled,
    Failed,
}

impl QuickFilter {
    pub const ALL: [QuickFilter; 5] = [
        QuickFilter::All,
        QuickFilter::Completed,
        QuickFilter::Running,
        QuickFilter::Scheduled,
        QuickFilter::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QuickFilter::All => "all",
            QuickFilter::Completed => "completed",
            QuickFilter::Running => "running",
            QuickFilter::Scheduled => "scheduled",
            QuickFilter::Failed => "failed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QuickFilter::All => "All",
            QuickFilter::Completed => "✅ Done",
            QuickFilter::Running => "🔄 Running",
            QuickFilter::Scheduled => "🕐 Scheduled",
            QuickFilter::Failed => "❌ Failed",
        }
    }

    pub fn next(self) -> Self {
        match self {
            QuickFilter::All => QuickFilter::Completed,
            QuickFilter::Completed => QuickFilter::Running,
            QuickFilter::Running => QuickFilter::Scheduled,
            QuickFilter::Scheduled => QuickFilter::Failed,
            QuickFilter::Failed => QuickFilter::All,
        }
    }

    pub fn matches(self, status: &str) -> bool {
        self == QuickFilter::All || status == self.as_str()
    }

    /// Toggles visibility of the rendered task fragments. Returns the number
    /// left visible, or `None` when the task region or its content is absent.
    pub fn apply(self, regions: &mut dyn Regions) -> Option<usize> {
        let markup = regions.get(region::TASKS_LIST)?.markup_mut()?;
        Some(markup.filter_by_attr("data-status", &|status| self.matches(status)))
    }
}
