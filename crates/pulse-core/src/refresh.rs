use crate::fetch::Fetcher;
use crate::model::Snapshot;
use crate::quick_filter::QuickFilter;
use crate::view::{apply_snapshot, Regions};
use chrono::{DateTime, Local};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Task scope sent to the backend. Unknown names fall back to `today`, as
/// the backend itself does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    Today,
    Week,
    Month,
    All,
}

impl Filter {
    pub const ALL: [Filter; 4] = [Filter::Today, Filter::Week, Filter::Month, Filter::All];

    pub fn as_str(self) -> &'static str {
        match self {
            Filter::Today => "today",
            Filter::Week => "week",
            Filter::Month => "month",
            Filter::All => "all",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Filter::Today => Filter::Week,
            Filter::Week => Filter::Month,
            Filter::Month => Filter::All,
            Filter::All => Filter::Today,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = std::convert::Infallible;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Ok(match input.trim().to_ascii_lowercase().as_str() {
            "week" => Filter::Week,
            "month" => Filter::Month,
            "all" => Filter::All,
            _ => Filter::Today,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingPolicy {
    /// Whichever response resolves last is what stays on screen.
    #[default]
    LastWriteWins,
    /// Drop responses older than the last applied one.
    RejectStale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Startup,
    Timer,
    FilterChange,
    Gesture,
    Manual,
}

impl RefreshTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            RefreshTrigger::Startup => "startup",
            RefreshTrigger::Timer => "timer",
            RefreshTrigger::FilterChange => "filter",
            RefreshTrigger::Gesture => "gesture",
            RefreshTrigger::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("http status {status}")]
    Status { status: u16 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response body: {0}")]
    Body(String),
}

/// Everything needed to run one fetch independently of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTicket {
    pub sequence: u64,
    pub filter: Filter,
    pub trigger: RefreshTrigger,
}

impl RefreshTicket {
    pub fn target(&self) -> String {
        format!("/api/data/{}", self.filter.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied {
        sequence: u64,
        regions: usize,
        malformed: usize,
    },
    Failed {
        sequence: u64,
        error: RefreshError,
    },
    Stale {
        sequence: u64,
        last_applied: u64,
    },
}

impl RefreshOutcome {
    pub fn sequence(&self) -> u64 {
        match self {
            RefreshOutcome::Applied { sequence, .. }
            | RefreshOutcome::Failed { sequence, .. }
            | RefreshOutcome::Stale { sequence, .. } => *sequence,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Applied { .. })
    }
}

/// Filter selection, refresh timer and sequence bookkeeping for one
/// dashboard instance.
#[derive(Debug)]
pub struct Session {
    filter: Filter,
    quick_filter: QuickFilter,
    policy: OrderingPolicy,
    next_sequence: u64,
    last_applied: Option<u64>,
    ticker: Option<Interval>,
}

impl Session {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            quick_filter: QuickFilter::All,
            policy: OrderingPolicy::LastWriteWins,
            next_sequence: 1,
            last_applied: None,
            ticker: None,
        }
    }

    pub fn with_policy(mut self, policy: OrderingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn quick_filter(&self) -> QuickFilter {
        self.quick_filter
    }

    pub fn policy(&self) -> OrderingPolicy {
        self.policy
    }

    pub fn last_applied(&self) -> Option<u64> {
        self.last_applied
    }

    /// Starts the repeating timer. Its first tick completes immediately,
    /// which doubles as the startup refresh. Needs a tokio runtime.
    pub fn start_timer(&mut self) {
        let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
    }

    pub fn stop_timer(&mut self) {
        self.ticker = None;
    }

    /// Waits for the next timer tick; pending forever without a timer.
    pub async fn tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    pub fn begin_refresh(&mut self, trigger: RefreshTrigger) -> RefreshTicket {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        debug!(
            "refresh_started: seq={sequence} filter={} trigger={}",
            self.filter,
            trigger.as_str()
        );
        RefreshTicket {
            sequence,
            filter: self.filter,
            trigger,
        }
    }

    /// Sets the filter and starts the refresh that every selection implies.
    pub fn select_filter(&mut self, filter: Filter) -> RefreshTicket {
        self.filter = filter;
        self.begin_refresh(RefreshTrigger::FilterChange)
    }

    pub fn select_quick_filter(&mut self, filter: QuickFilter, regions: &mut dyn Regions) -> Option<usize> {
        self.quick_filter = filter;
        filter.apply(regions)
    }

    /// Applies a finished fetch. A failed fetch leaves every region as it
    /// was.
    pub fn complete_refresh(
        &mut self,
        ticket: &RefreshTicket,
        result: Result<Value, RefreshError>,
        regions: &mut dyn Regions,
        now: DateTime<Local>,
    ) -> RefreshOutcome {
        let sequence = ticket.sequence;
        let body = match result {
            Ok(body) => body,
            Err(error) => {
                warn!(
                    "refresh_failed: seq={sequence} filter={} trigger={} err={error}",
                    ticket.filter,
                    ticket.trigger.as_str()
                );
                return RefreshOutcome::Failed { sequence, error };
            }
        };

        if self.policy == OrderingPolicy::RejectStale {
            if let Some(last_applied) = self.last_applied.filter(|last| *last > sequence) {
                info!("refresh_stale: seq={sequence} last_applied={last_applied}");
                return RefreshOutcome::Stale {
                    sequence,
                    last_applied,
                };
            }
        }

        let parsed = match Snapshot::from_value(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                let error = RefreshError::Body(err.to_string());
                warn!("refresh_failed: seq={sequence} err={error}");
                return RefreshOutcome::Failed { sequence, error };
            }
        };

        let written = apply_snapshot(regions, &parsed.snapshot, self.quick_filter, now);
        self.last_applied = Some(self.last_applied.map_or(sequence, |last| last.max(sequence)));
        info!(
            "refresh_applied: seq={sequence} filter={} tasks={} interactions={} regions={written} malformed={}",
            ticket.filter,
            parsed.snapshot.tasks.len(),
            parsed.snapshot.interactions.len(),
            parsed.malformed.len()
        );
        RefreshOutcome::Applied {
            sequence,
            regions: written,
            malformed: parsed.malformed.len(),
        }
    }
}

/// The single refresh entry point: fetch for the current filter, then apply.
pub async fn refresh<F>(
    session: &mut Session,
    fetcher: &F,
    regions: &mut dyn Regions,
    trigger: RefreshTrigger,
) -> RefreshOutcome
where
    F: Fetcher + ?Sized,
{
    let ticket = session.begin_refresh(trigger);
    let result = fetcher.fetch(&ticket.target()).await;
    session.complete_refresh(&ticket, result, regions, Local::now())
}
