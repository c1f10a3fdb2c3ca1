mod app;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use chrono::Local;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use pulse_core::{Fetcher, Filter, HttpFetcher, OrderingPolicy, RefreshError, RefreshTicket, Session};
use ratatui::{backend::CrosstermBackend, Terminal};
use serde_json::Value;
use std::{
    fs::OpenOptions,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time::{Instant, MissedTickBehavior},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CLOCK_INTERVAL: Duration = Duration::from_secs(1);
const FETCH_QUEUE_CAPACITY: usize = 16;

#[derive(Parser, Debug)]
#[command(name = "pulse-dashboard", about = "Live terminal dashboard for an agent monitoring backend")]
struct Args {
    #[arg(long, env = "PULSE_BASE_URL", default_value = "http://127.0.0.1:8080")]
    base_url: String,
    /// today, week, month or all; anything else means today.
    #[arg(long, env = "PULSE_FILTER", default_value = "today")]
    filter: String,
    #[arg(long, env = "PULSE_LOG_FILE")]
    log_file: Option<PathBuf>,
    /// Drop responses that resolve after a newer one was applied.
    #[arg(long, env = "PULSE_REJECT_STALE", default_value_t = false)]
    reject_stale: bool,
}

#[derive(Clone, Debug)]
struct Config {
    base_url: String,
    filter: Filter,
    policy: OrderingPolicy,
    log_file: Option<PathBuf>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let policy = if args.reject_stale {
            OrderingPolicy::RejectStale
        } else {
            OrderingPolicy::LastWriteWins
        };
        Self {
            base_url: args.base_url,
            filter: args.filter.parse().unwrap_or_default(),
            policy,
            log_file: args.log_file,
        }
    }
}

struct FetchDone {
    ticket: RefreshTicket,
    result: Result<Value, RefreshError>,
}

type DashboardTerminal = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from(Args::parse());
    init_logging(config.log_file.as_deref());
    info!(
        "dashboard_start: base_url={} filter={} policy={:?}",
        config.base_url, config.filter, config.policy
    );

    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(config.base_url.clone()));
    let mut app = App::new(Session::new(config.filter).with_policy(config.policy));

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout)).context("create terminal")?;

    let result = run(&mut terminal, &mut app, fetcher).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!("dashboard_stop");
    result
}

async fn run(terminal: &mut DashboardTerminal, app: &mut App, fetcher: Arc<dyn Fetcher>) -> Result<()> {
    let (done_tx, mut done_rx) = mpsc::channel::<FetchDone>(FETCH_QUEUE_CAPACITY);
    let mut events = EventStream::new();
    let mut clock = tokio::time::interval(CLOCK_INTERVAL);
    clock.set_missed_tick_behavior(MissedTickBehavior::Skip);
    app.session.start_timer();

    let mut timer_fired = false;
    let mut clock_due = false;
    let mut gesture_due = false;
    let mut finished: Option<FetchDone> = None;
    let mut input: Option<Event> = None;

    loop {
        if let Some(done) = finished.take() {
            app.finish_refresh(&done.ticket, done.result, Local::now());
        }
        if timer_fired {
            app.on_timer();
            timer_fired = false;
        }
        if clock_due {
            app.on_clock(Local::now());
            clock_due = false;
        }
        if gesture_due {
            app.on_gesture_deadline();
            gesture_due = false;
        }
        if let Some(event) = input.take() {
            if app.handle_input(event) {
                break;
            }
        }
        for ticket in app.take_tickets() {
            spawn_fetch(Arc::clone(&fetcher), ticket, done_tx.clone());
        }

        terminal.draw(|frame| ui::render(frame, app))?;
        let deadline = app.gesture_deadline();
        tokio::select! {
            _ = app.session.tick() => {
                timer_fired = true;
            }
            _ = clock.tick() => {
                clock_due = true;
            }
            _ = wait_until(deadline) => {
                gesture_due = true;
            }
            Some(done) = done_rx.recv() => {
                finished = Some(done);
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(event)) => input = Some(event),
                    Some(Err(err)) => warn!("input_error: {err}"),
                    None => break,
                }
            }
        }
    }

    app.session.stop_timer();
    Ok(())
}

/// Runs one fetch off the UI loop; the result is applied when it comes back.
fn spawn_fetch(fetcher: Arc<dyn Fetcher>, ticket: RefreshTicket, done_tx: mpsc::Sender<FetchDone>) {
    tokio::spawn(async move {
        let result = fetcher.fetch(&ticket.target()).await;
        if done_tx.send(FetchDone { ticket, result }).await.is_err() {
            warn!("fetch_result_dropped: dashboard loop closed");
        }
    });
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

fn init_logging(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
                return;
            }
            Err(err) => eprintln!("log_file_error: {err}"),
        }
    }
    if env_true("PULSE_LOG_STDOUT") {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .try_init();
    }
}

fn env_true(key: &str) -> bool {
    match std::env::var(key) {
        Ok(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_map_to_config() {
        let args = Args::parse_from([
            "pulse-dashboard",
            "--base-url",
            "http://agent.local:9000",
            "--filter",
            "Month",
            "--reject-stale",
        ]);
        let config = Config::from(args);
        assert_eq!(config.base_url, "http://agent.local:9000");
        assert_eq!(config.filter, Filter::Month);
        assert_eq!(config.policy, OrderingPolicy::RejectStale);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn unknown_filter_falls_back_to_today() {
        let config = Config::from(Args::parse_from(["pulse-dashboard", "--filter", "decade"]));
        assert_eq!(config.filter, Filter::Today);
        assert_eq!(config.policy, OrderingPolicy::LastWriteWins);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_wait_sleeps_until_the_instant() {
        let started = Instant::now();
        wait_until(Some(started + Duration::from_millis(500))).await;
        assert_eq!(started.elapsed(), Duration::from_millis(500));
    }
}
