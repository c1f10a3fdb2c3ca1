use chrono::{DateTime, Local};
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use pulse_core::gesture::{apply_visuals, PullLabel};
use pulse_core::render::Content;
use pulse_core::timefmt::format_clock;
use pulse_core::view::{apply, region};
use pulse_core::{
    Filter, GestureController, GestureEffect, GestureEvent, RefreshError, RefreshOutcome,
    RefreshTicket, RefreshTrigger, RegionStore, Session,
};
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

/// Gesture distance per terminal row. Rows are coarse, so one row counts as
/// ten units and a drag of nine rows clears the pull threshold.
pub const UNITS_PER_ROW: f64 = 10.0;

pub struct App {
    pub session: Session,
    pub store: RegionStore,
    pub scroll: u16,
    pub in_flight: usize,
    pub last_outcome: Option<RefreshOutcome>,
    gesture: GestureController,
    gesture_ticket: Option<u64>,
    gesture_timer: Option<(Instant, GestureEvent)>,
    timer_ticks: u64,
    outbox: Vec<RefreshTicket>,
}

impl App {
    pub fn new(session: Session) -> Self {
        let mut store = RegionStore::dashboard();
        apply_visuals(
            &mut store,
            &[
                GestureEffect::SetTransform(0.0),
                GestureEffect::SetLabel(PullLabel::Pull),
            ],
        );
        Self {
            session,
            store,
            scroll: 0,
            in_flight: 0,
            last_outcome: None,
            gesture: GestureController::new(),
            gesture_ticket: None,
            gesture_timer: None,
            timer_ticks: 0,
            outbox: Vec::new(),
        }
    }

    /// Tickets started since the last call; the host runs their fetches.
    pub fn take_tickets(&mut self) -> Vec<RefreshTicket> {
        std::mem::take(&mut self.outbox)
    }

    pub fn gesture_deadline(&self) -> Option<Instant> {
        self.gesture_timer.map(|(at, _)| at)
    }

    fn start_refresh(&mut self, trigger: RefreshTrigger) -> u64 {
        let ticket = self.session.begin_refresh(trigger);
        let sequence = ticket.sequence;
        self.in_flight += 1;
        self.outbox.push(ticket);
        sequence
    }

    /// The first tick of the session timer is the startup refresh.
    pub fn on_timer(&mut self) {
        let trigger = if self.timer_ticks == 0 {
            RefreshTrigger::Startup
        } else {
            RefreshTrigger::Timer
        };
        self.timer_ticks += 1;
        self.start_refresh(trigger);
    }

    pub fn on_clock(&mut self, now: DateTime<Local>) {
        apply(
            &mut self.store,
            region::CURRENT_TIME,
            &Content::Text(format_clock(now)),
        );
    }

    pub fn on_gesture_deadline(&mut self) {
        if let Some((_, event)) = self.gesture_timer.take() {
            self.feed_gesture(event);
        }
    }

    pub fn finish_refresh(
        &mut self,
        ticket: &RefreshTicket,
        result: Result<Value, RefreshError>,
        now: DateTime<Local>,
    ) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let outcome = self
            .session
            .complete_refresh(ticket, result, &mut self.store, now);
        self.last_outcome = Some(outcome);
        if self.gesture_ticket == Some(ticket.sequence) {
            self.gesture_ticket = None;
            self.feed_gesture(GestureEvent::RefreshResolved);
        }
    }

    fn feed_gesture(&mut self, event: GestureEvent) {
        for effect in self.gesture.handle_with_view(event, &mut self.store) {
            match effect {
                GestureEffect::TriggerRefresh => {
                    let sequence = self.start_refresh(RefreshTrigger::Gesture);
                    self.gesture_ticket = Some(sequence);
                }
                GestureEffect::Schedule { after, event } => {
                    self.gesture_timer = Some((Instant::now() + after, event));
                }
                GestureEffect::SetTransform(_) | GestureEffect::SetLabel(_) => {}
            }
        }
    }

    /// Returns true when the dashboard should exit.
    pub fn handle_input(&mut self, event: Event) -> bool {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Mouse(mouse) => {
                self.handle_mouse(mouse);
                false
            }
            _ => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => true,
            KeyCode::Char(digit @ '1'..='4') => {
                let index = digit as usize - '1' as usize;
                self.select_filter(Filter::ALL[index]);
                false
            }
            KeyCode::Char('f') | KeyCode::Tab => {
                self.select_filter(self.session.filter().next());
                false
            }
            KeyCode::Char('c') => {
                let next = self.session.quick_filter().next();
                self.session.select_quick_filter(next, &mut self.store);
                false
            }
            KeyCode::Char('r') => {
                self.start_refresh(RefreshTrigger::Manual);
                false
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = self.scroll.saturating_add(1);
                false
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                false
            }
            _ => false,
        }
    }

    fn select_filter(&mut self, filter: Filter) {
        let ticket = self.session.select_filter(filter);
        self.in_flight += 1;
        self.outbox.push(ticket);
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollDown => self.scroll = self.scroll.saturating_add(1),
            MouseEventKind::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
            _ => {
                if let Some(event) = gesture_for(mouse, self.scroll) {
                    debug!("gesture_event: {event:?}");
                    self.feed_gesture(event);
                }
            }
        }
    }
}

/// Left-button press, drag and release stand in for touch start, move and end.
pub fn gesture_for(mouse: MouseEvent, scroll: u16) -> Option<GestureEvent> {
    let y = f64::from(mouse.row) * UNITS_PER_ROW;
    let scroll_offset = f64::from(scroll);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            Some(GestureEvent::TouchStart { y, scroll_offset })
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            Some(GestureEvent::TouchMove { y, scroll_offset })
        }
        MouseEventKind::Up(MouseButton::Left) => Some(GestureEvent::TouchEnd),
        _ => None,
    }
}
