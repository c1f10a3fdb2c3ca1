//! Pull-to-refresh as an explicit state machine.
//!
//! [`transition`] is pure: it takes the current state and one event and
//! returns the next state plus the effects the host must carry out (move the
//! indicator, change its label, start a refresh, arm a timer). The host feeds
//! [`GestureEvent::RefreshResolved`] back once the refresh it started has
//! finished, and the scheduled timer events when they fire.

use crate::view::{region, Regions};
use std::time::Duration;

pub const PULL_THRESHOLD: f64 = 80.0;
pub const MAX_PULL: f64 = 150.0;
pub const PULL_RATE: f64 = 0.5;
pub const COMPLETE_DELAY: Duration = Duration::from_millis(500);
pub const RESET_DELAY: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullLabel {
    Pull,
    Release,
    Refreshing,
    Complete,
}

impl PullLabel {
    pub fn text(self) -> &'static str {
        match self {
            PullLabel::Pull => "↓ pull to refresh",
            PullLabel::Release => "↑ release to refresh",
            PullLabel::Refreshing => "⟳ refreshing...",
            PullLabel::Complete => "✓ refresh complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    TouchStart { y: f64, scroll_offset: f64 },
    TouchMove { y: f64, scroll_offset: f64 },
    TouchEnd,
    RefreshResolved,
    CompleteElapsed,
    ResetElapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    InFlight,
    Settling,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Tracking {
        start_y: f64,
        displacement: f64,
    },
    /// Displacement is past the threshold; releasing now refreshes.
    Armed {
        start_y: f64,
        displacement: f64,
    },
    Refreshing(RefreshPhase),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEffect {
    SetTransform(f64),
    SetLabel(PullLabel),
    TriggerRefresh,
    Schedule { after: Duration, event: GestureEvent },
}

fn reset_effects() -> Vec<GestureEffect> {
    vec![
        GestureEffect::SetTransform(0.0),
        GestureEffect::SetLabel(PullLabel::Pull),
    ]
}

fn pulled(start_y: f64, displacement: f64) -> GestureState {
    if displacement > PULL_THRESHOLD {
        GestureState::Armed {
            start_y,
            displacement,
        }
    } else {
        GestureState::Tracking {
            start_y,
            displacement,
        }
    }
}

pub fn transition(state: GestureState, event: GestureEvent) -> (GestureState, Vec<GestureEffect>) {
    use GestureEvent as E;
    use GestureState as S;

    match (state, event) {
        (S::Idle, E::TouchStart { y, scroll_offset }) if scroll_offset == 0.0 => (
            S::Tracking {
                start_y: y,
                displacement: 0.0,
            },
            Vec::new(),
        ),

        (
            S::Tracking { start_y, .. } | S::Armed { start_y, .. },
            E::TouchMove { y, scroll_offset },
        ) => {
            if scroll_offset != 0.0 {
                return (S::Idle, reset_effects());
            }
            let displacement = y - start_y;
            let mut effects = Vec::new();
            if displacement > 0.0 && displacement < MAX_PULL {
                effects.push(GestureEffect::SetTransform(displacement * PULL_RATE));
                effects.push(GestureEffect::SetLabel(if displacement > PULL_THRESHOLD {
                    PullLabel::Release
                } else {
                    PullLabel::Pull
                }));
            }
            (pulled(start_y, displacement), effects)
        }

        (S::Armed { .. }, E::TouchEnd) => (
            S::Refreshing(RefreshPhase::InFlight),
            vec![
                GestureEffect::SetTransform(PULL_THRESHOLD * PULL_RATE),
                GestureEffect::SetLabel(PullLabel::Refreshing),
                GestureEffect::TriggerRefresh,
            ],
        ),
        (S::Tracking { .. }, E::TouchEnd) => (S::Idle, reset_effects()),

        (S::Refreshing(RefreshPhase::InFlight), E::RefreshResolved) => (
            S::Refreshing(RefreshPhase::Settling),
            vec![GestureEffect::Schedule {
                after: COMPLETE_DELAY,
                event: E::CompleteElapsed,
            }],
        ),
        (S::Refreshing(RefreshPhase::Settling), E::CompleteElapsed) => (
            S::Refreshing(RefreshPhase::Completed),
            vec![
                GestureEffect::SetLabel(PullLabel::Complete),
                GestureEffect::Schedule {
                    after: RESET_DELAY,
                    event: E::ResetElapsed,
                },
            ],
        ),
        (S::Refreshing(RefreshPhase::Completed), E::ResetElapsed) => (S::Idle, reset_effects()),

        // A new pull supersedes a refresh that never resolved.
        (S::Refreshing(_), E::TouchStart { y, scroll_offset }) if scroll_offset == 0.0 => (
            S::Tracking {
                start_y: y,
                displacement: 0.0,
            },
            Vec::new(),
        ),

        (state, _) => (state, Vec::new()),
    }
}

/// Holds the gesture state between events.
#[derive(Debug, Clone, Default)]
pub struct GestureController {
    state: GestureState,
}

impl GestureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn handle(&mut self, event: GestureEvent) -> Vec<GestureEffect> {
        let (next, effects) = transition(self.state, event);
        self.state = next;
        effects
    }

    /// Applies the visual effects to the pull indicator region and returns
    /// the ones the host has to act on.
    pub fn handle_with_view(
        &mut self,
        event: GestureEvent,
        regions: &mut dyn Regions,
    ) -> Vec<GestureEffect> {
        let effects = self.handle(event);
        apply_visuals(regions, &effects);
        effects
            .into_iter()
            .filter(|effect| {
                matches!(
                    effect,
                    GestureEffect::TriggerRefresh | GestureEffect::Schedule { .. }
                )
            })
            .collect()
    }
}

pub fn apply_visuals(regions: &mut dyn Regions, effects: &[GestureEffect]) {
    let Some(indicator) = regions.get(region::PULL_INDICATOR) else {
        return;
    };
    for effect in effects {
        match effect {
            GestureEffect::SetTransform(offset) => indicator.set_transform(*offset),
            GestureEffect::SetLabel(label) => indicator.set_text(label.text()),
            GestureEffect::TriggerRefresh | GestureEffect::Schedule { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::RegionStore;

    fn start(y: f64) -> GestureEvent {
        GestureEvent::TouchStart { y, scroll_offset: 0.0 }
    }

    fn move_to(y: f64) -> GestureEvent {
        GestureEvent::TouchMove { y, scroll_offset: 0.0 }
    }

    fn run(events: &[GestureEvent]) -> (GestureController, Vec<GestureEffect>) {
        let mut controller = GestureController::new();
        let mut effects = Vec::new();
        for event in events {
            effects.extend(controller.handle(*event));
        }
        (controller, effects)
    }

    fn refreshes(effects: &[GestureEffect]) -> usize {
        effects
            .iter()
            .filter(|effect| **effect == GestureEffect::TriggerRefresh)
            .count()
    }

    #[test]
    fn pull_past_threshold_triggers_exactly_one_refresh() {
        let (controller, effects) = run(&[start(0.0), move_to(45.0), move_to(90.0), GestureEvent::TouchEnd]);
        assert_eq!(refreshes(&effects), 1);
        assert_eq!(
            controller.state(),
            GestureState::Refreshing(RefreshPhase::InFlight)
        );
        assert!(effects.contains(&GestureEffect::SetTransform(45.0)));
        assert!(effects.contains(&GestureEffect::SetLabel(PullLabel::Release)));
    }

    #[test]
    fn short_pull_resets_without_refresh() {
        let (controller, effects) = run(&[start(0.0), move_to(60.0), GestureEvent::TouchEnd]);
        assert_eq!(refreshes(&effects), 0);
        assert_eq!(controller.state(), GestureState::Idle);
        assert_eq!(effects.last(), Some(&GestureEffect::SetLabel(PullLabel::Pull)));
        assert!(effects.contains(&GestureEffect::SetTransform(0.0)));
    }

    #[test]
    fn exactly_threshold_is_not_armed() {
        let (_, effects) = run(&[start(10.0), move_to(90.0), GestureEvent::TouchEnd]);
        assert_eq!(refreshes(&effects), 0);
    }

    #[test]
    fn touch_start_while_scrolled_is_ignored() {
        let mut controller = GestureController::new();
        let effects = controller.handle(GestureEvent::TouchStart {
            y: 0.0,
            scroll_offset: 12.0,
        });
        assert!(effects.is_empty());
        controller.handle(move_to(120.0));
        let effects = controller.handle(GestureEvent::TouchEnd);
        assert!(effects.is_empty());
        assert_eq!(controller.state(), GestureState::Idle);
    }

    #[test]
    fn scrolling_mid_gesture_aborts() {
        let (controller, effects) = run(&[
            start(0.0),
            move_to(100.0),
            GestureEvent::TouchMove {
                y: 110.0,
                scroll_offset: 3.0,
            },
            GestureEvent::TouchEnd,
        ]);
        assert_eq!(refreshes(&effects), 0);
        assert_eq!(controller.state(), GestureState::Idle);
    }

    #[test]
    fn moving_back_below_threshold_disarms() {
        let (controller, effects) = run(&[start(0.0), move_to(100.0), move_to(40.0)]);
        assert_eq!(
            controller.state(),
            GestureState::Tracking {
                start_y: 0.0,
                displacement: 40.0
            }
        );
        assert_eq!(effects.last(), Some(&GestureEffect::SetLabel(PullLabel::Pull)));
    }

    #[test]
    fn drag_beyond_max_keeps_indicator_but_still_arms() {
        let (controller, effects) = run(&[start(0.0), move_to(200.0)]);
        assert!(effects.is_empty());
        assert!(matches!(controller.state(), GestureState::Armed { .. }));
    }

    #[test]
    fn completion_feedback_runs_on_timers_then_resets() {
        let (mut controller, _) = run(&[start(0.0), move_to(95.0), GestureEvent::TouchEnd]);

        let effects = controller.handle(GestureEvent::RefreshResolved);
        assert_eq!(
            effects,
            vec![GestureEffect::Schedule {
                after: COMPLETE_DELAY,
                event: GestureEvent::CompleteElapsed
            }]
        );
        let effects = controller.handle(GestureEvent::CompleteElapsed);
        assert_eq!(effects[0], GestureEffect::SetLabel(PullLabel::Complete));
        let effects = controller.handle(GestureEvent::ResetElapsed);
        assert_eq!(effects, reset_effects());
        assert_eq!(controller.state(), GestureState::Idle);
    }

    #[test]
    fn pull_again_after_unresolved_refresh_triggers_again() {
        let (mut controller, effects) = run(&[start(0.0), move_to(90.0), GestureEvent::TouchEnd]);
        assert_eq!(refreshes(&effects), 1);

        let mut again = Vec::new();
        for event in [start(0.0), move_to(120.0), GestureEvent::TouchEnd] {
            again.extend(controller.handle(event));
        }
        assert_eq!(refreshes(&again), 1);
        assert_eq!(
            controller.state(),
            GestureState::Refreshing(RefreshPhase::InFlight)
        );
    }

    #[test]
    fn scrolled_touch_does_not_interrupt_refresh() {
        let (mut controller, _) = run(&[start(0.0), move_to(95.0), GestureEvent::TouchEnd]);
        let effects = controller.handle(GestureEvent::TouchStart {
            y: 0.0,
            scroll_offset: 8.0,
        });
        assert!(effects.is_empty());
        assert_eq!(
            controller.state(),
            GestureState::Refreshing(RefreshPhase::InFlight)
        );
    }

    #[test]
    fn stray_refresh_events_outside_their_phase_are_ignored() {
        let (mut controller, _) = run(&[start(0.0), move_to(30.0)]);
        let tracking = controller.state();
        for event in [
            GestureEvent::RefreshResolved,
            GestureEvent::CompleteElapsed,
            GestureEvent::ResetElapsed,
        ] {
            assert!(controller.handle(event).is_empty());
            assert_eq!(controller.state(), tracking);
        }

        let (mut controller, _) = run(&[start(0.0), move_to(95.0), GestureEvent::TouchEnd]);
        assert!(controller.handle(GestureEvent::CompleteElapsed).is_empty());
        assert!(controller.handle(GestureEvent::ResetElapsed).is_empty());
        assert_eq!(
            controller.state(),
            GestureState::Refreshing(RefreshPhase::InFlight)
        );
    }

    #[test]
    fn visuals_land_in_the_pull_indicator_region() {
        let mut store = RegionStore::dashboard();
        let mut controller = GestureController::new();
        controller.handle_with_view(start(0.0), &mut store);
        controller.handle_with_view(move_to(100.0), &mut store);
        let indicator = store.view(region::PULL_INDICATOR).expect("indicator");
        assert_eq!(indicator.transform, 50.0);
        assert_eq!(indicator.text, PullLabel::Release.text());

        let pending = controller.handle_with_view(GestureEvent::TouchEnd, &mut store);
        assert_eq!(pending, vec![GestureEffect::TriggerRefresh]);
        let indicator = store.view(region::PULL_INDICATOR).expect("indicator");
        assert_eq!(indicator.text, PullLabel::Refreshing.text());
    }
}
