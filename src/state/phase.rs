//! Phase state machine
//!
//! Pure functions deciding what a timer looks like after a tick or after its
//! current phase expires. Callers persist the result.

use super::timer_state::{Phase, TimerState};

/// Every n-th completed work phase is followed by a long break
pub const LONG_BREAK_INTERVAL: u32 = 4;

/// What a single tick did to the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// One second was counted down
    Counted,
    /// The phase expired and the timer moved on
    Advanced { from: Phase, to: Phase },
}

/// Move an expired timer into its next phase.
///
/// Performs exactly one transition regardless of the configured durations.
pub fn advance_phase(state: &TimerState) -> TimerState {
    let mut next = state.clone();

    let phase = match state.current_phase {
        Phase::Pomodoro => {
            next.completed_pomodoros = next.completed_pomodoros.saturating_add(1);
            next.total_completed_pomodoros = next.total_completed_pomodoros.saturating_add(1);
            if next.completed_pomodoros % LONG_BREAK_INTERVAL == 0 {
                Phase::LongBreak
            } else {
                Phase::ShortBreak
            }
        }
        Phase::ShortBreak | Phase::LongBreak => Phase::Pomodoro,
    };

    next.current_phase = phase;
    next.remaining_time = next.phase_seconds(phase);
    next.is_running = state.auto_transition;
    next
}

/// Apply one second of countdown.
///
/// An already expired timer advances immediately; otherwise the timer counts
/// down and advances on the tick that brings it to zero.
pub fn tick(state: &TimerState) -> (TimerState, TickOutcome) {
    if state.remaining_time == 0 {
        return expire(state);
    }

    let mut next = state.clone();
    next.remaining_time -= 1;
    if next.remaining_time == 0 {
        return expire(&next);
    }
    (next, TickOutcome::Counted)
}

fn expire(state: &TimerState) -> (TimerState, TickOutcome) {
    let next = advance_phase(state);
    let outcome = TickOutcome::Advanced {
        from: state.current_phase,
        to: next.current_phase,
    };
    (next, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expired(phase: Phase, completed: u32) -> TimerState {
        let mut state = TimerState::new(1);
        state.current_phase = phase;
        state.remaining_time = 0;
        state.completed_pomodoros = completed;
        state.total_completed_pomodoros = completed + 10;
        state
    }

    #[test]
    fn every_fourth_pomodoro_earns_a_long_break() {
        let mut state = expired(Phase::Pomodoro, 0);
        for n in 1..=12 {
            state = advance_phase(&state);
            let expected = if n % 4 == 0 { Phase::LongBreak } else { Phase::ShortBreak };
            assert_eq!(state.current_phase, expected, "completion #{}", n);
            assert_eq!(state.completed_pomodoros, n);

            // back to work, then expire it again
            state = advance_phase(&state);
            assert_eq!(state.current_phase, Phase::Pomodoro);
            state.remaining_time = 0;
        }
    }

    #[test]
    fn fourth_completion_goes_to_long_break() {
        let next = advance_phase(&expired(Phase::Pomodoro, 3));
        assert_eq!(next.completed_pomodoros, 4);
        assert_eq!(next.total_completed_pomodoros, 14);
        assert_eq!(next.current_phase, Phase::LongBreak);
        assert_eq!(next.remaining_time, 900);
    }

    #[test]
    fn breaks_return_to_work_without_counting() {
        for phase in [Phase::ShortBreak, Phase::LongBreak] {
            let next = advance_phase(&expired(phase, 2));
            assert_eq!(next.current_phase, Phase::Pomodoro);
            assert_eq!(next.remaining_time, 1500);
            assert_eq!(next.completed_pomodoros, 2);
            assert_eq!(next.total_completed_pomodoros, 12);
        }
    }

    #[test]
    fn running_flag_follows_auto_transition() {
        let mut state = expired(Phase::Pomodoro, 0);
        state.is_running = true;

        state.auto_transition = false;
        assert!(!advance_phase(&state).is_running);

        state.auto_transition = true;
        assert!(advance_phase(&state).is_running);
    }

    #[test]
    fn zero_durations_still_make_exactly_one_transition() {
        let mut state = expired(Phase::Pomodoro, 0);
        state.pomodoro_duration = 0;
        state.short_break_duration = 0;
        state.long_break_duration = 0;

        let (next, outcome) = tick(&state);
        assert_eq!(
            outcome,
            TickOutcome::Advanced { from: Phase::Pomodoro, to: Phase::ShortBreak }
        );
        assert_eq!(next.remaining_time, 0);

        let (next, _) = tick(&next);
        assert_eq!(next.current_phase, Phase::Pomodoro);
        assert_eq!(next.completed_pomodoros, 1);
    }

    #[test]
    fn tick_counts_down_then_advances_on_reaching_zero() {
        let mut state = TimerState::new(1);
        state.remaining_time = 2;

        let (state, outcome) = tick(&state);
        assert_eq!(outcome, TickOutcome::Counted);
        assert_eq!(state.remaining_time, 1);

        let (state, outcome) = tick(&state);
        assert!(matches!(outcome, TickOutcome::Advanced { to: Phase::ShortBreak, .. }));
        assert_eq!(state.remaining_time, 300);
    }
}
