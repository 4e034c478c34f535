//! Per-user timer record and phase enumeration

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of the user owning a timer record
pub type UserId = u64;

pub const DEFAULT_POMODORO_MINUTES: u32 = 25;
pub const DEFAULT_SHORT_BREAK_MINUTES: u32 = 5;
pub const DEFAULT_LONG_BREAK_MINUTES: u32 = 15;

/// The three timer modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Pomodoro,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pomodoro => "pomodoro",
            Phase::ShortBreak => "shortBreak",
            Phase::LongBreak => "longBreak",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pomodoro" => Ok(Phase::Pomodoro),
            "shortBreak" => Ok(Phase::ShortBreak),
            "longBreak" => Ok(Phase::LongBreak),
            other => Err(format!("unknown phase '{}'", other)),
        }
    }
}

/// Durable timer state, one record per user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub user_id: UserId,
    /// Phase lengths in minutes
    pub pomodoro_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    pub current_phase: Phase,
    /// Seconds left in the current phase
    pub remaining_time: u32,
    pub is_running: bool,
    pub auto_transition: bool,
    /// Work phases completed since the last reset
    pub completed_pomodoros: u32,
    pub total_completed_pomodoros: u32,
    pub updated_at: DateTime<Utc>,
}

impl TimerState {
    /// Create a stopped timer with default durations, ready for a full work phase
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            pomodoro_duration: DEFAULT_POMODORO_MINUTES,
            short_break_duration: DEFAULT_SHORT_BREAK_MINUTES,
            long_break_duration: DEFAULT_LONG_BREAK_MINUTES,
            current_phase: Phase::Pomodoro,
            remaining_time: DEFAULT_POMODORO_MINUTES * 60,
            is_running: false,
            auto_transition: false,
            completed_pomodoros: 0,
            total_completed_pomodoros: 0,
            updated_at: Utc::now(),
        }
    }

    /// Configured length of `phase` in minutes
    pub fn duration_minutes(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Pomodoro => self.pomodoro_duration,
            Phase::ShortBreak => self.short_break_duration,
            Phase::LongBreak => self.long_break_duration,
        }
    }

    /// Full length of `phase` in seconds
    pub fn phase_seconds(&self, phase: Phase) -> u32 {
        self.duration_minutes(phase).saturating_mul(60)
    }

    /// Switch to `phase` with a full countdown. No-op if already in it.
    pub fn switch_phase(&mut self, phase: Phase) -> bool {
        if self.current_phase == phase {
            return false;
        }
        self.current_phase = phase;
        self.remaining_time = self.phase_seconds(phase);
        true
    }

    /// Keep `remaining_time` within the current phase's length
    pub fn clamp_remaining(&mut self) {
        let max = self.phase_seconds(self.current_phase);
        if self.remaining_time > max {
            self.remaining_time = max;
        }
    }

    pub fn status(&self) -> TimerStatus {
        TimerStatus {
            remaining_time: self.remaining_time,
            is_running: self.is_running,
            current_phase: self.current_phase,
            completed_pomodoros: self.completed_pomodoros,
            total_completed_pomodoros: self.total_completed_pomodoros,
            auto_transition: self.auto_transition,
        }
    }
}

/// Read-only snapshot returned by status queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatus {
    pub remaining_time: u32,
    pub is_running: bool,
    pub current_phase: Phase,
    pub completed_pomodoros: u32,
    pub total_completed_pomodoros: u32,
    pub auto_transition: bool,
}

/// Duration and auto-transition fields accepted by a settings update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    #[serde(rename = "pomodoro")]
    pub pomodoro_duration: u32,
    #[serde(rename = "shortBreak")]
    pub short_break_duration: u32,
    #[serde(rename = "longBreak")]
    pub long_break_duration: u32,
    #[serde(default)]
    pub auto_transition: bool,
}

impl TimerSettings {
    /// Longest phase a user may configure (one day)
    pub const MAX_MINUTES: u32 = 24 * 60;

    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("pomodoro", self.pomodoro_duration),
            ("shortBreak", self.short_break_duration),
            ("longBreak", self.long_break_duration),
        ] {
            if value == 0 || value > Self::MAX_MINUTES {
                return Err(format!(
                    "{} must be between 1 and {} minutes, got {}",
                    name,
                    Self::MAX_MINUTES,
                    value
                ));
            }
        }
        Ok(())
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            pomodoro_duration: DEFAULT_POMODORO_MINUTES,
            short_break_duration: DEFAULT_SHORT_BREAK_MINUTES,
            long_break_duration: DEFAULT_LONG_BREAK_MINUTES,
            auto_transition: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_starts_with_a_full_work_phase() {
        let state = TimerState::new(7);
        assert_eq!(state.current_phase, Phase::Pomodoro);
        assert_eq!(state.remaining_time, 1500);
        assert!(!state.is_running);
    }

    #[test]
    fn switching_to_the_current_phase_changes_nothing() {
        let mut state = TimerState::new(1);
        state.remaining_time = 42;
        assert!(!state.switch_phase(Phase::Pomodoro));
        assert_eq!(state.remaining_time, 42);

        assert!(state.switch_phase(Phase::LongBreak));
        assert_eq!(state.remaining_time, 900);
    }

    #[test]
    fn clamp_caps_remaining_time_at_phase_length() {
        let mut state = TimerState::new(1);
        state.pomodoro_duration = 10;
        state.clamp_remaining();
        assert_eq!(state.remaining_time, 600);
    }

    #[test]
    fn phase_round_trips_through_its_wire_name() {
        for phase in [Phase::Pomodoro, Phase::ShortBreak, Phase::LongBreak] {
            assert_eq!(phase.as_str().parse::<Phase>(), Ok(phase));
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(json, format!("\"{}\"", phase.as_str()));
        }
        assert!("break".parse::<Phase>().is_err());
    }

    #[test]
    fn settings_reject_zero_and_oversized_durations() {
        assert!(TimerSettings::default().validate().is_ok());
        let zero = TimerSettings { short_break_duration: 0, ..Default::default() };
        assert!(zero.validate().is_err());
        let huge = TimerSettings { long_break_duration: 2000, ..Default::default() };
        assert!(huge.validate().is_err());
    }
}
