//! State management module
//!
//! This module contains the persisted per-user records (timer, stats and
//! tasks), the pure phase state machine, and the shared application state
//! handed to HTTP handlers.

pub mod app_state;
pub mod phase;
pub mod stats_state;
pub mod task_state;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, PruneReport};
pub use phase::{advance_phase, TickOutcome, LONG_BREAK_INTERVAL};
pub use stats_state::{UserStats, VisitOutcome};
pub use task_state::{LocalId, NewTask, Task, TaskFilter, TaskOrder};
pub use timer_state::{Phase, TimerSettings, TimerState, TimerStatus, UserId};
