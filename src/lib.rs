//! Pomodoro Server - per-user Pomodoro timers behind an HTTP API
//!
//! Each user owns one durable timer record. Starting a timer spawns a driver
//! loop that ticks once per second, moves through work and break phases, and
//! writes every tick back to storage. Usage streaks and a task list sit
//! alongside the timer.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::{StatsError, TaskError, TimerError};
pub use services::{OrphanPolicy, TaskService, TimerEngine};
pub use state::{AppState, Phase, TimerState};
pub use utils::signals::shutdown_signal;
