//! Timer engine and supporting services
//!
//! This module contains the per-user timer engine, the concurrency guard it
//! relies on, and the usage stats and task list services.

pub mod guard;
pub mod stats;
pub mod tasks;
pub mod timer_engine;

// Re-export main types
pub use guard::{DriverRegistry, UserLocks};
pub use stats::{StatsService, StatsSummary};
pub use tasks::TaskService;
pub use timer_engine::{Countdown, OrphanPolicy, ReconcileReport, TimerEngine};
