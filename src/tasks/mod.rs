//! Background tasks module
//!
//! Timer driver loops (one per running user) and the orphan sweep run
//! alongside the HTTP server.

pub mod orphan_sweep;
pub mod timer_driver;

// Re-export main functions
pub use orphan_sweep::orphan_sweep_task;
pub use timer_driver::{timer_driver_task, Halt};
