//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod auth;
pub mod extract;
pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/pomodoro-settings", get(get_settings_handler))
        .route("/pomodoro-timer-status", get(status_handler))
        .route("/pomodoro-update-settings", post(update_settings_handler))
        .route("/pomodoro-start", post(start_handler))
        .route("/pomodoro-stop", post(stop_handler))
        .route("/pomodoro-phase", post(change_phase_handler))
        .route("/pomodoro-auto-mode", post(auto_mode_handler))
        .route("/pomodoro-reset", post(reset_handler))
        .route("/stats", get(stats_handler))
        .route("/stats/update-streak", post(update_streak_handler))
        .route("/start-session", post(session_start_handler))
        .route("/end-session", post(session_end_handler))
        .route("/tasks", get(list_tasks_handler))
        .route("/tasks-create", post(create_task_handler))
        .route("/tasks/order", put(reorder_tasks_handler))
        .route("/task/update-title/:id", put(update_task_title_handler))
        .route("/task/update-description/:id", put(update_task_description_handler))
        .route("/task/complete/:id", put(complete_task_handler))
        .route("/task/delete/:id", delete(delete_task_handler))
        .route("/task/delete-all", delete(delete_all_tasks_handler))
        .route("/task/delete-completed", delete(delete_completed_tasks_handler))
        .route("/user-data", delete(delete_user_data_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
