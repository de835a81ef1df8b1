pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::coach::handlers as coach;
use crate::scan::handlers as scan;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Coach API
        .route(
            "/api/v1/coach/history",
            get(coach::handle_get_history).delete(coach::handle_clear_history),
        )
        .route("/api/v1/coach/starters", get(coach::handle_starters))
        .route("/api/v1/coach/messages", post(coach::handle_send_message))
        // Scan API
        .route(
            "/api/v1/session",
            get(scan::handle_get_session)
                .put(scan::handle_save_session)
                .delete(scan::handle_clear_session),
        )
        .route("/api/v1/scans", post(scan::handle_scan))
        .with_state(state)
}
