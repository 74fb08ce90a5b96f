use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // The dashboards are served from other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/availability/grid", post(handlers::availability::get_grid))
        .route("/api/availability/toggle", post(handlers::availability::toggle))
        .route(
            "/api/availability/select-day",
            post(handlers::availability::select_day),
        )
        .route(
            "/api/availability/select-time",
            post(handlers::availability::select_time),
        )
        .route("/api/availability/save", post(handlers::availability::save))
        .route(
            "/api/availability/clear-day",
            post(handlers::availability::clear_day),
        )
        .route("/api/availability/block", post(handlers::availability::block))
        .route(
            "/api/availability/bookings/:id",
            delete(handlers::availability::delete_booking),
        )
        .route(
            "/api/availability/calendar.ics",
            get(handlers::calendar::calendar_feed),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
