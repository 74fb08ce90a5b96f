use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::errors::AppError;
use crate::models::LocalSlot;
use crate::services::calendar::generate_week_ics;
use crate::services::planner::{self, GridScope};
use crate::state::AppState;

// GET /api/availability/calendar.ics
pub async fn calendar_feed(
    State(state): State<Arc<AppState>>,
    Query(scope): Query<GridScope>,
) -> Result<Response, AppError> {
    let tz = scope.timezone(state.config.timezone)?;
    let window = scope.window()?;

    let bookings: Vec<_> = planner::week_bookings(&state, &scope, window, &tz)
        .await?
        .into_iter()
        .filter(|b| b.academy_id.as_deref().map_or(true, |id| id == scope.academy_id))
        .filter(|b| window.contains(LocalSlot::from_instant(b.start_at, &tz).date))
        .collect();

    let ics = generate_week_ics(
        &bookings,
        &state.config.calendar_name,
        state.config.slot_duration_minutes,
        chrono::Utc::now(),
    );

    let teacher: String = scope
        .teacher_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let filename = format!("agenda-{teacher}-{}.ics", scope.start_date);

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
