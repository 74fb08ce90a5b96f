use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{BookingRecord, CellState, GridView, LocalSlot, Selection, SlotTime};
use crate::services::backend::{
    AvailabilitySlot, BulkAvailabilityRequest, CustomBlockRequest, NotFound,
};
use crate::services::reconciler::{GridError, Reconciler, Window};
use crate::state::AppState;

/// Which teacher, academy and week a grid request is about.
#[derive(Debug, Clone, Deserialize)]
pub struct GridScope {
    pub teacher_id: String,
    pub academy_id: String,
    pub start_date: NaiveDate,
    /// IANA zone name; falls back to the configured teacher timezone.
    #[serde(default)]
    pub timezone: Option<String>,
}

impl GridScope {
    pub fn timezone(&self, default: Tz) -> Result<Tz, AppError> {
        if self.teacher_id.trim().is_empty() {
            return Err(AppError::Validation("teacher_id is required".to_string()));
        }
        if self.academy_id.trim().is_empty() {
            return Err(AppError::Validation("academy_id is required".to_string()));
        }
        match self.timezone.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => name
                .parse()
                .map_err(|_| AppError::Validation(format!("unknown timezone: {name}"))),
            None => Ok(default),
        }
    }

    pub fn window(&self) -> Result<Window, AppError> {
        Window::new(self.start_date).ok_or_else(|| {
            AppError::Validation(format!("start_date {} is out of range", self.start_date))
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SaveReport {
    pub created: u32,
    pub skipped: u32,
    pub grid: Option<GridView>,
}

#[derive(Debug, Serialize)]
pub struct DeleteFailure {
    pub booking_id: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ClearDayReport {
    pub date: NaiveDate,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<DeleteFailure>,
    pub grid: Option<GridView>,
}

#[derive(Debug, Serialize)]
pub struct BlockReport {
    pub date: NaiveDate,
    pub blocked: Vec<SlotTime>,
    pub grid: Option<GridView>,
}

/// The teacher's bookings in the window, with records that belong to another
/// teacher dropped.
pub async fn week_bookings(
    state: &AppState,
    scope: &GridScope,
    window: Window,
    tz: &Tz,
) -> Result<Vec<BookingRecord>, AppError> {
    let (from, to) = window.utc_bounds(tz);
    let bookings = state
        .backend
        .teacher_bookings(&scope.teacher_id, from, to)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, teacher_id = %scope.teacher_id, "failed to fetch bookings");
            AppError::backend(e)
        })?;

    Ok(bookings
        .into_iter()
        .filter(|b| b.teacher_id.as_deref().map_or(true, |id| id == scope.teacher_id))
        .collect())
}

pub async fn load_grid(state: &AppState, scope: &GridScope) -> Result<Reconciler, AppError> {
    let tz = scope.timezone(state.config.timezone)?;
    let window = scope.window()?;

    let slots = async {
        state
            .backend
            .operating_slots(&scope.academy_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, academy_id = %scope.academy_id, "failed to fetch operating slots");
                AppError::backend(e)
            })
    };
    let (slots, bookings) = tokio::try_join!(slots, week_bookings(state, scope, window, &tz))?;

    tracing::debug!(
        teacher_id = %scope.teacher_id,
        academy_id = %scope.academy_id,
        start_date = %scope.start_date,
        slots = slots.len(),
        bookings = bookings.len(),
        "loaded availability grid"
    );

    Ok(Reconciler::new(window, tz, &scope.academy_id, &slots, &bookings))
}

/// Re-fetches the grid after a write. The write already happened, so a fetch
/// failure here is logged and the report goes out without a grid.
async fn refresh(state: &AppState, scope: &GridScope, pending: &Selection) -> Option<GridView> {
    match load_grid(state, scope).await {
        Ok(reconciler) => Some(reconciler.view(pending)),
        Err(e) => {
            tracing::warn!(error = %e, "failed to refresh grid after write");
            None
        }
    }
}

fn clean_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Persists the pending selection as AVAILABLE bookings in one bulk request.
/// Bookings are re-fetched first; if any pending slot has been taken by a
/// student since, nothing is saved.
pub async fn save_availability(
    state: &AppState,
    scope: &GridScope,
    pending: &Selection,
    notes: Option<&str>,
) -> Result<SaveReport, AppError> {
    if pending.is_empty() {
        return Err(GridError::EmptySelection.into());
    }

    let reconciler = load_grid(state, scope).await?;
    if let Err(e) = reconciler.validate_pending(pending) {
        if let GridError::PendingConflict { count } = e {
            tracing::warn!(
                teacher_id = %scope.teacher_id,
                conflicts = count,
                "pending slots were booked before save"
            );
        }
        return Err(e.into());
    }

    let duration = Duration::minutes(state.config.slot_duration_minutes);
    let professor_notes = clean_notes(notes);
    let slots = pending
        .iter()
        .map(|slot| {
            let start_at = reconciler.to_utc(&slot)?;
            Ok(AvailabilitySlot {
                start_at,
                end_at: start_at + duration,
                professor_notes: professor_notes.clone(),
            })
        })
        .collect::<Result<Vec<_>, GridError>>()?;

    let request = BulkAvailabilityRequest {
        source: state.config.booking_source.clone(),
        professor_id: scope.teacher_id.clone(),
        academy_id: scope.academy_id.clone(),
        slots,
    };
    let result = state
        .backend
        .create_availability(&request)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, teacher_id = %scope.teacher_id, "failed to save availability");
            AppError::backend(e)
        })?;

    tracing::info!(
        teacher_id = %scope.teacher_id,
        academy_id = %scope.academy_id,
        requested = request.slots.len(),
        created = result.created,
        skipped = result.skipped,
        "saved availability"
    );

    Ok(SaveReport {
        created: result.created,
        skipped: result.skipped,
        grid: refresh(state, scope, &Selection::new()).await,
    })
}

/// Deletes every saved AVAILABLE booking on `date`, one request per booking.
/// Failures are collected, not propagated. A day with nothing saved reports
/// zero counts.
pub async fn clear_day(
    state: &AppState,
    scope: &GridScope,
    date: NaiveDate,
    confirm: bool,
    pending: &Selection,
) -> Result<ClearDayReport, AppError> {
    if !confirm {
        return Err(AppError::Validation(format!(
            "clearing {date} requires confirmation"
        )));
    }

    let reconciler = load_grid(state, scope).await?;
    reconciler.ensure_in_window(date)?;

    let ids = reconciler.saved_available_on(date);
    let mut succeeded = 0;
    let mut failures = Vec::new();
    for booking_id in ids {
        match state.backend.delete_booking(&booking_id).await {
            Ok(()) => succeeded += 1,
            Err(e) => {
                tracing::warn!(error = %e, booking_id = %booking_id, "failed to delete availability");
                failures.push(DeleteFailure {
                    booking_id,
                    error: format!("{e:#}"),
                });
            }
        }
    }

    tracing::info!(
        teacher_id = %scope.teacher_id,
        %date,
        succeeded,
        failed = failures.len(),
        "cleared day"
    );

    Ok(ClearDayReport {
        date,
        succeeded,
        failed: failures.len(),
        failures,
        grid: refresh(state, scope, pending).await,
    })
}

pub async fn delete_booking(state: &AppState, booking_id: &str, confirm: bool) -> Result<(), AppError> {
    if booking_id.trim().is_empty() {
        return Err(AppError::Validation("booking id is required".to_string()));
    }
    if !confirm {
        return Err(AppError::Validation(format!(
            "deleting booking {booking_id} requires confirmation"
        )));
    }

    state
        .backend
        .delete_booking(booking_id)
        .await
        .map_err(|e| {
            if e.downcast_ref::<NotFound>().is_some() {
                tracing::warn!(booking_id, "booking to delete not found");
                return AppError::NotFound(format!("booking {booking_id}"));
            }
            tracing::error!(error = %e, booking_id, "failed to delete booking");
            AppError::backend(e)
        })?;

    tracing::info!(booking_id, "deleted booking");
    Ok(())
}

/// Marks hours of one day as unavailable. Hours already blocked are skipped;
/// closed or occupied hours reject the whole request.
pub async fn block_hours(
    state: &AppState,
    scope: &GridScope,
    date: NaiveDate,
    hours: &[SlotTime],
    notes: Option<&str>,
    pending: &Selection,
) -> Result<BlockReport, AppError> {
    if hours.is_empty() {
        return Err(AppError::Validation("no hours to block".to_string()));
    }

    let reconciler = load_grid(state, scope).await?;
    reconciler.ensure_in_window(date)?;

    let mut to_block = BTreeSet::new();
    for time in hours {
        let slot = LocalSlot::new(date, *time);
        match reconciler.classify(&slot, &Selection::new()) {
            CellState::Closed => return Err(GridError::SlotClosed { date, time: *time }.into()),
            CellState::Occupied { .. } => {
                return Err(GridError::SlotOccupied { date, time: *time }.into())
            }
            CellState::Blocked { .. } => {
                tracing::debug!(%date, %time, "hour already blocked");
            }
            CellState::PendingSelection | CellState::SavedAvailable { .. } | CellState::Open => {
                to_block.insert(*time);
            }
        }
    }
    if to_block.is_empty() {
        return Err(AppError::Validation(format!(
            "all requested hours on {date} are already blocked"
        )));
    }

    let request = CustomBlockRequest {
        academy_id: scope.academy_id.clone(),
        date,
        hours: to_block.iter().copied().collect(),
        notes: clean_notes(notes),
    };
    state
        .backend
        .block_hours(&scope.teacher_id, &request)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, teacher_id = %scope.teacher_id, "failed to block hours");
            AppError::backend(e)
        })?;

    tracing::info!(
        teacher_id = %scope.teacher_id,
        %date,
        hours = request.hours.len(),
        "blocked hours"
    );

    let mut pending = pending.clone();
    for time in &to_block {
        pending.remove(&LocalSlot::new(date, *time));
    }

    Ok(BlockReport {
        date,
        blocked: request.hours,
        grid: refresh(state, scope, &pending).await,
    })
}
