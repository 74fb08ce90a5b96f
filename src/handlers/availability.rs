use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{GridView, LocalSlot, Selection, SlotTime, ToggleOutcome};
use crate::services::planner::{self, BlockReport, ClearDayReport, GridScope, SaveReport};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GridRequest {
    #[serde(flatten)]
    pub scope: GridScope,
    #[serde(default)]
    pub pending: Selection,
}

// POST /api/availability/grid
pub async fn get_grid(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GridRequest>,
) -> Result<Json<GridView>, AppError> {
    let reconciler = planner::load_grid(&state, &req.scope).await?;
    Ok(Json(reconciler.view(&req.pending)))
}

// POST /api/availability/toggle
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    #[serde(flatten)]
    pub grid: GridRequest,
    pub date: NaiveDate,
    pub time: SlotTime,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    #[serde(flatten)]
    outcome: ToggleOutcome,
    grid: GridView,
}

pub async fn toggle(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, AppError> {
    let reconciler = planner::load_grid(&state, &req.grid.scope).await?;
    let mut pending = req.grid.pending;

    let outcome = reconciler
        .toggle(&mut pending, LocalSlot::new(req.date, req.time))
        .inspect_err(|e| tracing::debug!(error = %e, "toggle rejected"))?;

    Ok(Json(ToggleResponse {
        outcome,
        grid: reconciler.view(&pending),
    }))
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    added: usize,
    grid: GridView,
}

// POST /api/availability/select-day
#[derive(Debug, Deserialize)]
pub struct SelectDayRequest {
    #[serde(flatten)]
    pub grid: GridRequest,
    pub date: NaiveDate,
}

pub async fn select_day(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectDayRequest>,
) -> Result<Json<SelectionResponse>, AppError> {
    let reconciler = planner::load_grid(&state, &req.grid.scope).await?;
    let mut pending = req.grid.pending;

    let added = reconciler.select_day(&mut pending, req.date)?;

    Ok(Json(SelectionResponse {
        added,
        grid: reconciler.view(&pending),
    }))
}

// POST /api/availability/select-time
#[derive(Debug, Deserialize)]
pub struct SelectTimeRequest {
    #[serde(flatten)]
    pub grid: GridRequest,
    pub time: SlotTime,
}

pub async fn select_time(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectTimeRequest>,
) -> Result<Json<SelectionResponse>, AppError> {
    let reconciler = planner::load_grid(&state, &req.grid.scope).await?;
    let mut pending = req.grid.pending;

    let added = reconciler.select_time(&mut pending, req.time)?;

    Ok(Json(SelectionResponse {
        added,
        grid: reconciler.view(&pending),
    }))
}

// POST /api/availability/save
#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    #[serde(flatten)]
    pub grid: GridRequest,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn save(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveRequest>,
) -> Result<Json<SaveReport>, AppError> {
    let report = planner::save_availability(
        &state,
        &req.grid.scope,
        &req.grid.pending,
        req.notes.as_deref(),
    )
    .await?;
    Ok(Json(report))
}

// POST /api/availability/clear-day
#[derive(Debug, Deserialize)]
pub struct ClearDayRequest {
    #[serde(flatten)]
    pub grid: GridRequest,
    pub date: NaiveDate,
    #[serde(default)]
    pub confirm: bool,
}

pub async fn clear_day(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClearDayRequest>,
) -> Result<Json<ClearDayReport>, AppError> {
    let report = planner::clear_day(
        &state,
        &req.grid.scope,
        req.date,
        req.confirm,
        &req.grid.pending,
    )
    .await?;
    Ok(Json(report))
}

// POST /api/availability/block
#[derive(Debug, Deserialize)]
pub struct BlockRequest {
    #[serde(flatten)]
    pub grid: GridRequest,
    pub date: NaiveDate,
    pub hours: Vec<SlotTime>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn block(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BlockRequest>,
) -> Result<Json<BlockReport>, AppError> {
    let report = planner::block_hours(
        &state,
        &req.grid.scope,
        req.date,
        &req.hours,
        req.notes.as_deref(),
        &req.grid.pending,
    )
    .await?;
    Ok(Json(report))
}

// DELETE /api/availability/bookings/:id
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    planner::delete_booking(&state, &id, query.confirm).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}
