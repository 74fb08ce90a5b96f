pub mod http;
pub mod wire;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{BookingRecord, OperatingSlot, SlotTime};

/// The backend answered 404 for a record. Other failures stay plain
/// `anyhow` errors; callers that care downcast to this.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct NotFound(pub String);

/// The platform's REST backend, as seen by the availability planner.
#[async_trait]
pub trait BookingBackend: Send + Sync {
    async fn operating_slots(&self, academy_id: &str) -> anyhow::Result<Vec<OperatingSlot>>;

    async fn teacher_bookings(
        &self,
        teacher_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<BookingRecord>>;

    async fn create_availability(
        &self,
        request: &BulkAvailabilityRequest,
    ) -> anyhow::Result<BulkAvailabilityResult>;

    async fn delete_booking(&self, booking_id: &str) -> anyhow::Result<()>;

    async fn block_hours(&self, teacher_id: &str, request: &CustomBlockRequest) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAvailabilityRequest {
    pub source: String,
    pub professor_id: String,
    pub academy_id: String,
    pub slots: Vec<AvailabilitySlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub professor_notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkAvailabilityResult {
    #[serde(default)]
    pub created: u32,
    #[serde(default)]
    pub skipped: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomBlockRequest {
    pub academy_id: String,
    pub date: NaiveDate,
    pub hours: Vec<SlotTime>,
    pub notes: Option<String>,
}
