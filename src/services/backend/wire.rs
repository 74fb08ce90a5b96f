//! Normalization of backend payloads.
//!
//! The backend mixes camelCase and snake_case field names and is loose about
//! id and timestamp formats. Everything is converted here into the crate's
//! domain records; records that cannot be understood are skipped with a
//! warning instead of failing the whole response.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::models::{BookingRecord, BookingStatus, OperatingSlot, SlotTime};

#[derive(Debug, Deserialize)]
pub struct SlotsEnvelope {
    #[serde(default, alias = "timeSlots", alias = "time_slots")]
    pub slots: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct BookingsEnvelope {
    #[serde(default)]
    pub bookings: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(i64),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            WireId::Text(s) => s,
            WireId::Number(n) => n.to_string(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct WireOperatingSlot {
    #[serde(default, alias = "academyId", alias = "unit_id", alias = "unitId")]
    academy_id: Option<WireId>,
    #[serde(alias = "dayOfWeek")]
    day_of_week: u8,
    #[serde(alias = "slot_time", alias = "slotTime")]
    time: String,
    #[serde(default = "default_true", alias = "isAvailable")]
    is_available: bool,
}

#[derive(Debug, Deserialize)]
struct WireBooking {
    id: WireId,
    #[serde(default, alias = "academyId", alias = "unit_id", alias = "unitId")]
    academy_id: Option<WireId>,
    #[serde(
        default,
        alias = "teacherId",
        alias = "professor_id",
        alias = "professorId"
    )]
    teacher_id: Option<WireId>,
    #[serde(default, alias = "studentId")]
    student_id: Option<WireId>,
    #[serde(alias = "start_at", alias = "startAt", alias = "date_time")]
    date: String,
    status: String,
}

pub fn parse_operating_slot(value: serde_json::Value) -> anyhow::Result<OperatingSlot> {
    let wire: WireOperatingSlot = serde_json::from_value(value)?;
    anyhow::ensure!(
        wire.day_of_week <= 6,
        "day of week out of range: {}",
        wire.day_of_week
    );
    Ok(OperatingSlot {
        academy_id: wire.academy_id.map(WireId::into_string),
        day_of_week: wire.day_of_week,
        time: SlotTime::parse(&wire.time)?,
        is_available: wire.is_available,
    })
}

pub fn parse_booking(value: serde_json::Value) -> anyhow::Result<BookingRecord> {
    let wire: WireBooking = serde_json::from_value(value)?;
    Ok(BookingRecord {
        id: wire.id.into_string(),
        academy_id: wire.academy_id.map(WireId::into_string),
        teacher_id: wire.teacher_id.map(WireId::into_string),
        student_id: wire.student_id.map(WireId::into_string),
        start_at: parse_instant(&wire.date)?,
        status: BookingStatus::parse(&wire.status),
    })
}

/// RFC 3339 timestamps are taken as given; timestamps without an offset are
/// UTC, which is how the backend stores them.
pub fn parse_instant(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| anyhow::anyhow!("invalid timestamp: {s}"))
}

pub fn normalize_slots(envelope: SlotsEnvelope) -> Vec<OperatingSlot> {
    normalize(envelope.slots, parse_operating_slot, "operating slot")
}

pub fn normalize_bookings(envelope: BookingsEnvelope) -> Vec<BookingRecord> {
    normalize(envelope.bookings, parse_booking, "booking")
}

fn normalize<T>(
    values: Vec<serde_json::Value>,
    parse: fn(serde_json::Value) -> anyhow::Result<T>,
    what: &str,
) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match parse(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed {what}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_operating_slot_camel_case() {
        let slot = parse_operating_slot(json!({
            "academyId": "a-1",
            "dayOfWeek": 1,
            "time": "06:00",
            "isAvailable": true,
        }))
        .unwrap();
        assert_eq!(slot.academy_id.as_deref(), Some("a-1"));
        assert_eq!(slot.day_of_week, 1);
        assert_eq!(slot.time.to_string(), "06:00:00");
        assert!(slot.is_available);
    }

    #[test]
    fn test_parse_operating_slot_snake_case() {
        let slot = parse_operating_slot(json!({
            "academy_id": 42,
            "day_of_week": 6,
            "time": "18:30:00",
            "is_available": false,
        }))
        .unwrap();
        assert_eq!(slot.academy_id.as_deref(), Some("42"));
        assert!(!slot.is_available);
    }

    #[test]
    fn test_parse_operating_slot_rejects_bad_day() {
        assert!(parse_operating_slot(json!({"day_of_week": 7, "time": "06:00"})).is_err());
    }

    #[test]
    fn test_parse_booking_variants() {
        let camel = parse_booking(json!({
            "id": "b-1",
            "unitId": "a-1",
            "teacherId": "t-1",
            "studentId": null,
            "startAt": "2025-06-16T09:00:00.000Z",
            "status": "AVAILABLE",
        }))
        .unwrap();
        let snake = parse_booking(json!({
            "id": 7,
            "academy_id": "a-1",
            "teacher_id": "t-1",
            "student_id": "s-1",
            "date": "2025-06-16T09:00:00",
            "status": "paid",
        }))
        .unwrap();

        assert_eq!(camel.academy_id.as_deref(), Some("a-1"));
        assert_eq!(camel.student_id, None);
        assert_eq!(camel.status, BookingStatus::Available);
        assert_eq!(snake.id, "7");
        assert_eq!(snake.student_id.as_deref(), Some("s-1"));
        assert_eq!(snake.status, BookingStatus::Occupied("PAID".to_string()));
        assert_eq!(camel.start_at, snake.start_at);
    }

    #[test]
    fn test_parse_instant_with_offset() {
        let dt = parse_instant("2025-06-16T06:00:00-03:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-06-16T09:00:00+00:00");
        assert!(parse_instant("yesterday").is_err());
    }

    #[test]
    fn test_normalize_skips_malformed_records() {
        let envelope: BookingsEnvelope = serde_json::from_value(json!({
            "bookings": [
                {"id": "ok", "date": "2025-06-16T09:00:00Z", "status": "BLOCKED"},
                {"id": "no-date", "status": "BLOCKED"},
                {"id": "bad-date", "date": "soon", "status": "BLOCKED"},
            ]
        }))
        .unwrap();
        let bookings = normalize_bookings(envelope);
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].id, "ok");
    }

    #[test]
    fn test_slots_envelope_alias() {
        let envelope: SlotsEnvelope = serde_json::from_value(json!({
            "timeSlots": [{"dayOfWeek": 2, "time": "07:00"}]
        }))
        .unwrap();
        let slots = normalize_slots(envelope);
        assert_eq!(slots.len(), 1);
        assert!(slots[0].is_available);
    }
}
