use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct BookingRecord {
    pub id: String,
    pub academy_id: Option<String>,
    pub teacher_id: Option<String>,
    pub student_id: Option<String>,
    pub start_at: DateTime<Utc>,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingStatus {
    Available,
    Blocked,
    Canceled,
    /// Any status meaning a student holds the slot (PAID, RESERVED, CONFIRMED, ...).
    Occupied(String),
}

impl BookingStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BookingStatus::Available => "AVAILABLE",
            BookingStatus::Blocked => "BLOCKED",
            BookingStatus::Canceled => "CANCELED",
            BookingStatus::Occupied(status) => status,
        }
    }

    pub fn parse(s: &str) -> Self {
        let upper = s.trim().to_uppercase();
        match upper.as_str() {
            "AVAILABLE" => BookingStatus::Available,
            "BLOCKED" => BookingStatus::Blocked,
            "CANCELED" | "CANCELLED" => BookingStatus::Canceled,
            _ => BookingStatus::Occupied(upper),
        }
    }
}

/// How a booking weighs on the grid. Canceled bookings have no kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Occupied,
    Blocked,
    Available,
}

impl BookingRecord {
    pub fn kind(&self) -> Option<SlotKind> {
        match self.status {
            BookingStatus::Canceled => None,
            BookingStatus::Occupied(_) => Some(SlotKind::Occupied),
            BookingStatus::Blocked => Some(SlotKind::Blocked),
            // A student attached to an AVAILABLE record still holds the slot.
            BookingStatus::Available if self.student_id.is_some() => Some(SlotKind::Occupied),
            BookingStatus::Available => Some(SlotKind::Available),
        }
    }
}
