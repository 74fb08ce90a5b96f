use chrono::{DateTime, Duration, Utc};

use crate::models::{BookingRecord, SlotKind};

const ICS_FORMAT: &str = "%Y%m%dT%H%M%SZ";

fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

fn summary(booking: &BookingRecord, kind: SlotKind) -> String {
    match kind {
        SlotKind::Available => "Available for classes".to_string(),
        SlotKind::Blocked => "Blocked".to_string(),
        SlotKind::Occupied => format!("Class booked ({})", booking.status.as_str()),
    }
}

/// Renders the teacher's week as an iCalendar feed. Canceled bookings are
/// left out.
pub fn generate_week_ics(
    bookings: &[BookingRecord],
    calendar_name: &str,
    duration_minutes: i64,
    generated_at: DateTime<Utc>,
) -> String {
    let dtstamp = generated_at.format(ICS_FORMAT).to_string();

    let mut ics = format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Agenda//Teacher Availability//EN\r\n\
         X-WR-CALNAME:{}\r\n",
        escape_text(calendar_name)
    );

    for booking in bookings {
        let Some(kind) = booking.kind() else {
            continue;
        };
        let dtstart = booking.start_at.format(ICS_FORMAT).to_string();
        let dtend = (booking.start_at + Duration::minutes(duration_minutes))
            .format(ICS_FORMAT)
            .to_string();

        ics.push_str(&format!(
            "BEGIN:VEVENT\r\n\
             UID:{}@agenda\r\n\
             DTSTAMP:{dtstamp}\r\n\
             DTSTART:{dtstart}\r\n\
             DTEND:{dtend}\r\n\
             SUMMARY:{}\r\n\
             STATUS:{}\r\n\
             END:VEVENT\r\n",
            booking.id,
            escape_text(&summary(booking, kind)),
            if kind == SlotKind::Occupied {
                "CONFIRMED"
            } else {
                "TENTATIVE"
            },
        ));
    }

    ics.push_str("END:VCALENDAR\r\n");
    ics
}
