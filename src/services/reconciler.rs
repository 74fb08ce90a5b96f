use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::models::slot::{weekday_index, weekday_label};
use crate::models::{
    BookingRecord, CellState, CellView, DayView, GridSummary, GridView, LocalSlot, OperatingSlot,
    Selection, SlotKind, SlotTime, ToggleOutcome,
};

pub const WINDOW_DAYS: u64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("{date} {time} is outside the academy's operating hours")]
    SlotClosed { date: NaiveDate, time: SlotTime },

    #[error("{date} {time} is already booked by a student")]
    SlotOccupied { date: NaiveDate, time: SlotTime },

    #[error("{date} {time} is blocked; unblock it before offering it")]
    SlotBlocked { date: NaiveDate, time: SlotTime },

    #[error("{date} is outside the visible week")]
    OutsideWindow { date: NaiveDate },

    #[error("no selectable slots on {date} ({occupied} already occupied)")]
    NoSelectableSlots { date: NaiveDate, occupied: usize },

    #[error("no selectable slots at {time} in the visible week")]
    NoSelectableTime { time: SlotTime },

    #[error("{count} selected slot(s) were booked in the meantime; nothing was saved")]
    PendingConflict { count: usize },

    #[error("no slots selected")]
    EmptySelection,

    #[error("{date} {time} does not exist in timezone {timezone}")]
    NonexistentLocalTime {
        date: NaiveDate,
        time: SlotTime,
        timezone: String,
    },
}

/// Seven consecutive local days starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: NaiveDate,
}

impl Window {
    /// Returns `None` when the week runs off the representable calendar.
    /// One spare day on each side keeps the UTC bounds in range for any offset.
    pub fn new(start: NaiveDate) -> Option<Self> {
        start.checked_sub_days(Days::new(1))?;
        start.checked_add_days(Days::new(WINDOW_DAYS + 1))?;
        Some(Self { start })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.start + Days::new(WINDOW_DAYS - 1)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(WINDOW_DAYS as usize)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end()
    }

    /// UTC bounds covering the whole window on the teacher's local calendar:
    /// local midnight of the first day up to the last second of the last day.
    pub fn utc_bounds(&self, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        let from = local_midnight(self.start, tz);
        let to = local_midnight(self.end() + Days::new(1), tz) - chrono::Duration::seconds(1);
        (from, to)
    }
}

fn local_midnight(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    // Some zones skip midnight on DST days; the first valid hour is used then.
    [0, 1]
        .iter()
        .find_map(|hour| {
            let naive = date.and_time(NaiveTime::from_hms_opt(*hour, 0, 0)?);
            tz.from_local_datetime(&naive).earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// The academy's recurring open hours, keyed by weekday index.
#[derive(Debug, Clone, Default)]
pub struct OperatingHours {
    by_weekday: BTreeMap<u8, BTreeSet<SlotTime>>,
}

impl OperatingHours {
    pub fn from_slots(academy_id: &str, slots: &[OperatingSlot]) -> Self {
        let mut by_weekday: BTreeMap<u8, BTreeSet<SlotTime>> = BTreeMap::new();
        for slot in slots {
            if !slot.is_available || slot.day_of_week > 6 {
                continue;
            }
            if slot.academy_id.as_deref().is_some_and(|id| id != academy_id) {
                continue;
            }
            by_weekday.entry(slot.day_of_week).or_default().insert(slot.time);
        }
        Self { by_weekday }
    }

    pub fn is_open(&self, date: NaiveDate, time: SlotTime) -> bool {
        self.by_weekday
            .get(&weekday_index(date))
            .is_some_and(|times| times.contains(&time))
    }

    pub fn times_on(&self, date: NaiveDate) -> Vec<SlotTime> {
        self.by_weekday
            .get(&weekday_index(date))
            .map(|times| times.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn all_times(&self) -> BTreeSet<SlotTime> {
        self.by_weekday.values().flatten().copied().collect()
    }
}

/// Non-canceled bookings of one academy placed on the local grid. Each
/// category keeps the first booking seen for a slot.
#[derive(Debug, Clone, Default)]
pub struct BookingIndex {
    occupied: HashMap<LocalSlot, String>,
    blocked: HashMap<LocalSlot, String>,
    available: HashMap<LocalSlot, String>,
}

impl BookingIndex {
    pub fn build(academy_id: &str, bookings: &[BookingRecord], tz: &Tz) -> Self {
        let mut index = Self::default();
        for booking in bookings {
            if booking.academy_id.as_deref().is_some_and(|id| id != academy_id) {
                continue;
            }
            let Some(kind) = booking.kind() else {
                continue;
            };
            let slot = LocalSlot::from_instant(booking.start_at, tz);
            let map = match kind {
                SlotKind::Occupied => &mut index.occupied,
                SlotKind::Blocked => &mut index.blocked,
                SlotKind::Available => &mut index.available,
            };
            match map.entry(slot) {
                Entry::Vacant(entry) => {
                    entry.insert(booking.id.clone());
                }
                Entry::Occupied(entry) => {
                    tracing::warn!(
                        kept = %entry.get(),
                        ignored = %booking.id,
                        date = %slot.date,
                        time = %slot.time,
                        "duplicate booking for slot"
                    );
                }
            }
        }
        index
    }
}

/// Classifies every cell of a one-week grid and applies the grid's
/// selection operations. Holds no pending state of its own; callers pass the
/// current [`Selection`] in.
#[derive(Debug, Clone)]
pub struct Reconciler {
    window: Window,
    tz: Tz,
    hours: OperatingHours,
    index: BookingIndex,
}

impl Reconciler {
    pub fn new(
        window: Window,
        tz: Tz,
        academy_id: &str,
        slots: &[OperatingSlot],
        bookings: &[BookingRecord],
    ) -> Self {
        Self {
            window,
            tz,
            hours: OperatingHours::from_slots(academy_id, slots),
            index: BookingIndex::build(academy_id, bookings, &tz),
        }
    }

    pub fn classify(&self, slot: &LocalSlot, pending: &Selection) -> CellState {
        if !self.hours.is_open(slot.date, slot.time) {
            return CellState::Closed;
        }
        if let Some(id) = self.index.occupied.get(slot) {
            return CellState::Occupied {
                booking_id: id.clone(),
            };
        }
        if let Some(id) = self.index.blocked.get(slot) {
            return CellState::Blocked {
                booking_id: id.clone(),
            };
        }
        if pending.contains(slot) {
            return CellState::PendingSelection;
        }
        if let Some(id) = self.index.available.get(slot) {
            return CellState::SavedAvailable {
                booking_id: id.clone(),
            };
        }
        CellState::Open
    }

    pub fn view(&self, pending: &Selection) -> GridView {
        let times: Vec<SlotTime> = self.hours.all_times().into_iter().collect();
        let mut summary = GridSummary::default();

        let days = self
            .window
            .days()
            .map(|date| {
                let cells = times
                    .iter()
                    .map(|time| {
                        let state = self.classify(&LocalSlot::new(date, *time), pending);
                        summary.record(&state);
                        CellView {
                            time: *time,
                            interactive: state.is_interactive(),
                            state,
                        }
                    })
                    .collect();
                DayView {
                    date,
                    weekday: weekday_label(date),
                    cells,
                }
            })
            .collect();

        GridView {
            start_date: self.window.start(),
            end_date: self.window.end(),
            timezone: self.tz.name().to_string(),
            times,
            days,
            pending: pending.clone(),
            summary,
        }
    }

    pub fn toggle(
        &self,
        pending: &mut Selection,
        slot: LocalSlot,
    ) -> Result<ToggleOutcome, GridError> {
        self.ensure_in_window(slot.date)?;

        match self.classify(&slot, pending) {
            CellState::Closed => Err(GridError::SlotClosed {
                date: slot.date,
                time: slot.time,
            }),
            CellState::Occupied { .. } => Err(GridError::SlotOccupied {
                date: slot.date,
                time: slot.time,
            }),
            CellState::Blocked { booking_id } => Ok(ToggleOutcome::ConfirmDelete {
                booking_id,
                state: "BLOCKED",
            }),
            CellState::SavedAvailable { booking_id } => Ok(ToggleOutcome::ConfirmDelete {
                booking_id,
                state: "SAVED_AVAILABLE",
            }),
            CellState::PendingSelection => {
                pending.remove(&slot);
                Ok(ToggleOutcome::Removed)
            }
            CellState::Open => {
                pending.insert(slot);
                Ok(ToggleOutcome::Added)
            }
        }
    }

    /// Adds every open slot of `date` to the selection. Returns how many were
    /// added.
    pub fn select_day(&self, pending: &mut Selection, date: NaiveDate) -> Result<usize, GridError> {
        self.ensure_in_window(date)?;

        let mut added = 0;
        let mut already_pending = 0;
        let mut occupied = 0;
        for time in self.hours.times_on(date) {
            let slot = LocalSlot::new(date, time);
            match self.classify(&slot, pending) {
                CellState::Open => {
                    pending.insert(slot);
                    added += 1;
                }
                CellState::PendingSelection => already_pending += 1,
                CellState::Occupied { .. } => occupied += 1,
                _ => {}
            }
        }

        if added == 0 && already_pending == 0 {
            return Err(GridError::NoSelectableSlots { date, occupied });
        }
        Ok(added)
    }

    /// Adds `time` on every visible day where that cell is open.
    pub fn select_time(&self, pending: &mut Selection, time: SlotTime) -> Result<usize, GridError> {
        let mut added = 0;
        let mut already_pending = 0;
        for date in self.window.days() {
            let slot = LocalSlot::new(date, time);
            match self.classify(&slot, pending) {
                CellState::Open => {
                    pending.insert(slot);
                    added += 1;
                }
                CellState::PendingSelection => already_pending += 1,
                _ => {}
            }
        }

        if added == 0 && already_pending == 0 {
            return Err(GridError::NoSelectableTime { time });
        }
        Ok(added)
    }

    /// Checks a selection against the current bookings before it is saved.
    /// Any pending slot that is now occupied fails the whole selection. A
    /// blocked slot is never offered as available.
    pub fn validate_pending(&self, pending: &Selection) -> Result<(), GridError> {
        if pending.is_empty() {
            return Err(GridError::EmptySelection);
        }

        let mut conflicts = 0;
        for slot in pending.iter() {
            self.ensure_in_window(slot.date)?;
            match self.classify(&slot, pending) {
                CellState::Closed => {
                    return Err(GridError::SlotClosed {
                        date: slot.date,
                        time: slot.time,
                    })
                }
                CellState::Blocked { .. } => {
                    return Err(GridError::SlotBlocked {
                        date: slot.date,
                        time: slot.time,
                    })
                }
                CellState::Occupied { .. } => conflicts += 1,
                _ => {}
            }
        }

        if conflicts > 0 {
            return Err(GridError::PendingConflict { count: conflicts });
        }
        Ok(())
    }

    /// Ids of the saved AVAILABLE bookings on `date`, ordered by time. Slots
    /// held by a student are left out even if an AVAILABLE record shares them.
    pub fn saved_available_on(&self, date: NaiveDate) -> Vec<String> {
        let mut found: Vec<(SlotTime, String)> = self
            .index
            .available
            .iter()
            .filter(|(slot, _)| slot.date == date && !self.index.occupied.contains_key(slot))
            .map(|(slot, id)| (slot.time, id.clone()))
            .collect();
        found.sort();
        found.into_iter().map(|(_, id)| id).collect()
    }

    pub fn to_utc(&self, slot: &LocalSlot) -> Result<DateTime<Utc>, GridError> {
        slot.to_utc(&self.tz)
            .ok_or_else(|| GridError::NonexistentLocalTime {
                date: slot.date,
                time: slot.time,
                timezone: self.tz.name().to_string(),
            })
    }

    pub fn ensure_in_window(&self, date: NaiveDate) -> Result<(), GridError> {
        if self.window.contains(date) {
            Ok(())
        } else {
            Err(GridError::OutsideWindow { date })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;

    const ACADEMY: &str = "academy-1";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn time(s: &str) -> SlotTime {
        SlotTime::parse(s).unwrap()
    }

    fn slot(d: &str, t: &str) -> LocalSlot {
        LocalSlot::new(date(d), time(t))
    }

    fn open(day_of_week: u8, t: &str) -> OperatingSlot {
        OperatingSlot {
            academy_id: Some(ACADEMY.to_string()),
            day_of_week,
            time: time(t),
            is_available: true,
        }
    }

    /// Booking at a local Sao Paulo time (UTC-3).
    fn booking(id: &str, d: &str, t: &str, status: &str) -> BookingRecord {
        let tz = chrono_tz::America::Sao_Paulo;
        BookingRecord {
            id: id.to_string(),
            academy_id: Some(ACADEMY.to_string()),
            teacher_id: Some("teacher-1".to_string()),
            student_id: None,
            start_at: slot(d, t).to_utc(&tz).unwrap(),
            status: BookingStatus::parse(status),
        }
    }

    // 2025-06-16 is a Monday
    fn monday_morning() -> Vec<OperatingSlot> {
        vec![open(1, "06:00"), open(1, "07:00:00")]
    }

    fn reconciler(slots: &[OperatingSlot], bookings: &[BookingRecord]) -> Reconciler {
        Reconciler::new(
            Window::new(date("2025-06-16")).unwrap(),
            chrono_tz::America::Sao_Paulo,
            ACADEMY,
            slots,
            bookings,
        )
    }

    #[test]
    fn test_window_bounds() {
        let window = Window::new(date("2025-06-16")).unwrap();
        assert_eq!(window.end(), date("2025-06-22"));
        assert_eq!(window.days().count(), 7);
        assert!(window.contains(date("2025-06-22")));
        assert!(!window.contains(date("2025-06-23")));

        let (from, to) = window.utc_bounds(&chrono_tz::America::Sao_Paulo);
        assert_eq!(from.to_rfc3339(), "2025-06-16T03:00:00+00:00");
        assert_eq!(to.to_rfc3339(), "2025-06-23T02:59:59+00:00");
    }

    #[test]
    fn test_window_rejects_calendar_edges() {
        assert!(Window::new(NaiveDate::MAX).is_none());
        assert!(Window::new(NaiveDate::MAX - Days::new(5)).is_none());
        assert!(Window::new(NaiveDate::MIN).is_none());
        assert!(Window::new(NaiveDate::MAX - Days::new(8)).is_some());
    }

    #[test]
    fn test_closed_when_not_in_template() {
        let r = reconciler(&monday_morning(), &[]);
        let pending = Selection::new();
        assert_eq!(r.classify(&slot("2025-06-16", "08:00"), &pending), CellState::Closed);
        // Tuesday has no hours at all
        assert_eq!(r.classify(&slot("2025-06-17", "06:00"), &pending), CellState::Closed);
        assert_eq!(r.classify(&slot("2025-06-16", "06:00"), &pending), CellState::Open);
    }

    #[test]
    fn test_unavailable_template_entry_is_closed() {
        let mut slots = monday_morning();
        slots[0].is_available = false;
        let r = reconciler(&slots, &[]);
        assert_eq!(
            r.classify(&slot("2025-06-16", "06:00"), &Selection::new()),
            CellState::Closed
        );
    }

    #[test]
    fn test_closed_outranks_bookings() {
        let bookings = vec![booking("b-1", "2025-06-16", "09:00", "PAID")];
        let r = reconciler(&monday_morning(), &bookings);
        assert_eq!(
            r.classify(&slot("2025-06-16", "09:00"), &Selection::new()),
            CellState::Closed
        );
    }

    #[test]
    fn test_occupied_outranks_everything_regardless_of_order() {
        let orders = [
            vec![
                booking("blk", "2025-06-16", "06:00", "BLOCKED"),
                booking("avl", "2025-06-16", "06:00", "AVAILABLE"),
                booking("occ", "2025-06-16", "06:00", "CONFIRMED"),
            ],
            vec![
                booking("occ", "2025-06-16", "06:00", "CONFIRMED"),
                booking("avl", "2025-06-16", "06:00", "AVAILABLE"),
                booking("blk", "2025-06-16", "06:00", "BLOCKED"),
            ],
        ];
        let pending: Selection = [slot("2025-06-16", "06:00")].into_iter().collect();

        for bookings in orders {
            let r = reconciler(&monday_morning(), &bookings);
            assert_eq!(
                r.classify(&slot("2025-06-16", "06:00"), &pending),
                CellState::Occupied {
                    booking_id: "occ".to_string()
                }
            );
        }
    }

    #[test]
    fn test_priority_blocked_pending_saved() {
        let bookings = vec![
            booking("blk", "2025-06-16", "06:00", "BLOCKED"),
            booking("avl", "2025-06-16", "06:00", "AVAILABLE"),
            booking("avl-2", "2025-06-16", "07:00", "AVAILABLE"),
        ];
        let r = reconciler(&monday_morning(), &bookings);
        let pending: Selection = [slot("2025-06-16", "06:00"), slot("2025-06-16", "07:00")]
            .into_iter()
            .collect();

        assert_eq!(
            r.classify(&slot("2025-06-16", "06:00"), &pending),
            CellState::Blocked {
                booking_id: "blk".to_string()
            }
        );
        assert_eq!(
            r.classify(&slot("2025-06-16", "07:00"), &pending),
            CellState::PendingSelection
        );
        assert_eq!(
            r.classify(&slot("2025-06-16", "07:00"), &Selection::new()),
            CellState::SavedAvailable {
                booking_id: "avl-2".to_string()
            }
        );
    }

    #[test]
    fn test_canceled_bookings_ignored() {
        let bookings = vec![booking("c-1", "2025-06-16", "06:00", "CANCELED")];
        let r = reconciler(&monday_morning(), &bookings);
        assert_eq!(
            r.classify(&slot("2025-06-16", "06:00"), &Selection::new()),
            CellState::Open
        );
    }

    #[test]
    fn test_other_academy_bookings_ignored() {
        let mut other = booking("x-1", "2025-06-16", "06:00", "PAID");
        other.academy_id = Some("academy-2".to_string());
        let r = reconciler(&monday_morning(), &[other]);
        assert_eq!(
            r.classify(&slot("2025-06-16", "06:00"), &Selection::new()),
            CellState::Open
        );
    }

    #[test]
    fn test_duplicate_first_seen_wins() {
        let bookings = vec![
            booking("first", "2025-06-16", "06:00", "AVAILABLE"),
            booking("second", "2025-06-16", "06:00", "AVAILABLE"),
        ];
        let r = reconciler(&monday_morning(), &bookings);
        assert_eq!(
            r.classify(&slot("2025-06-16", "06:00"), &Selection::new()),
            CellState::SavedAvailable {
                booking_id: "first".to_string()
            }
        );
    }

    #[test]
    fn test_short_and_long_times_classify_equally() {
        let slots = vec![open(1, "06:00")];
        let bookings = vec![booking("b-1", "2025-06-16", "06:00:00", "BLOCKED")];
        let r = reconciler(&slots, &bookings);
        let pending = Selection::new();
        assert_eq!(
            r.classify(&slot("2025-06-16", "06:00"), &pending),
            r.classify(&slot("2025-06-16", "06:00:00"), &pending)
        );
    }

    #[test]
    fn test_view_assigns_one_state_per_cell() {
        let bookings = vec![
            booking("occ", "2025-06-16", "06:00", "PAID"),
            booking("avl", "2025-06-16", "07:00", "AVAILABLE"),
        ];
        let r = reconciler(&monday_morning(), &bookings);
        let view = r.view(&Selection::new());

        assert_eq!(view.days.len(), 7);
        assert_eq!(view.times, vec![time("06:00"), time("07:00")]);
        assert!(view.days.iter().all(|d| d.cells.len() == 2));
        assert_eq!(view.summary.occupied, 1);
        assert_eq!(view.summary.saved_available, 1);
        assert_eq!(view.summary.closed, 12);
        assert_eq!(view.days[0].weekday, "mon");
        assert_eq!(view.timezone, "America/Sao_Paulo");
    }

    #[test]
    fn test_toggle_open_and_pending() {
        let r = reconciler(&monday_morning(), &[]);
        let mut pending = Selection::new();

        let outcome = r.toggle(&mut pending, slot("2025-06-16", "06:00")).unwrap();
        assert_eq!(outcome, ToggleOutcome::Added);
        assert!(pending.contains(&slot("2025-06-16", "06:00")));

        let outcome = r.toggle(&mut pending, slot("2025-06-16", "06:00:00")).unwrap();
        assert_eq!(outcome, ToggleOutcome::Removed);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_toggle_occupied_is_rejected() {
        let bookings = vec![booking("occ", "2025-06-16", "06:00", "RESERVED")];
        let r = reconciler(&monday_morning(), &bookings);
        let mut pending = Selection::new();

        let err = r.toggle(&mut pending, slot("2025-06-16", "06:00")).unwrap_err();
        assert!(matches!(err, GridError::SlotOccupied { .. }));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_toggle_closed_and_outside_window() {
        let r = reconciler(&monday_morning(), &[]);
        let mut pending = Selection::new();
        assert!(matches!(
            r.toggle(&mut pending, slot("2025-06-16", "12:00")),
            Err(GridError::SlotClosed { .. })
        ));
        assert!(matches!(
            r.toggle(&mut pending, slot("2025-06-23", "06:00")),
            Err(GridError::OutsideWindow { .. })
        ));
    }

    #[test]
    fn test_toggle_saved_asks_for_confirmation() {
        let bookings = vec![
            booking("avl", "2025-06-16", "06:00", "AVAILABLE"),
            booking("blk", "2025-06-16", "07:00", "BLOCKED"),
        ];
        let r = reconciler(&monday_morning(), &bookings);
        let mut pending = Selection::new();

        assert_eq!(
            r.toggle(&mut pending, slot("2025-06-16", "06:00")).unwrap(),
            ToggleOutcome::ConfirmDelete {
                booking_id: "avl".to_string(),
                state: "SAVED_AVAILABLE"
            }
        );
        assert_eq!(
            r.toggle(&mut pending, slot("2025-06-16", "07:00")).unwrap(),
            ToggleOutcome::ConfirmDelete {
                booking_id: "blk".to_string(),
                state: "BLOCKED"
            }
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn test_select_day_adds_open_slots() {
        let r = reconciler(&monday_morning(), &[]);
        let mut pending = Selection::new();

        let added = r.select_day(&mut pending, date("2025-06-16")).unwrap();
        assert_eq!(added, 2);
        let selected: Vec<String> = pending.iter().map(|s| s.time.to_string()).collect();
        assert_eq!(selected, vec!["06:00:00", "07:00:00"]);
    }

    #[test]
    fn test_select_day_skips_occupied_and_closed() {
        let slots = vec![open(1, "06:00"), open(1, "07:00"), open(1, "08:00")];
        let bookings = vec![
            booking("occ", "2025-06-16", "06:00", "PAID"),
            booking("blk", "2025-06-16", "08:00", "BLOCKED"),
        ];
        let r = reconciler(&slots, &bookings);
        let mut pending = Selection::new();

        let added = r.select_day(&mut pending, date("2025-06-16")).unwrap();
        assert_eq!(added, 1);
        for s in pending.iter() {
            let state = r.classify(&s, &Selection::new());
            assert_eq!(state, CellState::Open);
        }
    }

    #[test]
    fn test_select_day_all_occupied_warns() {
        let bookings = vec![
            booking("o-1", "2025-06-16", "06:00", "PAID"),
            booking("o-2", "2025-06-16", "07:00", "CONFIRMED"),
        ];
        let r = reconciler(&monday_morning(), &bookings);
        let mut pending = Selection::new();

        let err = r.select_day(&mut pending, date("2025-06-16")).unwrap_err();
        assert_eq!(
            err,
            GridError::NoSelectableSlots {
                date: date("2025-06-16"),
                occupied: 2
            }
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn test_select_day_closed_day() {
        let r = reconciler(&monday_morning(), &[]);
        let mut pending = Selection::new();
        assert!(matches!(
            r.select_day(&mut pending, date("2025-06-17")),
            Err(GridError::NoSelectableSlots { occupied: 0, .. })
        ));
    }

    #[test]
    fn test_select_time_across_week() {
        // Open Monday and Wednesday at 06:00, Monday taken
        let slots = vec![open(1, "06:00"), open(3, "06:00"), open(5, "07:00")];
        let bookings = vec![booking("occ", "2025-06-16", "06:00", "PAID")];
        let r = reconciler(&slots, &bookings);
        let mut pending = Selection::new();

        let added = r.select_time(&mut pending, time("06:00")).unwrap();
        assert_eq!(added, 1);
        assert!(pending.contains(&slot("2025-06-18", "06:00")));

        assert!(matches!(
            r.select_time(&mut pending, time("09:00")),
            Err(GridError::NoSelectableTime { .. })
        ));
    }

    #[test]
    fn test_validate_pending_conflict_counts() {
        let bookings = vec![
            booking("o-1", "2025-06-16", "06:00", "PAID"),
            booking("o-2", "2025-06-16", "07:00", "PAID"),
        ];
        let r = reconciler(&monday_morning(), &bookings);
        let pending: Selection = [slot("2025-06-16", "06:00"), slot("2025-06-16", "07:00")]
            .into_iter()
            .collect();

        assert_eq!(
            r.validate_pending(&pending),
            Err(GridError::PendingConflict { count: 2 })
        );
    }

    #[test]
    fn test_validate_pending_rules() {
        let r = reconciler(&monday_morning(), &[]);
        assert_eq!(
            r.validate_pending(&Selection::new()),
            Err(GridError::EmptySelection)
        );

        let closed: Selection = [slot("2025-06-16", "10:00")].into_iter().collect();
        assert!(matches!(
            r.validate_pending(&closed),
            Err(GridError::SlotClosed { .. })
        ));

        let ok: Selection = [slot("2025-06-16", "06:00")].into_iter().collect();
        assert!(r.validate_pending(&ok).is_ok());
    }

    #[test]
    fn test_validate_pending_rejects_blocked_slot() {
        let bookings = vec![booking("blk", "2025-06-16", "06:00", "BLOCKED")];
        let r = reconciler(&monday_morning(), &bookings);
        let pending: Selection = [slot("2025-06-16", "06:00"), slot("2025-06-16", "07:00")]
            .into_iter()
            .collect();

        assert_eq!(
            r.validate_pending(&pending),
            Err(GridError::SlotBlocked {
                date: date("2025-06-16"),
                time: time("06:00"),
            })
        );
    }

    #[test]
    fn test_saved_available_on_excludes_blocked_and_occupied() {
        let slots = vec![open(1, "06:00"), open(1, "07:00"), open(1, "08:00"), open(1, "09:00")];
        let bookings = vec![
            booking("avl-9", "2025-06-16", "09:00", "AVAILABLE"),
            booking("avl-6", "2025-06-16", "06:00", "AVAILABLE"),
            booking("blk", "2025-06-16", "07:00", "BLOCKED"),
            booking("occ", "2025-06-16", "08:00", "PAID"),
            booking("avl-8", "2025-06-16", "08:00", "AVAILABLE"),
            booking("avl-tue", "2025-06-17", "06:00", "AVAILABLE"),
        ];
        let r = reconciler(&slots, &bookings);
        assert_eq!(r.saved_available_on(date("2025-06-16")), vec!["avl-6", "avl-9"]);
    }

    #[test]
    fn test_late_evening_booking_stays_on_local_day() {
        let slots = vec![open(1, "22:00")];
        // 22:00 Monday in Sao Paulo is 01:00 Tuesday UTC
        let bookings = vec![booking("late", "2025-06-16", "22:00", "AVAILABLE")];
        let r = reconciler(&slots, &bookings);
        assert_eq!(
            r.classify(&slot("2025-06-16", "22:00"), &Selection::new()),
            CellState::SavedAvailable {
                booking_id: "late".to_string()
            }
        );
    }
}
