use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::slot::{LocalSlot, SlotTime};

/// Slots the teacher toggled on but has not saved yet, keyed by local day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(BTreeMap<NaiveDate, BTreeSet<SlotTime>>);

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, slot: &LocalSlot) -> bool {
        self.0
            .get(&slot.date)
            .is_some_and(|times| times.contains(&slot.time))
    }

    pub fn insert(&mut self, slot: LocalSlot) -> bool {
        self.0.entry(slot.date).or_default().insert(slot.time)
    }

    pub fn remove(&mut self, slot: &LocalSlot) -> bool {
        let Some(times) = self.0.get_mut(&slot.date) else {
            return false;
        };
        let removed = times.remove(&slot.time);
        if times.is_empty() {
            self.0.remove(&slot.date);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = LocalSlot> + '_ {
        self.0
            .iter()
            .flat_map(|(date, times)| times.iter().map(move |time| LocalSlot::new(*date, *time)))
    }
}

impl FromIterator<LocalSlot> for Selection {
    fn from_iter<I: IntoIterator<Item = LocalSlot>>(iter: I) -> Self {
        let mut selection = Selection::new();
        for slot in iter {
            selection.insert(slot);
        }
        selection
    }
}

/// The state of one grid cell. Variants are listed in classification
/// priority order, except that `Closed` is decided before everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CellState {
    Closed,
    Occupied { booking_id: String },
    Blocked { booking_id: String },
    PendingSelection,
    SavedAvailable { booking_id: String },
    Open,
}

impl CellState {
    pub fn is_interactive(&self) -> bool {
        !matches!(self, CellState::Closed | CellState::Occupied { .. })
    }
}

/// What a click on a cell resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// The cell holds a persisted booking; the client must confirm before
    /// deleting it.
    ConfirmDelete {
        booking_id: String,
        state: &'static str,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct CellView {
    pub time: SlotTime,
    #[serde(flatten)]
    pub state: CellState,
    pub interactive: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub weekday: String,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GridSummary {
    pub closed: usize,
    pub occupied: usize,
    pub blocked: usize,
    pub pending: usize,
    pub saved_available: usize,
    pub open: usize,
}

impl GridSummary {
    pub fn record(&mut self, state: &CellState) {
        match state {
            CellState::Closed => self.closed += 1,
            CellState::Occupied { .. } => self.occupied += 1,
            CellState::Blocked { .. } => self.blocked += 1,
            CellState::PendingSelection => self.pending += 1,
            CellState::SavedAvailable { .. } => self.saved_available += 1,
            CellState::Open => self.open += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GridView {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub timezone: String,
    pub times: Vec<SlotTime>,
    pub days: Vec<DayView>,
    pub pending: Selection,
    pub summary: GridSummary,
}
