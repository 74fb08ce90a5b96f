pub mod booking;
pub mod grid;
pub mod slot;

pub use booking::{BookingRecord, BookingStatus, SlotKind};
pub use grid::{CellState, CellView, DayView, GridSummary, GridView, Selection, ToggleOutcome};
pub use slot::{LocalSlot, OperatingSlot, SlotTime};
