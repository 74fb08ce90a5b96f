pub mod availability;
pub mod calendar;
pub mod health;
