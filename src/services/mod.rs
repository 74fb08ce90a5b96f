pub mod backend;
pub mod calendar;
pub mod planner;
pub mod reconciler;
