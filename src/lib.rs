//! Metric presentation, route navigation and the shells that render them.

pub mod catalog;
pub mod dashboard;
pub mod data;
pub mod dates;
pub mod formatting;
pub mod locale;
pub mod metric;
pub mod navigation;
pub mod report;
pub mod state;
pub mod summary;
