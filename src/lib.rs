// src/lib.rs
// Public library surface for the daily job binary and integration tests.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod daywindow;
pub mod dispatch;
pub mod error;
pub mod feed;
pub mod model;
pub mod pipeline;
pub mod store;
pub mod telemetry;
pub mod text;
pub mod validate;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{aggregate, Aggregate};
pub use crate::error::PipelineError;
pub use crate::model::{Classification, DailySentiment, ItemKind, Label, RawItem, ValidatedItem};
pub use crate::pipeline::{DailyRun, RunReport};
