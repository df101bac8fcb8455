//! Columnar frames
//!
//! The frame is the canonical result unit returned per query:
//!
//! - **types**: `Frame`, `Field`, `FieldValues`, notices and fill policy
//! - **wide**: long → wide pivot for multi-series results
//! - **resample**: gap-filling onto a uniform time grid
//! - **error**: error types
//!
//! # Invariants
//!
//! All fields of a frame have the same length, and every value is nullable.

mod error;
mod resample;
mod types;
mod wide;

pub use error::{FrameError, FrameResult};
pub use resample::resample;
pub use types::{
    Field, FieldType, FieldValues, FillMissing, FillMode, Frame, FrameMeta, Notice,
    NoticeSeverity, TimeSeriesSchema, TimeSeriesType, TIME_FIELD_NAME,
};
pub use wide::long_to_wide;
