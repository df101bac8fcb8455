//! Dialect-independent substitutions
//!
//! Runs before the dialect macro pass:
//!
//! ```text
//! $__interval_ms      → interval in milliseconds
//! $__interval         → interval formatted in its largest unit (1m, 2h, ...)
//! $__unixEpochFrom()  → range start, unix seconds
//! $__unixEpochTo()    → range end, unix seconds
//! ```
//!
//! `$__interval_ms` is replaced first so that `$__interval` never matches its
//! prefix.

use crate::macros::format_interval;
use crate::query::{DataQuery, TimeRange};

/// Global interpolation hook
pub trait Interpolator: Send + Sync {
    fn interpolate(&self, query: &DataQuery, time_range: &TimeRange, sql: &str) -> String;
}

/// Default global interpolation
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalInterpolator;

impl Interpolator for GlobalInterpolator {
    fn interpolate(&self, query: &DataQuery, time_range: &TimeRange, sql: &str) -> String {
        let interval = query.interval_duration();
        sql.replace("$__interval_ms", &interval.num_milliseconds().to_string())
            .replace("$__interval", &format_interval(interval))
            .replace("$__unixEpochFrom()", &time_range.from.timestamp().to_string())
            .replace("$__unixEpochTo()", &time_range.to.timestamp().to_string())
    }
}
