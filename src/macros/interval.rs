//! Interval parsing and formatting
//!
//! # Supported Syntax
//!
//! ```text
//! 500ms  10s  1m  1h30m  1d  1w  1M  1y  1.5h  '5m'  "30s"
//! ```
//!
//! Months are 30 days and years 365 days.

use super::error::{MacroError, MacroResult};
use chrono::Duration;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::many1,
    sequence::pair,
    IResult,
};

const NANOS_PER_SECOND: f64 = 1e9;
const NANOS_PER_DAY: f64 = 86_400.0 * NANOS_PER_SECOND;

/// Parse an interval such as `'1m'` into a duration
pub fn parse_interval(input: &str) -> MacroResult<Duration> {
    let trimmed = input
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .trim();

    let nanos: f64 = match all_consuming(many1(component))(trimmed) {
        Ok((_, parts)) => parts.iter().sum(),
        Err(_) => return Err(MacroError::InvalidInterval(input.to_string())),
    };

    if !nanos.is_finite() || nanos > i64::MAX as f64 {
        return Err(MacroError::InvalidInterval(input.to_string()));
    }
    Ok(Duration::nanoseconds(nanos.round() as i64))
}

/// One `<number><unit>` pair, in nanoseconds
fn component(input: &str) -> IResult<&str, f64> {
    map(pair(number, unit), |(n, per_unit)| n * per_unit)(input)
}

fn number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

/// Unit suffix as nanoseconds per unit
fn unit(input: &str) -> IResult<&str, f64> {
    alt((
        value(1.0, tag("ns")),
        value(1e3, alt((tag("us"), tag("µs")))),
        value(1e6, tag("ms")),
        value(NANOS_PER_SECOND, tag("s")),
        value(60.0 * NANOS_PER_SECOND, tag("m")),
        value(3600.0 * NANOS_PER_SECOND, tag("h")),
        value(NANOS_PER_DAY, tag("d")),
        value(7.0 * NANOS_PER_DAY, tag("w")),
        value(30.0 * NANOS_PER_DAY, tag("M")),
        value(365.0 * NANOS_PER_DAY, tag("y")),
    ))(input)
}

/// Format a duration in its largest whole unit (`1y`, `2d`, `5m`, `100ms`)
///
/// Anything below one millisecond formats as `1ms`.
pub fn format_interval(interval: Duration) -> String {
    let ms = interval.num_milliseconds();
    let units: [(i64, &str); 6] = [
        (365 * 86_400_000, "y"),
        (86_400_000, "d"),
        (3_600_000, "h"),
        (60_000, "m"),
        (1_000, "s"),
        (1, "ms"),
    ];
    for (size, suffix) in units {
        if ms >= size {
            return format!("{}{}", ms / size, suffix);
        }
    }
    "1ms".to_string()
}

/// Seconds of a duration, without a fractional part when whole
pub fn format_seconds(interval: Duration) -> String {
    let secs = seconds(interval);
    if secs.fract() == 0.0 {
        format!("{}", secs as i64)
    } else {
        format!("{}", secs)
    }
}

/// Seconds of a duration as a float
pub fn seconds(interval: Duration) -> f64 {
    interval
        .num_nanoseconds()
        .map(|n| n as f64 / NANOS_PER_SECOND)
        .unwrap_or_else(|| interval.num_seconds() as f64)
}
