//! Request data model
//!
//! - `TimeRange`: UTC query window
//! - `DataQuery`: one query of a batch as sent by the caller
//! - `QueryJson`: the dialect-neutral query body (`rawSql`, `format`, fill fields)
//! - `Format`: table or time-series output

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A time window with UTC bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Range from unix-second bounds
    pub fn from_unix(from: i64, to: i64) -> Self {
        Self {
            from: Utc.timestamp_opt(from, 0).single().unwrap_or_default(),
            to: Utc.timestamp_opt(to, 0).single().unwrap_or_default(),
        }
    }

    /// The last `duration` up to now
    pub fn last(duration: Duration) -> Self {
        let to = Utc::now();
        Self {
            from: to - duration,
            to,
        }
    }

    /// Move the start down to a multiple of `interval` (epoch seconds)
    pub fn align_start(&self, interval: Duration) -> Self {
        let secs = interval.num_seconds();
        if secs <= 0 {
            return *self;
        }
        let start = self.from.timestamp().div_euclid(secs) * secs;
        Self {
            from: Utc.timestamp_opt(start, 0).single().unwrap_or(self.from),
            to: self.to,
        }
    }
}

/// One query of a batch request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    /// Identifier correlating the query with its response
    pub ref_id: String,
    #[serde(default)]
    pub query_type: String,
    #[serde(default)]
    pub max_data_points: i64,
    /// Suggested interval between points, in milliseconds
    #[serde(default)]
    pub interval_ms: i64,
    pub time_range: TimeRange,
    /// Query body, decoded into [`QueryJson`]
    #[serde(default)]
    pub json: serde_json::Value,
}

impl DataQuery {
    /// Build a query from raw SQL with the default (time series) format
    pub fn new(ref_id: impl Into<String>, raw_sql: impl Into<String>, time_range: TimeRange) -> Self {
        Self {
            ref_id: ref_id.into(),
            query_type: String::new(),
            max_data_points: 0,
            interval_ms: 0,
            time_range,
            json: serde_json::json!({ "rawSql": raw_sql.into() }),
        }
    }

    /// Builder method: set the output format
    pub fn format(mut self, format: Format) -> Self {
        if let serde_json::Value::Object(map) = &mut self.json {
            map.insert(
                "format".to_string(),
                serde_json::Value::String(format.as_str().to_string()),
            );
        }
        self
    }

    /// Builder method: set the declared interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval_ms = interval.num_milliseconds();
        self
    }

    /// Builder method: set max data points
    pub fn max_data_points(mut self, points: i64) -> Self {
        self.max_data_points = points;
        self
    }

    /// Declared interval as a duration
    pub fn interval_duration(&self) -> Duration {
        Duration::milliseconds(self.interval_ms)
    }

    /// Decode the query body
    pub fn query_json(&self) -> Result<QueryJson, serde_json::Error> {
        if self.json.is_null() {
            return Ok(QueryJson::default());
        }
        serde_json::from_value(self.json.clone())
    }
}

/// Output format of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    #[default]
    TimeSeries,
    Table,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::TimeSeries => "time_series",
            Format::Table => "table",
        }
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time_series" | "timeseries" => Ok(Format::TimeSeries),
            "table" => Ok(Format::Table),
            other => Err(format!("unknown format: {}", other)),
        }
    }
}

/// Dialect-neutral query body
///
/// The fill fields exist only so that requests carrying them can be rejected:
/// fill settings may only come from `$__timeGroup(col, interval, fill)`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryJson {
    #[serde(default)]
    pub raw_sql: String,
    #[serde(default)]
    pub format: Format,
    #[serde(default)]
    pub fill: bool,
    #[serde(default)]
    pub fill_interval: f64,
    #[serde(default)]
    pub fill_mode: String,
    #[serde(default)]
    pub fill_value: f64,
}

impl QueryJson {
    /// Whether the caller tried to supply fill parameters directly
    pub fn has_fill_params(&self) -> bool {
        self.fill || self.fill_interval != 0.0 || !self.fill_mode.is_empty() || self.fill_value != 0.0
    }
}
