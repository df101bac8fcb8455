//! Query request and response model
//!
//! The inbound contract is a [`QueryDataRequest`] holding one or more
//! [`DataQuery`] values; the outbound contract is a [`QueryDataResponse`]
//! mapping each RefID to a [`DataResponse`].
//!
//! # Query body
//!
//! ```text
//! { "rawSql": "SELECT $__timeGroupAlias(ts, '1m'), avg(v) FROM m GROUP BY 1",
//!   "format": "time_series" }
//! ```

mod model;
mod response;

pub use model::{DataQuery, Format, QueryJson, TimeRange};
pub use response::{DataResponse, ErrorSource, QueryDataRequest, QueryDataResponse};
