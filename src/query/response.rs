//! Response data model

use super::model::DataQuery;
use crate::frame::Frame;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A batch of queries sharing one datasource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryDataRequest {
    pub queries: Vec<DataQuery>,
}

impl QueryDataRequest {
    pub fn new(queries: Vec<DataQuery>) -> Self {
        Self { queries }
    }
}

/// Who an error is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSource {
    /// The engine itself (bad input, unsupported shape, defect)
    Plugin,
    /// The external database
    Downstream,
}

/// Result of one query
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse {
    pub frames: Vec<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_source: Option<ErrorSource>,
}

impl DataResponse {
    pub fn from_frame(frame: Frame) -> Self {
        Self {
            frames: vec![frame],
            error: None,
            error_source: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Responses of a batch keyed by RefID
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryDataResponse {
    pub responses: HashMap<String, DataResponse>,
}

impl QueryDataResponse {
    pub fn get(&self, ref_id: &str) -> Option<&DataResponse> {
        self.responses.get(ref_id)
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}
