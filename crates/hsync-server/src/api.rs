//! Request and response bodies of the HTTP surface.

use hsync_types::DocumentHandle;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP endpoint paths.
pub mod endpoints {
    pub const ROOT: &str = "/";
    pub const HANDLE: &str = "/api/handle";
    pub const ASSIGN: &str = "/api/assign";
}

pub const LIVENESS_TEXT: &str = "👍 hsync sync server is running";

/// Body of `POST /api/handle`.
///
/// Fields are kept as raw JSON so a wrong type is reported as a bad
/// argument instead of a parse failure.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HandleRequest {
    #[serde(default)]
    pub iid: Value,
}

/// Body of `POST /api/assign`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    pub iid: Value,
    #[serde(default)]
    pub handle: Value,
}

/// `result` of a lookup: the handle, or `false` when nothing is assigned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupResult {
    Found(String),
    NotFound(bool),
}

impl LookupResult {
    pub fn handle(&self) -> Option<&str> {
        match self {
            Self::Found(h) => Some(h),
            Self::NotFound(_) => None,
        }
    }
}

impl From<Option<DocumentHandle>> for LookupResult {
    fn from(handle: Option<DocumentHandle>) -> Self {
        match handle {
            Some(h) => Self::Found(h.into_inner()),
            None => Self::NotFound(false),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResponse {
    pub result: LookupResult,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignResponse {
    pub result: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A JSON value that is a non-empty string.
pub(crate) fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}
