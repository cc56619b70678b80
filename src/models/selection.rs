use serde::{Serialize, Serializer};

/// Why a selection fell back to the rank-order heads
///
/// Informational only: a selection carrying one of these still holds usable
/// ids whenever both candidate lists were non-empty.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("insufficient items: {tops} tops, {bottoms} bottoms")]
    InsufficientItems { tops: usize, bottoms: usize },

    #[error("call failed: {0}")]
    CallFailed(String),

    #[error("invalid response format: {0}")]
    InvalidResponseFormat(String),

    #[error("ids not in catalog: {0}")]
    IdsNotInCatalog(String),
}

/// Outcome of choosing a top and bottom for a user
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SelectionResult {
    pub top_id: Option<String>,
    pub bottom_id: Option<String>,
    pub outfit_name: String,
    pub style_notes: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<SelectionError>,
}

impl SelectionResult {
    /// Both ids, when the selection produced a complete outfit
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (&self.top_id, &self.bottom_id) {
            (Some(top), Some(bottom)) => Some((top.as_str(), bottom.as_str())),
            _ => None,
        }
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<SelectionError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}
