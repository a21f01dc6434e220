// Change record entity
// Raw change-feed item carrying the record state after the change

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Insert,
    Modify,
    Remove,
    #[serde(other)]
    Unknown,
}

/// Typed attribute of an after image, in the feed's `{"S": ..}` / `{"N": ..}` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    #[serde(rename = "S")]
    S(String),
    #[serde(rename = "N")]
    N(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::S(value) | AttributeValue::N(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub change_type: ChangeType,
    pub sequence_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_image: Option<HashMap<String, AttributeValue>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeFeedBatch {
    #[serde(default)]
    pub records: Vec<ChangeRecord>,
}
