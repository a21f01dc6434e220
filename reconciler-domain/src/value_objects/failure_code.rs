// Dead-letter failure code value object

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DlqFailureCode {
    MissingPurchaserName,
    InvalidName,
    TwitchApiError,
    ParseError,
}

impl DlqFailureCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DlqFailureCode::MissingPurchaserName => "MISSING_PURCHASER_NAME",
            DlqFailureCode::InvalidName => "INVALID_NAME",
            DlqFailureCode::TwitchApiError => "TWITCH_API_ERROR",
            DlqFailureCode::ParseError => "PARSE_ERROR",
        }
    }
}
