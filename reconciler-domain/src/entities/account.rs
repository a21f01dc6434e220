// External account entity
// Identity directory profile of a purchaser

use serde::{Deserialize, Serialize};

use crate::value_objects::normalize_login;

/// A user record as returned by the identity directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: i64,
    pub login: String,
    pub display_name: String,
    pub user_type: String,
    pub broadcaster_type: String,
    pub description: String,
    pub created_at_epoch_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAccount {
    pub external_id: i64,
    pub login_name: String,
    pub display_name: String,
    pub account_type: String,
    pub tier: String,
    pub description: String,
    pub created_at_epoch_millis: i64,
}

impl From<DirectoryUser> for ExternalAccount {
    fn from(user: DirectoryUser) -> Self {
        Self {
            external_id: user.id,
            login_name: normalize_login(&user.login),
            display_name: user.display_name,
            account_type: user.user_type,
            tier: user.broadcaster_type,
            description: user.description,
            created_at_epoch_millis: user.created_at_epoch_millis,
        }
    }
}
