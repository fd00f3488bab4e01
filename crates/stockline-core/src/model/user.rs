use serde::Deserialize;

use super::{EntityId, Record};

/// A department member with access to the inventory service.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default, rename = "slackId", alias = "slack_id")]
    pub slack_id: String,
}

impl Record for User {
    fn id(&self) -> &EntityId {
        &self.id
    }
}
