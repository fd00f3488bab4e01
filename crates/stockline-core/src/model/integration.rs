use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Deserialize;

use super::{EntityId, Record};

/// Credentials and routing for one chat-workspace integration.
///
/// Tokens are wrapped in [`SecretString`] so they never leak through
/// `Debug` output or log fields.
#[derive(Debug, Clone, Deserialize)]
pub struct IntegrationConfig {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub bot_token: SecretString,
    #[serde(default)]
    pub app_token: Option<SecretString>,
    #[serde(default)]
    pub user_token: Option<SecretString>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub channel_ids: Vec<String>,
}

impl Record for IntegrationConfig {
    fn id(&self) -> &EntityId {
        &self.id
    }
}
