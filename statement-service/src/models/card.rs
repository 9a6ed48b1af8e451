use serde::{Deserialize, Serialize};

/// Ownership record for a payment card. Cards are managed elsewhere; the
/// confirm phase only checks who owns them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    #[serde(rename = "_id")]
    pub card_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
