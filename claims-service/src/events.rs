//! Token issuance start callback payload sent by the identity provider.
//!
//! Only the fields this service reads are typed strictly; principals and the
//! client descriptor are carried as opaque JSON objects but must be present.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenIssuanceEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: TokenIssuanceEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenIssuanceEventData {
    pub authentication_context: AuthenticationContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationContext {
    pub user: EventUser,
    pub correlation_id: String,
    pub client: Map<String, Value>,
    pub protocol: String,
    pub client_service_principal: Map<String, Value>,
    pub resource_service_principal: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_principal_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventUser {
    /// User principal name, falling back to the object id. Blank values count as absent.
    pub fn staging_key(&self) -> Option<&str> {
        non_blank(self.user_principal_name.as_deref()).or_else(|| non_blank(self.id.as_deref()))
    }
}

impl TokenIssuanceEvent {
    pub fn context(&self) -> &AuthenticationContext {
        &self.data.authentication_context
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}
