//! Claims composition for the provide-claims-for-token action.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::staging::ConsumeOutcome;
use crate::store::StoreKind;

pub const API_VERSION: &str = "1.0.0";
pub const CLAIMS_SOURCE: &str = "custom-claims-provider";
pub const PROVIDE_CLAIMS_ACTION: &str =
    "microsoft.graph.tokenIssuanceStart.provideClaimsForToken";

pub const DEFAULT_BUSINESS_UNIT: &str = "Default";
pub const DEFAULT_DEVICE_INFO: &str = "Server-Generated";
pub const DEFAULT_CUSTOM_DATA: &str = "No frontend data available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Frontend,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomClaims {
    pub api_version: &'static str,
    pub correlation_id: String,
    pub timestamp: String,
    pub source: &'static str,
    #[serde(rename = "storage_type")]
    pub storage_type: StoreKind,
    pub business_unit: String,
    pub device_info: String,
    pub custom_data: String,
    pub data_source: DataSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_age: Option<f64>,
}

/// Builds the claims for one token from whatever staging produced. Pure: the
/// clock is an argument.
pub fn compose_claims(
    correlation_id: &str,
    outcome: &ConsumeOutcome,
    storage_type: StoreKind,
    now: DateTime<Utc>,
) -> CustomClaims {
    let (business_unit, device_info, custom_data, data_source, data_age) = match outcome {
        ConsumeOutcome::Staged {
            record,
            data_age_seconds,
        } => (
            record.business_unit.clone(),
            record.device_info.clone(),
            record.custom_data.clone().unwrap_or_default(),
            DataSource::Frontend,
            Some(*data_age_seconds),
        ),
        ConsumeOutcome::Missing => (
            DEFAULT_BUSINESS_UNIT.to_string(),
            DEFAULT_DEVICE_INFO.to_string(),
            DEFAULT_CUSTOM_DATA.to_string(),
            DataSource::Default,
            None,
        ),
    };

    CustomClaims {
        api_version: API_VERSION,
        correlation_id: correlation_id.to_string(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Micros, true),
        source: CLAIMS_SOURCE,
        storage_type,
        business_unit,
        device_info,
        custom_data,
        data_source,
        data_age,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimsResponse {
    pub data: ClaimsResponseData,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimsResponseData {
    pub actions: Vec<ClaimsAction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimsAction {
    #[serde(rename = "@odata.type")]
    pub odata_type: &'static str,
    pub claims: CustomClaims,
}

impl ClaimsResponse {
    /// Single provide-claims action carrying `claims`.
    pub fn provide(claims: CustomClaims) -> Self {
        Self {
            data: ClaimsResponseData {
                actions: vec![ClaimsAction {
                    odata_type: PROVIDE_CLAIMS_ACTION,
                    claims,
                }],
            },
        }
    }
}
