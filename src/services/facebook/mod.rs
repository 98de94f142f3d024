pub mod client;

pub use client::{build_authorization_url, FacebookClient, GraphApiError};

use serde::{Deserialize, Serialize};

/// Graph API version pinned for every endpoint, including the OAuth dialog.
pub const GRAPH_API_VERSION: &str = "v17.0";

/// Permissions requested when connecting a Facebook account; covers ad,
/// pixel, and profile reads.
pub const FACEBOOK_SCOPES: &[&str] = &[
    "ads_read",
    "ads_management",
    "business_management",
    "pages_read_engagement",
    "catalog_management",
    "email",
    "public_profile",
];

/// Generic Graph list envelope; `data` is absent on some error payloads,
/// so it defaults to empty.
#[derive(Debug, Default, Deserialize)]
pub struct Paged<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FacebookProfile {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdAccount {
    pub id: String,
    pub name: Option<String>,
    pub account_id: Option<String>,
    pub business_name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphCampaign {
    pub id: String,
    pub name: Option<String>,
    pub status: Option<String>,
    pub objective: Option<String>,
    pub daily_budget: Option<String>,
    pub lifetime_budget: Option<String>,
    pub created_time: Option<String>,
    pub start_time: Option<String>,
    pub stop_time: Option<String>,
    pub updated_time: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphPixel {
    pub id: String,
    pub name: Option<String>,
    pub creation_time: Option<String>,
    pub last_fired_time: Option<String>,
    pub data_use_setting: Option<String>,
    pub code_update_status: Option<String>,
    pub is_created_by_business: Option<bool>,
}

/// One row of a pixel's per-event statistics
/// (`/<pixel>/stats?aggregation=event`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PixelEvent {
    pub event_name: Option<String>,
    pub count: Option<i64>,
}

/// A pixel combined with its event statistics, as returned to the client by
/// `get-ad-data` and accepted back by `sync-data`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PixelWithEvents {
    #[serde(flatten)]
    pub pixel: GraphPixel,
    #[serde(default)]
    pub events: Vec<PixelEvent>,
}

/// One `actions` entry from a campaign insights row. `value` is a stringly
/// count, following the Graph API's own encoding.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionStat {
    pub action_type: String,
    pub value: Option<String>,
}

/// One row of `/insights` for a campaign over the last-30d preset.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct InsightsRow {
    pub spend: Option<String>,
    pub impressions: Option<String>,
    pub clicks: Option<String>,
    pub actions: Option<Vec<ActionStat>>,
    pub cost_per_action_type: Option<Vec<ActionStat>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paged_defaults_to_empty_on_missing_data() {
        let paged: Paged<GraphCampaign> = serde_json::from_str("{}").unwrap();
        assert!(paged.data.is_empty());
    }

    #[test]
    fn test_pixel_with_events_flattens() {
        let json = r#"{
            "id": "987654321",
            "name": "Storefront pixel",
            "last_fired_time": "2024-05-01T12:00:00+0000",
            "events": [{"event_name": "Purchase", "count": 42}]
        }"#;
        let pixel: PixelWithEvents = serde_json::from_str(json).unwrap();
        assert_eq!(pixel.pixel.id, "987654321");
        assert_eq!(pixel.events.len(), 1);
        assert_eq!(pixel.events[0].event_name.as_deref(), Some("Purchase"));
    }

    #[test]
    fn test_pixel_events_default_when_absent() {
        let pixel: PixelWithEvents = serde_json::from_str(r#"{"id": "1"}"#).unwrap();
        assert!(pixel.events.is_empty());
    }

    #[test]
    fn test_insights_row_tolerates_sparse_payload() {
        let row: InsightsRow = serde_json::from_str(r#"{"spend": "12.34"}"#).unwrap();
        assert_eq!(row.spend.as_deref(), Some("12.34"));
        assert!(row.actions.is_none());
    }
}
