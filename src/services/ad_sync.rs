use anyhow::Result;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{campaign, pixel};
use crate::services::facebook::{
    ActionStat, FacebookClient, GraphApiError, GraphCampaign, PixelEvent, PixelWithEvents,
};

/// Action types counted as conversions when reading campaign insights.
const PURCHASE_ACTION_TYPES: &[&str] =
    &["purchase", "omni_purchase", "offline_conversion.purchase"];

/// Everything `get-ad-data` returns to the client: the account's campaigns
/// and its pixels, each pixel carrying its event statistics.
#[derive(Debug, Serialize)]
pub struct AdData {
    pub campaigns: Vec<GraphCampaign>,
    pub pixels: Vec<PixelWithEvents>,
}

#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub pixels_upserted: u32,
    pub campaigns_upserted: u32,
    pub errors: Vec<String>,
}

pub struct AdSyncService {
    db: DatabaseConnection,
    client: FacebookClient,
}

impl AdSyncService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            client: FacebookClient::new(),
        }
    }

    /// Fetch an ad account's campaigns, pixels, and per-pixel event stats.
    /// Calls are sequential; the first failure fails the whole fetch.
    pub async fn fetch_ad_data(
        &self,
        account_id: &str,
        access_token: &str,
    ) -> Result<AdData, GraphApiError> {
        fetch_ad_data(&self.client, account_id, access_token).await
    }

    /// Upsert the fetched pixels and campaigns for a user. Row-level upsert
    /// failures are logged and collected without aborting the batch; a
    /// failed insights fetch aborts the call.
    ///
    /// The campaign loop is nested inside the pixel loop: every pixel pass
    /// re-fetches and re-upserts the full campaign list, and each campaign
    /// row ends up linked to the last pixel iterated. Which pixel a campaign
    /// *should* link to is an open product question; until that is answered
    /// this keeps the shipped behavior.
    pub async fn sync_ad_data(
        &self,
        user_id: Uuid,
        account_id: &str,
        access_token: &str,
        pixels: &[PixelWithEvents],
        campaigns: &[GraphCampaign],
    ) -> Result<SyncOutcome> {
        let mut outcome = SyncOutcome::default();

        for entry in pixels {
            match self.upsert_pixel(user_id, account_id, entry).await {
                Ok(()) => outcome.pixels_upserted += 1,
                Err(e) => {
                    let msg = format!("Failed to save pixel {}: {}", entry.pixel.id, e);
                    log::error!("{}", msg);
                    outcome.errors.push(msg);
                }
            }

            for graph_campaign in campaigns {
                let insights = self
                    .client
                    .fetch_campaign_insights(&graph_campaign.id, access_token)
                    .await?;

                let spend = parse_spend(insights.spend.as_deref());
                let conversions =
                    purchase_conversions(insights.actions.as_deref().unwrap_or_default());
                let cpa = cost_per_conversion(spend, conversions);

                match self
                    .upsert_campaign(
                        user_id,
                        account_id,
                        &entry.pixel.id,
                        graph_campaign,
                        spend,
                        conversions,
                        cpa,
                    )
                    .await
                {
                    Ok(()) => outcome.campaigns_upserted += 1,
                    Err(e) => {
                        let msg =
                            format!("Failed to save campaign {}: {}", graph_campaign.id, e);
                        log::error!("{}", msg);
                        outcome.errors.push(msg);
                    }
                }
            }
        }

        log::info!(
            "Sync completed for user {}: {} pixel upserts, {} campaign upserts, {} errors",
            user_id,
            outcome.pixels_upserted,
            outcome.campaigns_upserted,
            outcome.errors.len()
        );

        Ok(outcome)
    }

    async fn upsert_pixel(
        &self,
        user_id: Uuid,
        account_id: &str,
        entry: &PixelWithEvents,
    ) -> Result<(), DbErr> {
        pixel_upsert(user_id, account_id, entry).exec(&self.db).await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn upsert_campaign(
        &self,
        user_id: Uuid,
        account_id: &str,
        pixel_id: &str,
        graph_campaign: &GraphCampaign,
        spend: f64,
        conversions: i64,
        cpa: f64,
    ) -> Result<(), DbErr> {
        campaign_upsert(
            user_id,
            account_id,
            pixel_id,
            graph_campaign,
            spend,
            conversions,
            cpa,
        )
        .exec(&self.db)
        .await?;
        Ok(())
    }
}

/// Fetch campaigns, pixels, and per-pixel event stats for one ad account.
async fn fetch_ad_data(
    client: &FacebookClient,
    account_id: &str,
    access_token: &str,
) -> Result<AdData, GraphApiError> {
    let campaigns = client.fetch_campaigns(account_id, access_token).await?;
    log::info!("Fetched {} campaigns for {}", campaigns.len(), account_id);

    let graph_pixels = client.fetch_pixels(account_id, access_token).await?;
    log::info!("Fetched {} pixels for {}", graph_pixels.len(), account_id);

    let mut pixels = Vec::with_capacity(graph_pixels.len());
    for graph_pixel in graph_pixels {
        let events = client
            .fetch_pixel_events(&graph_pixel.id, access_token)
            .await?;
        pixels.push(PixelWithEvents {
            pixel: graph_pixel,
            events,
        });
    }

    Ok(AdData { campaigns, pixels })
}

/// Insert-or-update statement for one pixel, keyed by its platform id.
fn pixel_upsert(
    user_id: Uuid,
    account_id: &str,
    entry: &PixelWithEvents,
) -> Insert<pixel::ActiveModel> {
    let now = Utc::now();
    let row = pixel::ActiveModel {
        id: Set(entry.pixel.id.clone()),
        user_id: Set(user_id),
        name: Set(entry
            .pixel
            .name
            .clone()
            .unwrap_or_else(|| entry.pixel.id.clone())),
        platform: Set(pixel::AdPlatform::Facebook),
        status: Set(pixel_status(entry.pixel.last_fired_time.as_deref())),
        captured_events: Set(serde_json::json!(captured_event_names(&entry.events))),
        facebook_account_id: Set(Some(account_id.to_string())),
        facebook_last_fired_time: Set(entry.pixel.last_fired_time.clone()),
        facebook_creation_time: Set(entry.pixel.creation_time.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    pixel::Entity::insert(row).on_conflict(
        OnConflict::column(pixel::Column::Id)
            .update_columns([
                pixel::Column::Name,
                pixel::Column::Status,
                pixel::Column::CapturedEvents,
                pixel::Column::FacebookAccountId,
                pixel::Column::FacebookLastFiredTime,
                pixel::Column::FacebookCreationTime,
                pixel::Column::UpdatedAt,
            ])
            .to_owned(),
    )
}

/// Insert-or-update statement for one campaign, keyed by its platform id.
#[allow(clippy::too_many_arguments)]
fn campaign_upsert(
    user_id: Uuid,
    account_id: &str,
    pixel_id: &str,
    graph_campaign: &GraphCampaign,
    spend: f64,
    conversions: i64,
    cpa: f64,
) -> Insert<campaign::ActiveModel> {
    let row = campaign::ActiveModel {
        id: Set(graph_campaign.id.clone()),
        user_id: Set(user_id),
        name: Set(graph_campaign
            .name
            .clone()
            .unwrap_or_else(|| graph_campaign.id.clone())),
        pixel_id: Set(pixel_id.to_string()),
        spend: Set(spend),
        conversions: Set(conversions),
        cost_per_conversion: Set(cpa),
        facebook_account_id: Set(account_id.to_string()),
        facebook_status: Set(graph_campaign.status.clone()),
        facebook_budget: Set(campaign_budget(graph_campaign)),
        facebook_objective: Set(graph_campaign.objective.clone()),
        synced_at: Set(Utc::now()),
    };

    campaign::Entity::insert(row).on_conflict(
        OnConflict::column(campaign::Column::Id)
            .update_columns([
                campaign::Column::Name,
                campaign::Column::PixelId,
                campaign::Column::Spend,
                campaign::Column::Conversions,
                campaign::Column::CostPerConversion,
                campaign::Column::FacebookAccountId,
                campaign::Column::FacebookStatus,
                campaign::Column::FacebookBudget,
                campaign::Column::FacebookObjective,
                campaign::Column::SyncedAt,
            ])
            .to_owned(),
    )
}

/// A pixel is active only if the platform reported a last-fired timestamp.
pub fn pixel_status(last_fired_time: Option<&str>) -> pixel::PixelStatus {
    match last_fired_time {
        Some(t) if !t.is_empty() => pixel::PixelStatus::Active,
        _ => pixel::PixelStatus::Inactive,
    }
}

/// Event names the platform has seen this pixel fire.
pub fn captured_event_names(events: &[PixelEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| event.event_name.clone())
        .collect()
}

/// Sum the counts of purchase-type actions from an insights row.
/// Graph sends action counts as strings, sometimes decimal ("2.00");
/// parse as float and truncate.
pub fn purchase_conversions(actions: &[ActionStat]) -> i64 {
    actions
        .iter()
        .filter(|action| PURCHASE_ACTION_TYPES.contains(&action.action_type.as_str()))
        .map(|action| {
            action
                .value
                .as_deref()
                .and_then(|v| v.parse::<f64>().ok())
                .map(|v| v as i64)
                .unwrap_or(0)
        })
        .sum()
}

/// Graph reports spend as a decimal string; missing or unparseable is 0.
pub fn parse_spend(spend: Option<&str>) -> f64 {
    spend.and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0)
}

/// Cost per conversion; 0 when there are no conversions.
pub fn cost_per_conversion(spend: f64, conversions: i64) -> f64 {
    if conversions > 0 {
        spend / conversions as f64
    } else {
        0.0
    }
}

/// Daily budget wins over lifetime budget when both are set.
pub fn campaign_budget(graph_campaign: &GraphCampaign) -> Option<String> {
    graph_campaign
        .daily_budget
        .clone()
        .or_else(|| graph_campaign.lifetime_budget.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::facebook::GraphPixel;

    fn action(action_type: &str, value: Option<&str>) -> ActionStat {
        ActionStat {
            action_type: action_type.to_string(),
            value: value.map(String::from),
        }
    }

    #[test]
    fn test_pixel_status_from_last_fired_time() {
        assert_eq!(
            pixel_status(Some("2024-05-01T12:00:00+0000")),
            pixel::PixelStatus::Active
        );
        assert_eq!(pixel_status(None), pixel::PixelStatus::Inactive);
        assert_eq!(pixel_status(Some("")), pixel::PixelStatus::Inactive);
    }

    #[test]
    fn test_captured_event_names_skips_unnamed() {
        let events = vec![
            PixelEvent {
                event_name: Some("Purchase".to_string()),
                count: Some(10),
            },
            PixelEvent {
                event_name: None,
                count: Some(3),
            },
            PixelEvent {
                event_name: Some("AddToCart".to_string()),
                count: None,
            },
        ];
        assert_eq!(captured_event_names(&events), vec!["Purchase", "AddToCart"]);
    }

    #[test]
    fn test_purchase_conversions_counts_only_purchase_types() {
        let actions = vec![
            action("purchase", Some("3")),
            action("omni_purchase", Some("2")),
            action("offline_conversion.purchase", Some("1")),
            action("link_click", Some("500")),
            action("purchase", None),
            action("purchase", Some("not-a-number")),
        ];
        assert_eq!(purchase_conversions(&actions), 6);
    }

    #[test]
    fn test_purchase_conversions_truncates_decimal_counts() {
        let actions = vec![
            action("purchase", Some("2.00")),
            action("omni_purchase", Some("3.75")),
        ];
        assert_eq!(purchase_conversions(&actions), 5);
    }

    #[test]
    fn test_purchase_conversions_empty() {
        assert_eq!(purchase_conversions(&[]), 0);
    }

    #[test]
    fn test_parse_spend() {
        assert_eq!(parse_spend(Some("123.45")), 123.45);
        assert_eq!(parse_spend(Some("garbage")), 0.0);
        assert_eq!(parse_spend(None), 0.0);
    }

    #[test]
    fn test_cost_per_conversion_zero_conversions_is_zero() {
        assert_eq!(cost_per_conversion(150.0, 0), 0.0);
        assert_eq!(cost_per_conversion(150.0, 3), 50.0);
    }

    fn graph_pixel(id: &str) -> GraphPixel {
        GraphPixel {
            id: id.to_string(),
            name: Some("Storefront pixel".to_string()),
            creation_time: Some("2024-01-01T00:00:00+0000".to_string()),
            last_fired_time: Some("2024-05-01T12:00:00+0000".to_string()),
            data_use_setting: None,
            code_update_status: None,
            is_created_by_business: None,
        }
    }

    fn graph_campaign(id: &str) -> GraphCampaign {
        GraphCampaign {
            id: id.to_string(),
            name: Some("Spring sale".to_string()),
            status: Some("ACTIVE".to_string()),
            objective: Some("OUTCOME_SALES".to_string()),
            daily_budget: Some("1000".to_string()),
            lifetime_budget: None,
            created_time: None,
            start_time: None,
            stop_time: None,
            updated_time: None,
        }
    }

    // Re-running a sync must update existing rows in place, so both upsert
    // statements have to carry an ON CONFLICT DO UPDATE clause on the
    // platform id.
    #[test]
    fn test_pixel_upsert_is_idempotent_by_id() {
        let entry = PixelWithEvents {
            pixel: graph_pixel("987654321"),
            events: vec![PixelEvent {
                event_name: Some("Purchase".to_string()),
                count: Some(42),
            }],
        };

        let sql = pixel_upsert(Uuid::new_v4(), "act_123", &entry)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#"ON CONFLICT ("id") DO UPDATE"#), "{}", sql);
        assert!(sql.contains(r#""updated_at""#), "{}", sql);
    }

    #[test]
    fn test_campaign_upsert_is_idempotent_by_id() {
        let sql = campaign_upsert(
            Uuid::new_v4(),
            "act_123",
            "987654321",
            &graph_campaign("111"),
            150.0,
            3,
            50.0,
        )
        .build(DbBackend::Postgres)
        .to_string();
        assert!(sql.contains(r#"ON CONFLICT ("id") DO UPDATE"#), "{}", sql);
        assert!(sql.contains(r#""synced_at""#), "{}", sql);
    }

    #[tokio::test]
    async fn test_fetch_ad_data_aggregates_pixels_with_events() {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/act_123/campaigns"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"id": "111", "name": "Spring sale", "status": "ACTIVE"},
                    {"id": "222", "name": "Retargeting", "status": "PAUSED"}
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/act_123/adspixels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"id": "987654321", "name": "Storefront pixel",
                     "last_fired_time": "2024-05-01T12:00:00+0000"}
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/987654321/stats"))
            .and(query_param("aggregation", "event"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"event_name": "Purchase", "count": 42}]
            })))
            .mount(&server)
            .await;

        let client = FacebookClient::with_graph_url(&server.uri());
        let data = fetch_ad_data(&client, "act_123", "token")
            .await
            .unwrap();

        assert_eq!(data.campaigns.len(), 2);
        assert_eq!(data.campaigns[0].id, "111");
        assert_eq!(data.pixels.len(), 1);
        assert_eq!(data.pixels[0].pixel.id, "987654321");
        assert_eq!(data.pixels[0].events.len(), 1);
        assert_eq!(
            data.pixels[0].events[0].event_name.as_deref(),
            Some("Purchase")
        );
    }

    #[test]
    fn test_campaign_budget_prefers_daily() {
        let mut c = GraphCampaign {
            id: "1".to_string(),
            name: None,
            status: None,
            objective: None,
            daily_budget: Some("1000".to_string()),
            lifetime_budget: Some("90000".to_string()),
            created_time: None,
            start_time: None,
            stop_time: None,
            updated_time: None,
        };
        assert_eq!(campaign_budget(&c).as_deref(), Some("1000"));

        c.daily_budget = None;
        assert_eq!(campaign_budget(&c).as_deref(), Some("90000"));

        c.lifetime_budget = None;
        assert_eq!(campaign_budget(&c), None);
    }
}
