use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use super::{
    AdAccount, FacebookProfile, GraphCampaign, GraphPixel, InsightsRow, Paged, PixelEvent,
    TokenResponse, FACEBOOK_SCOPES, GRAPH_API_VERSION,
};
use crate::utils::http_client::create_http_client;

const GRAPH_BASE_URL: &str = "https://graph.facebook.com";
const DIALOG_BASE_URL: &str = "https://www.facebook.com";

const CAMPAIGN_FIELDS: &str =
    "id,name,status,objective,daily_budget,lifetime_budget,created_time,start_time,stop_time,updated_time";
const PIXEL_FIELDS: &str =
    "id,name,owner_business,data_use_setting,creation_time,is_created_by_business,last_fired_time,owner_ad_account,code_update_status";
const INSIGHTS_FIELDS: &str = "spend,impressions,clicks,actions,conversions,cost_per_action_type";
const PROFILE_FIELDS: &str = "id,name,email";
const AD_ACCOUNT_FIELDS: &str = "id,name,account_id,business_name";

#[derive(Debug, Error)]
pub enum GraphApiError {
    #[error("Graph API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Graph API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Graph API did not return an access token")]
    MissingAccessToken,
}

/// A successfully exchanged OAuth token.
#[derive(Debug)]
pub struct ExchangedToken {
    pub access_token: String,
    pub expires_in: Option<i64>,
}

/// Build the Facebook OAuth dialog URL the browser is sent to.
pub fn build_authorization_url(app_id: &str, redirect_uri: &str, state: &str) -> String {
    let mut auth_url = Url::parse(DIALOG_BASE_URL).expect("dialog base URL is valid");
    auth_url.set_path(&format!("{}/dialog/oauth", GRAPH_API_VERSION));
    auth_url
        .query_pairs_mut()
        .append_pair("client_id", app_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("state", state)
        .append_pair("scope", &FACEBOOK_SCOPES.join(","))
        .append_pair("response_type", "code");

    auth_url.to_string()
}

/// Thin typed client over the Facebook Graph API. All calls are sequential
/// single requests; pagination beyond the first page is not followed.
pub struct FacebookClient {
    http: Client,
    graph_url: String,
}

impl FacebookClient {
    pub fn new() -> Self {
        Self {
            http: create_http_client(),
            graph_url: format!("{}/{}", GRAPH_BASE_URL, GRAPH_API_VERSION),
        }
    }

    /// Point the client at a local mock server instead of Graph.
    #[cfg(test)]
    pub fn with_graph_url(graph_url: &str) -> Self {
        Self {
            http: create_http_client(),
            graph_url: graph_url.trim_end_matches('/').to_string(),
        }
    }

    /// Exchange an OAuth authorization code for an access token.
    pub async fn exchange_code(
        &self,
        app_id: &str,
        app_secret: &str,
        redirect_uri: &str,
        code: &str,
    ) -> Result<ExchangedToken, GraphApiError> {
        let response = self
            .http
            .get(format!("{}/oauth/access_token", self.graph_url))
            .query(&[
                ("client_id", app_id),
                ("client_secret", app_secret),
                ("redirect_uri", redirect_uri),
                ("code", code),
            ])
            .send()
            .await?;

        let token: TokenResponse = self.parse(response).await?;
        let access_token = token
            .access_token
            .ok_or(GraphApiError::MissingAccessToken)?;

        Ok(ExchangedToken {
            access_token,
            expires_in: token.expires_in,
        })
    }

    /// Fetch the token owner's basic profile.
    pub async fn fetch_profile(
        &self,
        access_token: &str,
    ) -> Result<FacebookProfile, GraphApiError> {
        let response = self
            .http
            .get(format!("{}/me", self.graph_url))
            .query(&[("fields", PROFILE_FIELDS), ("access_token", access_token)])
            .send()
            .await?;

        self.parse(response).await
    }

    /// Fetch the ad accounts the token can read.
    pub async fn fetch_ad_accounts(
        &self,
        access_token: &str,
    ) -> Result<Vec<AdAccount>, GraphApiError> {
        let response = self
            .http
            .get(format!("{}/me/adaccounts", self.graph_url))
            .query(&[
                ("fields", AD_ACCOUNT_FIELDS),
                ("access_token", access_token),
            ])
            .send()
            .await?;

        let paged: Paged<AdAccount> = self.parse(response).await?;
        Ok(paged.data)
    }

    /// Fetch the campaign list of an ad account.
    pub async fn fetch_campaigns(
        &self,
        account_id: &str,
        access_token: &str,
    ) -> Result<Vec<GraphCampaign>, GraphApiError> {
        let response = self
            .http
            .get(format!("{}/{}/campaigns", self.graph_url, account_id))
            .query(&[("fields", CAMPAIGN_FIELDS), ("access_token", access_token)])
            .send()
            .await?;

        let paged: Paged<GraphCampaign> = self.parse(response).await?;
        Ok(paged.data)
    }

    /// Fetch the pixel list of an ad account.
    pub async fn fetch_pixels(
        &self,
        account_id: &str,
        access_token: &str,
    ) -> Result<Vec<GraphPixel>, GraphApiError> {
        let response = self
            .http
            .get(format!("{}/{}/adspixels", self.graph_url, account_id))
            .query(&[("fields", PIXEL_FIELDS), ("access_token", access_token)])
            .send()
            .await?;

        let paged: Paged<GraphPixel> = self.parse(response).await?;
        Ok(paged.data)
    }

    /// Fetch a pixel's per-event statistics.
    pub async fn fetch_pixel_events(
        &self,
        pixel_id: &str,
        access_token: &str,
    ) -> Result<Vec<PixelEvent>, GraphApiError> {
        let response = self
            .http
            .get(format!("{}/{}/stats", self.graph_url, pixel_id))
            .query(&[
                ("aggregation", "event"),
                ("event_type", "all"),
                ("access_token", access_token),
            ])
            .send()
            .await?;

        let paged: Paged<PixelEvent> = self.parse(response).await?;
        Ok(paged.data)
    }

    /// Fetch a campaign's spend/conversion insights over the last 30 days.
    /// Campaigns without delivery come back with an empty data array; that
    /// maps to a default (all-None) row.
    pub async fn fetch_campaign_insights(
        &self,
        campaign_id: &str,
        access_token: &str,
    ) -> Result<InsightsRow, GraphApiError> {
        let response = self
            .http
            .get(format!("{}/{}/insights", self.graph_url, campaign_id))
            .query(&[
                ("fields", INSIGHTS_FIELDS),
                ("date_preset", "last_30d"),
                ("access_token", access_token),
            ])
            .send()
            .await?;

        let paged: Paged<InsightsRow> = self.parse(response).await?;
        Ok(paged.data.into_iter().next().unwrap_or_default())
    }

    async fn parse<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, GraphApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(GraphApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

impl Default for FacebookClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_url_carries_oauth_params() {
        let url = build_authorization_url(
            "123456",
            "https://api.example.com/facebook-auth/callback",
            "state-abc",
        );

        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.host_str(), Some("www.facebook.com"));
        assert_eq!(parsed.path(), "/v17.0/dialog/oauth");

        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("client_id".into(), "123456".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "https://api.example.com/facebook-auth/callback".into()
        )));
        assert!(pairs.contains(&("state".into(), "state-abc".into())));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
    }

    #[test]
    fn test_authorization_url_scope_list() {
        let url = build_authorization_url("id", "https://cb.example.com", "s");
        let parsed = Url::parse(&url).unwrap();
        let scope = parsed
            .query_pairs()
            .find(|(k, _)| k == "scope")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(scope.split(',').count(), FACEBOOK_SCOPES.len());
        assert!(scope.contains("ads_read"));
        assert!(scope.contains("public_profile"));
    }

    #[tokio::test]
    async fn test_exchange_code_without_token_in_body_fails() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/access_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"token_type": "bearer"})),
            )
            .mount(&server)
            .await;

        let client = FacebookClient::with_graph_url(&server.uri());
        let err = client
            .exchange_code("app", "secret", "https://cb.example.com", "code")
            .await
            .unwrap_err();
        assert!(matches!(err, GraphApiError::MissingAccessToken));
    }

    #[tokio::test]
    async fn test_non_success_status_surfaces_body() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"error":{"message":"Invalid OAuth access token"}}"#),
            )
            .mount(&server)
            .await;

        let client = FacebookClient::with_graph_url(&server.uri());
        let err = client.fetch_profile("bad-token").await.unwrap_err();
        match err {
            GraphApiError::Status { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("Invalid OAuth access token"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
