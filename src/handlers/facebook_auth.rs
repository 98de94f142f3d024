use actix_web::{web, HttpResponse, Responder};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use sea_orm::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{facebook_auth_state, facebook_integration};
use crate::services::ad_sync::AdSyncService;
use crate::services::facebook::{
    build_authorization_url, AdAccount, FacebookClient, FacebookProfile, GraphCampaign,
    PixelWithEvents,
};
use crate::services::sync_progress::SyncProgressTracker;
use crate::utils::{config::Config, encryption, validators};

/// Validity window for an in-flight OAuth attempt.
const AUTH_STATE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdDataRequest {
    pub account_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SyncDataRequest {
    pub pixels: Vec<PixelWithEvents>,
    pub campaigns: Vec<GraphCampaign>,
    #[serde(rename = "accountId")]
    pub account_id: String,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// GET /facebook-auth/authorize
/// Stores a CSRF state row and returns the Facebook OAuth dialog URL.
pub async fn authorize(
    db: web::Data<DatabaseConnection>,
    config: web::Data<Config>,
    user_claims: web::ReqData<crate::middleware::auth::Claims>,
) -> Result<impl Responder, actix_web::Error> {
    let user_id = Uuid::parse_str(&user_claims.sub)
        .map_err(|e| actix_web::error::ErrorBadRequest(format!("Invalid user ID: {}", e)))?;

    let state_token = Uuid::new_v4().to_string();
    log::info!("Starting Facebook OAuth for user {}", user_id);

    let auth_state = facebook_auth_state::ActiveModel {
        id: Set(Uuid::new_v4()),
        state_token: Set(state_token.clone()),
        user_id: Set(user_id),
        created_at: Set(Utc::now()),
        expires_at: Set(Utc::now() + Duration::minutes(AUTH_STATE_TTL_MINUTES)),
    };

    facebook_auth_state::Entity::insert(auth_state)
        .exec(db.as_ref())
        .await
        .map_err(|e| {
            log::error!("Failed to store auth state: {}", e);
            actix_web::error::ErrorInternalServerError("Failed to create auth state")
        })?;

    let auth_url = build_authorization_url(
        &config.facebook_app_id,
        &config.facebook_redirect_uri(),
        &state_token,
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({ "authUrl": auth_url })))
}

/// GET /facebook-auth/callback?code&state
/// Completes the OAuth handshake. Every failure lands on the dashboard's
/// facebook-success page with an error status and message.
pub async fn callback(
    db: web::Data<DatabaseConnection>,
    config: web::Data<Config>,
    query: web::Query<CallbackQuery>,
    user_claims: web::ReqData<crate::middleware::auth::Claims>,
) -> impl Responder {
    let user_id = match Uuid::parse_str(&user_claims.sub) {
        Ok(id) => id,
        Err(_) => return error_redirect(&config, "Invalid user ID"),
    };

    match run_callback(db.as_ref(), &config, &query, user_id).await {
        Ok(()) => {
            log::info!("Facebook OAuth completed for user {}", user_id);
            redirect_to(format!(
                "{}/facebook-success?status=success",
                config.frontend_url
            ))
        }
        Err(e) => {
            log::error!("Facebook OAuth callback failed for user {}: {}", user_id, e);
            error_redirect(&config, &e.to_string())
        }
    }
}

async fn run_callback(
    db: &DatabaseConnection,
    config: &Config,
    query: &CallbackQuery,
    user_id: Uuid,
) -> Result<()> {
    let code = query
        .code
        .as_deref()
        .ok_or_else(|| anyhow!("Missing code parameter"))?;
    let state = query
        .state
        .as_deref()
        .ok_or_else(|| anyhow!("Missing state parameter"))?;

    let auth_state = facebook_auth_state::Entity::find()
        .filter(facebook_auth_state::Column::StateToken.eq(state))
        .one(db)
        .await
        .context("Database error looking up auth state")?
        .ok_or_else(|| anyhow!("Invalid authentication state"))?;

    // Single-use: the row is consumed on read, before any validation or
    // token exchange, so a replayed state can never reach Facebook.
    facebook_auth_state::Entity::delete_by_id(auth_state.id)
        .exec(db)
        .await
        .context("Failed to consume auth state")?;

    validate_auth_state(&auth_state, user_id, Utc::now())?;

    let client = FacebookClient::new();
    let token = client
        .exchange_code(
            &config.facebook_app_id,
            &config.facebook_app_secret,
            &config.facebook_redirect_uri(),
            code,
        )
        .await
        .context("Failed to exchange authorization code")?;

    let profile = client
        .fetch_profile(&token.access_token)
        .await
        .context("Failed to fetch Facebook profile")?;
    log::info!("Facebook profile fetched: {}", profile.id);

    // Best effort: a connection without ad accounts is still a connection.
    let ad_accounts = match client.fetch_ad_accounts(&token.access_token).await {
        Ok(accounts) => accounts,
        Err(e) => {
            log::warn!("Failed to fetch ad accounts, storing none: {}", e);
            Vec::new()
        }
    };

    let encrypted_token = encryption::encrypt(&token.access_token, &config.encryption_key)
        .context("Failed to encrypt access token")?;

    upsert_integration(
        db,
        user_id,
        &profile,
        encrypted_token,
        token.expires_in,
        ad_accounts,
    )
    .await?;

    Ok(())
}

/// The stored state must belong to the caller and still be inside its TTL.
/// Checked before the token exchange.
fn validate_auth_state(
    auth_state: &facebook_auth_state::Model,
    caller: Uuid,
    now: DateTime<Utc>,
) -> Result<()> {
    if auth_state.user_id != caller {
        return Err(anyhow!("Authentication state belongs to a different user"));
    }
    if auth_state.expires_at < now {
        return Err(anyhow!("Authentication state has expired"));
    }
    Ok(())
}

async fn upsert_integration(
    db: &DatabaseConnection,
    user_id: Uuid,
    profile: &FacebookProfile,
    encrypted_token: String,
    expires_in: Option<i64>,
    ad_accounts: Vec<AdAccount>,
) -> Result<()> {
    let now = Utc::now();
    let ad_accounts_json =
        serde_json::to_value(ad_accounts).context("Failed to serialize ad accounts")?;

    let existing = facebook_integration::Entity::find()
        .filter(facebook_integration::Column::UserId.eq(user_id))
        .one(db)
        .await
        .context("Database error looking up integration")?;

    if let Some(integration) = existing {
        let mut integration: facebook_integration::ActiveModel = integration.into();
        integration.facebook_user_id = Set(profile.id.clone());
        integration.facebook_user_name = Set(profile.name.clone());
        integration.facebook_user_email = Set(profile.email.clone());
        integration.access_token = Set(encrypted_token);
        integration.token_expires_in = Set(expires_in);
        integration.ad_accounts = Set(ad_accounts_json);
        integration.connected_at = Set(now);
        integration.is_active = Set(true);
        integration.updated_at = Set(now);

        integration
            .update(db)
            .await
            .context("Failed to update integration")?;
        log::info!("Updated Facebook integration for user {}", user_id);
    } else {
        let integration = facebook_integration::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            facebook_user_id: Set(profile.id.clone()),
            facebook_user_name: Set(profile.name.clone()),
            facebook_user_email: Set(profile.email.clone()),
            access_token: Set(encrypted_token),
            token_expires_in: Set(expires_in),
            ad_accounts: Set(ad_accounts_json),
            connected_at: Set(now),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        facebook_integration::Entity::insert(integration)
            .exec(db)
            .await
            .context("Failed to create integration")?;
        log::info!("Created Facebook integration for user {}", user_id);
    }

    Ok(())
}

fn error_redirect(config: &Config, message: &str) -> HttpResponse {
    redirect_to(format!(
        "{}/facebook-success?status=error&message={}",
        config.frontend_url,
        urlencoding::encode(message)
    ))
}

fn redirect_to(location: String) -> HttpResponse {
    HttpResponse::Found()
        .append_header(("Location", location))
        .finish()
}

/// POST /facebook-auth/get-ad-data
/// Fetches campaigns, pixels, and per-pixel event stats for one ad account.
/// Nothing is persisted here; the client feeds the payload back through
/// sync-data.
pub async fn get_ad_data(
    db: web::Data<DatabaseConnection>,
    config: web::Data<Config>,
    tracker: web::Data<SyncProgressTracker>,
    req: web::Json<AdDataRequest>,
    user_claims: web::ReqData<crate::middleware::auth::Claims>,
) -> Result<impl Responder, actix_web::Error> {
    let user_id = Uuid::parse_str(&user_claims.sub)
        .map_err(|e| actix_web::error::ErrorBadRequest(format!("Invalid user ID: {}", e)))?;

    validators::validate_account_id(&req.account_id)
        .map_err(|e| actix_web::error::ErrorBadRequest(e.to_string()))?;

    let integration = facebook_integration::Entity::find()
        .filter(facebook_integration::Column::UserId.eq(user_id))
        .filter(facebook_integration::Column::IsActive.eq(true))
        .one(db.as_ref())
        .await
        .map_err(|e| {
            log::error!("Database error: {}", e);
            actix_web::error::ErrorInternalServerError("Database error")
        })?
        .ok_or_else(|| actix_web::error::ErrorNotFound("Facebook integration not found"))?;

    let access_token = encryption::decrypt(&integration.access_token, &config.encryption_key)
        .map_err(|e| {
            log::error!("Failed to decrypt access token: {}", e);
            actix_web::error::ErrorInternalServerError("Failed to decrypt access token")
        })?;

    tracker.set_loading(&req.account_id, "Fetching data from Facebook");

    let service = AdSyncService::new(db.get_ref().clone());
    match service.fetch_ad_data(&req.account_id, &access_token).await {
        Ok(data) => {
            tracker.set_loading(&req.account_id, "Data fetched, awaiting sync");
            Ok(HttpResponse::Ok().json(data))
        }
        Err(e) => {
            log::error!("Failed to fetch ad data for {}: {}", req.account_id, e);
            tracker.set_error(&req.account_id, &e.to_string());
            Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            }))
        }
    }
}

/// POST /facebook-auth/sync-data
/// Upserts the fetched pixels and campaigns into the dashboard tables.
pub async fn sync_data(
    db: web::Data<DatabaseConnection>,
    tracker: web::Data<SyncProgressTracker>,
    req: web::Json<SyncDataRequest>,
    user_claims: web::ReqData<crate::middleware::auth::Claims>,
) -> Result<impl Responder, actix_web::Error> {
    let user_id = Uuid::parse_str(&user_claims.sub)
        .map_err(|e| actix_web::error::ErrorBadRequest(format!("Invalid user ID: {}", e)))?;

    tracker.set_loading(&req.account_id, "Syncing data to the dashboard");

    let service = AdSyncService::new(db.get_ref().clone());
    match service
        .sync_ad_data(
            user_id,
            &req.account_id,
            &req.access_token,
            &req.pixels,
            &req.campaigns,
        )
        .await
    {
        Ok(outcome) => {
            if !outcome.errors.is_empty() {
                log::warn!(
                    "Sync for {} finished with {} row errors",
                    req.account_id,
                    outcome.errors.len()
                );
            }
            tracker.set_success(&req.account_id, "Data synced successfully");
            Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
        }
        Err(e) => {
            log::error!("Sync failed for {}: {}", req.account_id, e);
            tracker.set_error(&req.account_id, &e.to_string());
            Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_model(user_id: Uuid, expires_at: DateTime<Utc>) -> facebook_auth_state::Model {
        facebook_auth_state::Model {
            id: Uuid::new_v4(),
            state_token: Uuid::new_v4().to_string(),
            user_id,
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[test]
    fn test_valid_state_accepted() {
        let user = Uuid::new_v4();
        let state = state_model(user, Utc::now() + Duration::minutes(5));
        assert!(validate_auth_state(&state, user, Utc::now()).is_ok());
    }

    #[test]
    fn test_state_of_other_user_rejected() {
        let state = state_model(Uuid::new_v4(), Utc::now() + Duration::minutes(5));
        let forged_caller = Uuid::new_v4();
        let err = validate_auth_state(&state, forged_caller, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("different user"));
    }

    #[test]
    fn test_expired_state_rejected() {
        let user = Uuid::new_v4();
        let state = state_model(user, Utc::now() - Duration::minutes(1));
        let err = validate_auth_state(&state, user, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }
}
