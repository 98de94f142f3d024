use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use sea_orm::*;
use serde::Serialize;
use uuid::Uuid;

use crate::models::facebook_integration;

/// Connection status as shown on the integration page. The access token
/// never leaves the server.
#[derive(Debug, Serialize)]
pub struct IntegrationResponse {
    pub id: String,
    pub facebook_user_id: String,
    pub facebook_user_name: Option<String>,
    pub facebook_user_email: Option<String>,
    pub ad_accounts: serde_json::Value,
    pub connected_at: String,
    pub is_active: bool,
}

impl From<facebook_integration::Model> for IntegrationResponse {
    fn from(model: facebook_integration::Model) -> Self {
        Self {
            id: model.id.to_string(),
            facebook_user_id: model.facebook_user_id,
            facebook_user_name: model.facebook_user_name,
            facebook_user_email: model.facebook_user_email,
            ad_accounts: model.ad_accounts,
            connected_at: model.connected_at.to_rfc3339(),
            is_active: model.is_active,
        }
    }
}

/// GET /integrations
/// The caller's Facebook integrations (zero or one entries today).
pub async fn list_integrations(
    db: web::Data<DatabaseConnection>,
    user_claims: web::ReqData<crate::middleware::auth::Claims>,
) -> Result<impl Responder, actix_web::Error> {
    let user_id = Uuid::parse_str(&user_claims.sub)
        .map_err(|e| actix_web::error::ErrorBadRequest(format!("Invalid user ID: {}", e)))?;

    let integrations = facebook_integration::Entity::find()
        .filter(facebook_integration::Column::UserId.eq(user_id))
        .all(db.as_ref())
        .await
        .map_err(|e| {
            log::error!("Database error: {}", e);
            actix_web::error::ErrorInternalServerError("Database error")
        })?;

    let response: Vec<IntegrationResponse> =
        integrations.into_iter().map(IntegrationResponse::from).collect();

    Ok(HttpResponse::Ok().json(response))
}

/// DELETE /integrations
/// Marks the caller's integration inactive; reconnecting reactivates it.
pub async fn disconnect_integration(
    db: web::Data<DatabaseConnection>,
    user_claims: web::ReqData<crate::middleware::auth::Claims>,
) -> Result<impl Responder, actix_web::Error> {
    let user_id = Uuid::parse_str(&user_claims.sub)
        .map_err(|e| actix_web::error::ErrorBadRequest(format!("Invalid user ID: {}", e)))?;

    let integration = facebook_integration::Entity::find()
        .filter(facebook_integration::Column::UserId.eq(user_id))
        .one(db.as_ref())
        .await
        .map_err(|e| {
            log::error!("Database error: {}", e);
            actix_web::error::ErrorInternalServerError("Database error")
        })?
        .ok_or_else(|| actix_web::error::ErrorNotFound("Facebook integration not found"))?;

    let mut integration: facebook_integration::ActiveModel = integration.into();
    integration.is_active = Set(false);
    integration.updated_at = Set(Utc::now());

    integration.update(db.as_ref()).await.map_err(|e| {
        log::error!("Failed to disconnect integration: {}", e);
        actix_web::error::ErrorInternalServerError("Failed to disconnect integration")
    })?;

    log::info!("Facebook integration disconnected for user {}", user_id);

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}
