use actix_web::{web, HttpResponse, Responder};
use sea_orm::*;
use uuid::Uuid;

use crate::models::campaign;

/// GET /campaigns
pub async fn list_campaigns(
    db: web::Data<DatabaseConnection>,
    user_claims: web::ReqData<crate::middleware::auth::Claims>,
) -> Result<impl Responder, actix_web::Error> {
    let user_id = Uuid::parse_str(&user_claims.sub)
        .map_err(|e| actix_web::error::ErrorBadRequest(format!("Invalid user ID: {}", e)))?;

    let campaigns = campaign::Entity::find()
        .filter(campaign::Column::UserId.eq(user_id))
        .order_by_desc(campaign::Column::SyncedAt)
        .all(db.as_ref())
        .await
        .map_err(|e| {
            log::error!("Database error: {}", e);
            actix_web::error::ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(campaigns))
}
