use actix_web::{web, HttpResponse, Responder};
use sea_orm::*;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{campaign, pixel};
use crate::utils::validators;

/// GET /pixels
pub async fn list_pixels(
    db: web::Data<DatabaseConnection>,
    user_claims: web::ReqData<crate::middleware::auth::Claims>,
) -> Result<impl Responder, actix_web::Error> {
    let user_id = Uuid::parse_str(&user_claims.sub)
        .map_err(|e| actix_web::error::ErrorBadRequest(format!("Invalid user ID: {}", e)))?;

    let pixels = pixel::Entity::find()
        .filter(pixel::Column::UserId.eq(user_id))
        .order_by_desc(pixel::Column::UpdatedAt)
        .all(db.as_ref())
        .await
        .map_err(|e| {
            log::error!("Database error: {}", e);
            actix_web::error::ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(pixels))
}

#[derive(Debug, Serialize)]
pub struct PixelDetailResponse {
    pub pixel: pixel::Model,
    pub campaigns: Vec<campaign::Model>,
}

/// GET /pixels/{id}
/// One pixel plus the campaigns currently linked to it.
pub async fn get_pixel(
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
    user_claims: web::ReqData<crate::middleware::auth::Claims>,
) -> Result<impl Responder, actix_web::Error> {
    let user_id = Uuid::parse_str(&user_claims.sub)
        .map_err(|e| actix_web::error::ErrorBadRequest(format!("Invalid user ID: {}", e)))?;
    let pixel_id = path.into_inner();
    validators::validate_object_id(&pixel_id)
        .map_err(|e| actix_web::error::ErrorBadRequest(e.to_string()))?;

    let found = pixel::Entity::find_by_id(&pixel_id)
        .filter(pixel::Column::UserId.eq(user_id))
        .one(db.as_ref())
        .await
        .map_err(|e| {
            log::error!("Database error: {}", e);
            actix_web::error::ErrorInternalServerError("Database error")
        })?
        .ok_or_else(|| actix_web::error::ErrorNotFound("Pixel not found"))?;

    let campaigns = campaign::Entity::find()
        .filter(campaign::Column::PixelId.eq(&pixel_id))
        .filter(campaign::Column::UserId.eq(user_id))
        .all(db.as_ref())
        .await
        .map_err(|e| {
            log::error!("Database error: {}", e);
            actix_web::error::ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(PixelDetailResponse {
        pixel: found,
        campaigns,
    }))
}
