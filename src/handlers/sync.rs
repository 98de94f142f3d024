use actix_web::{web, HttpResponse, Responder};

use crate::services::sync_progress::SyncProgressTracker;

/// GET /sync/status
/// Live per-account sync progress; accounts with no entry are idle.
pub async fn get_sync_status(tracker: web::Data<SyncProgressTracker>) -> impl Responder {
    HttpResponse::Ok().json(tracker.snapshot())
}
