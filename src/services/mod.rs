pub mod ad_sync;
pub mod facebook;
pub mod sync_progress;
