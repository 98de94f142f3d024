pub mod auth;
pub mod campaigns;
pub mod facebook_auth;
pub mod integrations;
pub mod pixels;
pub mod sync;
