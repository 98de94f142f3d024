pub mod campaign;
pub mod facebook_auth_state;
pub mod facebook_integration;
pub mod pixel;
pub mod user;
