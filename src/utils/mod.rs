pub mod auth;
pub mod config;
pub mod db;
pub mod encryption;
pub mod http_client;
pub mod validators;
