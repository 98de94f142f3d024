use serde::Deserialize;
use std::env;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub allow_registration: bool,
    pub encryption_key: String,
    pub facebook_app_id: String,
    pub facebook_app_secret: String,
    /// Public URL of this service, used to build the OAuth redirect URI
    pub base_url: String,
    /// Dashboard origin, used for the post-OAuth success/error redirect
    pub frontend_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a number"),
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            allow_registration: env::var("ALLOW_REGISTRATION")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .expect("ALLOW_REGISTRATION must be true or false"),
            encryption_key: env::var("ENCRYPTION_KEY")?,
            facebook_app_id: env::var("FACEBOOK_APP_ID")?,
            facebook_app_secret: env::var("FACEBOOK_APP_SECRET")?,
            base_url: env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
        })
    }

    /// Redirect URI registered with the Facebook app; must match exactly in
    /// both the authorize and token-exchange requests.
    pub fn facebook_redirect_uri(&self) -> String {
        format!("{}/facebook-auth/callback", self.base_url)
    }
}
