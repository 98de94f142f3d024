use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Create a configured HTTP client for requests to the Facebook Graph API
pub fn create_http_client() -> Client {
    ClientBuilder::new()
        .timeout(Duration::from_secs(30))
        .user_agent("pixeltrack/1.0")
        .build()
        .expect("Failed to create HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_http_client() {
        let client = create_http_client();
        assert!(client.timeout().is_some());
    }
}
