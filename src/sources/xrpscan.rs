use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::model::{RawHolding, WellKnownEntry};

use super::AccountSource;

/// The balances endpoint rejects default HTTP clients, so requests
/// carry a browser user agent.
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36";

/// XRPScan REST client backing both merge inputs.
pub struct XrpscanClient {
    client: Client,
    base_url: String,
}

impl XrpscanClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, endpoint: &str) -> AppResult<T> {
        let url = self.endpoint_url(endpoint);
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| AppError::Source(format!("request to {} failed: {}", endpoint, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Source(format!(
                "{} returned HTTP {}",
                endpoint,
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Source(format!("invalid JSON from {}: {}", endpoint, e)))
    }
}

#[async_trait]
impl AccountSource for XrpscanClient {
    async fn rich_list(&self) -> AppResult<Vec<RawHolding>> {
        let holdings: Vec<RawHolding> = self.fetch_json("balances").await?;
        info!("✓ Fetched {} rich list accounts", holdings.len());
        Ok(holdings)
    }

    async fn well_known(&self) -> AppResult<Vec<WellKnownEntry>> {
        let entries: Vec<WellKnownEntry> = self.fetch_json("names/well-known").await?;
        info!("✓ Fetched {} well-known accounts", entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_joins_cleanly() {
        let client = XrpscanClient::new("https://api.xrpscan.com/api/v1".to_string());
        assert_eq!(
            client.endpoint_url("balances"),
            "https://api.xrpscan.com/api/v1/balances"
        );

        let client = XrpscanClient::new("https://api.xrpscan.com/api/v1/".to_string());
        assert_eq!(
            client.endpoint_url("names/well-known"),
            "https://api.xrpscan.com/api/v1/names/well-known"
        );
    }

    #[test]
    fn test_rich_list_response_shape_parses() {
        let body = r#"[
            {"account": "rRich", "balance": 9000000000, "name": {"name": "Whale"}},
            {"account": "rPoor", "balance": 1000000}
        ]"#;
        let holdings: Vec<RawHolding> = serde_json::from_str(body).unwrap();
        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].address, "rRich");
        assert_eq!(
            holdings[0].identity.as_ref().unwrap().name.as_deref(),
            Some("Whale")
        );
        assert!(holdings[1].identity.is_none());
    }

    #[test]
    fn test_well_known_response_shape_parses() {
        let body = r#"[
            {"account": "rRipple", "name": "Ripple", "desc": "Operational", "verified": true},
            {"account": "rMystery"}
        ]"#;
        let entries: Vec<WellKnownEntry> = serde_json::from_str(body).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].verified);
        assert_eq!(entries[1].name, None);
        assert!(!entries[1].verified);
    }
}
