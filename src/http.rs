use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::SyncError;

pub trait ResourceClient: Send + Sync {
    fn head(&self, url: &str) -> Result<u16, SyncError>;
    /// Body of a successful GET; non-2xx responses are errors.
    fn get_text(&self, url: &str) -> Result<String, SyncError>;
}

pub fn user_agent_headers() -> Result<HeaderMap, SyncError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("natcap-sync/{}", env!("CARGO_PKG_VERSION")))
            .map_err(|err| SyncError::ResourceHttp(err.to_string()))?,
    );
    Ok(headers)
}

#[derive(Clone)]
pub struct ResourceHttpClient {
    client: Client,
}

impl ResourceHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .default_headers(user_agent_headers()?)
            .timeout(timeout)
            .build()
            .map_err(|err| SyncError::ResourceHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl ResourceClient for ResourceHttpClient {
    fn head(&self, url: &str) -> Result<u16, SyncError> {
        let response = self
            .client
            .head(url)
            .send()
            .map_err(|err| SyncError::ResourceHttp(err.to_string()))?;
        Ok(response.status().as_u16())
    }

    fn get_text(&self, url: &str) -> Result<String, SyncError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| SyncError::ResourceHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "resource request failed".to_string());
            return Err(SyncError::ResourceStatus { status, message });
        }
        response
            .text()
            .map_err(|err| SyncError::ResourceHttp(err.to_string()))
    }
}
