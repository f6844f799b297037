use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::SyncError;
use crate::http::user_agent_headers;

pub const PERCENTILES: [u8; 6] = [2, 20, 40, 60, 80, 98];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TileInfo {
    #[serde(default)]
    pub bounds: Option<[f64; 4]>,
    #[serde(default)]
    pub minzoom: Option<u8>,
    #[serde(default)]
    pub maxzoom: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BandStatistics {
    pub min: f64,
    pub max: f64,
    pub percentile_2: f64,
    pub percentile_20: f64,
    pub percentile_40: f64,
    pub percentile_60: f64,
    pub percentile_80: f64,
    pub percentile_98: f64,
}

#[derive(Debug, Deserialize)]
struct StatisticsResponse {
    b1: BandStatistics,
}

pub trait TileClient: Send + Sync {
    fn info(&self, dataset_url: &str) -> Result<TileInfo, SyncError>;
    fn statistics(&self, dataset_url: &str) -> Result<BandStatistics, SyncError>;
}

#[derive(Clone)]
pub struct TilerHttpClient {
    client: Client,
    base_url: String,
}

impl TilerHttpClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .default_headers(user_agent_headers()?)
            .timeout(timeout)
            .build()
            .map_err(|err| SyncError::TileHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, SyncError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|err| SyncError::TileHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "tile service request failed".to_string());
            return Err(SyncError::TileStatus { status, message });
        }
        response
            .json()
            .map_err(|err| SyncError::MalformedResponse(format!("{url}: {err}")))
    }
}

impl TileClient for TilerHttpClient {
    fn info(&self, dataset_url: &str) -> Result<TileInfo, SyncError> {
        self.get_json("info", &[("url", dataset_url.to_string())])
    }

    fn statistics(&self, dataset_url: &str) -> Result<BandStatistics, SyncError> {
        let query = std::iter::once(("url", dataset_url.to_string()))
            .chain(PERCENTILES.iter().map(|p| ("p", p.to_string())))
            .collect::<Vec<_>>();
        let response: StatisticsResponse = self.get_json("statistics", &query)?;
        Ok(response.b1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_tolerates_missing_zoom() {
        let info: TileInfo = serde_json::from_str(r#"{"bounds": [-1, -2, 3, 4]}"#).unwrap();
        assert_eq!(info.bounds, Some([-1.0, -2.0, 3.0, 4.0]));
        assert_eq!(info.minzoom, None);
        assert_eq!(info.maxzoom, None);
    }

    #[test]
    fn statistics_reads_first_band() {
        let body = r#"{"b1": {
            "min": 0, "max": 10, "mean": 5,
            "percentile_2": 0.2, "percentile_20": 2, "percentile_40": 4,
            "percentile_60": 6, "percentile_80": 8, "percentile_98": 9.8
        }}"#;
        let stats: StatisticsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(stats.b1.max, 10.0);
        assert_eq!(stats.b1.percentile_98, 9.8);
    }
}
