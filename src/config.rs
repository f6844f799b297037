use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub const DEFAULT_CATALOG_URL: &str = "http://localhost:5000";
pub const DEFAULT_TILE_SERVICE_URL: &str = "https://titiler-897938321824.us-west1.run.app";
const COG_ENDPOINT_PATH: &str = "/cog";
pub const DEFAULT_SIDECAR_DESCRIPTION: &str = "Geometamaker YML";
const CONFIG_FILE_NAME: &str = "natcap-sync.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub catalog_url: Option<String>,
    #[serde(default)]
    pub catalog_dir: Option<String>,
    #[serde(default)]
    pub tile_service_url: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub fetch_workers: Option<usize>,
    #[serde(default)]
    pub refresh_interval_secs: Option<i64>,
    #[serde(default)]
    pub sidecar_description: Option<String>,
    #[serde(default)]
    pub schema_owned_keys: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogTarget {
    Ckan { url: String, api_key: Option<String> },
    Directory(Utf8PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub catalog: CatalogTarget,
    pub tile_service_url: String,
    pub request_timeout: Duration,
    pub fetch_workers: usize,
    pub refresh_interval: chrono::Duration,
    pub sidecar_description: String,
    pub schema_owned_keys: Vec<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ConfigLoader::resolve_config(Config::default(), |_| None)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SyncError> {
        let config = match path {
            Some(path) => Self::read(PathBuf::from(path))?,
            None => match Self::implicit_path() {
                Some(path) => Self::read(path)?,
                None => Config::default(),
            },
        };
        Ok(Self::resolve_config(config, |key| std::env::var(key).ok()))
    }

    pub fn read(path: PathBuf) -> Result<Config, SyncError> {
        let content = fs::read_to_string(&path).map_err(|_| SyncError::ConfigRead(path.clone()))?;
        serde_json::from_str(&content).map_err(|err| SyncError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config<F>(config: Config, env: F) -> ResolvedConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let catalog = match (env("NATCAP_CKAN_URL"), config.catalog_dir) {
            (None, Some(dir)) => CatalogTarget::Directory(Utf8PathBuf::from(dir)),
            (url, _) => CatalogTarget::Ckan {
                url: url
                    .or(config.catalog_url)
                    .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                api_key: env("NATCAP_CKAN_APIKEY"),
            },
        };

        let tile_service_url = cog_endpoint(
            &env("TITILER_URL")
                .or(config.tile_service_url)
                .unwrap_or_else(|| DEFAULT_TILE_SERVICE_URL.to_string()),
        );

        ResolvedConfig {
            catalog,
            tile_service_url,
            request_timeout: Duration::from_secs(config.request_timeout_secs.unwrap_or(30)),
            fetch_workers: config.fetch_workers.unwrap_or(4).max(1),
            refresh_interval: chrono::Duration::seconds(
                config.refresh_interval_secs.unwrap_or(3600),
            ),
            sidecar_description: config
                .sidecar_description
                .unwrap_or_else(|| DEFAULT_SIDECAR_DESCRIPTION.to_string()),
            schema_owned_keys: config
                .schema_owned_keys
                .unwrap_or_else(default_schema_owned_keys),
        }
    }

    fn implicit_path() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        BaseDirs::new()
            .map(|dirs| {
                dirs.home_dir()
                    .join(".config")
                    .join("natcap-sync")
                    .join("config.json")
            })
            .filter(|path| path.exists())
    }
}

// `TITILER_URL` names the tile server host; the COG routes live under `/cog`.
fn cog_endpoint(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.ends_with(COG_ENDPOINT_PATH) {
        host.to_string()
    } else {
        format!("{host}{COG_ENDPOINT_PATH}")
    }
}

pub fn default_schema_owned_keys() -> Vec<String> {
    vec!["suggested_citation".to_string()]
}
