use std::fs;
use std::io::Write;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::domain::Dataset;
use crate::error::SyncError;
use crate::extras::Extras;
use crate::http::user_agent_headers;

pub trait CatalogStore: Send + Sync {
    fn get_dataset(&self, id: &str) -> Result<Dataset, SyncError>;
    fn patch_extras(&self, id: &str, extras: &Extras) -> Result<Dataset, SyncError>;
    fn list_dataset_ids(&self) -> Result<Vec<String>, SyncError>;
}

#[derive(Debug, Deserialize)]
struct ActionResponse<T> {
    success: bool,
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Clone)]
pub struct CkanCatalogClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CkanCatalogClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let client = Client::builder()
            .default_headers(user_agent_headers()?)
            .timeout(timeout)
            .build()
            .map_err(|err| SyncError::CatalogHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/api/3/action/{action}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, SyncError> {
        match &self.api_key {
            Some(key) => {
                let value = HeaderValue::from_str(key)
                    .map_err(|err| SyncError::CatalogHttp(err.to_string()))?;
                Ok(request.header(AUTHORIZATION, value))
            }
            None => Ok(request),
        }
    }

    fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        request: RequestBuilder,
    ) -> Result<T, SyncError> {
        let response = self
            .authorized(request)?
            .send()
            .map_err(|err| SyncError::CatalogHttp(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| SyncError::CatalogHttp(err.to_string()))?;

        let envelope: ActionResponse<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !(200..300).contains(&status) => {
                return Err(SyncError::CatalogStatus {
                    status,
                    message: body,
                });
            }
            Err(err) => {
                return Err(SyncError::MalformedResponse(format!("{action}: {err}")));
            }
        };

        match envelope {
            ActionResponse {
                success: true,
                result: Some(result),
                ..
            } => Ok(result),
            ActionResponse { error, .. } => Err(SyncError::CatalogAction {
                action: action.to_string(),
                message: error
                    .map(|error| error.to_string())
                    .unwrap_or_else(|| format!("status {status}")),
            }),
        }
    }
}

impl CatalogStore for CkanCatalogClient {
    fn get_dataset(&self, id: &str) -> Result<Dataset, SyncError> {
        let request = self
            .client
            .get(self.action_url("package_show"))
            .query(&[("id", id)]);
        match self.call("package_show", request) {
            Err(SyncError::CatalogAction { message, .. }) if message.contains("Not Found") => {
                Err(SyncError::DatasetNotFound(id.to_string()))
            }
            other => other,
        }
    }

    fn patch_extras(&self, id: &str, extras: &Extras) -> Result<Dataset, SyncError> {
        let request = self
            .client
            .post(self.action_url("package_patch"))
            .json(&json!({ "id": id, "extras": extras }));
        self.call("package_patch", request)
    }

    fn list_dataset_ids(&self) -> Result<Vec<String>, SyncError> {
        let request = self.client.get(self.action_url("package_list"));
        self.call("package_list", request)
    }
}

#[derive(Debug, Clone)]
pub struct FileCatalog {
    root: Utf8PathBuf,
}

impl FileCatalog {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn dataset_path(&self, id: &str) -> Result<Utf8PathBuf, SyncError> {
        let is_plain = !id.is_empty()
            && !id.contains(['/', '\\'])
            && id != "."
            && id != "..";
        if !is_plain {
            return Err(SyncError::DatasetNotFound(id.to_string()));
        }
        Ok(self.root.join("datasets").join(format!("{id}.json")))
    }

    pub fn put_dataset(&self, dataset: &Dataset) -> Result<(), SyncError> {
        let path = self.dataset_path(&dataset.id)?;
        let content = serde_json::to_vec_pretty(dataset)
            .map_err(|err| SyncError::Serialize(err.to_string()))?;
        write_atomic(&path, &content)
    }
}

impl CatalogStore for FileCatalog {
    fn get_dataset(&self, id: &str) -> Result<Dataset, SyncError> {
        let path = self.dataset_path(id)?;
        if !path.as_std_path().exists() {
            return Err(SyncError::DatasetNotFound(id.to_string()));
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        serde_json::from_str(&content)
            .map_err(|err| SyncError::MalformedResponse(format!("{path}: {err}")))
    }

    fn patch_extras(&self, id: &str, extras: &Extras) -> Result<Dataset, SyncError> {
        let mut dataset = self.get_dataset(id)?;
        dataset.extras = extras.clone();
        self.put_dataset(&dataset)?;
        Ok(dataset)
    }

    fn list_dataset_ids(&self) -> Result<Vec<String>, SyncError> {
        let dir = self.root.join("datasets");
        if !dir.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in
            fs::read_dir(dir.as_std_path()).map_err(|err| SyncError::Filesystem(err.to_string()))?
        {
            let path = entry
                .map_err(|err| SyncError::Filesystem(err.to_string()))?
                .path();
            if path.extension().map(|ext| ext == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), SyncError> {
    let parent = path
        .parent()
        .ok_or_else(|| SyncError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| SyncError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("natcap-sync-dataset")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| SyncError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| SyncError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| SyncError::Filesystem(err.to_string()))?;
    Ok(())
}
