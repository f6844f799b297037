use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::domain::Resource;
use crate::error::SyncError;
use crate::http::ResourceClient;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SidecarMetadataDocument {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub spatial: Option<SpatialInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialInfo {
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub crs: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl From<BoundingBox> for Bounds {
    fn from(value: BoundingBox) -> Self {
        Bounds::new(value.xmin, value.ymin, value.xmax, value.ymax)
    }
}

impl SpatialInfo {
    pub fn is_wgs84(&self) -> bool {
        match &self.crs {
            None => true,
            Some(crs) => {
                let crs = crs.to_ascii_uppercase();
                crs.contains("4326") || crs.contains("WGS 84") || crs.contains("WGS84")
            }
        }
    }
}

impl SidecarMetadataDocument {
    pub fn parse(url: &str, text: &str) -> Result<Option<Self>, SyncError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let malformed = |err: serde_yaml::Error| SyncError::MalformedSidecar {
            url: url.to_string(),
            message: err.to_string(),
        };
        let value: serde_yaml::Value = serde_yaml::from_str(text).map_err(malformed)?;
        if value.is_null() {
            return Ok(None);
        }
        serde_yaml::from_value(value).map(Some).map_err(malformed)
    }

    pub fn sources(&self) -> &[String] {
        self.sources.as_deref().unwrap_or_default()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let spatial = self.spatial.as_ref()?;
        let bounding_box = spatial.bounding_box?;
        if !spatial.is_wgs84() {
            tracing::debug!(
                crs = spatial.crs.as_deref().unwrap_or_default(),
                "treating non-WGS84 bounding box as WGS84"
            );
        }
        Some(bounding_box.into())
    }
}

#[derive(Debug)]
pub enum SidecarLoad {
    Missing,
    Unavailable { url: String, error: SyncError },
    Loaded(SidecarMetadataDocument),
}

pub struct MetadataLoader<'a, R: ResourceClient> {
    client: &'a R,
    description: &'a str,
}

impl<'a, R: ResourceClient> MetadataLoader<'a, R> {
    pub fn new(client: &'a R, description: &'a str) -> Self {
        Self {
            client,
            description,
        }
    }

    pub fn find<'r>(&self, resources: &'r [Resource]) -> Option<&'r Resource> {
        resources
            .iter()
            .find(|resource| resource.description == self.description)
    }

    /// Only malformed YAML is an error; fetch failures are reported as unavailable.
    pub fn load(&self, resources: &[Resource]) -> Result<SidecarLoad, SyncError> {
        let Some(resource) = self.find(resources) else {
            return Ok(SidecarLoad::Missing);
        };
        let text = match self.client.get_text(&resource.url) {
            Ok(text) => text,
            Err(error) => {
                return Ok(SidecarLoad::Unavailable {
                    url: resource.url.clone(),
                    error,
                });
            }
        };
        Ok(match SidecarMetadataDocument::parse(&resource.url, &text)? {
            Some(document) => SidecarLoad::Loaded(document),
            None => SidecarLoad::Missing,
        })
    }
}
