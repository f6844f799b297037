use serde::{Deserialize, Deserializer, Serialize};

use crate::bounds::Bounds;
use crate::error::SyncError;
use crate::extras::{Extras, MAPPREVIEW_KEY};
use crate::formats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub extras: Extras,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub format: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_url: Option<String>,
}

impl Resource {
    pub fn short_format(&self) -> &str {
        formats::short_format(&self.format)
    }

    pub fn is_archive(&self) -> bool {
        self.format.eq_ignore_ascii_case("zip")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub url: String,
    pub bounds: Bounds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u8>,
    #[serde(flatten)]
    pub kind: LayerKind,
}

impl Layer {
    pub fn is_raster(&self) -> bool {
        matches!(self.kind, LayerKind::Raster(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerKind {
    Raster(RasterStats),
    Vector(VectorInfo),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterStats {
    pub pixel_min_value: f64,
    pub pixel_max_value: f64,
    pub pixel_percentile_2: f64,
    pub pixel_percentile_20: f64,
    pub pixel_percentile_40: f64,
    pub pixel_percentile_60: f64,
    pub pixel_percentile_80: f64,
    pub pixel_percentile_98: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorInfo {
    #[serde(default)]
    pub vector_type: Option<String>,
    pub feature_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapSettings {
    pub minzoom: u8,
    pub maxzoom: u8,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPreview {
    pub map: MapSettings,
    pub layers: Vec<Layer>,
}

impl MapPreview {
    pub fn from_extras(extras: &Extras) -> Result<Option<Self>, SyncError> {
        let Some(raw) = extras.get(MAPPREVIEW_KEY) else {
            return Ok(None);
        };
        serde_json::from_str(raw)
            .map(Some)
            .map_err(|err| SyncError::MalformedResponse(format!("mappreview extra: {err}")))
    }
}

fn null_as_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
