use std::sync::atomic::{AtomicBool, Ordering};

use rayon::ThreadPool;
use rayon::prelude::*;
use serde::Deserialize;

use crate::bounds::Bounds;
use crate::domain::{Layer, LayerKind, RasterStats, Resource, VectorInfo};
use crate::error::SyncError;
use crate::http::ResourceClient;
use crate::sidecar::SidecarMetadataDocument;
use crate::tiles::TileClient;

const AUTHENTICATED_STORAGE_HOST: &str = "https://storage.cloud.google.com/";
const PUBLIC_STORAGE_HOST: &str = "https://storage.googleapis.com/";
const RENDERED_VECTOR_DIR: &str = "geojsons";
const RENDERED_VECTOR_EXTENSION: &str = "geojson";
const METADATA_SUFFIX: &str = ".yml";
const VECTOR_SOURCE_EXTENSIONS: &[&str] = &["shp"];
const RASTER_SOURCE_EXTENSIONS: &[&str] = &["tif", "tiff"];

pub const DEFAULT_RASTER_MIN_ZOOM: u8 = 1;
pub const DEFAULT_RASTER_MAX_ZOOM: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerCandidate {
    Raster {
        name: String,
        url: String,
    },
    Vector {
        name: String,
        url: String,
        metadata_url: String,
    },
}

impl LayerCandidate {
    pub fn name(&self) -> &str {
        match self {
            LayerCandidate::Raster { name, .. } | LayerCandidate::Vector { name, .. } => name,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            LayerCandidate::Raster { url, .. } | LayerCandidate::Vector { url, .. } => url,
        }
    }
}

pub fn normalize_storage_url(url: &str) -> String {
    match url.strip_prefix(AUTHENTICATED_STORAGE_HOST) {
        Some(rest) => format!("{PUBLIC_STORAGE_HOST}{rest}"),
        None => url.to_string(),
    }
}

pub fn collect_candidates(resources: &[Resource], sources: &[String]) -> Vec<LayerCandidate> {
    let mut candidates = resource_candidates(resources);
    if !sources.is_empty() {
        if let Some(archive) = resources.iter().find(|resource| resource.is_archive()) {
            candidates.extend(archive_candidates(archive, sources));
        }
    }
    candidates
}

pub fn resource_candidates(resources: &[Resource]) -> Vec<LayerCandidate> {
    resources
        .iter()
        .filter_map(|resource| match resource.short_format() {
            "tif" => Some(LayerCandidate::Raster {
                name: resource.name.clone(),
                url: resource.url.clone(),
            }),
            "geojson" => Some(LayerCandidate::Vector {
                name: resource.name.clone(),
                url: resource.url.clone(),
                metadata_url: resource
                    .metadata_url
                    .clone()
                    .unwrap_or_else(|| metadata_url_for(&resource.url)),
            }),
            "shp" => {
                let (base, file) = resource.url.rsplit_once('/')?;
                Some(LayerCandidate::Vector {
                    name: resource.name.clone(),
                    url: rendered_vector_url(base, file),
                    metadata_url: resource
                        .metadata_url
                        .clone()
                        .unwrap_or_else(|| metadata_url_for(&resource.url)),
                })
            }
            _ => None,
        })
        .collect()
}

pub fn archive_candidates(archive: &Resource, sources: &[String]) -> Vec<LayerCandidate> {
    let Some((base, _)) = archive.url.rsplit_once('/') else {
        return Vec::new();
    };
    let base = normalize_storage_url(base);

    sources
        .iter()
        .filter_map(|source| {
            let path = source.replace('\\', "/");
            let name = path.rsplit('/').next().unwrap_or(&path).to_string();
            if has_extension(&path, VECTOR_SOURCE_EXTENSIONS) {
                Some(LayerCandidate::Vector {
                    name,
                    url: rendered_vector_url(&base, &path),
                    metadata_url: metadata_url_for(&format!("{base}/{path}")),
                })
            } else if has_extension(&path, RASTER_SOURCE_EXTENSIONS) {
                Some(LayerCandidate::Raster {
                    name,
                    url: format!("{base}/{path}"),
                })
            } else {
                None
            }
        })
        .collect()
}

/// Geometamaker writes a layer's description next to it with `.yml` appended to
/// the full file name (`layer.shp.yml`), keeping the source extension rather
/// than replacing it.
pub fn metadata_url_for(source_url: &str) -> String {
    format!("{source_url}{METADATA_SUFFIX}")
}

fn has_extension(path: &str, extensions: &[&str]) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| {
            extensions
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
        .unwrap_or(false)
}

fn rendered_vector_url(base: &str, path: &str) -> String {
    let rendered = match path.rsplit_once('.') {
        Some((stem, _)) => format!("{stem}.{RENDERED_VECTOR_EXTENSION}"),
        None => format!("{path}.{RENDERED_VECTOR_EXTENSION}"),
    };
    match rendered.split_once('/') {
        Some((top, rest)) => format!("{base}/{top}/{RENDERED_VECTOR_DIR}/{rest}"),
        None => format!("{base}/{RENDERED_VECTOR_DIR}/{rendered}"),
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
}

pub struct LayerFetcher<'a, R: ResourceClient, T: TileClient> {
    resources: &'a R,
    tiles: &'a T,
    cancelled: Option<&'a AtomicBool>,
}

impl<'a, R: ResourceClient, T: TileClient> LayerFetcher<'a, R, T> {
    pub fn new(resources: &'a R, tiles: &'a T) -> Self {
        Self {
            resources,
            tiles,
            cancelled: None,
        }
    }

    pub fn with_cancellation(mut self, flag: &'a AtomicBool) -> Self {
        self.cancelled = Some(flag);
        self
    }

    pub fn fetch_all(&self, pool: &ThreadPool, candidates: &[LayerCandidate]) -> Vec<Layer> {
        pool.install(|| {
            candidates
                .par_iter()
                .filter_map(|candidate| self.fetch(candidate))
                .collect()
        })
    }

    pub fn fetch(&self, candidate: &LayerCandidate) -> Option<Layer> {
        if self.is_cancelled() {
            return None;
        }
        match candidate {
            LayerCandidate::Raster { name, url } => self.fetch_raster(name, url),
            LayerCandidate::Vector {
                name,
                url,
                metadata_url,
            } => self.fetch_vector(name, url, metadata_url),
        }
    }

    pub fn fetch_raster(&self, name: &str, url: &str) -> Option<Layer> {
        let url = normalize_storage_url(url);
        match self.resources.head(&url) {
            Ok(status) if (200..300).contains(&status) => {}
            Ok(status) => {
                tracing::info!(url = %url, status, "raster not reachable, skipping layer");
                return None;
            }
            Err(error) => {
                tracing::warn!(url = %url, error = %error, "raster check failed, skipping layer");
                return None;
            }
        }

        match self.raster_layer(name, &url) {
            Ok(layer) => Some(layer),
            Err(error) => {
                tracing::warn!(url = %url, error = %error, "failed to describe raster");
                None
            }
        }
    }

    pub fn fetch_vector(&self, name: &str, url: &str, metadata_url: &str) -> Option<Layer> {
        let url = normalize_storage_url(url);
        let metadata_url = normalize_storage_url(metadata_url);
        match self.vector_layer(name, &url, &metadata_url) {
            Ok(layer) => Some(layer),
            Err(error) => {
                tracing::warn!(url = %url, error = %error, "failed to describe vector");
                None
            }
        }
    }

    fn raster_layer(&self, name: &str, url: &str) -> Result<Layer, SyncError> {
        let info = self.tiles.info(url)?;
        let bounds = info
            .bounds
            .map(|bounds| Bounds::from(bounds).or_full_extent())
            .unwrap_or(Bounds::FULL_EXTENT);
        let stats = self.tiles.statistics(url)?;

        Ok(Layer {
            name: name.to_string(),
            url: url.to_string(),
            bounds,
            minzoom: Some(info.minzoom.unwrap_or(DEFAULT_RASTER_MIN_ZOOM)),
            maxzoom: Some(info.maxzoom.unwrap_or(DEFAULT_RASTER_MAX_ZOOM)),
            kind: LayerKind::Raster(RasterStats {
                pixel_min_value: stats.min,
                pixel_max_value: stats.max,
                pixel_percentile_2: stats.percentile_2,
                pixel_percentile_20: stats.percentile_20,
                pixel_percentile_40: stats.percentile_40,
                pixel_percentile_60: stats.percentile_60,
                pixel_percentile_80: stats.percentile_80,
                pixel_percentile_98: stats.percentile_98,
            }),
        })
    }

    fn vector_layer(&self, name: &str, url: &str, metadata_url: &str) -> Result<Layer, SyncError> {
        let body = self.resources.get_text(url)?;
        let collection: FeatureCollection = serde_json::from_str(&body)
            .map_err(|err| SyncError::MalformedResponse(format!("{url}: {err}")))?;

        let text = self.resources.get_text(metadata_url)?;
        let bounds = SidecarMetadataDocument::parse(metadata_url, &text)?
            .and_then(|document| document.bounds())
            .ok_or_else(|| {
                SyncError::MalformedResponse(format!("{metadata_url}: no bounding box"))
            })?
            .or_full_extent();

        let vector_type = collection
            .features
            .first()
            .and_then(|feature| feature.geometry.as_ref())
            .map(|geometry| geometry.kind.clone());

        Ok(Layer {
            name: name.to_string(),
            url: url.to_string(),
            bounds,
            minzoom: None,
            maxzoom: None,
            kind: LayerKind::Vector(VectorInfo {
                vector_type,
                feature_count: collection.features.len(),
            }),
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}
