use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;

use crate::bounds::merge_layers;
use crate::catalog::CatalogStore;
use crate::config::ResolvedConfig;
use crate::domain::{Dataset, MapPreview, Resource};
use crate::error::SyncError;
use crate::extras::{Extras, MAPPREVIEW_KEY, SOURCES_KEY, SOURCES_RES_FORMATS_KEY};
use crate::formats::sources_res_formats;
use crate::http::ResourceClient;
use crate::layers::{LayerFetcher, collect_candidates};
use crate::scheduler::{should_update, stamp_last_updated};
use crate::sidecar::{MetadataLoader, SidecarLoad, SidecarMetadataDocument};
use crate::tiles::TileClient;

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Skipped,
    NoMetadata,
    MetadataUnavailable {
        url: String,
        error: String,
    },
    Cancelled,
    Updated {
        layers: usize,
        persisted: bool,
        extras: Extras,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub dataset: String,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub refresh_interval: chrono::Duration,
    pub sidecar_description: String,
    pub schema_owned_keys: Vec<String>,
    pub fetch_workers: usize,
}

impl From<&ResolvedConfig> for PipelineSettings {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            refresh_interval: config.refresh_interval,
            sidecar_description: config.sidecar_description.clone(),
            schema_owned_keys: config.schema_owned_keys.clone(),
            fetch_workers: config.fetch_workers,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&ResolvedConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedExtras {
    pub extras: Extras,
    pub layers: usize,
}

pub struct SyncPipeline<C: CatalogStore, R: ResourceClient, T: TileClient> {
    catalog: C,
    resources: R,
    tiles: T,
    settings: PipelineSettings,
    pool: ThreadPool,
    cancelled: Arc<AtomicBool>,
}

impl<C: CatalogStore, R: ResourceClient, T: TileClient> SyncPipeline<C, R, T> {
    pub fn new(
        catalog: C,
        resources: R,
        tiles: T,
        settings: PipelineSettings,
    ) -> Result<Self, SyncError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(settings.fetch_workers.max(1))
            .thread_name(|index| format!("natcap-fetch-{index}"))
            .build()
            .map_err(|err| SyncError::WorkerPool(err.to_string()))?;
        Ok(Self {
            catalog,
            resources,
            tiles,
            settings,
            pool,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn sync(&self, id: &str, options: SyncOptions) -> Result<SyncOutcome, SyncError> {
        let dataset = self.catalog.get_dataset(id)?;
        self.update_dataset(&dataset, &dataset.resources, options)
    }

    pub fn sync_all(&self, options: SyncOptions) -> Result<Vec<SyncReport>, SyncError> {
        let ids = self.catalog.list_dataset_ids()?;
        tracing::info!(count = ids.len(), "syncing datasets");

        let mut reports = Vec::with_capacity(ids.len());
        for id in ids {
            let outcome = self.sync(&id, options).unwrap_or_else(|error| {
                tracing::error!(dataset = %id, error = %error, "dataset sync failed");
                SyncOutcome::Failed {
                    error: error.to_string(),
                }
            });
            reports.push(SyncReport {
                dataset: id,
                outcome,
            });
        }
        Ok(reports)
    }

    pub fn update_dataset(
        &self,
        dataset: &Dataset,
        resources: &[Resource],
        options: SyncOptions,
    ) -> Result<SyncOutcome, SyncError> {
        tracing::info!(dataset = %dataset.id, "updating dataset");

        if self.is_cancelled() {
            return Ok(SyncOutcome::Cancelled);
        }

        if !options.force && !should_update(&dataset.extras, self.settings.refresh_interval) {
            tracing::info!(dataset = %dataset.id, "skipping update, was updated recently");
            return Ok(SyncOutcome::Skipped);
        }

        let loader = MetadataLoader::new(&self.resources, &self.settings.sidecar_description);
        let document = match loader.load(resources)? {
            SidecarLoad::Loaded(document) => document,
            SidecarLoad::Missing => {
                tracing::info!(dataset = %dataset.id, "skipping update, no metadata found");
                return Ok(SyncOutcome::NoMetadata);
            }
            SidecarLoad::Unavailable { url, error } => {
                tracing::warn!(
                    dataset = %dataset.id,
                    url = %url,
                    error = %error,
                    "skipping update, metadata unavailable"
                );
                return Ok(SyncOutcome::MetadataUnavailable {
                    url,
                    error: error.to_string(),
                });
            }
        };

        let computed = self.compute_extras(dataset.extras.clone(), resources, &document)?;

        if self.is_cancelled() {
            tracing::info!(dataset = %dataset.id, "discarding computed extras, cancelled");
            return Ok(SyncOutcome::Cancelled);
        }

        let extras = stamp_last_updated(computed.extras, Utc::now())
            .strip_keys(&self.settings.schema_owned_keys);

        if !options.dry_run {
            self.catalog.patch_extras(&dataset.id, &extras)?;
        }

        tracing::info!(
            dataset = %dataset.id,
            layers = computed.layers,
            dry_run = options.dry_run,
            "done updating dataset"
        );
        Ok(SyncOutcome::Updated {
            layers: computed.layers,
            persisted: !options.dry_run,
            extras,
        })
    }

    /// Format summary, sources and map preview merged into `extras`.
    /// The preview is only replaced when at least one layer resolved.
    pub fn compute_extras(
        &self,
        extras: Extras,
        resources: &[Resource],
        document: &SidecarMetadataDocument,
    ) -> Result<ComputedExtras, SyncError> {
        let sources = document.sources();
        let mut extras = extras;

        if !sources.is_empty() {
            extras = extras.upsert(SOURCES_KEY, to_json(sources)?);
        }
        extras = extras.upsert(
            SOURCES_RES_FORMATS_KEY,
            to_json(&sources_res_formats(resources, sources))?,
        );

        let candidates = collect_candidates(resources, sources);
        let layers = LayerFetcher::new(&self.resources, &self.tiles)
            .with_cancellation(&self.cancelled)
            .fetch_all(&self.pool, &candidates);
        tracing::debug!(
            candidates = candidates.len(),
            layers = layers.len(),
            "fetched layer metadata"
        );

        let layer_count = layers.len();
        if !layers.is_empty() {
            let preview = MapPreview {
                map: merge_layers(&layers),
                layers,
            };
            extras = extras.upsert(MAPPREVIEW_KEY, to_json(&preview)?);
        }

        Ok(ComputedExtras {
            extras,
            layers: layer_count,
        })
    }
}

fn to_json<V: Serialize + ?Sized>(value: &V) -> Result<String, SyncError> {
    serde_json::to_string(value).map_err(|err| SyncError::Serialize(err.to_string()))
}
