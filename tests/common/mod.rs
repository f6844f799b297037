#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};

use natcap_sync::catalog::CatalogStore;
use natcap_sync::domain::{Dataset, Resource};
use natcap_sync::error::SyncError;
use natcap_sync::extras::Extras;
use natcap_sync::http::ResourceClient;
use natcap_sync::tiles::{BandStatistics, TileClient, TileInfo};

pub const SIDECAR_DESCRIPTION: &str = "Geometamaker YML";

#[derive(Default)]
pub struct MockCatalog {
    datasets: Mutex<HashMap<String, Dataset>>,
    pub patches: Mutex<Vec<(String, Extras)>>,
}

impl MockCatalog {
    pub fn with(datasets: Vec<Dataset>) -> Self {
        let catalog = Self::default();
        for dataset in datasets {
            catalog
                .datasets
                .lock()
                .unwrap()
                .insert(dataset.id.clone(), dataset);
        }
        catalog
    }

    pub fn patch_count(&self) -> usize {
        self.patches.lock().unwrap().len()
    }

    pub fn last_patch(&self) -> Option<(String, Extras)> {
        self.patches.lock().unwrap().last().cloned()
    }
}

impl CatalogStore for MockCatalog {
    fn get_dataset(&self, id: &str) -> Result<Dataset, SyncError> {
        self.datasets
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| SyncError::DatasetNotFound(id.to_string()))
    }

    fn patch_extras(&self, id: &str, extras: &Extras) -> Result<Dataset, SyncError> {
        self.patches
            .lock()
            .unwrap()
            .push((id.to_string(), extras.clone()));
        let mut datasets = self.datasets.lock().unwrap();
        let dataset = datasets
            .get_mut(id)
            .ok_or_else(|| SyncError::DatasetNotFound(id.to_string()))?;
        dataset.extras = extras.clone();
        Ok(dataset.clone())
    }

    fn list_dataset_ids(&self) -> Result<Vec<String>, SyncError> {
        let mut ids = self
            .datasets
            .lock()
            .unwrap()
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        ids.sort();
        Ok(ids)
    }
}

// Serves registered bodies; anything else answers 404.
#[derive(Default)]
pub struct MockResources {
    bodies: HashMap<String, String>,
    heads: HashMap<String, u16>,
    gate: Option<Gate>,
    pub requests: Mutex<Vec<String>>,
}

// Holds a GET of `url` until the test releases it.
struct Gate {
    url: String,
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl MockResources {
    pub fn body(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }

    pub fn head_status(mut self, url: &str, status: u16) -> Self {
        self.heads.insert(url.to_string(), status);
        self
    }

    // Returns a receiver signalled when the GET starts and a sender that lets it finish.
    pub fn gated(mut self, url: &str) -> (Self, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        self.gate = Some(Gate {
            url: url.to_string(),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        (self, entered_rx, release_tx)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl ResourceClient for MockResources {
    fn head(&self, url: &str) -> Result<u16, SyncError> {
        self.requests.lock().unwrap().push(format!("HEAD {url}"));
        Ok(self.heads.get(url).copied().unwrap_or(404))
    }

    fn get_text(&self, url: &str) -> Result<String, SyncError> {
        self.requests.lock().unwrap().push(format!("GET {url}"));
        if let Some(gate) = self.gate.as_ref().filter(|gate| gate.url == url) {
            let _ = gate.entered.lock().unwrap().send(());
            let _ = gate.release.lock().unwrap().recv();
        }
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| SyncError::ResourceStatus {
                status: 404,
                message: "Not Found".to_string(),
            })
    }
}

pub struct MockTiles {
    pub info: TileInfo,
    info_overrides: HashMap<String, TileInfo>,
    failing_info: HashSet<String>,
    failing_statistics: HashSet<String>,
    pub requests: Mutex<Vec<String>>,
}

impl Default for MockTiles {
    fn default() -> Self {
        Self {
            info: TileInfo {
                bounds: Some([-10.0, -5.0, 20.0, 20.0]),
                minzoom: Some(3),
                maxzoom: Some(12),
            },
            info_overrides: HashMap::new(),
            failing_info: HashSet::new(),
            failing_statistics: HashSet::new(),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl MockTiles {
    pub fn info_for(mut self, url: &str, info: TileInfo) -> Self {
        self.info_overrides.insert(url.to_string(), info);
        self
    }

    pub fn failing_info(mut self, url: &str) -> Self {
        self.failing_info.insert(url.to_string());
        self
    }

    pub fn failing_statistics(mut self, url: &str) -> Self {
        self.failing_statistics.insert(url.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl TileClient for MockTiles {
    fn info(&self, dataset_url: &str) -> Result<TileInfo, SyncError> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("info {dataset_url}"));
        if self.failing_info.contains(dataset_url) {
            return Err(SyncError::TileStatus {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        Ok(self
            .info_overrides
            .get(dataset_url)
            .cloned()
            .unwrap_or_else(|| self.info.clone()))
    }

    fn statistics(&self, dataset_url: &str) -> Result<BandStatistics, SyncError> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("statistics {dataset_url}"));
        if self.failing_statistics.contains(dataset_url) {
            return Err(SyncError::MalformedResponse(format!(
                "{dataset_url}: missing field `b1`"
            )));
        }
        Ok(BandStatistics {
            min: 0.0,
            max: 255.0,
            percentile_2: 1.0,
            percentile_20: 20.0,
            percentile_40: 40.0,
            percentile_60: 60.0,
            percentile_80: 80.0,
            percentile_98: 250.0,
        })
    }
}

pub fn resource(name: &str, format: &str, url: &str) -> Resource {
    Resource {
        name: name.to_string(),
        format: format.to_string(),
        url: url.to_string(),
        ..Resource::default()
    }
}

pub fn sidecar(url: &str) -> Resource {
    Resource {
        description: SIDECAR_DESCRIPTION.to_string(),
        ..resource("metadata.yml", "YML", url)
    }
}

pub fn dataset(id: &str, resources: Vec<Resource>) -> Dataset {
    Dataset {
        id: id.to_string(),
        name: id.to_string(),
        extras: Extras::new(),
        resources,
    }
}
