use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("catalog action {action} failed: {message}")]
    CatalogAction { action: String, message: String },

    #[error("dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("resource request failed: {0}")]
    ResourceHttp(String),

    #[error("resource returned status {status}: {message}")]
    ResourceStatus { status: u16, message: String },

    #[error("tile service request failed: {0}")]
    TileHttp(String),

    #[error("tile service returned status {status}: {message}")]
    TileStatus { status: u16, message: String },

    #[error("malformed sidecar metadata at {url}: {message}")]
    MalformedSidecar { url: String, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("failed to serialize extras: {0}")]
    Serialize(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to start fetch workers: {0}")]
    WorkerPool(String),

    #[error("sync queue is closed")]
    QueueClosed,
}
