pub mod bounds;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod extras;
pub mod formats;
pub mod http;
pub mod layers;
pub mod output;
pub mod pipeline;
pub mod queue;
pub mod scheduler;
pub mod sidecar;
pub mod sources;
pub mod tiles;
