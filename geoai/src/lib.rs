//! GeoAI - geospatial vision inference over web map tiles
//!
//! Turns a GeoJSON polygon into a georeferenced raster mosaic fetched from a
//! tile provider, runs a vision model on it and maps the detections back to
//! GeoJSON. The pieces are usable on their own:
//!
//! - [`tile`] plans the tile grid covering a polygon under a tile cap
//! - [`mosaic`] fetches and stitches the grid into a [`GeoRawImage`]
//! - [`geometry`] traces masks and contours and deduplicates detections
//! - [`pipeline`] caches pipeline instances and model weights
//! - [`worker`] runs pipelines behind a message-passing boundary
//!
//! Model execution is pluggable through [`inference::ModelLoader`].

pub mod config;
pub mod coord;
pub mod error;
pub mod geojson;
pub mod geometry;
pub mod inference;
pub mod logging;
pub mod mosaic;
pub mod pipeline;
pub mod provider;
pub mod raster;
pub mod tile;
pub mod worker;

pub use config::GeoAiConfig;
pub use coord::GeoBoundingBox;
pub use error::{ErrorKind, ErrorPayload, GeoAiError, GeoAiResult};
pub use geojson::{Feature, FeatureCollection, Geometry};
pub use inference::{InferenceRequest, InferenceResponse};
pub use pipeline::{PipelineInstance, PipelineRegistry, PipelineSignature};
pub use provider::ProviderConfig;
pub use raster::GeoRawImage;
pub use tile::TilePlanner;
pub use worker::{spawn_worker, WorkerClient};
