//! Tiled imagery provider abstraction
//!
//! A provider maps a [`TileCoord`](crate::coord::TileCoord) to a URL. The
//! bytes are fetched through an [`AsyncHttpClient`] so every provider shares
//! one client.
//!
//! # Factory Pattern
//!
//! ```ignore
//! use geoai::provider::{ProviderConfig, ProviderFactory};
//!
//! let provider = ProviderFactory::create(&ProviderConfig::esri_world_imagery())?;
//! ```

mod esri;
mod factory;
mod geobase;
mod http;
mod mapbox;
mod tms;
mod types;

pub use esri::{EsriProvider, DEFAULT_SERVICE_NAME, DEFAULT_SERVICE_URL};
pub use factory::{ProviderConfig, ProviderFactory};
pub use geobase::GeobaseProvider;
pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub(crate) use http::redact_query;
pub use mapbox::MapboxProvider;
pub use tms::TmsProvider;
pub use types::{MapSourceParams, Provider, ProviderError, ZoomStrategy};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
