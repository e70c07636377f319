//! Pipeline instances, their registry and the model weight cache.
//!
//! A [`PipelineSignature`] (provider configuration, model id and model
//! parameters) identifies a pipeline. The [`PipelineRegistry`] keeps one
//! [`PipelineInstance`] per signature and builds it at most once, using the
//! [`WeightCache`] for model bytes.

mod instance;
mod registry;
mod signature;
mod weights;

#[cfg(test)]
pub(crate) mod testing;

pub use instance::{polygon_extent, PipelineInstance};
pub use registry::{PipelineRegistry, RegistryStats};
pub use signature::PipelineSignature;
pub use weights::{
    WeightCache, WeightCacheError, WeightEntryMetadata, DEFAULT_WEIGHTS_MEMORY_BYTES,
};
