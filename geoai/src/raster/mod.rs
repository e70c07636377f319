//! Georeferenced rasters.
//!
//! [`GeoRawImage`] is the value passed between tile acquisition, inference
//! pre-processing and detection geometry. It owns its pixel buffer and
//! carries the geographic bounds needed to map pixels back to the world.

mod geo_raw_image;
mod patches;
mod types;

pub use geo_raw_image::GeoRawImage;
pub use patches::PatchPadding;
pub use types::{Crs, RasterError};
