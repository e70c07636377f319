//! A configured pipeline: provider, task and loaded model.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::coord::GeoBoundingBox;
use crate::error::GeoAiError;
use crate::geojson::{Feature, Geometry};
use crate::inference::{
    decode_output, prepare_input, InferenceRequest, InferenceResponse, InferenceSession, TaskSpec,
};
use crate::mosaic::MosaicAcquirer;
use crate::provider::{AsyncHttpClient, AsyncReqwestClient, Provider};
use crate::tile::TilePlanner;

use super::PipelineSignature;

/// A live pipeline built once per distinct [`PipelineSignature`].
///
/// Running it plans the tile grid over the request polygon, fetches the
/// mosaic, runs the model and decodes detections into world coordinates.
pub struct PipelineInstance<C = AsyncReqwestClient> {
    signature: PipelineSignature,
    provider: Arc<dyn Provider>,
    spec: TaskSpec,
    session: Arc<dyn InferenceSession>,
    acquirer: MosaicAcquirer<C>,
    planner: TilePlanner,
}

impl<C> PipelineInstance<C>
where
    C: AsyncHttpClient + Clone + 'static,
{
    pub fn new(
        signature: PipelineSignature,
        provider: Arc<dyn Provider>,
        spec: TaskSpec,
        session: Arc<dyn InferenceSession>,
        client: C,
        planner: TilePlanner,
    ) -> Self {
        Self {
            signature,
            provider,
            spec,
            session,
            acquirer: MosaicAcquirer::new(client),
            planner,
        }
    }

    pub fn signature(&self) -> &PipelineSignature {
        &self.signature
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    /// Runs one inference request.
    ///
    /// The request is validated and the tile grid planned before any
    /// network access, so a missing polygon, a non-polygon geometry or an
    /// oversized area fails without fetching anything.
    pub async fn run(&self, request: &InferenceRequest) -> Result<InferenceResponse, GeoAiError> {
        let started = Instant::now();
        let bbox = polygon_extent(request.inputs.polygon.as_ref())?;
        let map_params = request.map_source_params.clone().unwrap_or_default();
        let post = request
            .post_processing_params
            .clone()
            .unwrap_or_default()
            .resolve(&self.spec.defaults);

        let zoom = self.planner.select_zoom(
            self.provider.as_ref(),
            &bbox,
            map_params.zoom_level,
            self.spec.default_zoom,
        )?;
        let grid = self
            .planner
            .plan(self.provider.as_ref(), &bbox, zoom, &map_params)?;

        let mosaic = self.acquirer.acquire_mosaic(&grid).await?;
        let input = prepare_input(&mosaic, &self.spec)?;
        debug!(shape = ?input.shape(), model = %self.spec.model_id, "Running model");

        let outputs = self.session.run(input).await?;
        let detections = decode_output(&self.spec, &outputs, &mosaic, &post)?;

        info!(
            model = %self.spec.model_id,
            provider = self.provider.name(),
            zoom = zoom,
            tiles = grid.len(),
            features = detections.feature_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Inference complete"
        );

        Ok(InferenceResponse {
            detections,
            geo_raw_image: mosaic,
        })
    }
}

/// Extent of the request polygon.
///
/// # Errors
///
/// - [`GeoAiError::MissingInputField`] when no polygon is given
/// - [`GeoAiError::InvalidGeometry`] when the feature is not a polygon or
///   its outer ring does not enclose an area
pub fn polygon_extent(polygon: Option<&Feature>) -> Result<GeoBoundingBox, GeoAiError> {
    let feature = polygon.ok_or_else(|| GeoAiError::MissingInputField("polygon".to_string()))?;

    let rings = match &feature.geometry {
        Some(Geometry::Polygon(rings)) => rings,
        Some(other) => {
            return Err(GeoAiError::InvalidGeometry(format!(
                "expected Polygon, got {}",
                other.type_name()
            )))
        }
        None => {
            return Err(GeoAiError::InvalidGeometry(
                "polygon feature has no geometry".to_string(),
            ))
        }
    };

    let outer = rings
        .first()
        .filter(|ring| ring.len() >= 4)
        .ok_or_else(|| {
            GeoAiError::InvalidGeometry("outer ring needs at least four positions".to_string())
        })?;

    GeoBoundingBox::from_points(outer.iter().map(|p| (p[0], p[1])))
        .ok_or_else(|| GeoAiError::InvalidGeometry("polygon does not enclose an area".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn square() -> Feature {
        Feature::new(Geometry::Polygon(vec![vec![
            [10.0, 50.0],
            [10.01, 50.0],
            [10.01, 50.01],
            [10.0, 50.01],
            [10.0, 50.0],
        ]]))
    }

    #[test]
    fn test_extent_of_polygon() {
        let bbox = polygon_extent(Some(&square())).unwrap();
        assert_eq!(bbox.west, 10.0);
        assert_eq!(bbox.north, 50.01);
    }

    #[test]
    fn test_missing_polygon() {
        let err = polygon_extent(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingInputField);
    }

    #[test]
    fn test_point_rejected() {
        let point = Feature::new(Geometry::Point([10.0, 50.0]));
        let err = polygon_extent(Some(&point)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidGeometry);
        assert!(err.to_string().contains("Point"));
    }

    #[test]
    fn test_degenerate_ring_rejected() {
        let line = Feature::new(Geometry::Polygon(vec![vec![
            [10.0, 50.0],
            [10.01, 50.0],
            [10.02, 50.0],
            [10.0, 50.0],
        ]]));
        assert_eq!(
            polygon_extent(Some(&line)).unwrap_err().kind(),
            ErrorKind::InvalidGeometry
        );
        assert_eq!(
            polygon_extent(Some(&Feature::empty())).unwrap_err().kind(),
            ErrorKind::InvalidGeometry
        );
    }
}
