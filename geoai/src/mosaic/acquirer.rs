//! Concurrent tile fetching and stitching.

use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::types::{Acquisition, MosaicError};
use crate::coord::{GeoBoundingBox, TileCoord};
use crate::provider::{redact_query, AsyncHttpClient};
use crate::raster::{Crs, GeoRawImage};
use crate::tile::TileGrid;

/// Fetches every tile of a grid and returns a mosaic or per-tile rasters.
///
/// All requests are issued at once; the acquisition completes only when
/// every tile has arrived. The first failure aborts the outstanding
/// requests and fails the whole acquisition. There is no retry.
pub struct MosaicAcquirer<C> {
    client: C,
}

impl<C> MosaicAcquirer<C>
where
    C: AsyncHttpClient + Clone + 'static,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Fetches the grid.
    ///
    /// With `stitch`, tiles are composed into one raster whose bounds come
    /// from the four corner tiles. Without it, each tile keeps its exact
    /// bounds.
    pub async fn acquire(&self, grid: &TileGrid, stitch: bool) -> Result<Acquisition, MosaicError> {
        let started = Instant::now();
        let tiles = self.fetch_all(grid).await?;

        debug!(
            tiles = grid.len(),
            zoom = grid.zoom(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tile grid fetched"
        );

        if stitch {
            Ok(Acquisition::Mosaic(stitch_tiles(grid, &tiles)?))
        } else {
            Ok(Acquisition::Tiles(tiles))
        }
    }

    /// Convenience for `acquire(grid, true)`.
    pub async fn acquire_mosaic(&self, grid: &TileGrid) -> Result<GeoRawImage, MosaicError> {
        let started = Instant::now();
        let tiles = self.fetch_all(grid).await?;
        let mosaic = stitch_tiles(grid, &tiles)?;
        debug!(
            width = mosaic.width(),
            height = mosaic.height(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Mosaic stitched"
        );
        Ok(mosaic)
    }

    async fn fetch_all(&self, grid: &TileGrid) -> Result<Vec<Vec<GeoRawImage>>, MosaicError> {
        let cols = grid.col_count();
        let mut downloads = JoinSet::new();

        for (index, tile) in grid.iter().enumerate() {
            let client = self.client.clone();
            let coord = tile.coord();
            let url = tile.source_url().to_string();
            downloads.spawn(async move { (index, fetch_tile(client, coord, url).await) });
        }

        let mut slots: Vec<Option<GeoRawImage>> = vec![None; grid.len()];
        while let Some(joined) = downloads.join_next().await {
            match joined {
                Ok((index, Ok(image))) => slots[index] = Some(image),
                Ok((_, Err(e))) => {
                    warn!(error = %e, "Tile fetch failed, abandoning acquisition");
                    downloads.abort_all();
                    return Err(e);
                }
                Err(join_err) => {
                    downloads.abort_all();
                    return Err(MosaicError::Task(join_err.to_string()));
                }
            }
        }

        let flat: Vec<GeoRawImage> = slots.into_iter().flatten().collect();
        if flat.len() != grid.len() {
            return Err(MosaicError::Task(format!(
                "{} of {} tiles missing after fetch",
                grid.len() - flat.len(),
                grid.len()
            )));
        }

        let mut rows = Vec::with_capacity(grid.row_count());
        let mut iter = flat.into_iter();
        for _ in 0..grid.row_count() {
            rows.push(iter.by_ref().take(cols).collect());
        }
        Ok(rows)
    }
}

async fn fetch_tile<C: AsyncHttpClient>(
    client: C,
    coord: TileCoord,
    url: String,
) -> Result<GeoRawImage, MosaicError> {
    let bytes = client
        .get(&url)
        .await
        .map_err(|source| MosaicError::TileFetch { tile: coord, source })?;

    let image = image::load_from_memory(&bytes).map_err(|e| MosaicError::Decode {
        tile: coord,
        message: format!("{} ({})", e, redact_query(&url)),
    })?;

    Ok(GeoRawImage::from_dynamic_image(image, coord.bounds())?)
}

/// Concatenates tiles column-wise within rows and row-wise across rows.
fn stitch_tiles(grid: &TileGrid, tiles: &[Vec<GeoRawImage>]) -> Result<GeoRawImage, MosaicError> {
    let first = &tiles[0][0];
    let (tile_w, tile_h, channels) = (first.width(), first.height(), first.channels());

    for (row, descriptor_row) in tiles.iter().zip(grid.rows()) {
        for (image, descriptor) in row.iter().zip(descriptor_row) {
            if image.width() != tile_w || image.height() != tile_h || image.channels() != channels {
                return Err(MosaicError::InconsistentTiles {
                    tile: descriptor.coord(),
                    width: tile_w,
                    height: tile_h,
                    channels,
                    actual_width: image.width(),
                    actual_height: image.height(),
                    actual_channels: image.channels(),
                });
            }
        }
    }

    let cols = grid.col_count();
    let width = tile_w * cols as u32;
    let height = tile_h * grid.row_count() as u32;
    let tile_row_bytes = tile_w as usize * channels as usize;
    let mut data = Vec::with_capacity(width as usize * height as usize * channels as usize);

    for row in tiles {
        for py in 0..tile_h as usize {
            for image in row {
                let start = py * tile_row_bytes;
                data.extend_from_slice(&image.data()[start..start + tile_row_bytes]);
            }
        }
    }

    Ok(GeoRawImage::new(
        data,
        width,
        height,
        channels,
        corner_bounds(grid)?,
        Crs::Epsg4326,
    )?)
}

/// Mosaic bounds from the four corner tiles only.
///
/// For uniform Web Mercator grids this equals the union of all tiles. The
/// linear pixel transform over these bounds ignores Mercator stretch within
/// the mosaic, which is accepted.
fn corner_bounds(grid: &TileGrid) -> Result<GeoBoundingBox, MosaicError> {
    let [top_left, top_right, bottom_left, bottom_right] = grid.corners().map(|t| t.coord().bounds());
    let bounds = GeoBoundingBox::new(
        top_left.west.min(bottom_left.west),
        bottom_left.south.min(bottom_right.south),
        top_right.east.max(bottom_right.east),
        top_left.north.max(top_right.north),
    )
    .map_err(crate::raster::RasterError::from)?;
    Ok(bounds)
}
