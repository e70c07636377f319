//! Patch decomposition of a raster.

use super::geo_raw_image::GeoRawImage;
use super::types::RasterError;

/// How edge patches are sized when the raster is not an exact multiple of
/// the patch size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchPadding {
    /// Every patch is exactly the requested size; edge patches are
    /// zero-filled beyond the raster.
    #[default]
    Pad,
    /// Edge patches keep the exact remainder and are smaller.
    Exact,
}

impl GeoRawImage {
    /// Splits the raster row-major into `patch_height × patch_width` blocks.
    ///
    /// Rows of the result run north to south, columns west to east. With
    /// [`PatchPadding::Pad`] the grid is `ceil(H/ph) × ceil(W/pw)` and every
    /// patch has the requested size. Either way each patch's bounds are the
    /// exact geographic extent of the parent pixels it copies; padding does
    /// not widen them.
    pub fn to_patches(
        &self,
        patch_height: u32,
        patch_width: u32,
        padding: PatchPadding,
    ) -> Result<Vec<Vec<GeoRawImage>>, RasterError> {
        if patch_height == 0 || patch_width == 0 {
            return Err(RasterError::InvalidDimensions {
                width: patch_width,
                height: patch_height,
                channels: self.channels(),
                reason: "patch size must be non-zero".to_string(),
            });
        }

        let rows = self.height().div_ceil(patch_height);
        let cols = self.width().div_ceil(patch_width);
        let mut grid = Vec::with_capacity(rows as usize);

        for row in 0..rows {
            let y = row * patch_height;
            let h = patch_height.min(self.height() - y);
            let mut patches = Vec::with_capacity(cols as usize);

            for col in 0..cols {
                let x = col * patch_width;
                let w = patch_width.min(self.width() - x);

                let (out_w, out_h) = match padding {
                    PatchPadding::Pad => (patch_width, patch_height),
                    PatchPadding::Exact => (w, h),
                };

                let data = self.copy_window(x, y, w, h, out_w, out_h);
                patches.push(GeoRawImage::new(
                    data,
                    out_w,
                    out_h,
                    self.channels(),
                    self.window_bounds(x, y, w, h),
                    self.crs(),
                )?);
            }
            grid.push(patches);
        }

        Ok(grid)
    }
}
