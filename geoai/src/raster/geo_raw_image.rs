//! The georeferenced raster value type.

use image::imageops::FilterType;
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use super::types::{Crs, RasterError};
use crate::coord::GeoBoundingBox;

/// A pixel buffer with geographic bounds.
///
/// Pixels are stored row-major, interleaved, 8 bits per channel. Row 0 is
/// the northern edge of `bounds`. The pixel ↔ world transform is a plain
/// linear interpolation across the bounds, matching how tile mosaics are
/// georeferenced.
///
/// The buffer is owned: `clone()` is a deep copy and every transforming
/// operation returns a new instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRawImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    bounds: GeoBoundingBox,
    crs: Crs,
}

impl GeoRawImage {
    /// Creates a raster, validating dimensions, buffer length and bounds.
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        bounds: GeoBoundingBox,
        crs: Crs,
    ) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidDimensions {
                width,
                height,
                channels,
                reason: "width and height must be non-zero".to_string(),
            });
        }
        if !(1..=4).contains(&channels) {
            return Err(RasterError::InvalidDimensions {
                width,
                height,
                channels,
                reason: "channel count must be between 1 and 4".to_string(),
            });
        }

        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(RasterError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        // Re-validate: bounds may have been built field by field.
        let bounds = GeoBoundingBox::new(bounds.west, bounds.south, bounds.east, bounds.north)?;

        Ok(Self {
            data,
            width,
            height,
            channels,
            bounds,
            crs,
        })
    }

    /// Converts a decoded image, keeping its channel layout at 8 bits.
    pub fn from_dynamic_image(
        image: DynamicImage,
        bounds: GeoBoundingBox,
    ) -> Result<Self, RasterError> {
        let (width, height) = (image.width(), image.height());
        let (data, channels) = match image.color().channel_count() {
            1 => (image.into_luma8().into_raw(), 1),
            2 => (image.into_luma_alpha8().into_raw(), 2),
            3 => (image.into_rgb8().into_raw(), 3),
            _ => (image.into_rgba8().into_raw(), 4),
        };
        Self::new(data, width, height, channels, bounds, Crs::Epsg4326)
    }

    /// Converts back into an `image` crate buffer.
    pub fn to_dynamic_image(&self) -> Result<DynamicImage, RasterError> {
        let (w, h) = (self.width, self.height);
        let data = self.data.clone();
        let image = match self.channels {
            1 => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
            2 => GrayAlphaImage::from_raw(w, h, data).map(DynamicImage::ImageLumaA8),
            3 => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
            _ => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
        };
        image.ok_or_else(|| RasterError::Image("buffer does not match dimensions".to_string()))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the raster, returning its pixel buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn bounds(&self) -> &GeoBoundingBox {
        &self.bounds
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Channel values of one pixel, `None` when out of range.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let c = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * c;
        Some(&self.data[start..start + c])
    }

    /// Maps a pixel position to `(lng, lat)`.
    ///
    /// Fractional and out-of-range positions extrapolate linearly.
    #[inline]
    pub fn pixel_to_world(&self, px: f64, py: f64) -> (f64, f64) {
        let b = &self.bounds;
        let lng = b.west + px / self.width as f64 * (b.east - b.west);
        let lat = b.north - py / self.height as f64 * (b.north - b.south);
        (lng, lat)
    }

    /// Maps `(lng, lat)` to a fractional pixel position. Exact inverse of
    /// [`pixel_to_world`](Self::pixel_to_world).
    #[inline]
    pub fn world_to_pixel(&self, lng: f64, lat: f64) -> (f64, f64) {
        let b = &self.bounds;
        let px = (lng - b.west) / (b.east - b.west) * self.width as f64;
        let py = (b.north - lat) / (b.north - b.south) * self.height as f64;
        (px, py)
    }

    /// Exact geographic extent of a pixel window.
    pub fn window_bounds(&self, x: u32, y: u32, width: u32, height: u32) -> GeoBoundingBox {
        let (west, north) = self.pixel_to_world(x as f64, y as f64);
        let (east, south) = self.pixel_to_world((x + width) as f64, (y + height) as f64);
        GeoBoundingBox {
            west,
            south,
            east,
            north,
        }
    }

    /// Pixel window covering `bbox`, clamped to the raster.
    ///
    /// Returns `(x, y, width, height)`, or `None` when the box does not
    /// overlap the raster.
    pub fn bbox_to_pixels(&self, bbox: &GeoBoundingBox) -> Option<(u32, u32, u32, u32)> {
        let (x0, y0) = self.world_to_pixel(bbox.west, bbox.north);
        let (x1, y1) = self.world_to_pixel(bbox.east, bbox.south);

        let x0 = x0.floor().clamp(0.0, self.width as f64) as u32;
        let y0 = y0.floor().clamp(0.0, self.height as f64) as u32;
        let x1 = x1.ceil().clamp(0.0, self.width as f64) as u32;
        let y1 = y1.ceil().clamp(0.0, self.height as f64) as u32;

        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1 - x0, y1 - y0))
    }

    /// Copies a pixel window into a new raster with exact bounds.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Self, RasterError> {
        let in_range = width > 0
            && height > 0
            && x.checked_add(width).is_some_and(|r| r <= self.width)
            && y.checked_add(height).is_some_and(|b| b <= self.height);
        if !in_range {
            return Err(RasterError::WindowOutOfRange {
                x,
                y,
                width,
                height,
                raster_width: self.width,
                raster_height: self.height,
            });
        }

        let data = self.copy_window(x, y, width, height, width, height);
        Self::new(
            data,
            width,
            height,
            self.channels,
            self.window_bounds(x, y, width, height),
            self.crs,
        )
    }

    /// Resamples to new dimensions. Bounds are unchanged.
    pub fn resize(&self, width: u32, height: u32) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidDimensions {
                width,
                height,
                channels: self.channels,
                reason: "target size must be non-zero".to_string(),
            });
        }
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }

        let resized = self
            .to_dynamic_image()?
            .resize_exact(width, height, FilterType::Triangle);
        let mut out = Self::from_dynamic_image(resized, self.bounds)?;
        out.crs = self.crs;
        Ok(out)
    }

    /// Normalised planar `f32` copy of the first `mean.len()` channels.
    ///
    /// Each value is `(pixel / 255 - mean[c]) / std[c]`, laid out
    /// channel-major (CHW). Channels beyond the raster's own repeat its last
    /// channel, so a grey raster feeds a three-channel model.
    pub fn to_chw_f32(&self, mean: &[f32], std: &[f32]) -> Vec<f32> {
        let plane = self.width as usize * self.height as usize;
        let src_channels = self.channels as usize;
        let mut out = vec![0.0f32; plane * mean.len()];

        for (c, (m, s)) in mean.iter().zip(std).enumerate() {
            let src_c = c.min(src_channels - 1);
            let s = if *s == 0.0 { 1.0 } else { *s };
            let dst = &mut out[c * plane..(c + 1) * plane];
            for (i, value) in dst.iter_mut().enumerate() {
                let v = self.data[i * src_channels + src_c] as f32 / 255.0;
                *value = (v - m) / s;
            }
        }
        out
    }

    /// Copies a window into a zeroed `out_width × out_height` buffer.
    pub(super) fn copy_window(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        out_width: u32,
        out_height: u32,
    ) -> Vec<u8> {
        let c = self.channels as usize;
        let mut out = vec![0u8; out_width as usize * out_height as usize * c];
        let row_bytes = width as usize * c;

        for row in 0..height as usize {
            let src_start = ((y as usize + row) * self.width as usize + x as usize) * c;
            let dst_start = row * out_width as usize * c;
            out[dst_start..dst_start + row_bytes]
                .copy_from_slice(&self.data[src_start..src_start + row_bytes]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> GeoBoundingBox {
        GeoBoundingBox::new(10.0, 50.0, 11.0, 51.0).unwrap()
    }

    fn gradient(width: u32, height: u32) -> GeoRawImage {
        let data = (0..width * height).map(|i| (i % 251) as u8).collect();
        GeoRawImage::new(data, width, height, 1, bounds(), Crs::Epsg4326).unwrap()
    }

    #[test]
    fn test_new_rejects_buffer_mismatch() {
        let result = GeoRawImage::new(vec![0; 10], 4, 4, 1, bounds(), Crs::Epsg4326);
        assert!(matches!(
            result,
            Err(RasterError::BufferSizeMismatch {
                expected: 16,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_new_rejects_inverted_bounds() {
        let inverted = GeoBoundingBox {
            west: 1.0,
            south: 1.0,
            east: 0.0,
            north: 0.0,
        };
        let result = GeoRawImage::new(vec![0; 4], 2, 2, 1, inverted, Crs::Epsg4326);
        assert!(matches!(result, Err(RasterError::InvalidBounds(_))));
    }

    #[test]
    fn test_pixel_to_world_corners() {
        let img = gradient(100, 50);
        assert_eq!(img.pixel_to_world(0.0, 0.0), (10.0, 51.0));
        assert_eq!(img.pixel_to_world(100.0, 50.0), (11.0, 50.0));
        let (lng, lat) = img.pixel_to_world(50.0, 25.0);
        assert!((lng - 10.5).abs() < 1e-12);
        assert!((lat - 50.5).abs() < 1e-12);
    }

    #[test]
    fn test_clone_is_independent() {
        let original = gradient(4, 4);
        let copy = original.clone();
        let mut data = copy.into_data();
        data[0] = 99;
        assert_ne!(original.data()[0], 99);
    }

    #[test]
    fn test_crop_has_exact_bounds() {
        let img = gradient(100, 100);
        let crop = img.crop(25, 50, 50, 25).unwrap();
        assert_eq!(crop.width(), 50);
        assert_eq!(crop.height(), 25);
        assert!((crop.bounds().west - 10.25).abs() < 1e-12);
        assert!((crop.bounds().north - 50.5).abs() < 1e-12);
        assert!((crop.bounds().east - 10.75).abs() < 1e-12);
        assert!((crop.bounds().south - 50.25).abs() < 1e-12);
        assert_eq!(crop.pixel(0, 0), img.pixel(25, 50));
    }

    #[test]
    fn test_crop_out_of_range() {
        let img = gradient(10, 10);
        assert!(matches!(
            img.crop(5, 5, 6, 1),
            Err(RasterError::WindowOutOfRange { .. })
        ));
    }

    #[test]
    fn test_resize_keeps_bounds_and_channels() {
        let data = vec![128u8; 8 * 8 * 3];
        let img = GeoRawImage::new(data, 8, 8, 3, bounds(), Crs::Epsg4326).unwrap();
        let resized = img.resize(4, 2).unwrap();
        assert_eq!((resized.width(), resized.height()), (4, 2));
        assert_eq!(resized.channels(), 3);
        assert_eq!(resized.bounds(), img.bounds());
        assert_eq!(resized.pixel(0, 0), Some(&[128u8, 128, 128][..]));
    }

    #[test]
    fn test_bbox_to_pixels_clamps() {
        let img = gradient(100, 100);
        let window = img
            .bbox_to_pixels(&GeoBoundingBox::new(10.5, 49.0, 12.0, 50.5).unwrap())
            .unwrap();
        assert_eq!(window, (50, 50, 50, 50));
        let outside = GeoBoundingBox::new(20.0, 0.0, 21.0, 1.0).unwrap();
        assert!(img.bbox_to_pixels(&outside).is_none());
    }

    #[test]
    fn test_to_chw_f32_repeats_grey_channel() {
        let img = GeoRawImage::new(vec![0, 255], 2, 1, 1, bounds(), Crs::Epsg4326).unwrap();
        let tensor = img.to_chw_f32(&[0.0, 0.0, 0.5], &[1.0, 1.0, 0.5]);
        assert_eq!(tensor, vec![0.0, 1.0, 0.0, 1.0, -1.0, 1.0]);
    }

    #[test]
    fn test_dynamic_image_roundtrip_preserves_pixels() {
        let data: Vec<u8> = (0..4 * 3 * 4).map(|i| i as u8).collect();
        let img = GeoRawImage::new(data, 4, 3, 4, bounds(), Crs::Epsg4326).unwrap();
        let back = GeoRawImage::from_dynamic_image(img.to_dynamic_image().unwrap(), bounds())
            .unwrap();
        assert_eq!(back, img);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_pixel_world_roundtrip(
                width in 1u32..2048,
                height in 1u32..2048,
                fx in 0.0..1.0_f64,
                fy in 0.0..1.0_f64,
                west in -170.0..170.0_f64,
                south in -80.0..80.0_f64,
                span_x in 1e-6..5.0_f64,
                span_y in 1e-6..4.0_f64,
            ) {
                let bounds = GeoBoundingBox::new(west, south, west + span_x, south + span_y).unwrap();
                let img = GeoRawImage::new(vec![0; (width * height) as usize], width, height, 1, bounds, Crs::Epsg4326).unwrap();
                let px = (fx * width as f64).floor();
                let py = (fy * height as f64).floor();
                let (lng, lat) = img.pixel_to_world(px, py);
                let (rx, ry) = img.world_to_pixel(lng, lat);
                prop_assert!((rx - px).abs() < 1.0);
                prop_assert!((ry - py).abs() < 1.0);
            }
        }
    }
}
