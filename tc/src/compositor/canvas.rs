//! Single-channel canvas

use std::path::Path;

use image::error::{ParameterError, ParameterErrorKind};
use image::{GrayImage, ImageError, ImageFormat};
use tracing::debug;

use crate::domain::CanvasSize;

/// Pre-allocated row-major L8 raster; unwritten pixels stay zero
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(size: CanvasSize) -> Self {
        debug!(%size, "Canvas::new: called");
        Self {
            width: size.width,
            height: size.height,
            pixels: vec![0; size.pixels()],
        }
    }

    pub fn size(&self) -> CanvasSize {
        CanvasSize::new(self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.pixels[start..start + w]
    }

    /// Mutable rows `[y, y + rows)` as one contiguous slice
    pub(crate) fn rows_mut(&mut self, y: u32, rows: u32) -> &mut [u8] {
        let w = self.width as usize;
        let start = y as usize * w;
        &mut self.pixels[start..start + rows as usize * w]
    }

    /// Write the canvas as a grayscale PNG
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        let path = path.as_ref();
        debug!(path = %path.display(), size = %self.size(), "Canvas::save_png: called");
        let Some(image) = GrayImage::from_raw(self.width, self.height, self.pixels.clone()) else {
            return Err(ImageError::Parameter(ParameterError::from_kind(
                ParameterErrorKind::DimensionMismatch,
            )));
        };
        image.save_with_format(path, ImageFormat::Png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_canvas_is_zeroed() {
        let canvas = Canvas::new(CanvasSize::new(4, 3));
        assert_eq!(canvas.pixels().len(), 12);
        assert!(canvas.pixels().iter().all(|p| *p == 0));
        assert_eq!(canvas.row(2), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_save_png_round_trips_dimensions() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("out.png");

        let mut canvas = Canvas::new(CanvasSize::new(5, 4));
        canvas.rows_mut(1, 2).fill(255);
        canvas.save_png(&path).unwrap();

        let loaded = image::open(&path).unwrap().into_luma8();
        assert_eq!(loaded.dimensions(), (5, 4));
        assert_eq!(loaded.get_pixel(0, 0).0, [0]);
        assert_eq!(loaded.get_pixel(3, 2).0, [255]);
    }
}
