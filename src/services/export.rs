//! PNG export of the canvas.
//!
//! Each cell becomes a `PIXEL_SIZE`-square block. Unset cells stay fully
//! transparent, cells with malformed colors are skipped, and cells outside
//! the requested grid are clipped.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::pixel::{Pixel, parse_hex_color};

/// Edge length in image pixels of one canvas cell.
pub const PIXEL_SIZE: u32 = 20;

/// Largest grid edge the exporter will rasterize.
pub const MAX_EXPORT_GRID: u32 = 200;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("grid size {size} out of range (1..={max})", max = MAX_EXPORT_GRID)]
    OutOfRange { size: u32 },
    #[error("png encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Draw `pixels` onto a `grid_size * PIXEL_SIZE` square bitmap.
///
/// # Errors
///
/// Returns [`ExportError::OutOfRange`] for a zero or oversized grid.
pub fn render(pixels: &[Pixel], grid_size: u32) -> Result<RgbaImage, ExportError> {
    if grid_size == 0 || grid_size > MAX_EXPORT_GRID {
        return Err(ExportError::OutOfRange { size: grid_size });
    }

    let side = grid_size * PIXEL_SIZE;
    let mut img = RgbaImage::new(side, side);

    for pixel in pixels {
        let Some([r, g, b]) = parse_hex_color(&pixel.color) else {
            continue;
        };
        if pixel.x >= grid_size || pixel.y >= grid_size {
            continue;
        }
        let (left, top) = (pixel.x * PIXEL_SIZE, pixel.y * PIXEL_SIZE);
        for dy in 0..PIXEL_SIZE {
            for dx in 0..PIXEL_SIZE {
                img.put_pixel(left + dx, top + dy, Rgba([r, g, b, 255]));
            }
        }
    }

    Ok(img)
}

/// Render and encode as PNG bytes.
///
/// # Errors
///
/// Returns an error if the grid size is out of range or encoding fails.
pub fn export_png(pixels: &[Pixel], grid_size: u32) -> Result<Vec<u8>, ExportError> {
    let img = render(pixels, grid_size)?;
    let mut output = Cursor::new(Vec::new());
    img.write_to(&mut output, ImageFormat::Png)?;
    Ok(output.into_inner())
}

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;
