//! Zone mask rasterisation for the image-generation step.
//!
//! Pixels are sampled at their centres `(x + 0.5, y + 0.5)`; a centre on the
//! right or bottom edge of an outline is outside. A covered pixel is 255,
//! everything else 0.

use crate::types::MaskData;
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const FILLED: Luma<u8> = Luma([255]);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    #[error("mask image must be at least 1x1, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },
}

/// Which outline of a zone to fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskShape {
    /// The bounding-rectangle hull.
    #[default]
    Hull,
    /// The landmark polygon, even-odd rule.
    Polygon,
}

/// Coordinate space of the landmarks feeding the mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    #[default]
    Pixels,
    /// 0–1 relative to the image, scaled by width/height.
    Normalized,
}

/// Rasterise one zone mask. `None` (an empty zone) yields an all-black image.
pub fn render_mask(
    mask: Option<&MaskData>,
    width: u32,
    height: u32,
    shape: MaskShape,
    space: CoordinateSpace,
) -> Result<GrayImage, RasterError> {
    if width == 0 || height == 0 {
        return Err(RasterError::EmptyImage { width, height });
    }

    let mut img = GrayImage::new(width, height);
    let Some(mask) = mask else {
        return Ok(img);
    };

    let outline = match shape {
        MaskShape::Hull => &mask.approximate_hull,
        MaskShape::Polygon => &mask.polygon,
    };
    let (sx, sy) = match space {
        CoordinateSpace::Pixels => (1.0, 1.0),
        CoordinateSpace::Normalized => (width as f64, height as f64),
    };
    let vertices: Vec<(f64, f64)> = outline.iter().map(|&[x, y]| (x * sx, y * sy)).collect();

    fill_even_odd(&mut img, &vertices);
    Ok(img)
}

/// Scanline fill. Degenerate outlines (fewer than three vertices, or zero area
/// along a scanline) cover nothing.
fn fill_even_odd(img: &mut GrayImage, vertices: &[(f64, f64)]) {
    if vertices.len() < 3 {
        return;
    }
    let (width, height) = img.dimensions();
    let mut crossings: Vec<f64> = Vec::with_capacity(vertices.len());

    for py in 0..height {
        let cy = py as f64 + 0.5;
        crossings.clear();

        for (i, &(x0, y0)) in vertices.iter().enumerate() {
            let (x1, y1) = vertices[(i + 1) % vertices.len()];
            // Half-open on y so shared vertices are counted once.
            if (y0 <= cy) != (y1 <= cy) {
                crossings.push(x0 + (cy - y0) / (y1 - y0) * (x1 - x0));
            }
        }
        crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        // Centres in [left, right) are covered.
        for span in crossings.chunks_exact(2) {
            let start = (span[0] - 0.5).ceil().max(0.0);
            let end = ((span[1] - 0.5).ceil() - 1.0).min(width as f64 - 1.0);
            if end < start {
                continue;
            }
            for px in start as u32..=end as u32 {
                img.put_pixel(px, py, FILLED);
            }
        }
    }
}
