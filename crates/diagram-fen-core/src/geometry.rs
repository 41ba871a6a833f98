//! Pixel-space geometry: padding, cropping, and bounding-box arithmetic.

use image::{imageops, DynamicImage, GenericImage, RgbImage};
use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates of some source image.
///
/// Invariant after [`BoundingBox::clamped`]: `x1 < x2` and `y1 < y2` unless
/// the box is degenerate, which callers detect via [`BoundingBox::is_empty`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    #[inline]
    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() < 1.0 || self.height() < 1.0
    }

    /// Rescale from model space to image space with independent x/y factors.
    pub fn scaled(&self, x_factor: f32, y_factor: f32) -> Self {
        Self {
            x1: self.x1 * x_factor,
            y1: self.y1 * y_factor,
            x2: self.x2 * x_factor,
            y2: self.y2 * y_factor,
        }
    }

    /// Clamp all coordinates into `[0, max_x] x [0, max_y]`.
    pub fn clamped(&self, max_x: f32, max_y: f32) -> Self {
        Self {
            x1: self.x1.clamp(0.0, max_x),
            y1: self.y1.clamp(0.0, max_y),
            x2: self.x2.clamp(0.0, max_x),
            y2: self.y2.clamp(0.0, max_y),
        }
    }

    /// Grow the box by `frac` of its own width/height on every side.
    pub fn expanded(&self, frac: f32) -> Self {
        let dx = self.width() * frac;
        let dy = self.height() * frac;
        Self {
            x1: self.x1 - dx,
            y1: self.y1 - dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }
}

/// Pad an image with a black border of `pad_x` pixels left and right and
/// `pad_y` pixels top and bottom.
///
/// The bounding-box refiner pads before its first pass so boards touching
/// the frame edge still leave the model room to predict a full box.
pub fn pad(img: &DynamicImage, pad_x: u32, pad_y: u32) -> DynamicImage {
    let mut out = DynamicImage::ImageRgb8(RgbImage::new(
        img.width() + 2 * pad_x,
        img.height() + 2 * pad_y,
    ));
    out.copy_from(&DynamicImage::ImageRgb8(img.to_rgb8()), pad_x, pad_y)
        .expect("padded canvas always fits the source image");
    out
}

/// Crop an image to a bounding box, rounding to whole pixels.
pub fn crop(img: &DynamicImage, bbox: &BoundingBox) -> DynamicImage {
    let x = bbox.x1.max(0.0).round() as u32;
    let y = bbox.y1.max(0.0).round() as u32;
    let width = (bbox.width().round() as u32).min(img.width().saturating_sub(x));
    let height = (bbox.height().round() as u32).min(img.height().saturating_sub(y));
    imageops::crop_imm(img, x, y, width, height).to_image().into()
}
