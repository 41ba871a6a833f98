//! Image/tensor conversion and the fixed model-input transform.
//!
//! All classifiers consume CHW `f32` tensors produced here: RGB scaled to
//! `[0, 1]`, resized to the model's square resolution, then "min-max-mean"
//! normalized (rescale to span `[0, 1]`, subtract the mean).

use image::DynamicImage;
use ndarray::Array3;

/// Convert an image to a CHW RGB tensor with values in `[0, 1]`.
pub fn to_rgb_tensor(img: &DynamicImage) -> Array3<f32> {
    let rgb = img.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);
    let mut tensor = Array3::zeros((3, height, width));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for channel in 0..3 {
            tensor[[channel, y, x]] = f32::from(pixel.0[channel]) / 255.0;
        }
    }
    tensor
}

/// Min-max-mean normalization, in place.
///
/// Rescales the tensor so its values span `[0, 1]`, then subtracts the mean.
/// A constant tensor is left at zero after mean subtraction.
pub fn min_max_mean_normalize(tensor: &mut Array3<f32>) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &value in tensor.iter() {
        min = min.min(value);
        max = max.max(value);
    }
    let range = max - min;
    if range > 0.0 {
        tensor.mapv_inplace(|v| (v - min) / range);
    } else {
        tensor.fill(0.0);
    }
    let mean = tensor.mean().unwrap_or(0.0);
    tensor.mapv_inplace(|v| v - mean);
}

/// Bilinear resize of a CHW tensor to `(width, height)`.
pub fn resize_bilinear(tensor: &Array3<f32>, width: usize, height: usize) -> Array3<f32> {
    let (channels, src_h, src_w) = tensor.dim();
    let mut out = Array3::zeros((channels, height, width));
    if src_w == 0 || src_h == 0 || width == 0 || height == 0 {
        return out;
    }
    let x_scale = src_w as f32 / width as f32;
    let y_scale = src_h as f32 / height as f32;
    for y in 0..height {
        // Pixel-center mapping, clamped to the source borders.
        let sy = ((y as f32 + 0.5) * y_scale - 0.5).max(0.0);
        let y0 = (sy.floor() as usize).min(src_h - 1);
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = sy - y0 as f32;
        for x in 0..width {
            let sx = ((x as f32 + 0.5) * x_scale - 0.5).max(0.0);
            let x0 = (sx.floor() as usize).min(src_w - 1);
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = sx - x0 as f32;
            for channel in 0..channels {
                let p00 = tensor[[channel, y0, x0]];
                let p10 = tensor[[channel, y0, x1]];
                let p01 = tensor[[channel, y1, x0]];
                let p11 = tensor[[channel, y1, x1]];
                let top = p00 + fx * (p10 - p00);
                let bottom = p01 + fx * (p11 - p01);
                out[[channel, y, x]] = top + fy * (bottom - top);
            }
        }
    }
    out
}

/// The fixed per-model input transform: resize to a square resolution and
/// min-max-mean normalize.
pub fn default_transform(tensor: &Array3<f32>, size: usize) -> Array3<f32> {
    let mut resized = resize_bilinear(tensor, size, size);
    min_max_mean_normalize(&mut resized);
    resized
}

/// Invert pixel polarity, simulating a board rendered with swapped piece
/// colors. The subsequent min-max-mean normalization maps the result back
/// into the model's input range.
pub fn invert_polarity(tensor: &mut Array3<f32>) {
    tensor.mapv_inplace(|v| -v);
}

/// True when every value is finite. Augmentation occasionally produces NaNs
/// (equalization of a degenerate histogram); such a try is discarded rather
/// than poisoning the ensemble sum.
pub fn all_finite(tensor: &Array3<f32>) -> bool {
    tensor.iter().all(|v| v.is_finite())
}
