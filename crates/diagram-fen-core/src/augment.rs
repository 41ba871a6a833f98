//! Stochastic test-time augmentation for the recognition ensemble.
//!
//! Each transform is applied independently with a fixed probability,
//! mirroring the augmentation menu the piece-recognition model was trained
//! with: noise, elastic warp, grayscale, posterize, brightness/contrast
//! jitter, blur, sharpening, and histogram equalization. The random source
//! is explicit so callers control reproducibility.

use ndarray::{Array3, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Per-transform application probabilities.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AugmentParams {
    pub noise: f32,
    pub elastic: f32,
    pub grayscale: f32,
    pub posterize: f32,
    pub color_jitter: f32,
    pub blur3: f32,
    pub blur5: f32,
    pub sharpen: f32,
    pub equalize: f32,
}

impl Default for AugmentParams {
    fn default() -> Self {
        Self {
            noise: 0.4,
            elastic: 0.4,
            grayscale: 0.4,
            posterize: 0.2,
            color_jitter: 0.3,
            blur3: 0.2,
            blur5: 0.1,
            sharpen: 0.1,
            equalize: 0.8,
        }
    }
}

/// Apply one randomly composed augmentation pass to a CHW tensor in `[0, 1]`.
pub fn augment<R: Rng>(tensor: &Array3<f32>, rng: &mut R) -> Array3<f32> {
    augment_with(tensor, &AugmentParams::default(), rng)
}

pub fn augment_with<R: Rng>(
    tensor: &Array3<f32>,
    params: &AugmentParams,
    rng: &mut R,
) -> Array3<f32> {
    let mut out = tensor.clone();
    if rng.gen::<f32>() < params.noise {
        add_gaussian_noise(&mut out, 0.1, rng);
    }
    if rng.gen::<f32>() < params.elastic {
        out = elastic_warp(&out, 30.0, rng);
        out = elastic_warp(&out, 40.0, rng);
    }
    if rng.gen::<f32>() < params.grayscale {
        grayscale(&mut out);
    }
    if rng.gen::<f32>() < params.posterize {
        posterize(&mut out, 2);
    }
    if rng.gen::<f32>() < params.color_jitter {
        let brightness = rng.gen_range(0.1..1.9f32);
        let contrast = rng.gen_range(0.1..1.5f32);
        color_jitter(&mut out, brightness, contrast);
    }
    if rng.gen::<f32>() < params.blur3 {
        out = blur(&out, &[1.0, 2.0, 1.0]);
    }
    if rng.gen::<f32>() < params.blur5 {
        out = blur(&out, &[1.0, 4.0, 6.0, 4.0, 1.0]);
    }
    if rng.gen::<f32>() < params.sharpen {
        out = sharpen(&out, 10.0);
    }
    if rng.gen::<f32>() < params.equalize {
        equalize(&mut out);
    }
    out.mapv_inplace(|v| v.clamp(0.0, 1.0));
    out
}

/// Additive gaussian noise with a standard deviation relative to the value
/// span of the input.
fn add_gaussian_noise<R: Rng>(tensor: &mut Array3<f32>, rel_std: f32, rng: &mut R) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &value in tensor.iter() {
        min = min.min(value);
        max = max.max(value);
    }
    let std = rel_std * (max - min).max(f32::EPSILON);
    tensor.mapv_inplace(|v| v + std * standard_normal(rng));
}

/// Box-Muller sample from the standard normal distribution.
fn standard_normal<R: Rng>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen::<f32>();
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}

/// Elastic warp: a coarse random displacement field, bilinearly upsampled and
/// applied with border-clamped bilinear sampling. `alpha` is the maximum
/// displacement in pixels.
fn elastic_warp<R: Rng>(tensor: &Array3<f32>, alpha: f32, rng: &mut R) -> Array3<f32> {
    const GRID: usize = 4;
    let (channels, height, width) = tensor.dim();
    if height < 2 || width < 2 {
        return tensor.clone();
    }

    let mut dx = [[0.0f32; GRID + 1]; GRID + 1];
    let mut dy = [[0.0f32; GRID + 1]; GRID + 1];
    for row in dx.iter_mut().chain(dy.iter_mut()) {
        for value in row.iter_mut() {
            *value = rng.gen_range(-alpha..alpha);
        }
    }

    let field = |grid: &[[f32; GRID + 1]; GRID + 1], x: f32, y: f32| {
        let gx = x / (width - 1) as f32 * GRID as f32;
        let gy = y / (height - 1) as f32 * GRID as f32;
        let x0 = (gx.floor() as usize).min(GRID - 1);
        let y0 = (gy.floor() as usize).min(GRID - 1);
        let fx = gx - x0 as f32;
        let fy = gy - y0 as f32;
        let top = grid[y0][x0] + fx * (grid[y0][x0 + 1] - grid[y0][x0]);
        let bottom = grid[y0 + 1][x0] + fx * (grid[y0 + 1][x0 + 1] - grid[y0 + 1][x0]);
        top + fy * (bottom - top)
    };

    let sample = |channel: usize, x: f32, y: f32| {
        let x = x.clamp(0.0, (width - 1) as f32);
        let y = y.clamp(0.0, (height - 1) as f32);
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(width - 1);
        let y1 = (y0 + 1).min(height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;
        let top = tensor[[channel, y0, x0]] + fx * (tensor[[channel, y0, x1]] - tensor[[channel, y0, x0]]);
        let bottom =
            tensor[[channel, y1, x0]] + fx * (tensor[[channel, y1, x1]] - tensor[[channel, y1, x0]]);
        top + fy * (bottom - top)
    };

    let mut out = Array3::zeros((channels, height, width));
    for y in 0..height {
        for x in 0..width {
            let offset_x = field(&dx, x as f32, y as f32);
            let offset_y = field(&dy, x as f32, y as f32);
            for channel in 0..channels {
                out[[channel, y, x]] = sample(channel, x as f32 + offset_x, y as f32 + offset_y);
            }
        }
    }
    out
}

fn grayscale(tensor: &mut Array3<f32>) {
    let (channels, height, width) = tensor.dim();
    if channels < 3 {
        return;
    }
    for y in 0..height {
        for x in 0..width {
            let luma = 0.299 * tensor[[0, y, x]] + 0.587 * tensor[[1, y, x]]
                + 0.114 * tensor[[2, y, x]];
            for channel in 0..3 {
                tensor[[channel, y, x]] = luma;
            }
        }
    }
}

fn posterize(tensor: &mut Array3<f32>, bits: u32) {
    let levels = (1u32 << bits) as f32 - 1.0;
    tensor.mapv_inplace(|v| (v.clamp(0.0, 1.0) * levels).round() / levels);
}

fn color_jitter(tensor: &mut Array3<f32>, brightness: f32, contrast: f32) {
    tensor.mapv_inplace(|v| v * brightness);
    let mean = tensor.mean().unwrap_or(0.0);
    tensor.mapv_inplace(|v| (mean + contrast * (v - mean)).clamp(0.0, 1.0));
}

/// Separable blur with a symmetric odd-length kernel.
fn blur(tensor: &Array3<f32>, kernel: &[f32]) -> Array3<f32> {
    let (channels, height, width) = tensor.dim();
    let radius = kernel.len() / 2;
    let norm: f32 = kernel.iter().sum();

    let mut horizontal = Array3::zeros((channels, height, width));
    for channel in 0..channels {
        for y in 0..height {
            for x in 0..width {
                let mut acc = 0.0;
                for (k, &weight) in kernel.iter().enumerate() {
                    let sx = (x + k).saturating_sub(radius).min(width - 1);
                    acc += weight * tensor[[channel, y, sx]];
                }
                horizontal[[channel, y, x]] = acc / norm;
            }
        }
    }

    let mut out = Array3::zeros((channels, height, width));
    for channel in 0..channels {
        for y in 0..height {
            for x in 0..width {
                let mut acc = 0.0;
                for (k, &weight) in kernel.iter().enumerate() {
                    let sy = (y + k).saturating_sub(radius).min(height - 1);
                    acc += weight * horizontal[[channel, sy, x]];
                }
                out[[channel, y, x]] = acc / norm;
            }
        }
    }
    out
}

/// Unsharp masking: blend the input away from its blurred version.
fn sharpen(tensor: &Array3<f32>, factor: f32) -> Array3<f32> {
    let blurred = blur(tensor, &[1.0, 2.0, 1.0]);
    let mut out = tensor.clone();
    out.zip_mut_with(&blurred, |value, &soft| {
        *value = (soft + factor * (*value - soft)).clamp(0.0, 1.0);
    });
    out
}

/// Per-channel histogram equalization over 256 bins.
fn equalize(tensor: &mut Array3<f32>) {
    let (channels, _, _) = tensor.dim();
    for channel in 0..channels {
        let mut plane = tensor.index_axis_mut(Axis(0), channel);
        let mut histogram = [0u32; 256];
        for &value in plane.iter() {
            let bin = (value.clamp(0.0, 1.0) * 255.0) as usize;
            histogram[bin] += 1;
        }
        let total: u32 = histogram.iter().sum();
        if total == 0 {
            continue;
        }
        let mut cdf = [0.0f32; 256];
        let mut running = 0u32;
        for (bin, &count) in histogram.iter().enumerate() {
            running += count;
            cdf[bin] = running as f32 / total as f32;
        }
        let floor = cdf.iter().copied().find(|&v| v > 0.0).unwrap_or(0.0);
        if floor >= 1.0 {
            continue;
        }
        for value in plane.iter_mut() {
            let bin = (value.clamp(0.0, 1.0) * 255.0) as usize;
            *value = (cdf[bin] - floor) / (1.0 - floor);
        }
    }
}
