//! The diagram-to-FEN detection pipeline.
//!
//! This module wires the five classifiers into one decision procedure:
//! existence gate, iterative bounding-box refinement, rotation
//! normalization, the piece-recognition ensemble, and board-orientation
//! correction.

mod bbox;
mod existence;
mod orientation;
mod params;
mod pipeline;
mod recognize;
mod result;
mod rotation;

use image::DynamicImage;
use ndarray::{ArrayD, Axis};

use diagram_fen_core::{default_transform, to_rgb_tensor};

pub use params::FenDetectorParams;
pub use pipeline::FenDetector;
pub use result::{CropOutcome, FenResult};

/// Build the `(1, 3, size, size)` input batch every image-consuming
/// classifier expects.
pub(crate) fn model_input(img: &DynamicImage, size: usize) -> ArrayD<f32> {
    default_transform(&to_rgb_tensor(img), size)
        .insert_axis(Axis(0))
        .into_dyn()
}
