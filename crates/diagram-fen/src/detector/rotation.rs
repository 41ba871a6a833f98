//! Image-rotation classification and correction.

use image::DynamicImage;

use crate::consts;
use crate::model::{ModelError, ModelRegistry, ModelRole};

use super::model_input;

/// Classify the rotation of a board crop. Returns an index into
/// [`consts::ROTATIONS`].
pub(crate) fn classify_rotation(
    registry: &ModelRegistry,
    img: &DynamicImage,
) -> Result<usize, ModelError> {
    let model = registry.get(ModelRole::ImageRotation)?;
    let input = model_input(img, consts::ROTATION_IMAGE_SIZE);
    let output = model.infer(&input)?;

    let scores: Vec<f32> = output.iter().copied().take(consts::ROTATIONS.len()).collect();
    if scores.len() < consts::ROTATIONS.len() {
        return Err(ModelError::OutputShape {
            name: "ImageRotation".to_string(),
            shape: output.shape().to_vec(),
        });
    }

    let mut best = 0;
    for (index, &score) in scores.iter().enumerate() {
        if score > scores[best] {
            best = index;
        }
    }
    Ok(best)
}

/// Rotate the pixels back to upright given a classified rotation index.
///
/// All rotations are quarter turns, so the canvas expands losslessly.
pub(crate) fn rotate_image_back(img: DynamicImage, angle_index: usize) -> DynamicImage {
    match consts::ROTATIONS[angle_index] {
        90 => img.rotate90(),
        180 => img.rotate180(),
        270 => img.rotate270(),
        _ => img,
    }
}
