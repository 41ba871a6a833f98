//! Existence gate: does this image plausibly contain a chess diagram?

use image::DynamicImage;

use crate::consts;
use crate::model::{scalar_output, ModelError, ModelRegistry, ModelRole};

use super::model_input;

pub(crate) fn exists(registry: &ModelRegistry, img: &DynamicImage) -> Result<bool, ModelError> {
    let model = registry.get(ModelRole::Existence)?;
    let input = model_input(img, consts::BBOX_IMAGE_SIZE);
    let output = model.infer(&input)?;
    Ok(scalar_output(&output, "Existence")? > 0.5)
}
