//! Iterative bounding-box refinement.
//!
//! A single bounding-box inference is often loose. Each pass crops the image
//! a little closer to the predicted box and asks again, letting the model
//! zoom in; the loop accepts once the box fills most of the current frame.

use image::DynamicImage;
use log::debug;
use ndarray::ArrayD;

use diagram_fen_core::{crop, pad, BoundingBox};

use crate::consts;
use crate::model::{ModelError, ModelRegistry, ModelRole};

use super::{model_input, CropOutcome};

pub(crate) fn crop_to_board(
    registry: &ModelRegistry,
    img: &DynamicImage,
    max_tries: u32,
) -> Result<CropOutcome, ModelError> {
    let model = registry.get(ModelRole::BoundingBox)?;

    // Guard against boards touching the frame edge.
    let pad_x = (img.width() as f32 * consts::BBOX_PAD_FACTOR) as u32;
    let pad_y = (img.height() as f32 * consts::BBOX_PAD_FACTOR) as u32;
    let mut img = pad(img, pad_x, pad_y);

    for pass in 0..max_tries {
        if img.width() == 0 || img.height() == 0 {
            return Ok(CropOutcome::Exhausted);
        }

        let input = model_input(&img, consts::BBOX_IMAGE_SIZE);
        let output = model.infer(&input)?;
        let bbox = bbox_from_output(&output)?;

        let (width, height) = (img.width() as f32, img.height() as f32);
        let x_factor = width / consts::BBOX_IMAGE_SIZE as f32;
        let y_factor = height / consts::BBOX_IMAGE_SIZE as f32;
        let bbox = bbox
            .scaled(x_factor, y_factor)
            .clamped(width - 1.0, height - 1.0);

        let x_coverage = bbox.width() / width;
        let y_coverage = bbox.height() / height;
        debug!(
            "bbox pass {pass}: coverage {x_coverage:.2} x {y_coverage:.2} in {}x{}",
            img.width(),
            img.height()
        );

        // The box is only trusted once the board fills most of the frame.
        if x_coverage > consts::BBOX_COVERAGE_THRESHOLD
            && y_coverage > consts::BBOX_COVERAGE_THRESHOLD
        {
            return Ok(CropOutcome::Converged(crop(&img, &bbox)));
        }

        // Re-crop a little wider than the prediction so the next pass does
        // not cut off a board edge the model underestimated.
        let expanded = bbox
            .expanded(consts::BBOX_EXPAND_FACTOR)
            .clamped(width, height);
        if expanded.is_empty() {
            return Ok(CropOutcome::Exhausted);
        }
        img = crop(&img, &expanded);
    }

    Ok(CropOutcome::Exhausted)
}

fn bbox_from_output(output: &ArrayD<f32>) -> Result<BoundingBox, ModelError> {
    let mut coords = output.iter().copied();
    let mut next = || {
        coords.next().ok_or_else(|| ModelError::OutputShape {
            name: "BoundingBox".to_string(),
            shape: output.shape().to_vec(),
        })
    };
    Ok(BoundingBox::new(next()?, next()?, next()?, next()?))
}
