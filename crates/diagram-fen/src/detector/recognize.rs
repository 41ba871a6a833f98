//! Piece-recognition ensemble with test-time augmentation.
//!
//! One forward pass over a board crop is noisy. The ensemble sums clamped
//! per-class confidences over clean, augmented, and color-inverted views of
//! the same crop, then decodes the accumulated tensor by per-square argmax.
//! Color-inverted tries have their output color channels remapped back
//! before accumulation, so every view votes on the same color semantics.

use image::DynamicImage;
use log::warn;
use ndarray::{Array3, ArrayD, Axis};
use rand::Rng;

use diagram_fen_core::{
    all_finite, augment_with, decode_board_tensor, flip_color_channels, invert_polarity,
    min_max_mean_normalize, resize_bilinear, to_rgb_tensor, AugmentParams, BoardState, BOARD_SIZE,
    OCC_CHANNELS,
};

use crate::consts;
use crate::model::{ModelError, ModelRegistry, ModelRole};

pub(crate) fn recognize_board<R: Rng>(
    registry: &ModelRegistry,
    img: &DynamicImage,
    num_tries: u32,
    augment_params: &AugmentParams,
    rng: &mut R,
) -> Result<Option<BoardState>, ModelError> {
    if img.width() < consts::MIN_RECOGNITION_SIZE || img.height() < consts::MIN_RECOGNITION_SIZE {
        return Ok(None);
    }

    let model = registry.get(ModelRole::PieceRecognition)?;
    let base = to_rgb_tensor(img);

    let mut accumulator: Option<Array3<f32>> = None;
    let mut tries = 0u32;
    let mut attempts = 0u32;
    // A non-finite augmented view is retried, but the loop stays bounded.
    let max_attempts = num_tries.saturating_mul(2).max(1);

    while tries < num_tries && attempts < max_attempts {
        attempts += 1;

        // The first two tries are clean; later ones get a random view.
        let mut input = if tries >= 2 {
            augment_with(&base, augment_params, rng)
        } else {
            base.clone()
        };

        let color_flipped = tries % 2 == 1;
        if color_flipped {
            invert_polarity(&mut input);
        }

        let mut input = resize_bilinear(&input, consts::BOARD_PIXEL_WIDTH, consts::BOARD_PIXEL_WIDTH);
        min_max_mean_normalize(&mut input);

        if !all_finite(&input) {
            warn!("non-finite values after transforms; discarding ensemble try");
            continue;
        }

        let output = model.infer(&input.insert_axis(Axis(0)).into_dyn())?;
        let mut scores = occupancy_scores(&output)?;
        scores.mapv_inplace(|v| v.clamp(0.0, 1.0));

        if color_flipped {
            scores = flip_color_channels(&scores);
        }

        match accumulator {
            Some(ref mut sum) => *sum += &scores,
            None => accumulator = Some(scores),
        }
        tries += 1;
    }

    // Every try may have been discarded; an empty accumulator is "no board".
    let Some(accumulator) = accumulator else {
        return Ok(None);
    };

    let board = decode_board_tensor(&accumulator);
    if board.occupied_count() == 0 {
        return Ok(None);
    }
    Ok(Some(board))
}

fn occupancy_scores(output: &ArrayD<f32>) -> Result<Array3<f32>, ModelError> {
    let expected = OCC_CHANNELS * BOARD_SIZE * BOARD_SIZE;
    if output.len() != expected {
        return Err(ModelError::OutputShape {
            name: "PieceRecognition".to_string(),
            shape: output.shape().to_vec(),
        });
    }
    let flat: Vec<f32> = output.iter().copied().collect();
    Array3::from_shape_vec((OCC_CHANNELS, BOARD_SIZE, BOARD_SIZE), flat).map_err(|_| {
        ModelError::OutputShape {
            name: "PieceRecognition".to_string(),
            shape: output.shape().to_vec(),
        }
    })
}
