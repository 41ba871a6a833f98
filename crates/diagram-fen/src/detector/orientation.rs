//! Board-orientation correction.
//!
//! Decides whether a decoded board is drawn from black's perspective. This
//! operates on the logical board, not pixels: the board is re-encoded into
//! its tensor form for the classifier, and a positive verdict triggers a
//! 180-degree rotation of the board state.

use ndarray::Axis;

use diagram_fen_core::{board_to_tensor, BoardState};

use crate::model::{scalar_output, ModelError, ModelRegistry, ModelRole};

/// True when the classifier judges the diagram to be drawn from black's
/// side. `bias` is subtracted from the raw score before the 0.5 threshold,
/// so flipping requires stronger evidence than not flipping.
pub(crate) fn is_flipped(
    registry: &ModelRegistry,
    board: &BoardState,
    bias: f32,
) -> Result<bool, ModelError> {
    let model = registry.get(ModelRole::BoardOrientation)?;
    let input = board_to_tensor(board).insert_axis(Axis(0)).into_dyn();
    let output = model.infer(&input)?;
    Ok(scalar_output(&output, "BoardOrientation")? - bias > 0.5)
}
