use serde::{Deserialize, Serialize};

use diagram_fen_core::AugmentParams;

use crate::consts;

/// Configuration for the detection pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FenDetectorParams {
    /// Bounding-box refinement passes and recognition-ensemble tries.
    /// Higher is more accurate and slower, with diminishing returns.
    pub num_tries: u32,
    /// Undo the classified image rotation before piece recognition.
    pub auto_rotate_image: bool,
    /// Additionally mirror left-right after undoing a 180-degree rotation.
    /// Some symmetric diagrams are not resolved by the rotation alone.
    pub mirror_when_180_rotation: bool,
    /// Rotate the logical board when it is classified as drawn from
    /// black's perspective.
    pub auto_rotate_board: bool,
    /// Bias subtracted from the orientation score before the 0.5 threshold,
    /// favoring "not flipped" on ambiguous boards.
    pub no_rotate_bias: f32,
    /// Augmentation probabilities for ensemble tries after the first two.
    pub augment: AugmentParams,
}

impl Default for FenDetectorParams {
    fn default() -> Self {
        Self {
            num_tries: 10,
            auto_rotate_image: true,
            mirror_when_180_rotation: false,
            auto_rotate_board: true,
            no_rotate_bias: consts::DEFAULT_NO_ROTATE_BIAS,
            augment: AugmentParams::default(),
        }
    }
}
