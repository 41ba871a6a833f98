//! Fixed model-input constants.
//!
//! These are external configuration in the sense that each trained
//! classifier expects exactly this resolution and normalization; the
//! pipeline depends on the values but does not derive them.

/// Input resolution of the bounding-box model, shared by the existence gate.
pub const BBOX_IMAGE_SIZE: usize = 256;

/// Input resolution of the image-rotation model.
pub const ROTATION_IMAGE_SIZE: usize = 256;

/// Input resolution of the piece-recognition model.
pub const BOARD_PIXEL_WIDTH: usize = 256;

/// Minimum crop size accepted by the recognition ensemble, in pixels.
pub const MIN_RECOGNITION_SIZE: u32 = 32;

/// Rotation classes of the image-rotation model, in degrees.
pub const ROTATIONS: [u32; 4] = [0, 90, 180, 270];

/// Frame padding applied before the first bounding-box pass.
pub const BBOX_PAD_FACTOR: f32 = 0.05;

/// Fractional coverage along each axis at which a predicted box is accepted.
pub const BBOX_COVERAGE_THRESHOLD: f32 = 0.7;

/// Relative growth of a rejected box before the next refinement pass.
pub const BBOX_EXPAND_FACTOR: f32 = 0.1;

/// Default bias subtracted from the orientation score before thresholding.
/// Deliberately favors "not flipped" on ambiguous boards; tuned, not derived.
pub const DEFAULT_NO_ROTATE_BIAS: f32 = 0.2;
