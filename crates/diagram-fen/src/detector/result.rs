use image::DynamicImage;

/// Output of a full pipeline run.
///
/// Fields are populated incrementally as stages succeed; a partially filled
/// result is a valid outcome, not an error. Everything is `None` when the
/// bounding-box refiner found no board.
#[derive(Clone, Debug, Default)]
pub struct FenResult {
    /// Full FEN string of the recognized position.
    pub fen: Option<String>,
    /// The board crop piece recognition ran on, after any rotation/mirror.
    pub cropped_image: Option<DynamicImage>,
    /// Classified image rotation, in degrees (0, 90, 180, or 270).
    pub image_rotation_angle: Option<u32>,
    /// Whether the orientation classifier judged the diagram to be drawn
    /// from black's perspective.
    pub board_is_flipped: Option<bool>,
}

/// Outcome of bounding-box refinement.
#[derive(Clone, Debug)]
pub enum CropOutcome {
    /// The predicted box covered enough of the frame; here is the crop.
    Converged(DynamicImage),
    /// No confident box within the allowed number of passes.
    Exhausted,
}
