use image::DynamicImage;
use log::debug;
use rand::Rng;

use diagram_fen_core::{rotate_board, BoardState};

use crate::consts;
use crate::model::{ModelError, ModelRegistry};

use super::{bbox, existence, orientation, recognize, rotation};
use super::{CropOutcome, FenDetectorParams, FenResult};

/// End-to-end diagram-to-FEN detector.
///
/// Owns the model registry and the pipeline parameters; one instance serves
/// many images. The random source for augmentation is passed per call so
/// callers control reproducibility.
pub struct FenDetector {
    registry: ModelRegistry,
    params: FenDetectorParams,
}

impl FenDetector {
    pub fn new(registry: ModelRegistry, params: FenDetectorParams) -> Self {
        Self { registry, params }
    }

    pub fn with_defaults(registry: ModelRegistry) -> Self {
        Self::new(registry, FenDetectorParams::default())
    }

    #[inline]
    pub fn params(&self) -> &FenDetectorParams {
        &self.params
    }

    #[inline]
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Mutable registry access, for weight reloads between requests.
    #[inline]
    pub fn registry_mut(&mut self) -> &mut ModelRegistry {
        &mut self.registry
    }

    /// Does the image plausibly contain a chess diagram?
    pub fn exists(&self, img: &DynamicImage) -> Result<bool, ModelError> {
        existence::exists(&self.registry, img)
    }

    /// Iteratively crop the image down to the board.
    pub fn crop_to_board(
        &self,
        img: &DynamicImage,
        max_tries: u32,
    ) -> Result<CropOutcome, ModelError> {
        bbox::crop_to_board(&self.registry, img, max_tries)
    }

    /// Classified rotation of a board crop, as an index into
    /// [`consts::ROTATIONS`].
    pub fn classify_rotation(&self, img: &DynamicImage) -> Result<usize, ModelError> {
        rotation::classify_rotation(&self.registry, img)
    }

    /// Run the recognition ensemble on a board crop.
    pub fn recognize_board<R: Rng>(
        &self,
        img: &DynamicImage,
        num_tries: u32,
        rng: &mut R,
    ) -> Result<Option<BoardState>, ModelError> {
        recognize::recognize_board(&self.registry, img, num_tries, &self.params.augment, rng)
    }

    /// Is the decoded board drawn from black's perspective?
    pub fn is_flipped(&self, board: &BoardState) -> Result<bool, ModelError> {
        orientation::is_flipped(&self.registry, board, self.params.no_rotate_bias)
    }

    /// Full pipeline: image in, FEN (and intermediates) out.
    ///
    /// `Ok(None)` means the existence gate rejected the image. Otherwise a
    /// result is always returned, populated as far as the stages got; a
    /// missing `fen` with a present crop means geometry succeeded but no
    /// pieces were recognized.
    pub fn get_fen<R: Rng>(
        &self,
        img: &DynamicImage,
        rng: &mut R,
    ) -> Result<Option<FenResult>, ModelError> {
        let img = DynamicImage::ImageRgb8(img.to_rgb8());

        if !self.exists(&img)? {
            debug!("existence gate rejected the image");
            return Ok(None);
        }

        let mut result = FenResult::default();

        let crop = match self.crop_to_board(&img, self.params.num_tries)? {
            CropOutcome::Converged(crop) => crop,
            CropOutcome::Exhausted => {
                debug!("bounding-box refinement exhausted without converging");
                return Ok(Some(result));
            }
        };

        let angle_index = self.classify_rotation(&crop)?;
        result.image_rotation_angle = Some(consts::ROTATIONS[angle_index]);

        let mut crop = crop;
        if self.params.auto_rotate_image {
            crop = rotation::rotate_image_back(crop, angle_index);
            if consts::ROTATIONS[angle_index] == 180 && self.params.mirror_when_180_rotation {
                crop = crop.fliph();
            }
        }
        result.cropped_image = Some(crop.clone());

        if let Some(board) = self.recognize_board(&crop, self.params.num_tries, rng)? {
            let flipped = self.is_flipped(&board)?;
            result.board_is_flipped = Some(flipped);

            let board = if flipped && self.params.auto_rotate_board {
                rotate_board(&board)
            } else {
                board
            };
            result.fen = Some(board.fen());
        }

        Ok(Some(result))
    }
}
