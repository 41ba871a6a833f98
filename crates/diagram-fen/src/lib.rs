//! Chess-diagram-to-FEN inference pipeline.
//!
//! Chains five independently trained classifiers into one robust decision
//! procedure: an existence gate, an iterative bounding-box refiner, a
//! rotation classifier, a test-time-augmentation piece-recognition
//! ensemble, and a board-orientation corrector.
//!
//! ```no_run
//! use diagram_fen::{FenDetector, ModelPaths, ModelRegistry};
//! use rand::rngs::SmallRng;
//! use rand::SeedableRng;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let paths = ModelPaths::from_json_file("models.json".as_ref())?;
//! let detector = FenDetector::with_defaults(ModelRegistry::load(&paths)?);
//!
//! let img = image::open("diagram.png")?;
//! let mut rng = SmallRng::seed_from_u64(0);
//! match detector.get_fen(&img, &mut rng)? {
//!     Some(result) => println!("{:?}", result.fen),
//!     None => println!("no chess diagram found"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod consts;
mod detector;
mod model;

pub use detector::{CropOutcome, FenDetector, FenDetectorParams, FenResult};
pub use model::{Classifier, ModelError, ModelPaths, ModelRegistry, ModelRole, OnnxClassifier};

// Re-export the core vocabulary so most callers need only this crate.
pub use diagram_fen_core::{
    board_to_tensor, decode_board_tensor, flip_color_channels, normalize_fen, rotate_board,
    AugmentParams, BoardState, BOARD_SIZE, OCC_CHANNELS,
};
