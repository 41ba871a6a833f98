//! Classifier abstraction and the model registry.
//!
//! The pipeline consumes every trained model through the [`Classifier`]
//! trait: a normalized tensor batch in, a score tensor out. Production code
//! loads ONNX sessions via [`OnnxClassifier`]; tests inject mocks.

mod onnx;
mod registry;

use std::path::PathBuf;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

pub use onnx::OnnxClassifier;
pub use registry::{ModelPaths, ModelRegistry};

/// The five classifier roles the pipeline orchestrates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    /// Scalar: does the image contain a chess diagram at all?
    Existence,
    /// Four coordinates of the board in model space.
    BoundingBox,
    /// Four-way categorical: 0/90/180/270 degrees.
    ImageRotation,
    /// Per-square per-class occupancy scores.
    PieceRecognition,
    /// Scalar: is the board drawn from black's perspective?
    BoardOrientation,
}

impl ModelRole {
    pub const ALL: [ModelRole; 5] = [
        ModelRole::Existence,
        ModelRole::BoundingBox,
        ModelRole::ImageRotation,
        ModelRole::PieceRecognition,
        ModelRole::BoardOrientation,
    ];
}

/// A loaded model: one forward pass over a normalized input batch.
pub trait Classifier: Send + Sync {
    fn infer(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>, ModelError>;
}

impl std::fmt::Debug for dyn Classifier + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Classifier")
    }
}

/// Fatal model faults. Expected "no board found" outcomes never surface
/// here; they are `None`-shaped results at the pipeline boundary.
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("no model configured for role {0:?}")]
    NotConfigured(ModelRole),
    #[error("failed to load model for role {role:?} from {path}")]
    Load {
        role: ModelRole,
        path: PathBuf,
        #[source]
        source: ort::Error,
    },
    #[error("inference failed for model {name}")]
    Inference {
        name: String,
        #[source]
        source: ort::Error,
    },
    #[error("model {name} produced no usable output tensor")]
    MissingOutput { name: String },
    #[error("model {name} output has unexpected shape {shape:?}")]
    OutputShape { name: String, shape: Vec<usize> },
    #[error("model session for {name} is poisoned")]
    Poisoned { name: String },
    #[error("failed to read model manifest {path}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model manifest {path}")]
    ManifestFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Pull the single scalar out of a classifier output, whatever batch or
/// singleton axes surround it.
pub(crate) fn scalar_output(output: &ArrayD<f32>, name: &str) -> Result<f32, ModelError> {
    output
        .iter()
        .next()
        .copied()
        .ok_or_else(|| ModelError::MissingOutput {
            name: name.to_string(),
        })
}
