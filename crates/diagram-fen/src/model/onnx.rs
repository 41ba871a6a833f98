//! ONNX Runtime backend for the [`Classifier`] trait.

use std::path::Path;
use std::sync::Mutex;

use ndarray::ArrayD;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::TensorRef;

use super::{Classifier, ModelError, ModelRole};

/// One ONNX session per classifier role.
///
/// `Session::run` needs exclusive access, so the session lives behind a
/// mutex and concurrent requests serialize on it. Replacing a model while a
/// request is in flight is handled one level up, in the registry.
pub struct OnnxClassifier {
    name: String,
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxClassifier {
    /// Load a model from a weights file, eagerly building the session.
    pub fn load(role: ModelRole, path: &Path) -> Result<Self, ModelError> {
        let load_err = |source| ModelError::Load {
            role,
            path: path.to_path_buf(),
            source,
        };

        let session = Session::builder()
            .and_then(|builder| Ok(builder.with_optimization_level(GraphOptimizationLevel::Level3)?))
            .and_then(|mut builder| builder.commit_from_file(path))
            .map_err(load_err)?;

        let name = format!("{role:?}");
        let input_name = session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .ok_or_else(|| ModelError::MissingOutput { name: name.clone() })?;
        let output_name = session
            .outputs()
            .first()
            .map(|output| output.name().to_string())
            .ok_or_else(|| ModelError::MissingOutput { name: name.clone() })?;

        Ok(Self {
            name,
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn infer(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>, ModelError> {
        let infer_err = |source| ModelError::Inference {
            name: self.name.clone(),
            source,
        };

        let mut session = self.session.lock().map_err(|_| ModelError::Poisoned {
            name: self.name.clone(),
        })?;

        let tensor = TensorRef::from_array_view(input).map_err(infer_err)?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(infer_err)?;

        let scores = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()
            .map_err(infer_err)?;
        Ok(scores.to_owned())
    }
}
