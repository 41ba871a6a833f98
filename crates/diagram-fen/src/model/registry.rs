//! Explicit model registry.
//!
//! Weight paths come from configuration; every model is loaded eagerly when
//! the registry is built, so a missing path aborts before any inference is
//! attempted. The registry replaces load-on-first-use global state: callers
//! construct it once at startup and pass it to the detector.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Classifier, ModelError, ModelRole, OnnxClassifier};

/// Weight-file locations for the five classifier roles.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelPaths {
    pub existence: Option<PathBuf>,
    pub bounding_box: Option<PathBuf>,
    pub image_rotation: Option<PathBuf>,
    pub piece_recognition: Option<PathBuf>,
    pub board_orientation: Option<PathBuf>,
}

impl ModelPaths {
    /// Read a JSON manifest of weight paths.
    pub fn from_json_file(path: &Path) -> Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ModelError::Manifest {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ModelError::ManifestFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    fn get(&self, role: ModelRole) -> Option<&PathBuf> {
        match role {
            ModelRole::Existence => self.existence.as_ref(),
            ModelRole::BoundingBox => self.bounding_box.as_ref(),
            ModelRole::ImageRotation => self.image_rotation.as_ref(),
            ModelRole::PieceRecognition => self.piece_recognition.as_ref(),
            ModelRole::BoardOrientation => self.board_orientation.as_ref(),
        }
    }
}

/// Loaded classifiers keyed by role.
pub struct ModelRegistry {
    models: HashMap<ModelRole, Arc<dyn Classifier>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("roles", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModelRegistry {
    /// Eagerly load every role from its configured weight path.
    ///
    /// Fails with [`ModelError::NotConfigured`] on the first role without a
    /// path, before any session is built for the remaining roles.
    pub fn load(paths: &ModelPaths) -> Result<Self, ModelError> {
        let mut models: HashMap<ModelRole, Arc<dyn Classifier>> = HashMap::new();
        for role in ModelRole::ALL {
            let path = paths.get(role).ok_or(ModelError::NotConfigured(role))?;
            models.insert(role, Arc::new(OnnxClassifier::load(role, path)?));
        }
        Ok(Self { models })
    }

    /// Build a registry from pre-constructed classifiers.
    ///
    /// This is how tests install mocks, and how callers plug in a non-ONNX
    /// backend.
    pub fn from_classifiers<I>(classifiers: I) -> Self
    where
        I: IntoIterator<Item = (ModelRole, Arc<dyn Classifier>)>,
    {
        Self {
            models: classifiers.into_iter().collect(),
        }
    }

    /// The classifier for a role, or [`ModelError::NotConfigured`].
    pub fn get(&self, role: ModelRole) -> Result<&dyn Classifier, ModelError> {
        self.models
            .get(&role)
            .map(Arc::as_ref)
            .ok_or(ModelError::NotConfigured(role))
    }

    /// Swap the model behind a role for freshly loaded weights.
    ///
    /// The swap is atomic with respect to `&mut self`, but in-flight
    /// inference holding the old `Arc` keeps using the old weights; do not
    /// call this concurrently with requests that must see the new model.
    pub fn reload(&mut self, role: ModelRole, path: &Path) -> Result<(), ModelError> {
        let model = OnnxClassifier::load(role, path)?;
        self.models.insert(role, Arc::new(model));
        Ok(())
    }
}
