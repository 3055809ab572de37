//! # Model Artifacts
//!
//! A model artifact is a local file plus the serialization format inferred
//! from its name. Only an allow-list of suffixes is accepted.

use crate::error::{DeployerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Supported serialization formats, keyed by file name suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// Pickled estimator (`.pkl`)
    Pickle,
    /// Keras HDF5 model (`.h5`)
    KerasH5,
    /// TensorFlow SavedModel graph (`saved_model.pb`)
    TensorFlowSavedModel,
}

impl ArtifactFormat {
    pub const ALL: [ArtifactFormat; 3] = [Self::Pickle, Self::KerasH5, Self::TensorFlowSavedModel];

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Pickle => ".pkl",
            Self::KerasH5 => ".h5",
            Self::TensorFlowSavedModel => "saved_model.pb",
        }
    }

    /// Infer the format from the trailing characters of a path
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.to_string_lossy();
        Self::ALL
            .into_iter()
            .find(|format| name.ends_with(format.suffix()))
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pickle => write!(f, "pickle"),
            Self::KerasH5 => write!(f, "keras_h5"),
            Self::TensorFlowSavedModel => write!(f, "tensorflow_saved_model"),
        }
    }
}

/// Validated reference to a serialized model on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact {
    path: PathBuf,
    format: ArtifactFormat,
}

impl ModelArtifact {
    /// Check that the file exists and carries an allowed suffix
    pub fn validate(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(DeployerError::invalid_artifact(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let format = ArtifactFormat::from_path(path).ok_or_else(|| {
            DeployerError::invalid_artifact(format!(
                "Unsupported model format: {} (expected one of .pkl, .h5, saved_model.pb)",
                path.display()
            ))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            format,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ArtifactFormat {
        self.format
    }

    /// Final path component, used for object names and derived endpoint names
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Endpoint name used when the caller does not supply one
    pub fn default_endpoint_name(&self) -> String {
        format!("model-{}-endpoint", self.file_name())
    }
}

/// Whether a path name is in the allow-list, without touching the filesystem
pub fn is_supported_format(path: impl AsRef<Path>) -> bool {
    ArtifactFormat::from_path(path.as_ref()).is_some()
}
