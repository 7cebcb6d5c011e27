//! Prediction Types
//!
//! Results and error kinds shared by the prediction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Number of careers returned per prediction
pub const TOP_N: usize = 3;

/// Message returned for every prediction while the models are unavailable
pub const MODELS_UNAVAILABLE: &str = "ML components failed to load";

// ============================================================
// RESULTS
// ============================================================

/// One suggested career with the classifier's confidence in it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerScore {
    pub career: String,
    /// Probability mass assigned by the classifier (0.0 to 1.0)
    pub confidence: f64,
}

/// Ranked careers, most probable first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PredictionResult {
    pub careers: Vec<CareerScore>,
}

impl PredictionResult {
    /// The single most probable career
    pub fn top(&self) -> Option<&CareerScore> {
        self.careers.first()
    }

    pub fn career_names(&self) -> Vec<String> {
        self.careers.iter().map(|c| c.career.clone()).collect()
    }
}

// ============================================================
// ERRORS
// ============================================================

/// Failure while loading one of the model artifacts at startup
#[derive(Error, Debug)]
pub enum ArtifactLoadError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid artifact {artifact}: {reason}")]
    Invalid { artifact: &'static str, reason: String },
}

impl ArtifactLoadError {
    pub fn invalid(artifact: &'static str, reason: impl Into<String>) -> Self {
        ArtifactLoadError::Invalid {
            artifact,
            reason: reason.into(),
        }
    }
}

/// Per-request prediction failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    /// Artifacts failed to load at startup; permanent for the process
    #[error("ML components failed to load: {reason}")]
    ModelsUnavailable { reason: String },

    /// A survey answer is not a finite number
    #[error("Invalid value {value:?} for field '{field}'")]
    InvalidInput { field: String, value: String },

    /// Scaling, classification or label decoding failed
    #[error("Model error: {0}")]
    Model(String),
}

impl PredictionError {
    pub fn model(message: impl Into<String>) -> Self {
        PredictionError::Model(message.into())
    }

    /// Whether the caller can fix this by changing the request
    pub fn is_user_fixable(&self) -> bool {
        matches!(self, PredictionError::InvalidInput { .. })
    }
}
