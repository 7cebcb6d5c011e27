//! Model Artifacts
//!
//! Loads the scaler, classifier and label encoder produced by the training
//! pipeline. Artifacts are JSON files living side by side in one directory:
//!
//! - `scaler.json`        - `{ "mean": [..], "scale": [..] }`
//! - `model.json`         - classifier, tagged by `"kind"`
//! - `label_encoder.json` - `{ "classes": [..] }`

use super::classifier::{ClassifierModel, ProbabilisticClassifier};
use super::features::FEATURE_COUNT;
use super::types::{ArtifactLoadError, PredictionError};
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const SCALER_FILE: &str = "scaler.json";
pub const MODEL_FILE: &str = "model.json";
pub const LABEL_ENCODER_FILE: &str = "label_encoder.json";

// ============================================================
// STANDARD SCALER
// ============================================================

/// Per-feature standardization: `(x - mean) / scale`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn validate(&mut self) -> Result<(), ArtifactLoadError> {
        if self.mean.is_empty() || self.mean.len() != self.scale.len() {
            return Err(ArtifactLoadError::invalid(
                "scaler",
                format!(
                    "mean has {} entries, scale has {}",
                    self.mean.len(),
                    self.scale.len()
                ),
            ));
        }
        if self.mean.iter().chain(self.scale.iter()).any(|v| !v.is_finite()) {
            return Err(ArtifactLoadError::invalid("scaler", "non-finite parameter"));
        }
        // Constant features were fitted with zero variance
        for s in self.scale.iter_mut() {
            if *s == 0.0 {
                *s = 1.0;
            }
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>, PredictionError> {
        if x.len() != self.mean.len() {
            return Err(PredictionError::model(format!(
                "scaler expects {} features, got {}",
                self.mean.len(),
                x.len()
            )));
        }
        Ok(x.iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }
}

// ============================================================
// LABEL ENCODER
// ============================================================

/// Maps class indices to career names and back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    fn validate(&self) -> Result<(), ArtifactLoadError> {
        if self.classes.is_empty() {
            return Err(ArtifactLoadError::invalid("label_encoder", "no classes"));
        }
        let mut seen = HashSet::new();
        for class in &self.classes {
            if !seen.insert(class.as_str()) {
                return Err(ArtifactLoadError::invalid(
                    "label_encoder",
                    format!("duplicate class '{}'", class),
                ));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Career names for class indices
    pub fn inverse_transform(&self, indices: &[usize]) -> Result<Vec<String>, PredictionError> {
        indices
            .iter()
            .map(|&i| {
                self.classes.get(i).cloned().ok_or_else(|| {
                    PredictionError::model(format!(
                        "label index {} outside encoder range 0..{}",
                        i,
                        self.classes.len()
                    ))
                })
            })
            .collect()
    }
}

// ============================================================
// ARTIFACT BUNDLE
// ============================================================

/// The three artifacts required for prediction
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub scaler: StandardScaler,
    pub classifier: ClassifierModel,
    pub label_encoder: LabelEncoder,
}

impl ModelArtifacts {
    /// Load all artifacts from a model directory
    pub fn load(model_dir: &Path) -> Result<Self, ArtifactLoadError> {
        let mut scaler: StandardScaler = read_json(&model_dir.join(SCALER_FILE))?;
        scaler.validate()?;

        let classifier: ClassifierModel = read_json(&model_dir.join(MODEL_FILE))?;
        classifier.validate()?;

        let label_encoder: LabelEncoder = read_json(&model_dir.join(LABEL_ENCODER_FILE))?;
        label_encoder.validate()?;

        let artifacts = Self {
            scaler,
            classifier,
            label_encoder,
        };
        artifacts.warn_on_shape_mismatch();

        info!(
            "Model, scaler and label encoder loaded from {} ({} careers)",
            model_dir.display(),
            artifacts.label_encoder.len()
        );
        Ok(artifacts)
    }

    /// Shape disagreements are reported per request; flag them early in the log too
    fn warn_on_shape_mismatch(&self) {
        if self.scaler.n_features() != FEATURE_COUNT {
            warn!(
                "Scaler expects {} features but the survey has {}",
                self.scaler.n_features(),
                FEATURE_COUNT
            );
        }
        if self.classifier.n_features() != self.scaler.n_features() {
            warn!(
                "Classifier expects {} features but scaler produces {}",
                self.classifier.n_features(),
                self.scaler.n_features()
            );
        }
        if self.classifier.n_classes() != self.label_encoder.len() {
            warn!(
                "Classifier has {} classes but label encoder has {}",
                self.classifier.n_classes(),
                self.label_encoder.len()
            );
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactLoadError> {
    let file = File::open(path).map_err(|source| ArtifactLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ArtifactLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_scaler_transform_and_zero_scale() {
        let mut scaler = StandardScaler {
            mean: vec![10.0, 5.0],
            scale: vec![2.0, 0.0],
        };
        scaler.validate().unwrap();
        let scaled = scaler.transform(&[14.0, 7.0]).unwrap();
        assert_eq!(scaled, vec![2.0, 2.0]);
        assert!(scaler.transform(&[1.0]).is_err());
    }

    #[test]
    fn test_label_encoder_rejects_duplicates() {
        let encoder = LabelEncoder {
            classes: vec!["Web Developer".to_string(), "Web Developer".to_string()],
        };
        assert!(encoder.validate().is_err());
    }

    #[test]
    fn test_label_encoder_mapping() {
        let encoder = LabelEncoder {
            classes: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(encoder.inverse_transform(&[1, 0]).unwrap(), vec!["B", "A"]);
        assert!(encoder.inverse_transform(&[2]).is_err());
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = ModelArtifacts::load(&dir.path().join("nope"));
        assert!(matches!(result, Err(ArtifactLoadError::Io { .. })));
    }

    #[test]
    fn test_load_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), SCALER_FILE, "{ not json");
        let result = ModelArtifacts::load(dir.path());
        assert!(matches!(result, Err(ArtifactLoadError::Parse { .. })));
    }

    #[test]
    fn test_load_valid_bundle() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), SCALER_FILE, r#"{"mean": [0.0, 0.0], "scale": [1.0, 1.0]}"#);
        write(
            dir.path(),
            MODEL_FILE,
            r#"{"kind": "logistic_regression", "coef": [[1.0, 0.0], [0.0, 1.0]], "intercept": [0.0, 0.0]}"#,
        );
        write(dir.path(), LABEL_ENCODER_FILE, r#"{"classes": ["A", "B"]}"#);

        let artifacts = ModelArtifacts::load(dir.path()).unwrap();
        assert_eq!(artifacts.label_encoder.len(), 2);
        assert_eq!(artifacts.classifier.n_classes(), 2);
    }
}
