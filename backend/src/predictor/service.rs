//! Prediction Service
//!
//! Turns survey answers into a ranked list of careers.
//!
//! The service is built once from the artifact load result. A failed load
//! leaves it permanently disabled: every call fails fast and no model is
//! touched. Loaded artifacts are immutable and shared across workers.

use super::artifacts::ModelArtifacts;
use super::classifier::ProbabilisticClassifier;
use super::features::{FeatureVector, RawAnswers};
use super::types::{ArtifactLoadError, CareerScore, PredictionError, PredictionResult, TOP_N};
use log::error;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum ServiceState {
    Ready(Arc<ModelArtifacts>),
    Disabled { reason: String },
}

/// Career prediction over the loaded model artifacts
#[derive(Debug, Clone)]
pub struct PredictionService {
    state: ServiceState,
}

impl PredictionService {
    /// Service over already loaded artifacts
    pub fn new(artifacts: ModelArtifacts) -> Self {
        Self {
            state: ServiceState::Ready(Arc::new(artifacts)),
        }
    }

    /// Service that rejects every prediction
    pub fn disabled(reason: impl Into<String>) -> Self {
        Self {
            state: ServiceState::Disabled {
                reason: reason.into(),
            },
        }
    }

    pub fn from_load_result(result: Result<ModelArtifacts, ArtifactLoadError>) -> Self {
        match result {
            Ok(artifacts) => Self::new(artifacts),
            Err(e) => {
                error!("Error loading ML components: {}", e);
                Self::disabled(e.to_string())
            }
        }
    }

    /// Load artifacts from a directory; never fails, but may come up disabled
    pub fn load(model_dir: &Path) -> Self {
        Self::from_load_result(ModelArtifacts::load(model_dir))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ServiceState::Ready(_))
    }

    /// Why the service is disabled, if it is
    pub fn disabled_reason(&self) -> Option<&str> {
        match &self.state {
            ServiceState::Ready(_) => None,
            ServiceState::Disabled { reason } => Some(reason.as_str()),
        }
    }

    /// All career names the classifier can suggest, in label order
    pub fn careers(&self) -> Result<Vec<String>, PredictionError> {
        Ok(self.artifacts()?.label_encoder.classes.clone())
    }

    /// Top careers for a set of raw survey answers
    pub fn predict(&self, answers: &RawAnswers) -> Result<PredictionResult, PredictionError> {
        self.predict_with_features(answers).map(|(_, result)| result)
    }

    /// Like [`predict`](Self::predict), also returning the parsed answers
    pub fn predict_with_features(
        &self,
        answers: &RawAnswers,
    ) -> Result<(FeatureVector, PredictionResult), PredictionError> {
        let artifacts = self.artifacts()?;
        let features = FeatureVector::from_answers(answers)?;
        let ranked = rank(artifacts, &features)?;

        let result = PredictionResult {
            careers: ranked.into_iter().take(TOP_N).collect(),
        };
        Ok((features, result))
    }

    /// Full probability distribution, most probable first
    pub fn predict_distribution(
        &self,
        features: &FeatureVector,
    ) -> Result<Vec<CareerScore>, PredictionError> {
        rank(self.artifacts()?, features)
    }

    fn artifacts(&self) -> Result<&ModelArtifacts, PredictionError> {
        match &self.state {
            ServiceState::Ready(artifacts) => Ok(artifacts.as_ref()),
            ServiceState::Disabled { reason } => Err(PredictionError::ModelsUnavailable {
                reason: reason.clone(),
            }),
        }
    }
}

fn rank(
    artifacts: &ModelArtifacts,
    features: &FeatureVector,
) -> Result<Vec<CareerScore>, PredictionError> {
    let scaled = artifacts.scaler.transform(features.as_slice())?;
    let probabilities = artifacts.classifier.predict_proba(&scaled)?;
    if probabilities.len() != artifacts.label_encoder.len() {
        return Err(PredictionError::model(format!(
            "classifier produced {} probabilities but the label encoder has {} classes",
            probabilities.len(),
            artifacts.label_encoder.len()
        )));
    }

    let indices: Vec<usize> = (0..probabilities.len()).collect();
    let careers = artifacts.label_encoder.inverse_transform(&indices)?;

    let mut scored: Vec<CareerScore> = careers
        .into_iter()
        .zip(probabilities)
        .map(|(career, confidence)| CareerScore { career, confidence })
        .collect();

    // Stable: equal confidences keep label order
    scored.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::artifacts::{LabelEncoder, StandardScaler};
    use crate::predictor::classifier::{ClassifierModel, LogisticRegression, MultiClass};
    use crate::predictor::features::{FEATURE_COUNT, FEATURE_NAMES};

    /// Four careers; the score of class `k` only depends on feature `k`
    fn artifacts() -> ModelArtifacts {
        let careers = ["Database Developer", "Network Engineer", "Software Developer", "UX Designer"];
        let coef = (0..careers.len())
            .map(|k| {
                let mut row = vec![0.0; FEATURE_COUNT];
                row[k] = 1.0;
                row
            })
            .collect();

        ModelArtifacts {
            scaler: StandardScaler {
                mean: vec![50.0; FEATURE_COUNT],
                scale: vec![10.0; FEATURE_COUNT],
            },
            classifier: ClassifierModel::LogisticRegression(LogisticRegression {
                coef,
                intercept: vec![0.0; careers.len()],
                multi_class: MultiClass::Multinomial,
            }),
            label_encoder: LabelEncoder {
                classes: careers.iter().map(|c| c.to_string()).collect(),
            },
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> RawAnswers {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_top_three_sorted_descending() {
        let service = PredictionService::new(artifacts());
        let input = answers(&[(FEATURE_NAMES[0], "60"), (FEATURE_NAMES[1], "80"), (FEATURE_NAMES[3], "70")]);

        let result = service.predict(&input).unwrap();
        assert_eq!(
            result.career_names(),
            vec!["Network Engineer", "UX Designer", "Database Developer"]
        );
        assert!(result
            .careers
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
        assert!(result
            .careers
            .iter()
            .all(|c| (0.0..=1.0).contains(&c.confidence)));
    }

    #[test]
    fn test_ties_keep_label_order() {
        let service = PredictionService::new(artifacts());
        let all_fifty: RawAnswers = FEATURE_NAMES
            .iter()
            .map(|n| (n.to_string(), "50".to_string()))
            .collect();

        let result = service.predict(&all_fifty).unwrap();
        assert_eq!(
            result.career_names(),
            vec!["Database Developer", "Network Engineer", "Software Developer"]
        );
        assert!((result.careers[0].confidence - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_distribution_sums_to_one() {
        let service = PredictionService::new(artifacts());
        let features = FeatureVector::from_answers(&answers(&[(FEATURE_NAMES[2], "95")])).unwrap();

        let distribution = service.predict_distribution(&features).unwrap();
        assert_eq!(distribution.len(), 4);
        let total: f64 = distribution.iter().map(|c| c.confidence).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input_is_deterministic() {
        let service = PredictionService::new(artifacts());
        let first = service.predict(&RawAnswers::new()).unwrap();
        let second = service.predict(&RawAnswers::new()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.careers.len(), 3);
    }

    #[test]
    fn test_fewer_than_three_careers() {
        let mut small = artifacts();
        small.classifier = ClassifierModel::LogisticRegression(LogisticRegression {
            coef: vec![vec![0.0; FEATURE_COUNT]],
            intercept: vec![1.0],
            multi_class: MultiClass::Multinomial,
        });
        small.label_encoder.classes.truncate(2);

        let result = PredictionService::new(small).predict(&RawAnswers::new()).unwrap();
        assert_eq!(result.careers.len(), 2);
        assert_eq!(result.top().unwrap().career, "Network Engineer");
    }

    #[test]
    fn test_invalid_input_rejected() {
        let service = PredictionService::new(artifacts());
        let err = service
            .predict(&answers(&[("Coding skills rating", "high")]))
            .unwrap_err();
        assert!(err.is_user_fixable());
    }

    #[test]
    fn test_disabled_service_always_fails() {
        let service = PredictionService::disabled("model.json missing");
        assert!(!service.is_ready());
        assert_eq!(service.disabled_reason(), Some("model.json missing"));

        for input in [RawAnswers::new(), answers(&[("Hackathons", "many")])] {
            assert!(matches!(
                service.predict(&input),
                Err(PredictionError::ModelsUnavailable { .. })
            ));
        }
    }

    #[test]
    fn test_label_count_mismatch_is_model_error() {
        let mut broken = artifacts();
        broken.label_encoder.classes.truncate(3);
        let err = PredictionService::new(broken)
            .predict(&RawAnswers::new())
            .unwrap_err();
        assert!(matches!(err, PredictionError::Model(_)));
    }

    #[test]
    fn test_extra_encoder_classes_is_model_error() {
        let mut broken = artifacts();
        broken.classifier = ClassifierModel::LogisticRegression(LogisticRegression {
            coef: vec![vec![0.0; FEATURE_COUNT]; 3],
            intercept: vec![0.0; 3],
            multi_class: MultiClass::Multinomial,
        });
        let err = PredictionService::new(broken)
            .predict(&RawAnswers::new())
            .unwrap_err();
        assert!(matches!(err, PredictionError::Model(_)));
    }

    #[test]
    fn test_features_returned_with_result() {
        let service = PredictionService::new(artifacts());
        let (features, result) = service
            .predict_with_features(&answers(&[("Hackathons", "4")]))
            .unwrap();
        assert_eq!(features.get("Hackathons"), Some(4.0));
        assert_eq!(result.careers.len(), 3);
    }

    #[test]
    fn test_scaler_width_mismatch_is_model_error() {
        let mut broken = artifacts();
        broken.scaler.mean.pop();
        broken.scaler.scale.pop();
        let err = PredictionService::new(broken)
            .predict(&RawAnswers::new())
            .unwrap_err();
        assert!(matches!(err, PredictionError::Model(_)));
    }
}
