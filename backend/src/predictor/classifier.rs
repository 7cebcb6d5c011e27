//! Classifier Models
//!
//! Probabilistic classifiers exported by the training pipeline.
//! Every model maps a scaled feature vector to one probability per class index.

use super::types::{ArtifactLoadError, PredictionError};
use serde::{Deserialize, Serialize};

const ARTIFACT: &str = "model";

/// Anything that can produce a class probability distribution
pub trait ProbabilisticClassifier: Send + Sync {
    /// Number of input features expected
    fn n_features(&self) -> usize;

    /// Number of classes in the output distribution
    fn n_classes(&self) -> usize;

    /// Probability for each class index, summing to 1
    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, PredictionError>;
}

// ============================================================
// SERIALIZED MODEL
// ============================================================

/// The classifier artifact, tagged by model kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
}

impl ClassifierModel {
    pub fn validate(&self) -> Result<(), ArtifactLoadError> {
        match self {
            ClassifierModel::LogisticRegression(m) => m.validate(),
            ClassifierModel::RandomForest(m) => m.validate(),
        }
    }

    fn inner(&self) -> &dyn ProbabilisticClassifier {
        match self {
            ClassifierModel::LogisticRegression(m) => m,
            ClassifierModel::RandomForest(m) => m,
        }
    }
}

impl ProbabilisticClassifier for ClassifierModel {
    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn n_classes(&self) -> usize {
        self.inner().n_classes()
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, PredictionError> {
        let probabilities = self.inner().predict_proba(x)?;

        if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(PredictionError::model(
                "classifier produced an invalid probability",
            ));
        }
        Ok(probabilities)
    }
}

fn check_width(expected: usize, x: &[f64]) -> Result<(), PredictionError> {
    if x.len() != expected {
        return Err(PredictionError::model(format!(
            "classifier expects {} features, got {}",
            expected,
            x.len()
        )));
    }
    Ok(())
}

// ============================================================
// LOGISTIC REGRESSION
// ============================================================

/// How per-class scores become probabilities
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MultiClass {
    /// Softmax over all class scores
    #[default]
    Multinomial,
    /// Independent sigmoids, normalized
    Ovr,
}

/// Linear model: one coefficient row and intercept per class.
/// A single row means a binary model over two classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
    #[serde(default)]
    pub multi_class: MultiClass,
}

impl LogisticRegression {
    fn validate(&self) -> Result<(), ArtifactLoadError> {
        if self.coef.is_empty() {
            return Err(ArtifactLoadError::invalid(ARTIFACT, "no coefficient rows"));
        }
        if self.coef.len() != self.intercept.len() {
            return Err(ArtifactLoadError::invalid(
                ARTIFACT,
                format!(
                    "{} coefficient rows but {} intercepts",
                    self.coef.len(),
                    self.intercept.len()
                ),
            ));
        }
        let width = self.coef[0].len();
        if width == 0 || self.coef.iter().any(|row| row.len() != width) {
            return Err(ArtifactLoadError::invalid(
                ARTIFACT,
                "coefficient rows have inconsistent widths",
            ));
        }
        let all_finite = self
            .coef
            .iter()
            .flatten()
            .chain(self.intercept.iter())
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(ArtifactLoadError::invalid(ARTIFACT, "non-finite weight"));
        }
        Ok(())
    }

    fn decision_function(&self, x: &[f64]) -> Vec<f64> {
        self.coef
            .iter()
            .zip(self.intercept.iter())
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b)
            .collect()
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn n_features(&self) -> usize {
        self.coef.first().map(Vec::len).unwrap_or(0)
    }

    fn n_classes(&self) -> usize {
        if self.coef.len() == 1 {
            2
        } else {
            self.coef.len()
        }
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, PredictionError> {
        check_width(self.n_features(), x)?;
        let scores = self.decision_function(x);

        if scores.len() == 1 {
            let p = sigmoid(scores[0]);
            return Ok(vec![1.0 - p, p]);
        }

        Ok(match self.multi_class {
            MultiClass::Multinomial => softmax(&scores),
            MultiClass::Ovr => {
                let raw: Vec<f64> = scores.iter().map(|s| sigmoid(*s)).collect();
                normalize(raw)
            }
        })
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    normalize(exps)
}

fn normalize(values: Vec<f64>) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        let uniform = 1.0 / values.len() as f64;
        return vec![uniform; values.len()];
    }
    values.into_iter().map(|v| v / total).collect()
}

// ============================================================
// RANDOM FOREST
// ============================================================

/// Flattened decision tree node. Leaves have `left == right == -1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default)]
    pub feature: i64,
    #[serde(default)]
    pub threshold: f64,
    pub left: i64,
    pub right: i64,
    /// Per-class sample weight at this node (used at leaves)
    #[serde(default)]
    pub value: Vec<f64>,
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.left < 0 && self.right < 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), ArtifactLoadError> {
        if self.nodes.is_empty() {
            return Err(ArtifactLoadError::invalid(ARTIFACT, "empty decision tree"));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                if node.value.len() != n_classes {
                    return Err(ArtifactLoadError::invalid(
                        ARTIFACT,
                        format!("leaf {} has {} class weights, expected {}", i, node.value.len(), n_classes),
                    ));
                }
                if node.value.iter().any(|v| !v.is_finite() || *v < 0.0)
                    || node.value.iter().sum::<f64>() <= 0.0
                {
                    return Err(ArtifactLoadError::invalid(
                        ARTIFACT,
                        format!("leaf {} has invalid class weights", i),
                    ));
                }
                continue;
            }

            // Children always come after their parent, so traversal terminates.
            let in_range = |child: i64| child as usize > i && (child as usize) < self.nodes.len();
            if node.left < 0 || node.right < 0 || !in_range(node.left) || !in_range(node.right) {
                return Err(ArtifactLoadError::invalid(
                    ARTIFACT,
                    format!("node {} has invalid children", i),
                ));
            }
            if node.feature < 0 || node.feature as usize >= n_features || !node.threshold.is_finite() {
                return Err(ArtifactLoadError::invalid(
                    ARTIFACT,
                    format!("node {} has an invalid split", i),
                ));
            }
        }
        Ok(())
    }

    fn leaf_for(&self, x: &[f64]) -> Result<&TreeNode, PredictionError> {
        let mut index = 0usize;
        loop {
            let node = self
                .nodes
                .get(index)
                .ok_or_else(|| PredictionError::model(format!("tree node {} missing", index)))?;
            if node.is_leaf() {
                return Ok(node);
            }
            let value = x
                .get(node.feature as usize)
                .ok_or_else(|| PredictionError::model("split feature out of range"))?;
            index = if *value <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }
}

/// Ensemble of decision trees whose normalized leaf distributions are averaged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub n_classes: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    fn validate(&self) -> Result<(), ArtifactLoadError> {
        if self.n_classes == 0 || self.n_features == 0 {
            return Err(ArtifactLoadError::invalid(
                ARTIFACT,
                "forest needs at least one feature and one class",
            ));
        }
        if self.trees.is_empty() {
            return Err(ArtifactLoadError::invalid(ARTIFACT, "forest has no trees"));
        }
        for tree in &self.trees {
            tree.validate(self.n_features, self.n_classes)?;
        }
        Ok(())
    }
}

impl ProbabilisticClassifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, PredictionError> {
        check_width(self.n_features, x)?;
        if self.trees.is_empty() {
            return Err(PredictionError::model("forest has no trees"));
        }

        let mut totals = vec![0.0; self.n_classes];
        for tree in &self.trees {
            let leaf = tree.leaf_for(x)?;
            if leaf.value.len() != self.n_classes {
                return Err(PredictionError::model("leaf class count mismatch"));
            }
            let leaf_sum: f64 = leaf.value.iter().sum();
            for (total, weight) in totals.iter_mut().zip(&leaf.value) {
                *total += weight / leaf_sum;
            }
        }

        let tree_count = self.trees.len() as f64;
        Ok(totals.into_iter().map(|t| t / tree_count).collect())
    }
}
