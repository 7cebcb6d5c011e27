//! Survey Features
//!
//! The 25 survey answers the classifier was trained on, in training order.
//! Parsing turns a loose name → string mapping into a fixed-width vector.

use super::types::PredictionError;
use std::collections::HashMap;

/// Number of answers the classifier expects
pub const FEATURE_COUNT: usize = 25;

/// Survey question names, in the order the model was trained on
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Academic percentage in Operating Systems",
    "Percentage in Algorithms",
    "Percentage in Programming Concepts",
    "Percentage in Software Engineering",
    "Percentage in Computer Networks",
    "Percentage in Electronics Subjects",
    "Percentage in Computer Architecture",
    "Percentage in Mathematics",
    "Percentage in Communication skills",
    "Hours working per day",
    "Logical quotient rating",
    "Hackathons",
    "Coding skills rating",
    "Public speaking points",
    "Can work long time before system?",
    "Self-learning capability?",
    "Extra-courses did",
    "Certifications",
    "Workshops",
    "Interested subjects",
    "Interested career area",
    "Job/Higher Studies?",
    "Type of company want to settle in?",
    "Management or Technical",
    "Worked in teams ever?",
];

/// Raw survey answers as submitted (field name → text)
pub type RawAnswers = HashMap<String, String>;

/// A complete, ordered set of numeric answers
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Build from raw answers. Missing fields become 0.0, extra fields are ignored.
    ///
    /// A skipped question is indistinguishable from an answer of 0, which can
    /// skew predictions for partially filled surveys.
    pub fn from_answers(answers: &RawAnswers) -> Result<Self, PredictionError> {
        let mut values = [0.0; FEATURE_COUNT];

        for (slot, name) in values.iter_mut().zip(FEATURE_NAMES.iter()) {
            if let Some(raw) = answers.get(*name) {
                *slot = parse_answer(name, raw)?;
            }
        }

        Ok(Self { values })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Value by question name
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }
}

fn parse_answer(field: &str, raw: &str) -> Result<f64, PredictionError> {
    let invalid = || PredictionError::InvalidInput {
        field: field.to_string(),
        value: raw.to_string(),
    };

    let value: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_zero() {
        let vector = FeatureVector::from_answers(&RawAnswers::new()).unwrap();
        assert!(vector.as_slice().iter().all(|v| *v == 0.0));
        assert_eq!(vector.as_slice().len(), FEATURE_COUNT);
    }

    #[test]
    fn test_values_keep_question_order() {
        let mut answers = RawAnswers::new();
        answers.insert("Percentage in Algorithms".to_string(), "72".to_string());
        answers.insert("Worked in teams ever?".to_string(), " 1 ".to_string());
        answers.insert("Favourite colour".to_string(), "blue".to_string());

        let vector = FeatureVector::from_answers(&answers).unwrap();
        assert_eq!(vector.as_slice()[1], 72.0);
        assert_eq!(vector.as_slice()[24], 1.0);
        assert_eq!(vector.get("Percentage in Algorithms"), Some(72.0));
        assert_eq!(vector.get("Favourite colour"), None);
    }

    #[test]
    fn test_non_numeric_answer_names_the_field() {
        let mut answers = RawAnswers::new();
        answers.insert("Hackathons".to_string(), "lots".to_string());

        match FeatureVector::from_answers(&answers) {
            Err(PredictionError::InvalidInput { field, value }) => {
                assert_eq!(field, "Hackathons");
                assert_eq!(value, "lots");
            }
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_and_non_finite_answers_rejected() {
        for raw in ["", "   ", "NaN", "inf", "-infinity"] {
            let mut answers = RawAnswers::new();
            answers.insert("Certifications".to_string(), raw.to_string());
            assert!(
                FeatureVector::from_answers(&answers).is_err(),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_scientific_and_negative_values_accepted() {
        let mut answers = RawAnswers::new();
        answers.insert("Workshops".to_string(), "1e1".to_string());
        answers.insert("Hackathons".to_string(), "-3.5".to_string());

        let vector = FeatureVector::from_answers(&answers).unwrap();
        assert_eq!(vector.get("Workshops"), Some(10.0));
        assert_eq!(vector.get("Hackathons"), Some(-3.5));
    }
}
