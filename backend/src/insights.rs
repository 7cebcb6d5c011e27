//! Career Insights
//!
//! Static statistics shown next to a prediction: sample confidences,
//! commonly missing skills, hiring companies and a generic roadmap.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CAREER: &str = "Software Developer";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareerConfidence {
    pub career: String,
    /// Percentage (0 to 100)
    pub confidence: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub name: String,
    pub link: String,
}

/// Payload behind the statistics page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareerInsights {
    pub predictions: Vec<CareerConfidence>,
    pub missing_skills: Vec<String>,
    pub companies: Vec<Company>,
    pub roadmap: Vec<String>,
}

/// Insights for a career. The data set is static and does not vary with `career` yet.
pub fn career_insights(_career: &str) -> CareerInsights {
    CareerInsights {
        predictions: vec![
            confidence("Software Developer", 90),
            confidence("Database Developer", 85),
            confidence("UX Designer", 80),
            confidence("Data Architect", 75),
            confidence("Network Engineer", 70),
        ],
        missing_skills: vec![
            "Leadership".to_string(),
            "System Design".to_string(),
            "Cloud Knowledge".to_string(),
        ],
        companies: vec![
            company("Google", "https://careers.google.com"),
            company("Microsoft", "https://careers.microsoft.com"),
            company("Amazon", "https://www.amazon.jobs"),
        ],
        roadmap: vec![
            "Learn core programming languages".to_string(),
            "Work on projects".to_string(),
            "Contribute to open source".to_string(),
            "Learn system design".to_string(),
            "Prepare for interviews".to_string(),
        ],
    }
}

fn confidence(career: &str, confidence: u32) -> CareerConfidence {
    CareerConfidence {
        career: career.to_string(),
        confidence,
    }
}

fn company(name: &str, link: &str) -> Company {
    Company {
        name: name.to_string(),
        link: link.to_string(),
    }
}
