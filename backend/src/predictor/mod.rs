//! Predictor Module - Core of the Career Recommender
//!
//! Survey answers → scaled features → class probabilities → ranked careers.
//!
//! Architecture:
//! - Features: the 25 fixed survey questions and answer parsing
//! - Artifacts: scaler and label encoder loading (JSON exported by training)
//! - Classifier: logistic regression and random forest inference
//! - Service: the read-only prediction entry point shared by all requests

pub mod artifacts;
pub mod classifier;
pub mod features;
pub mod service;
pub mod types;

pub use artifacts::*;
pub use classifier::*;
pub use features::*;
pub use service::*;
pub use types::*;
