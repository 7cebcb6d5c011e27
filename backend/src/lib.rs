//! Career Recommender Backend
//!
//! Suggests careers from a 25-question academic/skill survey:
//! - Prediction over pre-trained scaler, classifier and label encoder artifacts
//! - Accounts with session cookies
//! - Per-user prediction history in SQLite
//! - Static career statistics

pub mod api;
pub mod auth;
pub mod config;
pub mod insights;
pub mod predictor;
pub mod store;

pub use api::*;
pub use predictor::*;
