//! Persistence Module
//!
//! SQLite-backed storage for registered users and their prediction history.
//! All statements are parameterized; the connection is shared behind a mutex.

use crate::predictor::{FeatureVector, PredictionResult, RawAnswers};
use chrono::{DateTime, Utc};
use rusqlite::{ffi, params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Database connection poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================
// RECORDS
// ============================================================

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Survey subset stored alongside a user's top prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub user_id: i64,
    pub os_percentage: f64,
    pub algo_percentage: f64,
    pub programming_percentage: f64,
    pub networks_percentage: f64,
    pub communication: f64,
    pub logical_rating: f64,
    pub coding_skills: f64,
    pub interested_subjects: String,
    pub interested_career: String,
    pub prediction_result: String,
}

impl PredictionRecord {
    /// Build from a completed prediction. `None` when there is no top career.
    pub fn from_prediction(
        user_id: i64,
        answers: &RawAnswers,
        features: &FeatureVector,
        result: &PredictionResult,
    ) -> Option<Self> {
        let top = result.top()?;
        let value = |name: &str| features.get(name).unwrap_or(0.0);
        let raw = |name: &str| answers.get(name).cloned().unwrap_or_else(|| "0".to_string());

        Some(Self {
            user_id,
            os_percentage: value("Academic percentage in Operating Systems"),
            algo_percentage: value("Percentage in Algorithms"),
            programming_percentage: value("Percentage in Programming Concepts"),
            networks_percentage: value("Percentage in Computer Networks"),
            communication: value("Percentage in Communication skills"),
            logical_rating: value("Logical quotient rating"),
            coding_skills: value("Coding skills rating"),
            interested_subjects: raw("Interested subjects"),
            interested_career: raw("Interested career area"),
            prediction_result: top.career.clone(),
        })
    }
}

/// One row of a user's prediction history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub prediction_result: String,
    pub interested_subjects: String,
    pub interested_career: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================
// REPOSITORY INTERFACES
// ============================================================

pub trait UserRepository: Send + Sync {
    fn create_user(&self, username: &str, email: &str, password_hash: &str) -> StoreResult<User>;
    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
}

pub trait PredictionRepository: Send + Sync {
    fn save_prediction(&self, record: &PredictionRecord) -> StoreResult<i64>;
    /// Newest first
    fn prediction_history(&self, user_id: i64) -> StoreResult<Vec<HistoryEntry>>;
}

// ============================================================
// SQLITE STORE
// ============================================================

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Create an in-memory store for testing
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                os_percentage REAL NOT NULL,
                algo_percentage REAL NOT NULL,
                programming_percentage REAL NOT NULL,
                networks_percentage REAL NOT NULL,
                communication REAL NOT NULL,
                logical_rating REAL NOT NULL,
                coding_skills REAL NOT NULL,
                interested_subjects TEXT NOT NULL,
                interested_career TEXT NOT NULL,
                prediction_result TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_predictions_user_id ON predictions(user_id);",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Only UNIQUE failures mean a duplicate; NOT NULL or CHECK failures are real errors
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl UserRepository for SqliteStore {
    fn create_user(&self, username: &str, email: &str, password_hash: &str) -> StoreResult<User> {
        let conn = self.lock()?;
        let created_at = Utc::now();

        let inserted = conn.execute(
            "INSERT INTO users (username, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![username, email, password_hash, created_at.to_rfc3339()],
        );

        match inserted {
            Ok(_) => Ok(User {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                created_at,
            }),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateEmail(email.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let conn = self.lock()?;
        let user = conn
            .query_row(
                "SELECT id, username, email, password_hash, created_at
                 FROM users
                 WHERE email = ?1",
                [email],
                |row| {
                    let created_at: String = row.get(4)?;
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        password_hash: row.get(3)?,
                        created_at: parse_timestamp(&created_at),
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}

impl PredictionRepository for SqliteStore {
    fn save_prediction(&self, record: &PredictionRecord) -> StoreResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO predictions (user_id, os_percentage, algo_percentage, programming_percentage,
                networks_percentage, communication, logical_rating, coding_skills,
                interested_subjects, interested_career, prediction_result, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.user_id,
                record.os_percentage,
                record.algo_percentage,
                record.programming_percentage,
                record.networks_percentage,
                record.communication,
                record.logical_rating,
                record.coding_skills,
                record.interested_subjects,
                record.interested_career,
                record.prediction_result,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn prediction_history(&self, user_id: i64) -> StoreResult<Vec<HistoryEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT prediction_result, interested_subjects, interested_career, created_at
             FROM predictions
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt.query_map([user_id], |row| {
            let created_at: String = row.get(3)?;
            Ok(HistoryEntry {
                prediction_result: row.get(0)?,
                interested_subjects: row.get(1)?,
                interested_career: row.get(2)?,
                created_at: parse_timestamp(&created_at),
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
