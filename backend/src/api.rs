//! Web API Module
//!
//! Exposes JSON endpoints for the career recommender frontend:
//! accounts, survey prediction, prediction history and career statistics.

use crate::auth::{self, AuthError, SessionStore, SessionUser, SESSION_COOKIE};
use crate::config::Config;
use crate::insights::{self, DEFAULT_CAREER};
use crate::predictor::{
    CareerScore, FeatureVector, PredictionError, PredictionResult, PredictionService, RawAnswers,
    FEATURE_NAMES, MODELS_UNAVAILABLE,
};
use crate::store::{
    HistoryEntry, PredictionRecord, PredictionRepository, SqliteStore, StoreError, User,
};
use actix_cors::Cors;
use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, ResponseError};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

// ============================================================
// APPLICATION STATE
// ============================================================

/// Shared application state
pub struct AppState {
    pub predictor: PredictionService,
    pub store: SqliteStore,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(predictor: PredictionService, store: SqliteStore) -> Self {
        Self {
            predictor,
            store,
            sessions: SessionStore::new(),
        }
    }

    /// Load models and open the database described by `config`
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let predictor = PredictionService::load(&config.model_dir);
        let store = if config.uses_in_memory_database() {
            SqliteStore::in_memory()?
        } else {
            SqliteStore::open(Path::new(&config.database_path))?
        };
        Ok(Self::new(predictor, store))
    }

    fn session_user(&self, req: &HttpRequest) -> Option<SessionUser> {
        req.cookie(SESSION_COOKIE)
            .and_then(|cookie| self.sessions.get(cookie.value()))
    }
}

// ============================================================
// API REQUEST/RESPONSE TYPES
// ============================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize, Default)]
pub struct StatisticsRequest {
    #[serde(default)]
    pub career: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct PredictResponse {
    /// Top careers with confidences, most probable first
    pub careers: Vec<CareerScore>,
    pub predicted_jobs: Vec<String>,
    /// Whether the top career was added to the user's history
    pub saved: bool,
}

#[derive(Serialize, Deserialize)]
pub struct ProfileResponse {
    pub username: String,
    pub history: Vec<HistoryEntry>,
}

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: &str) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.to_string()),
        }
    }
}

// ============================================================
// ERRORS
// ============================================================

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Prediction(#[from] PredictionError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Please log in first")]
    Unauthorized,
}

impl ApiError {
    /// Message shown to the client; internals stay in the log
    fn public_message(&self) -> String {
        match self {
            ApiError::Prediction(PredictionError::ModelsUnavailable { .. }) => {
                format!("Error: {}.", MODELS_UNAVAILABLE)
            }
            ApiError::Prediction(e) => format!("Error during prediction: {}", e),
            ApiError::Auth(AuthError::Store(StoreError::DuplicateEmail(email)))
            | ApiError::Store(StoreError::DuplicateEmail(email)) => {
                format!("Email already registered: {}", email)
            }
            ApiError::Auth(AuthError::Store(_)) | ApiError::Store(_) => "Database error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Prediction(PredictionError::InvalidInput { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Prediction(PredictionError::ModelsUnavailable { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Prediction(PredictionError::Model(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Auth(AuthError::InvalidCredentials) | ApiError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Auth(AuthError::MissingField(_)) => StatusCode::BAD_REQUEST,
            ApiError::Auth(AuthError::Store(StoreError::DuplicateEmail(_)))
            | ApiError::Store(StoreError::DuplicateEmail(_)) => StatusCode::CONFLICT,
            ApiError::Auth(AuthError::Store(_)) | ApiError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
        }
        HttpResponse::build(status).json(ApiResponse::<()>::error(&self.public_message()))
    }
}

// ============================================================
// API HANDLERS
// ============================================================

/// Health check endpoint
async fn health_check(data: web::Data<Arc<AppState>>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "Career Recommender API",
        "version": env!("CARGO_PKG_VERSION"),
        "models_loaded": data.predictor.is_ready(),
    }))
}

/// Create an account
async fn register(
    data: web::Data<Arc<AppState>>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let user: User = auth::register(&data.store, &req.username, &req.email, &req.password)?;
    info!("Registered user {} ({})", user.id, user.username);
    Ok(HttpResponse::Ok().json(ApiResponse::success(user)))
}

/// Log in and receive a session cookie
async fn login(
    data: web::Data<Arc<AppState>>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = auth::authenticate(&data.store, &req.email, &req.password)?;
    let token = data.sessions.create(&user);

    let cookie = Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .finish();

    Ok(HttpResponse::Ok().cookie(cookie).json(ApiResponse::success(SessionUser {
        user_id: user.id,
        username: user.username,
    })))
}

/// End the current session
async fn logout(data: web::Data<Arc<AppState>>, req: HttpRequest) -> HttpResponse {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        data.sessions.remove(cookie.value());
    }

    let mut removal = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    removal.make_removal();
    HttpResponse::Ok()
        .cookie(removal)
        .json(ApiResponse::success("Logged out"))
}

/// Password reset request; sending mail is not wired up
async fn forgot_password(req: web::Json<ForgotPasswordRequest>) -> HttpResponse {
    info!("Password reset requested for {}", req.email);
    HttpResponse::Ok().json(ApiResponse::success(
        "Password reset link sent to your email.",
    ))
}

/// Predict from a form-encoded survey
async fn predict_form(
    data: web::Data<Arc<AppState>>,
    req: HttpRequest,
    form: web::Form<HashMap<String, String>>,
) -> Result<HttpResponse, ApiError> {
    run_prediction(&data, &req, &form.into_inner())
}

/// Predict from a JSON survey; values may be strings or numbers
async fn predict_json(
    data: web::Data<Arc<AppState>>,
    req: HttpRequest,
    body: web::Json<HashMap<String, Value>>,
) -> Result<HttpResponse, ApiError> {
    let answers = json_answers(body.into_inner())?;
    run_prediction(&data, &req, &answers)
}

fn run_prediction(
    state: &AppState,
    req: &HttpRequest,
    answers: &RawAnswers,
) -> Result<HttpResponse, ApiError> {
    let (features, result) = state.predictor.predict_with_features(answers).map_err(|e| {
        if e.is_user_fixable() {
            warn!("Rejected prediction input: {}", e);
        } else {
            error!("Prediction error: {}", e);
        }
        e
    })?;

    let saved = match state.session_user(req) {
        Some(user) => save_history(state, &user, answers, &features, &result),
        None => false,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(PredictResponse {
        predicted_jobs: result.career_names(),
        careers: result.careers,
        saved,
    })))
}

/// Persist the top career for a logged-in user. Failures are logged, never fatal.
fn save_history(
    state: &AppState,
    user: &SessionUser,
    answers: &RawAnswers,
    features: &FeatureVector,
    result: &PredictionResult,
) -> bool {
    let Some(record) = PredictionRecord::from_prediction(user.user_id, answers, features, result)
    else {
        warn!("No career to save for user {}", user.user_id);
        return false;
    };

    match state.store.save_prediction(&record) {
        Ok(_) => true,
        Err(e) => {
            error!("Failed to save prediction for user {}: {}", user.user_id, e);
            false
        }
    }
}

fn json_answers(body: HashMap<String, Value>) -> Result<RawAnswers, PredictionError> {
    let mut answers = RawAnswers::with_capacity(FEATURE_NAMES.len());
    for (field, value) in body {
        // Unknown keys are ignored whatever their type
        if !FEATURE_NAMES.contains(&field.as_str()) {
            continue;
        }
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => {
                return Err(PredictionError::InvalidInput {
                    field,
                    value: other.to_string(),
                })
            }
        };
        answers.insert(field, text);
    }
    Ok(answers)
}

/// The logged-in user's prediction history
async fn profile(data: web::Data<Arc<AppState>>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let user = data.session_user(&req).ok_or(ApiError::Unauthorized)?;
    let history = data.store.prediction_history(user.user_id)?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(ProfileResponse {
        username: user.username,
        history,
    })))
}

/// Statistics for the statistics page
async fn statistics_data(req: Option<web::Json<StatisticsRequest>>) -> HttpResponse {
    let career = req
        .and_then(|r| r.into_inner().career)
        .unwrap_or_else(|| DEFAULT_CAREER.to_string());
    HttpResponse::Ok().json(insights::career_insights(&career))
}

/// All careers the classifier can suggest
async fn list_careers(data: web::Data<Arc<AppState>>) -> Result<HttpResponse, ApiError> {
    let careers = data.predictor.careers()?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(careers)))
}

// ============================================================
// SERVER CONFIGURATION
// ============================================================

/// Register every route on an app or test service
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/register", web::post().to(register))
        .route("/login", web::post().to(login))
        .route("/logout", web::get().to(logout))
        .route("/logout", web::post().to(logout))
        .route("/forgot-password", web::post().to(forgot_password))
        .route("/predict", web::post().to(predict_form))
        .route("/api/predict", web::post().to(predict_json))
        .route("/profile", web::get().to(profile))
        .route("/api/statistics_data", web::post().to(statistics_data))
        .route("/api/careers", web::get().to(list_careers));
}

/// Configure and run the API server
pub async fn run_server(config: Config) -> std::io::Result<()> {
    let state = AppState::from_config(&config).map_err(|e| {
        error!("Failed to initialize app state: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;
    if let Some(reason) = state.predictor.disabled_reason() {
        warn!("Predictions disabled: {}", reason);
    }
    let state = Arc::new(state);

    info!("Career Recommender API starting at http://{}:{}", config.host, config.port);
    info!("API Endpoints:");
    info!("   POST /register            - Create account");
    info!("   POST /login               - Log in");
    info!("   GET  /logout              - Log out");
    info!("   POST /predict             - Predict careers (form)");
    info!("   POST /api/predict         - Predict careers (JSON)");
    info!("   GET  /profile             - Prediction history");
    info!("   POST /api/statistics_data - Career statistics");
    info!("   GET  /api/careers         - Known careers");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
