use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

use luna_core::cycle::fetcher::{CyclePhaseResult, CALCULATE_CYCLE_PATH};
use luna_core::cycle::phase::DEFAULT_CYCLE_LENGTH;
use luna_core::cycle::{calculate_cycle_day_and_phase, CalculationError};

/// Request body. Only `last_period_date` is required; `current_date`
/// defaults to today on the server's clock.
#[derive(Debug, Deserialize)]
pub struct CalculateCycleBody {
    pub last_period_date: String,
    #[serde(default = "default_cycle_length")]
    pub cycle_length: u32,
    #[serde(default)]
    pub current_date: Option<String>,
}

fn default_cycle_length() -> u32 {
    DEFAULT_CYCLE_LENGTH
}

type ApiResult = Result<Json<CyclePhaseResult>, (StatusCode, Json<CyclePhaseResult>)>;

pub fn app_router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(CALCULATE_CYCLE_PATH, post(calculate_cycle_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health_handler() -> &'static str {
    "ok"
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<CyclePhaseResult>) {
    (
        StatusCode::BAD_REQUEST,
        Json(CyclePhaseResult::failure(message)),
    )
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, (StatusCode, Json<CyclePhaseResult>)> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| bad_request(format!("Invalid {field} '{value}', expected YYYY-MM-DD")))
}

async fn calculate_cycle_handler(body: Result<Json<CalculateCycleBody>, JsonRejection>) -> ApiResult {
    let Json(body) = body.map_err(|e| bad_request(e.body_text()))?;
    debug!(?body, "calculate cycle");

    let last_period = parse_date("last_period_date", &body.last_period_date)?;
    let today = match body.current_date.as_deref() {
        Some(raw) => parse_date("current_date", raw)?,
        None => chrono::Local::now().date_naive(),
    };

    match calculate_cycle_day_and_phase(last_period, body.cycle_length, today) {
        Ok(pos) => Ok(Json(CyclePhaseResult {
            success: true,
            cycle_day: Some(i64::from(pos.cycle_day)),
            phase: Some(pos.phase.name().to_string()),
            phase_description: Some(pos.phase.description().to_string()),
            error: None,
        })),
        Err(e @ CalculationError::ZeroCycleLength) => Err(bad_request(e.to_string())),
        // A well-formed request; the answer is just "not yet".
        Err(e @ CalculationError::BeforeLastPeriod) => Ok(Json(CyclePhaseResult::failure(e.to_string()))),
    }
}
