use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AppState;
use crate::domain::{HistoricalData, SeriesKind};
use crate::engine::SimulationParams;
use crate::error::AppError;
use crate::orchestration::{SimulationReport, SimulationRequest};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateBody {
    pub start_date: String,
    pub end_date: String,
    pub initial_capital: f64,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub cleared: u64,
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (its UTC date is used).
fn parse_date(field: &str, input: &str) -> Result<NaiveDate, AppError> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(input).map(|dt| dt.naive_utc().date()))
        .map_err(|_| AppError::BadRequest(format!("Invalid {}: {}", field, input)))
}

fn validate_capital(capital: f64) -> Result<f64, AppError> {
    if capital.is_finite() && capital > 0.0 {
        Ok(capital)
    } else {
        Err(AppError::BadRequest(
            "initialCapital must be a positive number".to_string(),
        ))
    }
}

/// Every point needs a calendar-representable timestamp and a finite,
/// positive price.
fn validate_history(data: &HistoricalData) -> Result<(), AppError> {
    for kind in [SeriesKind::Eth, SeriesKind::WstEth, SeriesKind::Gas] {
        for (idx, point) in data.series(kind).points().iter().enumerate() {
            if !point.timestamp.is_representable() {
                return Err(AppError::BadRequest(format!(
                    "{} point {} has an out-of-range timestamp: {}",
                    kind,
                    idx,
                    point.timestamp.as_secs()
                )));
            }
            if !(point.price.is_finite() && point.price > 0.0) {
                return Err(AppError::BadRequest(format!(
                    "{} point {} must have a positive price, got {}",
                    kind, idx, point.price
                )));
            }
        }
    }
    Ok(())
}

fn bad_body(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

impl SimulateBody {
    fn validate(&self) -> Result<SimulationRequest, AppError> {
        let start_date = parse_date("startDate", &self.start_date)?;
        let end_date = parse_date("endDate", &self.end_date)?;
        if start_date > end_date {
            return Err(AppError::BadRequest(
                "startDate must be on or before endDate".to_string(),
            ));
        }
        Ok(SimulationRequest {
            start_date,
            end_date,
            initial_capital: validate_capital(self.initial_capital)?,
        })
    }
}

pub async fn simulate(
    State(state): State<AppState>,
    body: Result<Json<SimulateBody>, JsonRejection>,
) -> Result<Json<SimulationReport>, AppError> {
    let Json(body) = body.map_err(bad_body)?;
    let request = body.validate()?;
    info!(
        start = %request.start_date,
        end = %request.end_date,
        capital = request.initial_capital,
        "Simulation requested"
    );

    let report = state.orchestrator.run(&request).await?;
    Ok(Json(report))
}

pub async fn simulate_historical(
    State(state): State<AppState>,
    body: Result<Json<SimulationParams>, JsonRejection>,
) -> Result<Json<SimulationReport>, AppError> {
    let Json(params) = body.map_err(bad_body)?;
    validate_capital(params.initial_capital)?;
    validate_history(&params.historical_data)?;

    let report = state.orchestrator.run_historical(&params)?;
    Ok(Json(report))
}

pub async fn clear_cache(State(state): State<AppState>) -> Result<Json<ClearCacheResponse>, AppError> {
    let cleared = match state.orchestrator.loader().cache() {
        Some(cache) => cache.clear().await?,
        None => 0,
    };
    info!(cleared, "Cache cleared");
    Ok(Json(ClearCacheResponse { cleared }))
}
