//! On-demand triggers for the batch jobs.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::TimeMs;
use crate::error::AppError;
use crate::orchestration::area::PoolDay;
use crate::orchestration::{BatchItem, BatchReport};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub run_id: String,
    pub job: String,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub items: Vec<BatchItem>,
}

impl From<BatchReport> for JobResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            run_id: report.run_id.to_string(),
            job: report.job.to_string(),
            applied: report.applied(),
            skipped: report.skipped(),
            failed: report.failed(),
            items: report.items,
        }
    }
}

pub async fn deposit_scan(State(state): State<AppState>) -> Result<Json<JobResponse>, AppError> {
    let source = state
        .deposit_source
        .clone()
        .ok_or_else(|| AppError::Unavailable("deposit source not configured".into()))?;

    match state.engine.scan_deposits(source.as_ref(), TimeMs::now()).await? {
        Some(report) => Ok(Json(report.into())),
        None => Err(AppError::Conflict("global lock busy".into())),
    }
}

pub async fn daily_position_reward(
    State(state): State<AppState>,
) -> Result<Json<JobResponse>, AppError> {
    let report = state
        .engine
        .run_daily_position_reward(TimeMs::now())
        .await?;
    Ok(Json(report.into()))
}

#[derive(Debug, Default, Deserialize)]
pub struct AreaRewardQuery {
    /// `today` to distribute the current day's pool instead of yesterday's.
    pub day: Option<String>,
}

pub async fn area_reward(
    State(state): State<AppState>,
    Query(params): Query<AreaRewardQuery>,
) -> Result<Json<JobResponse>, AppError> {
    let day = match params.day.as_deref() {
        None | Some("yesterday") => PoolDay::Yesterday,
        Some("today") => PoolDay::Today,
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "day must be today or yesterday, got {}",
                other
            )))
        }
    };
    let report = state.engine.run_area_reward(day, TimeMs::now()).await?;
    Ok(Json(report.into()))
}

pub async fn area_rebuild(State(state): State<AppState>) -> Result<Json<JobResponse>, AppError> {
    let report = state.engine.rebuild_area_aggregates().await?;
    Ok(Json(report.into()))
}
