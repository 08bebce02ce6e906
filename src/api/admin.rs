//! Operator endpoints for users and placements.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{Address, TimeMs, UserId};
use crate::error::AppError;
use crate::orchestration::PlacementSummary;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub address: String,
    pub referrer_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserResponse {
    pub user_id: i64,
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(body): Json<RegisterUserRequest>,
) -> Result<Json<RegisterUserResponse>, AppError> {
    if body.address.trim().is_empty() {
        return Err(AppError::BadRequest("address must not be empty".into()));
    }
    let user = state
        .engine
        .register_user(
            &Address::new(body.address),
            body.referrer_id.map(UserId::new),
            TimeMs::now(),
        )
        .await?;
    Ok(Json(RegisterUserResponse {
        user_id: user.as_i64(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRequest {
    pub user_id: i64,
    /// One of the tier amounts, in display units.
    pub amount: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementResponse {
    pub position_id: i64,
    pub user_id: i64,
    pub status: String,
    pub level: i64,
    pub current: String,
    pub current_max: String,
    pub carry_over_paid: String,
    pub commissions_paid: usize,
}

impl From<PlacementSummary> for PlacementResponse {
    fn from(summary: PlacementSummary) -> Self {
        let p = summary.position;
        Self {
            position_id: p.id.as_i64(),
            user_id: p.user_id.as_i64(),
            status: p.status.as_str().to_string(),
            level: p.level,
            current: p.current.to_decimal().to_string(),
            current_max: p.current_max.to_decimal().to_string(),
            carry_over_paid: summary.carry_over_paid.to_decimal().to_string(),
            commissions_paid: summary.commissions_paid,
        }
    }
}

pub async fn create_placement(
    State(state): State<AppState>,
    Json(body): Json<PlacementRequest>,
) -> Result<Json<PlacementResponse>, AppError> {
    let summary = state
        .engine
        .admin_place(UserId::new(body.user_id), body.amount, TimeMs::now())
        .await?;
    Ok(Json(summary.into()))
}

#[derive(Debug, Deserialize)]
pub struct AreaLevelRequest {
    pub level: i64,
}

pub async fn set_area_level(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<AreaLevelRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .engine
        .set_area_level(UserId::new(user_id), body.level)
        .await?;
    Ok(Json(serde_json::json!({"userId": user_id, "level": body.level})))
}

#[derive(Debug, Deserialize)]
pub struct VipRequest {
    pub vip: i64,
}

pub async fn set_vip(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<VipRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let profile = state.engine.set_vip(UserId::new(user_id), body.vip).await?;
    Ok(Json(serde_json::json!({
        "userId": user_id,
        "vip": profile.vip,
        "historyRecommend": profile.history_recommend,
    })))
}
