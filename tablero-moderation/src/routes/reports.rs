use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use tablero_shared::errors::{AppError, AppResult, ErrorCode};
use tablero_shared::types::ApiResponse;

use crate::models::Report;
use crate::AppState;

use super::reason_field;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportRequest {
    #[validate(range(min = 1))]
    pub reporter_id: i64,
    #[validate(range(min = 1))]
    pub reported_id: i64,
    #[validate(range(min = 1))]
    pub match_id: i64,
    #[validate(custom = "reason_field")]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ReportCount {
    pub user_id: i64,
    pub reports: i64,
}

// --- POST /reports ---

pub async fn create_report(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateReportRequest>,
) -> AppResult<Json<ApiResponse<Report>>> {
    body.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let report = state
        .reports
        .add_report(body.reporter_id, body.reported_id, body.match_id, &body.reason)?;
    Ok(Json(ApiResponse::ok(report)))
}

// --- GET /users/:id/reports/count ---

pub async fn count_user_reports(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<ReportCount>>> {
    let reports = state.reports.count_reports_for_user(user_id)?;
    Ok(Json(ApiResponse::ok(ReportCount { user_id, reports })))
}

// --- GET /users/:id/reports ---

pub async fn list_user_reports(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<Report>>>> {
    let reports = state.reports.reports_for_user(user_id)?;
    Ok(Json(ApiResponse::ok(reports)))
}
