use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use tablero_shared::errors::{AppError, AppResult, ErrorCode};
use tablero_shared::types::ApiResponse;

use crate::models::Sanction;
use crate::AppState;

use super::reason_field;

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyBanRequest {
    #[serde(default)]
    pub permanent: bool,
    pub until: Option<DateTime<Utc>>,
    #[validate(custom = "reason_field")]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct BanStatus {
    pub user_id: i64,
    pub banned: bool,
}

// --- POST /users/:id/sanctions ---

pub async fn apply_ban(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(body): Json<ApplyBanRequest>,
) -> AppResult<Json<ApiResponse<Sanction>>> {
    body.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let sanction = state
        .sanctions
        .apply_ban(user_id, body.permanent, body.until, &body.reason)?;
    Ok(Json(ApiResponse::ok(sanction)))
}

// --- GET /users/:id/ban ---

pub async fn ban_status(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<BanStatus>>> {
    let banned = state.sanctions.has_active_ban(user_id)?;
    Ok(Json(ApiResponse::ok(BanStatus { user_id, banned })))
}

// --- GET /users/:id/sanctions ---

pub async fn list_user_sanctions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<Sanction>>>> {
    let sanctions = state.sanctions.sanctions_for_user(user_id)?;
    Ok(Json(ApiResponse::ok(sanctions)))
}

// --- DELETE /sanctions/:id ---

pub async fn lift_sanction(
    State(state): State<Arc<AppState>>,
    Path(sanction_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Sanction>>> {
    let sanction = state.sanctions.lift_sanction(sanction_id)?;
    Ok(Json(ApiResponse::ok(sanction)))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::build_router;
    use crate::config::AppConfig;
    use crate::repositories::test_support;

    fn app() -> axum::Router {
        let state = Arc::new(AppState::new(AppConfig::default(), test_support::pool(), None));
        build_router(state)
    }

    async fn call(app: &axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn ban_then_lift() {
        let app = app();

        let (_, status) = call(&app, Method::GET, "/users/9/ban", None).await;
        assert_eq!(status["data"]["banned"], false);

        let (code, body) = call(
            &app,
            Method::POST,
            "/users/9/sanctions",
            Some(json!({ "permanent": true, "reason": "cheating" })),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["data"]["kind"], "permanent");
        let sanction_id = body["data"]["id"].as_i64().unwrap();

        let (_, status) = call(&app, Method::GET, "/users/9/ban", None).await;
        assert_eq!(status["data"]["banned"], true);

        let (code, _) = call(&app, Method::DELETE, &format!("/sanctions/{sanction_id}"), None).await;
        assert_eq!(code, StatusCode::OK);

        let (_, status) = call(&app, Method::GET, "/users/9/ban", None).await;
        assert_eq!(status["data"]["banned"], false);
    }

    #[tokio::test]
    async fn reports_are_counted() {
        let app = app();

        for match_id in [1, 2] {
            let (code, _) = call(
                &app,
                Method::POST,
                "/reports",
                Some(json!({ "reporter_id": 1, "reported_id": 4, "match_id": match_id, "reason": "abuse" })),
            )
            .await;
            assert_eq!(code, StatusCode::OK);
        }

        let (_, body) = call(&app, Method::GET, "/users/4/reports/count", None).await;
        assert_eq!(body["data"]["reports"], 2);
    }

    #[tokio::test]
    async fn self_report_is_forbidden() {
        let app = app();

        let (code, body) = call(
            &app,
            Method::POST,
            "/reports",
            Some(json!({ "reporter_id": 4, "reported_id": 4, "match_id": 1, "reason": "abuse" })),
        )
        .await;

        assert_eq!(code, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], ErrorCode::CannotReportSelf.value());
    }

    #[tokio::test]
    async fn reasons_are_measured_after_trimming() {
        let app = app();
        let longest = "r".repeat(500);

        let (code, body) = call(
            &app,
            Method::POST,
            "/reports",
            Some(json!({ "reporter_id": 1, "reported_id": 2, "match_id": 3, "reason": format!(" {longest}  ") })),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["data"]["reason"], longest.as_str());

        let (code, body) = call(
            &app,
            Method::POST,
            "/users/2/sanctions",
            Some(json!({ "permanent": true, "reason": "   " })),
        )
        .await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ErrorCode::ValidationError.value());
    }

    #[tokio::test]
    async fn unknown_sanction_is_not_found() {
        let app = app();

        let (code, body) = call(&app, Method::DELETE, "/sanctions/77", None).await;

        assert_eq!(code, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], ErrorCode::SanctionNotFound.value());
    }
}
