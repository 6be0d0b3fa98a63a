use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use tablero_shared::errors::{AppError, AppResult, ErrorCode};
use tablero_shared::types::ApiResponse;

use crate::models::User;
use crate::AppState;

use super::username_field;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(custom = "username_field")]
    pub username: String,
}

// --- POST /internal/users ---

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let user = state.users.create(&req.username)?;
    Ok(Json(ApiResponse::ok(user)))
}
