use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use tablero_shared::errors::{AppError, AppResult, ErrorCode};
use tablero_shared::types::ApiResponse;

use crate::models::{FriendRequest, Friendship, User};
use crate::AppState;

use super::username_field;

#[derive(Debug, Deserialize, Validate)]
pub struct SendFriendRequestBody {
    #[validate(custom = "username_field")]
    pub sender: String,
    #[validate(custom = "username_field")]
    pub receiver: String,
}

// --- POST /friends/requests ---

pub async fn send_friend_request(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SendFriendRequestBody>,
) -> AppResult<Json<ApiResponse<FriendRequest>>> {
    body.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let request = state.friends.send_friend_request(&body.sender, &body.receiver)?;
    Ok(Json(ApiResponse::ok(request)))
}

// --- POST /friends/requests/:id/accept ---

pub async fn accept_friend_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Friendship>>> {
    let friendship = state.friends.accept_friend_request(request_id)?;
    Ok(Json(ApiResponse::ok(friendship)))
}

// --- POST /friends/requests/:id/reject ---

pub async fn reject_friend_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<i64>,
) -> AppResult<Json<ApiResponse<FriendRequest>>> {
    let request = state.friends.reject_friend_request(request_id)?;
    Ok(Json(ApiResponse::ok(request)))
}

// --- DELETE /friends/:user_a/:user_b ---

pub async fn remove_friendship(
    State(state): State<Arc<AppState>>,
    Path((user_a, user_b)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.friends.remove_friendship(user_a, user_b)?;
    Ok(Json(ApiResponse::empty()))
}

// --- GET /users/:id/friends ---

pub async fn list_friends(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<User>>>> {
    let friends = state.friends.get_friends(user_id)?;
    Ok(Json(ApiResponse::ok(friends)))
}

// --- GET /users/:id/friend-requests ---

pub async fn list_pending_requests(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<FriendRequest>>>> {
    let requests = state.friends.pending_requests_for(user_id)?;
    Ok(Json(ApiResponse::ok(requests)))
}
