use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode};

use crate::legal::User;
use crate::web::server::GatewayState;
use crate::web::types::{
    ApiError, ApiResult, DeleteUserRequest, IdRequest, LoginRequest, parse_body, respond,
};

pub async fn create_user_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<User>, JsonRejection>,
) -> ApiResult<User> {
    let input = parse_body(body)?;
    let user = state
        .repos
        .users
        .create(input)
        .await
        .map_err(|e| ApiError::from_service("Failed to create user", e))?;
    respond(StatusCode::CREATED, "User created successfully", user)
}

pub async fn login_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<User> {
    let req = parse_body(body)?;
    let user = state
        .repos
        .users
        .authenticate(&req.email, &req.password)
        .await
        .map_err(|e| ApiError::from_service("Failed to get user", e))?;
    respond(StatusCode::OK, "User authorized successfully", user)
}

pub async fn get_user_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<IdRequest>, JsonRejection>,
) -> ApiResult<User> {
    let req = parse_body(body)?;
    let user = state
        .repos
        .users
        .get_by_id(&req.id)
        .await
        .map_err(|e| ApiError::internal("Failed to get user", e))?
        .ok_or_else(|| ApiError::not_found("User"))?;
    respond(StatusCode::OK, "User retrieved successfully", user)
}

pub async fn update_user_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<User>, JsonRejection>,
) -> ApiResult<User> {
    let input = parse_body(body)?;
    if input.id.is_empty() {
        return Err(ApiError::bad_request("User ID is required"));
    }
    if input.email.trim().is_empty() || input.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }
    let user = state
        .repos
        .users
        .update(input)
        .await
        .map_err(|e| ApiError::from_service("Failed to update user", e))?
        .ok_or_else(|| ApiError::not_found("User"))?;
    respond(StatusCode::OK, "User updated successfully", user)
}

pub async fn delete_user_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<DeleteUserRequest>, JsonRejection>,
) -> ApiResult<User> {
    let req = parse_body(body)?;
    if req.id.is_empty() || req.email.is_empty() {
        return Err(ApiError::bad_request("User ID and email are required"));
    }
    let user = state
        .repos
        .users
        .delete(&req.id, &req.email)
        .await
        .map_err(|e| ApiError::internal("Failed to delete user", e))?
        .ok_or_else(|| ApiError::not_found("User"))?;
    respond(StatusCode::OK, "User deleted successfully", user)
}
