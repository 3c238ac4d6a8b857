use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode};

use crate::legal::Case;
use crate::web::server::GatewayState;
use crate::web::types::{ApiError, ApiResult, IdRequest, UserIdRequest, parse_body, respond};

pub async fn create_case_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<Case>, JsonRejection>,
) -> ApiResult<Case> {
    let input = parse_body(body)?;
    let case = state
        .cascade
        .create_case(input)
        .await
        .map_err(|e| ApiError::from_service("Failed to create case", e))?;
    respond(StatusCode::CREATED, "Case created successfully", case)
}

pub async fn get_case_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<IdRequest>, JsonRejection>,
) -> ApiResult<Case> {
    let req = parse_body(body)?;
    let case = state
        .repos
        .cases
        .get_by_id(&req.id)
        .await
        .map_err(|e| ApiError::internal("Failed to get case", e))?
        .ok_or_else(|| ApiError::not_found("Case"))?;
    respond(StatusCode::OK, "Case retrieved successfully", case)
}

pub async fn update_case_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<Case>, JsonRejection>,
) -> ApiResult<Case> {
    let input = parse_body(body)?;
    if input.id.is_empty() {
        return Err(ApiError::bad_request("Case ID is required"));
    }
    // Ownership cannot change, so user_id may be left out.
    if input.blank_fields().iter().any(|field| *field != "user_id") {
        return Err(ApiError::bad_request("All fields must be filled out"));
    }
    let case = state
        .repos
        .cases
        .update(input)
        .await
        .map_err(|e| ApiError::internal("Failed to update case", e))?
        .ok_or_else(|| ApiError::not_found("Case"))?;
    respond(StatusCode::OK, "Case updated successfully", case)
}

pub async fn get_user_cases_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<UserIdRequest>, JsonRejection>,
) -> ApiResult<Vec<Case>> {
    let req = parse_body(body)?;
    state
        .repos
        .users
        .get_by_id(&req.user_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get user", e))?
        .ok_or_else(|| ApiError::not_found("User"))?;
    let cases = state
        .repos
        .cases
        .get_by_user(&req.user_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get case", e))?;
    respond(StatusCode::OK, "Case retrieved successfully", cases)
}

pub async fn delete_case_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<IdRequest>, JsonRejection>,
) -> ApiResult<Case> {
    let req = parse_body(body)?;
    let case = state
        .cascade
        .delete_case(&req.id)
        .await
        .map_err(|e| ApiError::from_service("Failed to delete case", e))?
        .ok_or_else(|| ApiError::not_found("Case"))?;
    respond(StatusCode::OK, "Case deleted successfully", case)
}

pub async fn delete_user_cases_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<UserIdRequest>, JsonRejection>,
) -> ApiResult<Vec<Case>> {
    let req = parse_body(body)?;
    if req.user_id.is_empty() {
        return Err(ApiError::bad_request("User ID is required"));
    }
    let cases = state
        .cascade
        .delete_user_cases(&req.user_id)
        .await
        .map_err(|e| ApiError::from_service("Failed to delete cases", e))?;
    if cases.is_empty() {
        return Err(ApiError::not_found("Cases"));
    }
    respond(StatusCode::OK, "Cases deleted successfully", cases)
}
