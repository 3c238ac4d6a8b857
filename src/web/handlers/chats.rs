use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode};

use crate::legal::{Chat, Message};
use crate::web::server::GatewayState;
use crate::web::types::{
    AddMessageRequest, ApiError, ApiResult, CaseIdRequest, parse_body, respond,
};

pub async fn get_case_chat_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<CaseIdRequest>, JsonRejection>,
) -> ApiResult<Chat> {
    let req = parse_body(body)?;
    state
        .repos
        .cases
        .get_by_id(&req.case_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get case", e))?
        .ok_or_else(|| ApiError::not_found("Case"))?;
    let chat = state
        .repos
        .chats
        .get_by_id(&req.case_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get chat", e))?
        .ok_or_else(|| ApiError::not_found("Chat"))?;
    respond(StatusCode::OK, "Chat retrieved successfully", chat)
}

pub async fn add_message_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<AddMessageRequest>, JsonRejection>,
) -> ApiResult<Chat> {
    let req = parse_body(body)?;
    if [&req.case_id, &req.text, &req.sender, &req.timestamp]
        .iter()
        .any(|value| value.trim().is_empty())
    {
        return Err(ApiError::bad_request("All fields must be filled out"));
    }
    let message = Message {
        text: req.text,
        sender: req.sender,
        timestamp: req.timestamp,
    };
    let chat = state
        .repos
        .chats
        .append_message(&req.case_id, message)
        .await
        .map_err(|e| ApiError::internal("Failed to add message", e))?
        .ok_or_else(|| ApiError::not_found("Chat"))?;
    respond(StatusCode::OK, "Message added successfully", chat)
}
