use std::sync::Arc;

use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::JsonRejection,
    extract::{Multipart, State},
    http::StatusCode,
};

use crate::legal::Document;
use crate::legal::cascade::{KeyNaming, UploadedFile};
use crate::web::server::GatewayState;
use crate::web::types::{
    ApiError, ApiResult, CaseIdRequest, IdRequest, RelevancyRequest, parse_body, respond,
};

/// Fallback name for a file part without a usable filename.
const DEFAULT_FILE_NAME: &str = "document";

struct UploadForm {
    case_id: String,
    files: Vec<UploadedFile>,
}

fn read_error(e: MultipartError) -> ApiError {
    tracing::debug!("Multipart read error: {}", e);
    ApiError {
        status: e.status(),
        message: "Failed to read file".to_string(),
    }
}

/// Collect the `case_id` text part and every part named `file_field`.
async fn read_upload_form(
    multipart: Result<Multipart, MultipartRejection>,
    file_field: &str,
) -> Result<UploadForm, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected multipart body: {}", e);
        ApiError::bad_request("Failed to read request body")
    })?;

    let mut case_id = String::new();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        let part = field.name().map(str::to_string);
        match part.as_deref() {
            Some("case_id") => {
                case_id = field.text().await.map_err(read_error)?.trim().to_string();
            }
            Some(name) if name == file_field => {
                // Basename only; directory components from the client are dropped.
                let file_name = field
                    .file_name()
                    .and_then(|raw| raw.rsplit(['/', '\\']).next())
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or(DEFAULT_FILE_NAME)
                    .to_string();
                let content_type = match field.content_type() {
                    Some(content_type) => content_type.to_string(),
                    None => mime_guess::from_path(&file_name)
                        .first_or_octet_stream()
                        .to_string(),
                };
                let body = field.bytes().await.map_err(read_error)?;
                files.push(UploadedFile {
                    file_name,
                    content_type,
                    body,
                });
            }
            _ => {}
        }
    }

    if case_id.is_empty() {
        return Err(ApiError::bad_request("Case ID is required"));
    }
    if files.is_empty() {
        return Err(ApiError::bad_request("No files uploaded"));
    }
    Ok(UploadForm { case_id, files })
}

async fn upload(
    state: &GatewayState,
    form: UploadForm,
    naming: KeyNaming,
) -> Result<Vec<Document>, ApiError> {
    state
        .cascade
        .upload_documents(&form.case_id, form.files, naming)
        .await
        .map_err(|e| ApiError::from_service("Failed to upload file", e))
}

/// Single file under `file`, keyed by case id and file name.
pub async fn upload_document_handler(
    State(state): State<Arc<GatewayState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<String> {
    let form = read_upload_form(multipart, "file").await?;
    if form.files.len() > 1 {
        return Err(ApiError::bad_request("Only one file may be uploaded"));
    }
    let mut documents = upload(&state, form, KeyNaming::Single).await?;
    let document = documents
        .pop()
        .ok_or_else(|| ApiError::internal("Failed to upload file", "no document recorded"))?;
    respond(StatusCode::OK, "File uploaded successfully", document.file_url)
}

/// Files under `files`, answered with their URLs.
pub async fn upload_documents_handler(
    State(state): State<Arc<GatewayState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Vec<String>> {
    let form = read_upload_form(multipart, "files").await?;
    let documents = upload(&state, form, KeyNaming::Batch).await?;
    let urls = documents.into_iter().map(|d| d.file_url).collect();
    respond(StatusCode::OK, "Files uploaded successfully", urls)
}

/// Files under `files`, answered with their document records.
pub async fn create_documents_handler(
    State(state): State<Arc<GatewayState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Vec<Document>> {
    let form = read_upload_form(multipart, "files").await?;
    let documents = upload(&state, form, KeyNaming::Batch).await?;
    respond(StatusCode::OK, "Documents created successfully", documents)
}

async fn require_case(state: &GatewayState, case_id: &str) -> Result<(), ApiError> {
    state
        .repos
        .cases
        .get_by_id(case_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get case", e))?
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found("Case"))
}

pub async fn get_case_documents_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<CaseIdRequest>, JsonRejection>,
) -> ApiResult<Vec<Document>> {
    let req = parse_body(body)?;
    require_case(&state, &req.case_id).await?;
    let documents = state
        .repos
        .documents
        .get_by_case(&req.case_id)
        .await
        .map_err(|e| ApiError::internal("Failed to get documents", e))?;
    respond(StatusCode::OK, "Documents retrieved successfully", documents)
}

pub async fn get_document_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<IdRequest>, JsonRejection>,
) -> ApiResult<Document> {
    let req = parse_body(body)?;
    let document = state
        .repos
        .documents
        .get_by_id(&req.id)
        .await
        .map_err(|e| ApiError::internal("Failed to get document", e))?
        .ok_or_else(|| ApiError::not_found("Document"))?;
    respond(StatusCode::OK, "Document retrieved successfully", document)
}

pub async fn delete_document_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<IdRequest>, JsonRejection>,
) -> ApiResult<Document> {
    let req = parse_body(body)?;
    let document = state
        .cascade
        .delete_document(&req.id)
        .await
        .map_err(|e| ApiError::from_service("Failed to delete document", e))?
        .ok_or_else(|| ApiError::not_found("Document"))?;
    respond(StatusCode::OK, "Document deleted successfully", document)
}

pub async fn delete_case_documents_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<CaseIdRequest>, JsonRejection>,
) -> ApiResult<Vec<Document>> {
    let req = parse_body(body)?;
    require_case(&state, &req.case_id).await?;
    let documents = state
        .cascade
        .delete_case_documents(&req.case_id)
        .await
        .map_err(|e| ApiError::from_service("Failed to delete documents", e))?;
    respond(StatusCode::OK, "Documents deleted successfully", documents)
}

pub async fn update_relevancy_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<RelevancyRequest>, JsonRejection>,
) -> ApiResult<Document> {
    let req = parse_body(body)?;
    if req.file_url.is_empty() {
        return Err(ApiError::bad_request("File URL is required"));
    }
    let document = state
        .repos
        .documents
        .update_relevancy(&req.file_url, req.relevancy)
        .await
        .map_err(|e| ApiError::from_service("Failed to update relevancy", e))?
        .ok_or_else(|| ApiError::not_found("Document"))?;
    respond(StatusCode::OK, "Relevancy updated successfully", document)
}
