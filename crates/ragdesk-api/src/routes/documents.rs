use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use ragdesk_persist::{DocumentStore, KnowledgeBase, UserFile};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use super::StatusResponse;
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub status: String,
    pub filename: String,
    pub file_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub chunks: usize,
}

impl From<UserFile> for UploadResponse {
    fn from(file: UserFile) -> Self {
        Self {
            status: "success".to_string(),
            filename: file.filename,
            file_id: file.id,
            user_id: file.user_id,
            chunks: file.chunk_count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    #[schema(value_type = Object)]
    pub metadata: Value,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl From<UserFile> for DocumentSummary {
    fn from(file: UserFile) -> Self {
        Self {
            metadata: json!({
                "source": file.filename,
                "content_type": file.content_type,
                "chunk_count": file.chunk_count,
                "user_id": file.user_id,
            }),
            created_at: file.created_at.to_rfc3339(),
            id: file.id,
            filename: file.filename,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KbCheckResponse {
    pub has_personal_kb: bool,
}

/// Fields read from an upload form
#[derive(Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    user_id: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::BadRequest("file field has no filename".to_string()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                form.file = Some((filename, bytes.to_vec()));
            }
            Some("user_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read user_id: {}", e)))?;
                form.user_id = Some(text.trim().to_string());
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Upload a document into the user's own knowledge base
#[utoipa::path(
    post,
    path = "/upload_user_document",
    request_body(content = String, content_type = "multipart/form-data", description = "`file` and `user_id` fields"),
    responses(
        (status = 201, description = "Document stored", body = UploadResponse),
        (status = 400, description = "Missing fields, unsupported or empty file")
    ),
    tag = "documents"
)]
pub async fn upload_user_document(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let form = read_upload_form(multipart).await?;
    let user_id = form
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("user_id is required".to_string()))?;
    let (filename, bytes) = form
        .file
        .ok_or_else(|| ApiError::BadRequest("file is required".to_string()))?;

    let file = state
        .ingestor
        .ingest(&KnowledgeBase::user(&user_id), &filename, &bytes)
        .await?;

    Ok((StatusCode::CREATED, Json(file.into())))
}

/// Upload a document into the shared default knowledge base
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = String, content_type = "multipart/form-data", description = "`file` field"),
    responses(
        (status = 201, description = "Document stored", body = UploadResponse),
        (status = 400, description = "Missing, unsupported or empty file")
    ),
    tag = "documents"
)]
pub async fn upload_default_document(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let form = read_upload_form(multipart).await?;
    let (filename, bytes) = form
        .file
        .ok_or_else(|| ApiError::BadRequest("file is required".to_string()))?;

    let file = state
        .ingestor
        .ingest(&KnowledgeBase::Default, &filename, &bytes)
        .await?;

    Ok((StatusCode::CREATED, Json(file.into())))
}

#[utoipa::path(
    get,
    path = "/get_user_documents/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    responses((status = 200, description = "Documents uploaded by the user", body = DocumentListResponse)),
    tag = "documents"
)]
pub async fn get_user_documents(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<DocumentListResponse>> {
    let files = state.persist.list_user_files(&user_id).await?;
    Ok(Json(DocumentListResponse {
        documents: files.into_iter().map(DocumentSummary::from).collect(),
    }))
}

/// Delete one of the user's documents with all its chunks
#[utoipa::path(
    delete,
    path = "/delete_user_document/{user_id}/{document_id}",
    params(
        ("user_id" = String, Path, description = "User ID"),
        ("document_id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Document deleted", body = StatusResponse),
        (status = 404, description = "Document not found or not owned by the user")
    ),
    tag = "documents"
)]
pub async fn delete_user_document(
    State(state): State<Arc<AppState>>,
    Path((user_id, document_id)): Path<(String, String)>,
) -> ApiResult<Json<StatusResponse>> {
    let not_found =
        || ApiError::NotFound("Document not found or doesn't belong to user".to_string());

    let file = state
        .persist
        .get_user_file(&user_id, &document_id)
        .await?
        .ok_or_else(not_found)?;

    if !state.persist.delete_user_file(&user_id, &document_id).await? {
        return Err(not_found());
    }

    if !file.storage_path.is_empty() {
        if let Err(e) = tokio::fs::remove_file(&file.storage_path).await {
            tracing::warn!(path = %file.storage_path, error = %e, "Failed to remove stored upload");
        }
    }

    Ok(Json(StatusResponse::success("Document deleted")))
}

#[utoipa::path(
    get,
    path = "/check_user_kb/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    responses((status = 200, description = "Whether the user has a personal knowledge base", body = KbCheckResponse)),
    tag = "documents"
)]
pub async fn check_user_kb(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<KbCheckResponse>> {
    let has_personal_kb = state.persist.has_documents(&user_id).await?;
    Ok(Json(KbCheckResponse { has_personal_kb }))
}
