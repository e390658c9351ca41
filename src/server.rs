//! HTTP surface.
//!
//! Thin by design: handlers parse the multipart upload, map client-input
//! rejections to 400, run the pipeline, and serialize the report. All
//! pipeline outcomes, including conversion and validation failures, are
//! HTTP 200 with the failure encoded structurally in the body.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::pipeline::{SourceFormat, ValidationPipeline, ValidationRequest, ValidationReport};
use crate::validator::SchemaSet;

const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<ValidationPipeline>,
}

/// FastAPI-compatible error body: `{"detail": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

pub fn create_app(pipeline: Arc<ValidationPipeline>) -> Router {
    Router::new()
        .route("/validate-xml", post(validate_xml))
        .route("/validate-psv", post(validate_psv))
        .route("/validate-mpc", post(validate_mpc))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { pipeline })
}

async fn validate_xml(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ValidationReport>, HandlerError> {
    validate_upload(state, multipart, SourceFormat::Xml).await
}

async fn validate_psv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ValidationReport>, HandlerError> {
    validate_upload(state, multipart, SourceFormat::Psv).await
}

async fn validate_mpc(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ValidationReport>, HandlerError> {
    validate_upload(state, multipart, SourceFormat::Mpc80Col).await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "ades-validator" }))
}

/// Shared handler body for the three format endpoints.
async fn validate_upload(
    state: AppState,
    multipart: Multipart,
    format: SourceFormat,
) -> Result<Json<ValidationReport>, HandlerError> {
    let upload = read_upload(multipart).await?;
    let schema_set: SchemaSet = upload
        .validation_type
        .parse()
        .map_err(reject)?;

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "validate",
        %request_id,
        filename = %upload.filename,
        validation_type = schema_set.as_str(),
    );

    let request = ValidationRequest {
        content: upload.content,
        filename: upload.filename,
        format,
        schema_set,
    };

    match state.pipeline.run(request).instrument(span).await {
        Ok(report) => Ok(Json(report)),
        Err(e) if e.is_client_fault() => Err(reject(e)),
        Err(e) => {
            tracing::error!(error = %e, "validation request failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    detail: format!("Validation error: {e}"),
                }),
            ))
        }
    }
}

struct Upload {
    filename: String,
    content: Vec<u8>,
    validation_type: String,
}

/// Pull the `file` part and optional `validation_type` field (default `all`)
/// out of the multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, HandlerError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut validation_type = "all".to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_request(e.to_string()))?;
            file = Some((filename, data.to_vec()));
        } else if name == "validation_type" {
            validation_type = field
                .text()
                .await
                .map_err(|e| bad_request(e.to_string()))?;
        }
    }

    let (filename, content) =
        file.ok_or_else(|| bad_request("Missing file upload".to_string()))?;

    Ok(Upload {
        filename,
        content,
        validation_type,
    })
}

fn bad_request(detail: String) -> HandlerError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { detail }))
}

fn reject(err: GatewayError) -> HandlerError {
    bad_request(err.to_string())
}
