//! Build API Handlers
//!
//! HTTP trigger of the build pipeline.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use locci_core::dto::build::{BuildResponse, BuildStatus, StartBuild};
use std::sync::Arc;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::pipeline_service::PipelineResult;

/// POST /build
/// Run the pipeline for a repository branch
///
/// Answers 200 when every stage succeeded and 207 when the image was
/// published but export or notification failed. The run is a task of its
/// own, so a client hanging up does not abort it halfway.
pub async fn start_build(
    State(state): State<AppState>,
    payload: Result<Json<StartBuild>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    tracing::info!("Build requested for {}#{}", req.repository, req.branch);

    let pipeline = Arc::clone(&state.pipeline);
    let result = tokio::spawn(async move { pipeline.start_build(req).await })
        .await
        .map_err(|e| ApiError::InternalError(format!("Pipeline task failed: {}", e)))??;

    match result {
        PipelineResult::Completed {
            event,
            image,
            export_path,
        } => {
            let body = BuildResponse {
                status: BuildStatus::Completed,
                image: image.reference,
                data: Some(event),
                export_path: Some(export_path.display().to_string()),
                errors: Vec::new(),
            };
            Ok((StatusCode::OK, Json(body)).into_response())
        }
        PipelineResult::PartialSuccess {
            event,
            image,
            export_path,
            failures,
        } => {
            let body = BuildResponse {
                status: BuildStatus::PartialSuccess,
                image: image.reference,
                data: Some(event),
                export_path: export_path.map(|p| p.display().to_string()),
                errors: failures.iter().map(|f| f.to_failure()).collect(),
            };
            Ok((StatusCode::MULTI_STATUS, Json(body)).into_response())
        }
        PipelineResult::Failed { error, .. } => Err(error.into()),
    }
}
