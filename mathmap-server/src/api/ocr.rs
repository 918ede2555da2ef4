//! OCR upload endpoint

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::ocr::PipelineOutcome;
use crate::AppState;

/// Multipart field carrying the image
const IMAGE_FIELD: &str = "image";

/// Header telling clients whether the answer is real or a fallback
pub const OUTCOME_HEADER: HeaderName = HeaderName::from_static("x-ocr-outcome");

fn upload_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Pull the `image` field out of the upload, if any
async fn read_image(multipart: Result<Multipart, MultipartRejection>) -> ApiResult<Option<Bytes>> {
    let Ok(mut multipart) = multipart else {
        return Ok(None);
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(upload_error)?
    {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(upload_error)?;
            return Ok(Some(bytes));
        }
    }

    Ok(None)
}

/// POST /api/ocr
///
/// 200 with `{question, sub_questions, analysis, answer}` for solved and
/// degraded outcomes, 400 without an image, 500 when the image cannot be read.
pub async fn recognize(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let image = read_image(multipart).await?;

    let outcome = state
        .ocr
        .process_image(image.as_deref())
        .await
        .map_err(|e| ApiError::ImageProcessing(e.to_string()))?;

    let label = HeaderValue::from_static(outcome.label());
    match outcome {
        PipelineOutcome::Solved(answer) => {
            info!("OCR pipeline solved upload");
            Ok((StatusCode::OK, [(OUTCOME_HEADER, label)], Json(answer)).into_response())
        }
        PipelineOutcome::Degraded { answer, reason } => {
            warn!(reason = %reason, "OCR pipeline degraded");
            Ok((StatusCode::OK, [(OUTCOME_HEADER, label)], Json(answer)).into_response())
        }
        PipelineOutcome::ClientError(message) => Err(ApiError::BadRequest(message)),
    }
}
