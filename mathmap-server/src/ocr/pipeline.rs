//! Image → structured answer
//!
//! Stages: image check, text extraction, normalization, prompt, completion
//! call, reply parsing. Failures of the completion service never escape:
//! they become [`PipelineOutcome::Degraded`] results carrying the cleaned text.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::answer::{parse_model_reply, StructuredAnswer};
use super::client::{CompletionClient, CompletionError};
use super::normalize::normalize_ocr_text;
use super::prompt::build_prompt;
use super::recognizer::{ensure_image, RecognizeError, TextRecognizer};

/// Message for an upload without an image
pub const MISSING_IMAGE_MESSAGE: &str = "请选择要上传的图片";

/// Placeholder answer when the completion service is unavailable
pub const RETRY_LATER_ANSWER: &str = "请稍后重试";

/// Analysis text when the model reply cannot be parsed
pub const PARSE_FAILURE_ANALYSIS: &str = "抱歉，解析AI响应时出错，请稍后重试。";

/// Placeholder answer when the model reply cannot be parsed
pub const PARSE_FAILURE_ANSWER: &str = "无法生成答案";

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Model reply parsed and reshaped
    Solved(StructuredAnswer),

    /// Completion service failed; `answer` is a well-formed fallback
    Degraded {
        answer: StructuredAnswer,
        reason: String,
    },

    /// Caller supplied unusable input
    ClientError(String),
}

impl PipelineOutcome {
    /// Label used in the `x-ocr-outcome` response header
    pub fn label(&self) -> &'static str {
        match self {
            PipelineOutcome::Solved(_) => "solved",
            PipelineOutcome::Degraded { .. } => "degraded",
            PipelineOutcome::ClientError(_) => "client-error",
        }
    }
}

/// OCR + completion pipeline
#[derive(Clone)]
pub struct OcrPipeline {
    recognizer: Arc<dyn TextRecognizer>,
    client: CompletionClient,
}

impl std::fmt::Debug for OcrPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrPipeline")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl OcrPipeline {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, client: CompletionClient) -> Self {
        Self { recognizer, client }
    }

    /// Run the whole pipeline on an uploaded image
    ///
    /// `None` (or an empty upload) is a client error. Unreadable images and
    /// OCR engine failures are returned as `Err`.
    pub async fn process_image(&self, image: Option<&[u8]>) -> Result<PipelineOutcome, RecognizeError> {
        let image = match image {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Ok(PipelineOutcome::ClientError(MISSING_IMAGE_MESSAGE.to_string())),
        };

        let mime = ensure_image(image)?;
        debug!(mime, bytes = image.len(), "Image accepted");

        let raw_text = self.recognizer.recognize(image).await?;
        info!(chars = raw_text.chars().count(), "OCR text extracted");

        Ok(self.solve_text(&raw_text).await)
    }

    /// Normalize recognized text and ask the completion service to solve it
    pub async fn solve_text(&self, raw_text: &str) -> PipelineOutcome {
        let cleaned = normalize_ocr_text(raw_text);
        debug!(text = %cleaned, "Normalized OCR text");

        let content = match self.client.complete(&build_prompt(&cleaned)).await {
            Ok(content) => content,
            Err(CompletionError::Status { status, body }) => {
                warn!(status, body = %body, "Completion service returned an error status");
                return PipelineOutcome::Degraded {
                    answer: StructuredAnswer::fallback(
                        &cleaned,
                        format!("API调用失败: {}", status),
                        RETRY_LATER_ANSWER,
                    ),
                    reason: format!("completion service returned status {}", status),
                };
            }
            Err(CompletionError::Network(err)) => {
                warn!(error = %err, "Completion request failed");
                return PipelineOutcome::Degraded {
                    answer: StructuredAnswer::fallback(
                        &cleaned,
                        format!("API调用出错: {}", err),
                        RETRY_LATER_ANSWER,
                    ),
                    reason: format!("completion request failed: {}", err),
                };
            }
            Err(CompletionError::MalformedResponse(err)) => {
                warn!(error = %err, "Completion response malformed");
                return parse_failure(&cleaned, err);
            }
        };

        match parse_model_reply(&content) {
            Ok(answer) => {
                info!(sub_questions = answer.sub_questions.len(), "Model reply parsed");
                PipelineOutcome::Solved(answer)
            }
            Err(err) => {
                warn!(error = %err, "Model reply could not be parsed");
                parse_failure(&cleaned, err.to_string())
            }
        }
    }
}

fn parse_failure(cleaned: &str, reason: String) -> PipelineOutcome {
    PipelineOutcome::Degraded {
        answer: StructuredAnswer::fallback(cleaned, PARSE_FAILURE_ANALYSIS, PARSE_FAILURE_ANSWER),
        reason,
    }
}
