//! Text recognition for uploaded images
//!
//! Production recognition shells out to the Tesseract executable; the
//! [`TextRecognizer`] trait lets tests substitute a fake engine.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Recognition errors
#[derive(Debug, Error)]
pub enum RecognizeError {
    /// Uploaded bytes are not a known image format
    #[error("cannot identify image file")]
    NotAnImage,

    /// OCR executable missing
    #[error("OCR executable not found: {0}")]
    BinaryNotFound(String),

    /// OCR process could not be run
    #[error("Failed to execute OCR engine: {0}")]
    ExecutionError(String),

    /// OCR process ran but reported failure
    #[error("OCR failed: {0}")]
    RecognitionFailed(String),
}

/// Image → text
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize the text in an encoded image; the result is trimmed
    async fn recognize(&self, image: &[u8]) -> Result<String, RecognizeError>;
}

/// Check that the bytes sniff as an image; returns the MIME type
pub fn ensure_image(bytes: &[u8]) -> Result<&'static str, RecognizeError> {
    match infer::get(bytes) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => Ok(kind.mime_type()),
        _ => Err(RecognizeError::NotAnImage),
    }
}

/// Tesseract command-line engine
///
/// Runs `tesseract stdin stdout -l <language_hint>`.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary_path: PathBuf,
    language_hint: String,
}

impl TesseractCli {
    pub fn new(binary_path: PathBuf, language_hint: String) -> Self {
        Self {
            binary_path,
            language_hint,
        }
    }
}

#[async_trait]
impl TextRecognizer for TesseractCli {
    async fn recognize(&self, image: &[u8]) -> Result<String, RecognizeError> {
        tracing::debug!(
            binary = %self.binary_path.display(),
            language = %self.language_hint,
            bytes = image.len(),
            "Running OCR"
        );

        let mut child = Command::new(&self.binary_path)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.language_hint)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    RecognizeError::BinaryNotFound(self.binary_path.display().to_string())
                }
                _ => RecognizeError::ExecutionError(e.to_string()),
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RecognizeError::ExecutionError("stdin not captured".to_string()))?;
        let input = image.to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RecognizeError::ExecutionError(e.to_string()))?;

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(RecognizeError::ExecutionError(e.to_string())),
            Err(e) => return Err(RecognizeError::ExecutionError(e.to_string())),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognizeError::RecognitionFailed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
