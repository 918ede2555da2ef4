//! Photographed math problem → structured question/analysis/answer

pub mod answer;
pub mod client;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod recognizer;

pub use answer::{AnswerBody, StructuredAnswer, SubQuestion, Text};
pub use client::{CompletionClient, CompletionError};
pub use normalize::normalize_ocr_text;
pub use pipeline::{OcrPipeline, PipelineOutcome};
pub use recognizer::{RecognizeError, TesseractCli, TextRecognizer};
