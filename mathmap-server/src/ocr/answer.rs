//! Structured answer shape and model-reply parsing

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Reply could not be turned into a [`StructuredAnswer`]
#[derive(Debug, Error)]
pub enum ReplyParseError {
    #[error("reply is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("reply is missing required fields: {0}")]
    MissingFields(String),
}

/// Text that may arrive as a JSON string, number or boolean
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Text(pub String);

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(Text(s)),
            serde_json::Value::Number(n) => Ok(Text(n.to_string())),
            serde_json::Value::Bool(b) => Ok(Text(b.to_string())),
            other => Err(de::Error::custom(format!("expected text, found {}", other))),
        }
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text(s.to_string())
    }
}

/// One numbered part of the restated problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQuestion {
    pub id: Text,
    pub content: Text,
}

/// Per-sub-question text keyed by sub-question id, or a single text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerBody {
    PerPart(BTreeMap<String, Text>),
    Whole(Text),
}

impl AnswerBody {
    pub fn text(s: impl Into<String>) -> Self {
        AnswerBody::Whole(Text(s.into()))
    }
}

/// Pipeline result returned to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredAnswer {
    pub question: String,
    pub sub_questions: Vec<SubQuestion>,
    pub analysis: AnswerBody,
    pub answer: AnswerBody,
}

impl StructuredAnswer {
    /// Fallback that echoes the cleaned question text
    pub fn fallback(question: &str, analysis: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.to_string(),
            sub_questions: Vec::new(),
            analysis: AnswerBody::text(analysis),
            answer: AnswerBody::text(answer),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelQuestion {
    main: Text,
    sub_questions: Vec<SubQuestion>,
}

#[derive(Debug, Deserialize)]
struct ModelReply {
    question: ModelQuestion,
    analysis: AnswerBody,
    answer: AnswerBody,
}

/// Remove a surrounding Markdown code fence (```json ... ``` or ``` ... ```)
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(body) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    else {
        return trimmed;
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse the model's message content into the flat answer shape
pub fn parse_model_reply(content: &str) -> Result<StructuredAnswer, ReplyParseError> {
    let json: serde_json::Value = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| ReplyParseError::InvalidJson(e.to_string()))?;

    let reply: ModelReply =
        serde_json::from_value(json).map_err(|e| ReplyParseError::MissingFields(e.to_string()))?;

    Ok(StructuredAnswer {
        question: reply.question.main.0,
        sub_questions: reply.question.sub_questions,
        analysis: reply.analysis,
        answer: reply.answer,
    })
}
