//! OCR pipeline tests against a mock completion service
//!
//! The OCR engine is replaced by a fixed-text recognizer; the completion API
//! is served by wiremock.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use mathmap_common::api::TokenSigner;
use mathmap_common::config::LlmConfig;
use mathmap_common::db::init_memory_database;
use mathmap_server::ocr::{
    AnswerBody, CompletionClient, OcrPipeline, PipelineOutcome, RecognizeError, Text, TextRecognizer,
};
use mathmap_server::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;
use wiremock::matchers::{body_partial_json, header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Enough of a PNG header for content sniffing
const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

const RAW_OCR_TEXT: &str = "3X4十1\n\n\n\n=?";
const CLEANED_TEXT: &str = "3×4+1\n\n=?";

const MODEL_REPLY: &str = r#"{
    "question": {
        "main": "计算",
        "sub_questions": [{"id": "1", "content": "3×4+1=?"}]
    },
    "analysis": {"1": "先乘后加"},
    "answer": {"1": "13"}
}"#;

/// Recognizer returning fixed text
struct FixedText(&'static str);

#[async_trait]
impl TextRecognizer for FixedText {
    async fn recognize(&self, _image: &[u8]) -> Result<String, RecognizeError> {
        Ok(self.0.to_string())
    }
}

fn llm_config(endpoint_url: String) -> LlmConfig {
    LlmConfig {
        api_key: "test-key".to_string(),
        endpoint_url,
        timeout_secs: 5,
        ..LlmConfig::default()
    }
}

fn pipeline_for(server: &MockServer) -> OcrPipeline {
    let client = CompletionClient::new(&llm_config(format!("{}{}", server.uri(), COMPLETIONS_PATH)))
        .expect("Should build completion client");
    OcrPipeline::new(Arc::new(FixedText(RAW_OCR_TEXT)), client)
}

fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ]
    })
}

fn expect_degraded(outcome: PipelineOutcome) -> mathmap_server::ocr::StructuredAnswer {
    match outcome {
        PipelineOutcome::Degraded { answer, .. } => answer,
        other => panic!("expected degraded outcome, got {:?}", other),
    }
}

// =============================================================================
// Pipeline Outcome Tests
// =============================================================================

#[tokio::test]
async fn test_successful_reply_is_reshaped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(header_matcher("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "deepseek-chat",
            "max_tokens": 2000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(MODEL_REPLY)))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = pipeline_for(&server).process_image(Some(PNG_BYTES)).await.unwrap();

    let answer = match outcome {
        PipelineOutcome::Solved(answer) => answer,
        other => panic!("expected solved outcome, got {:?}", other),
    };
    assert_eq!(answer.question, "计算");
    assert_eq!(answer.sub_questions.len(), 1);
    assert_eq!(answer.sub_questions[0].content, Text::from("3×4+1=?"));
    match &answer.answer {
        AnswerBody::PerPart(parts) => assert_eq!(parts["1"], Text::from("13")),
        other => panic!("unexpected answer shape: {:?}", other),
    }
}

#[tokio::test]
async fn test_prompt_contains_cleaned_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(MODEL_REPLY)))
        .mount(&server)
        .await;

    pipeline_for(&server).solve_text(RAW_OCR_TEXT).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains(CLEANED_TEXT));
    assert!(!prompt.contains("十"));
}

#[tokio::test]
async fn test_fenced_reply_is_accepted() {
    let server = MockServer::start().await;
    let fenced = format!("```json\n{}\n```", MODEL_REPLY);
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&fenced)))
        .mount(&server)
        .await;

    let outcome = pipeline_for(&server).solve_text(RAW_OCR_TEXT).await;
    assert_eq!(outcome.label(), "solved");
}

#[tokio::test]
async fn test_error_status_degrades_with_cleaned_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let answer = expect_degraded(pipeline_for(&server).solve_text(RAW_OCR_TEXT).await);

    assert_eq!(answer.question, CLEANED_TEXT);
    assert!(answer.sub_questions.is_empty());
    assert_eq!(answer.analysis, AnswerBody::text("API调用失败: 500"));
    assert_eq!(answer.answer, AnswerBody::text("请稍后重试"));
}

#[tokio::test]
async fn test_non_json_response_body_degrades() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let answer = expect_degraded(pipeline_for(&server).solve_text(RAW_OCR_TEXT).await);

    assert_eq!(answer.question, CLEANED_TEXT);
    assert_eq!(answer.analysis, AnswerBody::text("抱歉，解析AI响应时出错，请稍后重试。"));
    assert_eq!(answer.answer, AnswerBody::text("无法生成答案"));
}

#[tokio::test]
async fn test_unparsable_reply_content_degrades() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion_body("这道题的答案是 13。")),
        )
        .mount(&server)
        .await;

    let answer = expect_degraded(pipeline_for(&server).solve_text(RAW_OCR_TEXT).await);
    assert_eq!(answer.analysis, AnswerBody::text("抱歉，解析AI响应时出错，请稍后重试。"));
    assert!(answer.sub_questions.is_empty());
}

#[tokio::test]
async fn test_reply_missing_keys_degrades() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion_body(r#"{"answer": "13"}"#)),
        )
        .mount(&server)
        .await;

    let answer = expect_degraded(pipeline_for(&server).solve_text(RAW_OCR_TEXT).await);
    assert_eq!(answer.answer, AnswerBody::text("无法生成答案"));
}

#[tokio::test]
async fn test_unreachable_service_degrades() {
    // Nothing listens on the discard port
    let client = CompletionClient::new(&llm_config(
        "http://127.0.0.1:9/v1/chat/completions".to_string(),
    ))
    .unwrap();
    let pipeline = OcrPipeline::new(Arc::new(FixedText(RAW_OCR_TEXT)), client);

    let answer = expect_degraded(pipeline.solve_text(RAW_OCR_TEXT).await);

    assert_eq!(answer.question, CLEANED_TEXT);
    match &answer.analysis {
        AnswerBody::Whole(Text(text)) => assert!(text.starts_with("API调用出错: ")),
        other => panic!("unexpected analysis shape: {:?}", other),
    }
    assert_eq!(answer.answer, AnswerBody::text("请稍后重试"));
}

#[tokio::test]
async fn test_missing_and_invalid_images() {
    let server = MockServer::start().await;
    let pipeline = pipeline_for(&server);

    let outcome = pipeline.process_image(None).await.unwrap();
    assert_eq!(outcome, PipelineOutcome::ClientError("请选择要上传的图片".to_string()));

    let outcome = pipeline.process_image(Some(&[][..])).await.unwrap();
    assert_eq!(outcome.label(), "client-error");

    let err = pipeline.process_image(Some(&b"plain text"[..])).await.unwrap_err();
    assert!(matches!(err, RecognizeError::NotAnImage));

    // No completion call for rejected uploads
    assert!(server.received_requests().await.unwrap().is_empty());
}

// =============================================================================
// HTTP Endpoint Tests
// =============================================================================

async fn setup_app(server: &MockServer) -> (axum::Router, String) {
    let db = init_memory_database().await.expect("Should create database");
    let tokens = TokenSigner::new("test-secret", 300, 86_400);
    let state = AppState::new(db, tokens, pipeline_for(server));
    let app = build_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/users/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"username": "ocr", "email": "ocr@example.com", "password": "pw"}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    (app, body["access"].as_str().unwrap().to_string())
}

fn upload_request(token: &str) -> Request<Body> {
    let boundary = "mathmap-ocr-boundary";
    let mut payload = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"problem.png\"\r\n\
         Content-Type: image/png\r\n\r\n",
        b = boundary
    )
    .into_bytes();
    payload.extend_from_slice(PNG_BYTES);
    payload.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/ocr")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(payload))
        .unwrap()
}

#[tokio::test]
async fn test_upload_solved() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(MODEL_REPLY)))
        .mount(&server)
        .await;
    let (app, token) = setup_app(&server).await;

    let response = app.oneshot(upload_request(&token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ocr-outcome"], "solved");

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["question"], "计算");
    assert_eq!(body["sub_questions"][0]["id"], "1");
    assert_eq!(body["analysis"]["1"], "先乘后加");
    assert_eq!(body["answer"]["1"], "13");
}

#[tokio::test]
async fn test_upload_degraded_still_ok() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let (app, token) = setup_app(&server).await;

    let response = app.oneshot(upload_request(&token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ocr-outcome"], "degraded");

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["question"], CLEANED_TEXT);
    assert_eq!(body["sub_questions"], json!([]));
    assert_eq!(body["analysis"], "API调用失败: 503");
    assert_eq!(body["answer"], "请稍后重试");
}
