//! 推理客户端测试（wiremock 模拟推理服务）

mod common;

use base64::{engine::general_purpose, Engine as _};
use common::setup_tracing;
use exam_grader::clients::{ModelInvoker, ModelNames, OllamaClient, OpenAiClient};
use exam_grader::error::GradeError;
use exam_grader::models::{ModelCallSpec, ModelKind};
use exam_grader::{App, Config, GradingRequest, InferenceBackend};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn model_names() -> ModelNames {
    ModelNames {
        vision: "vision-test".to_string(),
        text: "text-test".to_string(),
    }
}

fn ollama_reply(content: &str) -> JsonValue {
    json!({
        "model": "text-test",
        "created_at": "2024-05-01T10:00:00Z",
        "message": { "role": "assistant", "content": content },
        "done": true
    })
}

// ========== Ollama ==========

#[tokio::test]
async fn test_ollama_text_call_reads_message_content() {
    // --- 1. Arrange ---
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({ "model": "text-test", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama_reply(
            "  {\"grade\": 3, \"reason\": \"ok\"}\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::with_base_url(server.uri(), model_names()).unwrap();
    let spec = ModelCallSpec::new(ModelKind::Text, "grade it", Duration::from_secs(5));

    // --- 2. Act ---
    let response = client.invoke(&spec).await.unwrap();

    // --- 3. Assert ---
    assert_eq!(response.content, "{\"grade\": 3, \"reason\": \"ok\"}");

    let requests = server.received_requests().await.unwrap();
    let body: JsonValue = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "grade it");
    assert!(body["messages"][0].get("images").is_none());
}

#[tokio::test]
async fn test_ollama_vision_call_sends_base64_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({ "model": "vision-test" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama_reply("el yazısı")))
        .mount(&server)
        .await;

    let client = OllamaClient::with_base_url(format!("{}/", server.uri()), model_names()).unwrap();
    let image = vec![0xFF, 0xD8, 0xFF, 0x00, 0x42];
    let spec = ModelCallSpec::new(ModelKind::Vision, "transcribe", Duration::from_secs(5))
        .with_image(image.clone());

    let response = client.invoke(&spec).await.unwrap();
    assert_eq!(response.content, "el yazısı");

    let requests = server.received_requests().await.unwrap();
    let body: JsonValue = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body["messages"][0]["images"][0],
        general_purpose::STANDARD.encode(&image)
    );
}

#[tokio::test]
async fn test_ollama_error_status_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&server)
        .await;

    let client = OllamaClient::with_base_url(server.uri(), model_names()).unwrap();
    let spec = ModelCallSpec::new(ModelKind::Text, "p", Duration::from_secs(5));

    let err = client.invoke(&spec).await.unwrap_err();
    match &err {
        GradeError::ModelUnavailable { model, reason } => {
            assert_eq!(model, "text-test");
            assert!(reason.contains("500"));
            assert!(reason.contains("model crashed"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.is_service_unavailable());
}

#[tokio::test]
async fn test_ollama_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ollama_reply("{}"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::with_base_url(server.uri(), model_names()).unwrap();
    let spec = ModelCallSpec::new(ModelKind::Text, "p", Duration::from_millis(200));

    let err = client.invoke(&spec).await.unwrap_err();
    assert!(matches!(err, GradeError::ModelTimeout { .. }));
}

#[tokio::test]
async fn test_ollama_unreachable_is_unavailable() {
    // 端口 1 上没有服务
    let client = OllamaClient::with_base_url("http://127.0.0.1:1", model_names()).unwrap();
    let spec = ModelCallSpec::new(ModelKind::Text, "p", Duration::from_secs(5));

    let err = client.invoke(&spec).await.unwrap_err();
    assert!(matches!(err, GradeError::ModelUnavailable { .. }));
}

#[tokio::test]
async fn test_ollama_unreadable_envelope_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = OllamaClient::with_base_url(server.uri(), model_names()).unwrap();
    let spec = ModelCallSpec::new(ModelKind::Text, "p", Duration::from_secs(5));

    let err = client.invoke(&spec).await.unwrap_err();
    assert!(matches!(err, GradeError::ModelUnavailable { .. }));
}

#[tokio::test]
async fn test_ollama_readiness_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "text-test" }]
        })))
        .mount(&server)
        .await;

    // 视觉模型缺失只会告警
    let client = OllamaClient::with_base_url(server.uri(), model_names()).unwrap();
    assert!(client.check_ready().await.is_ok());

    let down = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&down)
        .await;
    let client = OllamaClient::with_base_url(down.uri(), model_names()).unwrap();
    assert!(client.check_ready().await.unwrap_err().is_service_unavailable());
}

#[tokio::test]
async fn test_app_grades_text_against_mock_ollama() {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama_reply(
            "```json\n{\"grade\":\"8/10\",\"reason\":\"ok\"}\n```",
        )))
        .mount(&server)
        .await;

    let config = Config {
        ollama_api_url: server.uri(),
        ..Config::default()
    };
    let app = App::initialize(config).await.unwrap();

    let outcome = app
        .grade_from_text(&GradingRequest::from_text("Q", "R", None, "A"))
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&outcome.result).unwrap(),
        json!({ "grade": "8/10", "reason": "ok" })
    );
}

#[tokio::test]
async fn test_app_initialize_fails_when_service_is_down() {
    let config = Config {
        ollama_api_url: "http://127.0.0.1:1".to_string(),
        ..Config::default()
    };
    let err = App::initialize(config).await.unwrap_err();
    assert!(err.is_service_unavailable());
}

// ========== OpenAI 兼容接口 ==========

fn openai_config(base_url: String) -> Config {
    Config {
        inference_backend: InferenceBackend::OpenAi,
        llm_api_base_url: base_url,
        llm_api_key: "sk-test".to_string(),
        vision_model_name: "vision-test".to_string(),
        text_model_name: "text-test".to_string(),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_openai_client_reads_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": "text-test" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1714557600,
            "model": "text-test",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": " {\"grade\":2} " },
                "finish_reason": "stop",
                "logprobs": null
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        })))
        .mount(&server)
        .await;

    let client = OpenAiClient::new(&openai_config(format!("{}/v1", server.uri()))).unwrap();
    let spec = ModelCallSpec::new(ModelKind::Text, "grade", Duration::from_secs(5));

    let response = client.invoke(&spec).await.unwrap();
    assert_eq!(response.content, "{\"grade\":2}");
}

#[tokio::test]
async fn test_openai_readiness_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiClient::new(&openai_config(format!("{}/v1", server.uri()))).unwrap();
    assert!(client.check_ready().await.is_ok());
}

#[tokio::test]
async fn test_openai_readiness_reads_model_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                { "id": "text-test", "object": "model", "owned_by": "local" }
            ]
        })))
        .mount(&server)
        .await;

    // 视觉模型缺失只会告警
    let client = OpenAiClient::new(&openai_config(format!("{}/v1", server.uri()))).unwrap();
    assert!(client.check_ready().await.is_ok());

    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&broken)
        .await;
    let client = OpenAiClient::new(&openai_config(format!("{}/v1", broken.uri()))).unwrap();
    assert!(client.check_ready().await.unwrap_err().is_service_unavailable());
}
