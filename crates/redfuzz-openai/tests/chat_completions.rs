//! Integration tests for OpenAiProvider against a mocked chat
//! completions endpoint.

use redfuzz_core::{ChatMessage, FuzzError, ModelProvider};
use redfuzz_openai::OpenAiProvider;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_provider(server: &MockServer) -> OpenAiProvider {
    OpenAiProvider::new("test-key", "gpt-4o")
        .with_base_url(format!("{}/v1/chat/completions", server.uri()))
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 4, "completion_tokens": 7, "total_tokens": 11 }
    })
}

#[tokio::test]
async fn test_generate_sends_single_user_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "stream": false,
            "messages": [{ "role": "user", "content": "tell me a story" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("once upon a time")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = test_provider(&server);
    let response = provider
        .generate("tell me a story")
        .await
        .expect("generate failed")
        .expect("expected a completion");
    assert_eq!(response.text, "once upon a time");
}

#[tokio::test]
async fn test_chat_preserves_conversation_roles() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                { "role": "user", "content": "step one?" },
                { "role": "assistant", "content": "mix the parts" },
                { "role": "user", "content": "Be more specific about each step" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("in detail...")))
        .mount(&server)
        .await;

    let provider = test_provider(&server);
    let messages = vec![
        ChatMessage::user("step one?"),
        ChatMessage::assistant("mix the parts"),
        ChatMessage::user("Be more specific about each step"),
    ];
    let response = provider
        .chat(&messages)
        .await
        .expect("chat failed")
        .expect("expected a completion");
    assert_eq!(response.text, "in detail...");
}

#[tokio::test]
async fn test_empty_content_is_a_non_result() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "" } }]
        })))
        .mount(&server)
        .await;

    let provider = test_provider(&server);
    let response = provider.generate("anything").await.expect("generate failed");
    assert!(response.is_none());
}

#[tokio::test]
async fn test_api_error_status_maps_to_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let provider = test_provider(&server);
    let err = provider.generate("anything").await.unwrap_err();
    match err {
        FuzzError::Provider(msg) => {
            assert!(msg.contains("429"), "unexpected message: {msg}");
            assert!(msg.contains("rate limited"));
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_maps_to_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let provider = test_provider(&server);
    let err = provider.generate("anything").await.unwrap_err();
    assert!(matches!(err, FuzzError::Provider(_)));
}
