// Unit tests for the OpenAI provider

mod provider_tests {
    use crate::OpenAiProvider;
    use redfuzz_core::ModelProvider;

    #[test]
    fn test_provider_with_api_key() {
        let provider = OpenAiProvider::new("test-key", "gpt-4o");
        assert_eq!(provider.qualified_name(), "openai/gpt-4o");
    }

    #[test]
    fn test_provider_with_base_url() {
        let provider = OpenAiProvider::new("test-key", "llama3")
            .with_base_url("http://localhost:11434/v1/chat/completions");
        assert_eq!(
            provider.api_url(),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(provider.qualified_name(), "openai/llama3");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let provider = OpenAiProvider::new("sk-secret-value", "gpt-4o");
        let debug = format!("{provider:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret-value"));
    }
}

mod wire_tests {
    use crate::{ChatRequest, ChatResponse, WireMessage};

    #[test]
    fn test_request_omits_unset_parameters() {
        let request = ChatRequest {
            model: "gpt-4o".to_string(),
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: "hello".to_string(),
            }],
            temperature: None,
            max_tokens: None,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["stream"], serde_json::json!(false));
    }

    #[test]
    fn test_response_tolerates_missing_usage() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"hi"},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hi"));
    }
}
