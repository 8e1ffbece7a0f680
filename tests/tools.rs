//! Tool dispatch against a mock xAI endpoint

use grok_mcp::config::XaiConfig;
use grok_mcp::types::{CallToolRequest, CallToolResponse};
use grok_mcp::xai::XaiClient;
use grok_mcp::McpServer;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

const API_KEY: &str = "test-key";
const PATH: &str = "/v1/chat/completions";

async fn setup() -> (ServerGuard, McpServer) {
    let upstream = Server::new_async().await;
    let config = XaiConfig::new(API_KEY)
        .unwrap()
        .with_base_url(&format!("{}/v1", upstream.url()))
        .unwrap();
    let client = XaiClient::new(config).unwrap();
    (upstream, grok_mcp::tools::server(&client))
}

fn completion(message: Value) -> String {
    json!({
        "id": "cmpl-test",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "grok-3-mini-beta",
        "choices": [{"index": 0, "message": message, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
    })
    .to_string()
}

async fn mock_ok(upstream: &mut ServerGuard, expected_body: Value, message: Value) -> Mock {
    upstream
        .mock("POST", PATH)
        .match_header("authorization", "Bearer test-key")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(expected_body))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(message))
        .create_async()
        .await
}

async fn mock_unreached(upstream: &mut ServerGuard) -> Mock {
    upstream
        .mock("POST", PATH)
        .expect(0)
        .create_async()
        .await
}

async fn call(server: &McpServer, name: &str, arguments: Value) -> CallToolResponse {
    server
        .call_tool(CallToolRequest {
            name: name.to_string(),
            arguments: arguments.as_object().cloned(),
            meta: None,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn chat_completion_applies_defaults() {
    let (mut upstream, server) = setup().await;
    let mock = mock_ok(
        &mut upstream,
        json!({
            "messages": [{"role": "user", "content": "Hello"}],
            "model": "grok-3-mini-beta",
            "temperature": 1.0,
            "max_tokens": 16384
        }),
        json!({"role": "assistant", "content": "Hi there!"}),
    )
    .await;

    let result = call(&server, "chat_completion", json!({"messages": [{"role": "user", "content": "Hello"}]})).await;

    mock.assert_async().await;
    assert!(!result.is_error);
    assert_eq!(result.text(), Some("Hi there!"));
}

#[tokio::test]
async fn chat_completion_forwards_caller_options() {
    let (mut upstream, server) = setup().await;
    let mock = mock_ok(
        &mut upstream,
        json!({"model": "grok-3", "temperature": 0.2, "max_tokens": 50, "top_p": 0.9}),
        json!({"role": "assistant", "content": "ok"}),
    )
    .await;

    let result = call(
        &server,
        "chat_completion",
        json!({
            "messages": [{"role": "user", "content": "Hello"}],
            "model": "grok-3",
            "temperature": 0.2,
            "max_tokens": 50,
            "top_p": 0.9
        }),
    )
    .await;

    mock.assert_async().await;
    assert_eq!(result.text(), Some("ok"));
}

#[tokio::test]
async fn chat_completion_without_messages_never_calls_upstream() {
    let (mut upstream, server) = setup().await;
    let mock = mock_unreached(&mut upstream).await;

    for arguments in [json!({}), json!({"messages": []})] {
        let result = call(&server, "chat_completion", arguments).await;
        assert!(result.is_error);
        assert_eq!(result.text(), Some("Error: messages must be a non-empty array"));
    }

    let result = call(&server, "chat_completion", json!({"messages": "hello"})).await;
    assert!(result.is_error);
    assert!(result.text().unwrap().starts_with("Error: Invalid arguments: "));

    mock.assert_async().await;
}

#[tokio::test]
async fn image_understanding_sends_data_uri() {
    let (mut upstream, server) = setup().await;
    let mock = mock_ok(
        &mut upstream,
        json!({
            "model": "grok-2-vision-latest",
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,ABCD", "detail": "high"}},
                    {"type": "text", "text": "What is this?"}
                ]
            }]
        }),
        json!({"role": "assistant", "content": "A cat."}),
    )
    .await;

    let result = call(
        &server,
        "image_understanding",
        json!({"prompt": "What is this?", "base64_image": "ABCD"}),
    )
    .await;

    mock.assert_async().await;
    assert_eq!(result.text(), Some("A cat."));
}

#[tokio::test]
async fn image_understanding_prefers_image_url() {
    let (mut upstream, server) = setup().await;
    let mock = mock_ok(
        &mut upstream,
        json!({
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "image_url", "image_url": {"url": "https://example.com/cat.jpg", "detail": "high"}},
                    {"type": "text", "text": "Describe"}
                ]
            }]
        }),
        json!({"role": "assistant", "content": "A cat on a mat."}),
    )
    .await;

    let result = call(
        &server,
        "image_understanding",
        json!({"prompt": "Describe", "image_url": "https://example.com/cat.jpg", "base64_image": "ABCD"}),
    )
    .await;

    mock.assert_async().await;
    assert!(!result.is_error);
}

#[tokio::test]
async fn image_understanding_without_image_never_calls_upstream() {
    let (mut upstream, server) = setup().await;
    let mock = mock_unreached(&mut upstream).await;

    let result = call(&server, "image_understanding", json!({"prompt": "Describe"})).await;

    mock.assert_async().await;
    assert!(result.is_error);
    assert_eq!(
        result.text(),
        Some("Error: either image_url or base64_image is required")
    );
}

fn weather_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": "get_weather",
            "description": "Current weather for a city",
            "parameters": {"type": "object", "properties": {"city": {"type": "string"}}, "required": ["city"]}
        }
    })
}

#[tokio::test]
async fn function_calling_returns_tool_calls_as_json() {
    let (mut upstream, server) = setup().await;
    let mock = mock_ok(
        &mut upstream,
        json!({"model": "grok-3-mini-beta", "tools": [weather_tool()], "tool_choice": "auto"}),
        json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "get_weather", "arguments": "{\"city\":\"Paris\"}"}
            }]
        }),
    )
    .await;

    let result = call(
        &server,
        "function_calling",
        json!({"messages": [{"role": "user", "content": "Weather in Paris?"}], "tools": [weather_tool()]}),
    )
    .await;

    mock.assert_async().await;
    assert!(!result.is_error);
    let report: Value = serde_json::from_str(result.text().unwrap()).unwrap();
    assert_eq!(report["message"]["tool_calls"][0]["id"], "call_1");
    assert_eq!(report["usage"]["total_tokens"], 16);
}

#[tokio::test]
async fn function_calling_returns_plain_content_without_tool_calls() {
    let (mut upstream, server) = setup().await;
    let mock = mock_ok(
        &mut upstream,
        json!({"tool_choice": "none"}),
        json!({"role": "assistant", "content": "It is sunny."}),
    )
    .await;

    let result = call(
        &server,
        "function_calling",
        json!({
            "messages": [{"role": "user", "content": "Weather in Paris?"}],
            "tools": [weather_tool()],
            "tool_choice": "none"
        }),
    )
    .await;

    mock.assert_async().await;
    assert_eq!(result.text(), Some("It is sunny."));
}

#[tokio::test]
async fn upstream_errors_become_error_results() {
    let (mut upstream, server) = setup().await;
    let mock = upstream
        .mock("POST", PATH)
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
        .create_async()
        .await;

    let result = call(&server, "chat_completion", json!({"messages": [{"role": "user", "content": "Hello"}]})).await;

    mock.assert_async().await;
    assert!(result.is_error);
    let text = result.text().unwrap();
    assert!(text.starts_with("Error: "), "{text}");
    assert!(text.contains("Incorrect API key provided"));
}

#[tokio::test]
async fn server_errors_become_error_results() {
    let (mut upstream, server) = setup().await;
    let mock = upstream
        .mock("POST", PATH)
        .with_status(503)
        .with_body("overloaded")
        .create_async()
        .await;

    let result = call(
        &server,
        "image_understanding",
        json!({"prompt": "Describe", "image_url": "https://example.com/cat.jpg"}),
    )
    .await;

    mock.assert_async().await;
    assert!(result.is_error);
    assert_eq!(
        result.text(),
        Some("Error: xAI API error (503 Service Unavailable): overloaded")
    );
}

#[tokio::test]
async fn empty_choices_become_error_results() {
    let (mut upstream, server) = setup().await;
    let mock = upstream
        .mock("POST", PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"cmpl-empty","choices":[]}"#)
        .create_async()
        .await;

    let result = call(&server, "chat_completion", json!({"messages": [{"role": "user", "content": "Hello"}]})).await;

    mock.assert_async().await;
    assert!(result.is_error);
    assert_eq!(result.text(), Some("Error: xAI response contained no choices"));
}

#[tokio::test]
async fn connection_failures_become_error_results() {
    // Bind then drop a listener so the port is known to be closed.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let config = XaiConfig::new(API_KEY)
        .unwrap()
        .with_base_url(&format!("http://127.0.0.1:{port}/v1"))
        .unwrap();
    let server = grok_mcp::tools::server(&XaiClient::new(config).unwrap());

    let result = call(&server, "chat_completion", json!({"messages": [{"role": "user", "content": "Hello"}]})).await;

    assert!(result.is_error);
    let text = result.text().unwrap();
    assert!(text.starts_with("Error: request to xAI failed"), "{text}");
}
