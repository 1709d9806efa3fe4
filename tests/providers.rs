//! Backend adapter tests against mocked HTTP APIs.

use ai_warp::{
    chunk_callback, AiProvider, AiProviderConfig, AzureProvider, ByteStream, ChatTurn,
    MistralProvider, OllamaProvider, OpenAiProvider, ProviderFactory,
};
use futures_util::StreamExt;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MOCK_CONTENT_RESPONSE: &str = "a complete answer";
const MOCK_CHUNKS: [&str; 3] = ["chunk1", "chunk2", "chunk3"];

fn completion_body(content: &str) -> String {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

/// SSE body in the chat-completions chunk format, `[DONE]`-terminated.
fn sse_chunk_body(chunks: &[&str]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        let data = json!({
            "id": "chatcmpl-123",
            "object": "chat.completion.chunk",
            "choices": [{
                "index": 0,
                "delta": { "role": "assistant", "content": chunk },
                "finish_reason": null
            }]
        });
        body.push_str(&format!("data: {data}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

/// NDJSON body in Ollama's chat format; the last line carries `done`.
fn ndjson_body(chunks: &[&str]) -> String {
    let mut body = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let line = json!({
            "model": "llama2",
            "message": { "role": "assistant", "content": chunk },
            "done": i == chunks.len() - 1
        });
        body.push_str(&format!("{line}\n"));
    }
    body
}

fn expected_stream_body(chunks: &[&str]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("event: content\ndata: {{\"response\":\"{chunk}\"}}\n\n"))
        .collect()
}

async fn collect_body(stream: ByteStream) -> String {
    stream
        .map(|result| String::from_utf8(result.unwrap().to_vec()).unwrap())
        .collect()
        .await
}

/// Messages of the most recent request the mock server received.
async fn last_request_messages(server: &MockServer) -> Vec<Value> {
    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests.last().unwrap().body).unwrap();
    body["messages"].as_array().unwrap().clone()
}

fn assert_history_translation(messages: &[Value]) {
    let rendered: Vec<(&str, &str)> = messages
        .iter()
        .map(|m| {
            (
                m["role"].as_str().unwrap(),
                m["content"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        rendered,
        vec![("user", "a"), ("assistant", "b"), ("user", "c")]
    );
}

async fn mock_openai_like(path_str: &str, stream_body: String, buffered_body: String) -> MockServer {
    let server = MockServer::start().await;

    // One endpoint serves both modes; dispatch on the `stream` flag the way
    // the real APIs do.
    Mock::given(method("POST"))
        .and(path(path_str))
        .and(wiremock::matchers::body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(stream_body, "text/event-stream"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(200).set_body_raw(buffered_body, "application/json"))
        .mount(&server)
        .await;

    server
}

// ---------------------------------------------------------------- OpenAI

async fn openai_provider(server: &MockServer) -> OpenAiProvider {
    OpenAiProvider::with_base_url("gpt-4o-mini", "test-key", format!("{}/v1", server.uri()))
        .unwrap()
}

#[tokio::test]
async fn test_openai_ask() {
    let server = mock_openai_like(
        "/v1/chat/completions",
        sse_chunk_body(&MOCK_CHUNKS),
        completion_body(MOCK_CONTENT_RESPONSE),
    )
    .await;
    let provider = openai_provider(&server).await;

    let response = provider.ask("asd", None).await.unwrap();
    assert_eq!(response, MOCK_CONTENT_RESPONSE);
}

#[tokio::test]
async fn test_openai_ask_stream() {
    let server = mock_openai_like(
        "/v1/chat/completions",
        sse_chunk_body(&MOCK_CHUNKS),
        completion_body(MOCK_CONTENT_RESPONSE),
    )
    .await;
    let provider = openai_provider(&server).await;

    let stream = provider.ask_stream("asd", None, None).await.unwrap();
    assert_eq!(collect_body(stream).await, expected_stream_body(&MOCK_CHUNKS));
}

#[tokio::test]
async fn test_openai_chat_history() {
    let server = mock_openai_like(
        "/v1/chat/completions",
        sse_chunk_body(&MOCK_CHUNKS),
        completion_body(MOCK_CONTENT_RESPONSE),
    )
    .await;
    let provider = openai_provider(&server).await;

    let history = vec![ChatTurn::new("a", "b")];
    provider.ask("c", Some(&history)).await.unwrap();

    assert_history_translation(&last_request_messages(&server).await);
}

#[tokio::test]
async fn test_openai_stream_transform() {
    let server = mock_openai_like(
        "/v1/chat/completions",
        sse_chunk_body(&MOCK_CHUNKS),
        completion_body(MOCK_CONTENT_RESPONSE),
    )
    .await;
    let provider = openai_provider(&server).await;

    let transform = chunk_callback(|chunk: String| async move { chunk.to_uppercase() });
    let stream = provider
        .ask_stream("asd", Some(transform), None)
        .await
        .unwrap();

    assert_eq!(
        collect_body(stream).await,
        expected_stream_body(&["CHUNK1", "CHUNK2", "CHUNK3"])
    );
}

#[tokio::test]
async fn test_openai_stream_zero_choices_is_one_error_event() {
    let body = format!(
        "data: {}\n\ndata: [DONE]\n\n",
        json!({ "id": "chatcmpl-123", "choices": [] })
    );
    let server = mock_openai_like(
        "/v1/chat/completions",
        body,
        completion_body(MOCK_CONTENT_RESPONSE),
    )
    .await;
    let provider = openai_provider(&server).await;

    let stream = provider.ask_stream("asd", None, None).await.unwrap();
    assert_eq!(
        collect_body(stream).await,
        "event: error\ndata: {\"code\":\"NO_CONTENT\",\"message\":\"OpenAI didn't return any content\"}\n\n"
    );
}

#[tokio::test]
async fn test_openai_ask_zero_choices_is_no_content_error() {
    let server = mock_openai_like(
        "/v1/chat/completions",
        sse_chunk_body(&MOCK_CHUNKS),
        json!({ "id": "chatcmpl-123", "choices": [] }).to_string(),
    )
    .await;
    let provider = openai_provider(&server).await;

    let error = provider.ask("asd", None).await.unwrap_err();
    assert_eq!(error.code(), "NO_CONTENT");
    assert_eq!(error.to_string(), "OpenAI didn't return any content");
}

// ---------------------------------------------------------------- Mistral

#[tokio::test]
async fn test_mistral_ask() {
    let server = mock_openai_like(
        "/v1/chat/completions",
        sse_chunk_body(&MOCK_CHUNKS),
        completion_body(MOCK_CONTENT_RESPONSE),
    )
    .await;
    let provider =
        MistralProvider::with_base_url("open-mistral-7b", "key", format!("{}/v1", server.uri()))
            .unwrap();

    assert_eq!(provider.ask("asd", None).await.unwrap(), MOCK_CONTENT_RESPONSE);
}

#[tokio::test]
async fn test_mistral_ask_stream_is_single_shot() {
    let server = mock_openai_like(
        "/v1/chat/completions",
        sse_chunk_body(&MOCK_CHUNKS),
        completion_body(MOCK_CONTENT_RESPONSE),
    )
    .await;
    let provider =
        MistralProvider::with_base_url("open-mistral-7b", "key", format!("{}/v1", server.uri()))
            .unwrap();

    let stream = provider.ask_stream("asd", None, None).await.unwrap();
    assert_eq!(
        collect_body(stream).await,
        expected_stream_body(&[MOCK_CONTENT_RESPONSE])
    );
}

#[tokio::test]
async fn test_mistral_chat_history() {
    let server = mock_openai_like(
        "/v1/chat/completions",
        sse_chunk_body(&MOCK_CHUNKS),
        completion_body(MOCK_CONTENT_RESPONSE),
    )
    .await;
    let provider =
        MistralProvider::with_base_url("open-mistral-7b", "key", format!("{}/v1", server.uri()))
            .unwrap();

    let history = vec![ChatTurn::new("a", "b")];
    provider.ask("c", Some(&history)).await.unwrap();

    assert_history_translation(&last_request_messages(&server).await);
}

// ---------------------------------------------------------------- Ollama

async fn ollama_mock() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(wiremock::matchers::body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(ndjson_body(&MOCK_CHUNKS), "application/json"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            json!({
                "model": "llama2",
                "message": { "role": "assistant", "content": MOCK_CONTENT_RESPONSE },
                "done": true
            })
            .to_string(),
            "application/json",
        ))
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn test_ollama_ask() {
    let server = ollama_mock().await;
    let provider = OllamaProvider::new(server.uri(), "llama2").unwrap();

    assert_eq!(provider.ask("asd", None).await.unwrap(), MOCK_CONTENT_RESPONSE);
}

#[tokio::test]
async fn test_ollama_ask_stream() {
    let server = ollama_mock().await;
    let provider = OllamaProvider::new(server.uri(), "llama2").unwrap();

    let stream = provider.ask_stream("asd", None, None).await.unwrap();
    assert_eq!(collect_body(stream).await, expected_stream_body(&MOCK_CHUNKS));
}

#[tokio::test]
async fn test_ollama_chat_history() {
    let server = ollama_mock().await;
    let provider = OllamaProvider::new(server.uri(), "llama2").unwrap();

    let history = vec![ChatTurn::new("a", "b")];
    provider.ask("c", Some(&history)).await.unwrap();

    assert_history_translation(&last_request_messages(&server).await);
}

// ---------------------------------------------------------------- Azure

const AZURE_DEPLOYMENT: &str = "some-deployment";

async fn azure_mock() -> MockServer {
    let server = MockServer::start().await;
    let chat_path = format!("/openai/deployments/{AZURE_DEPLOYMENT}/chat/completions");

    Mock::given(method("POST"))
        .and(path(chat_path.clone()))
        .and(query_param("api-version", "2024-03-01-preview"))
        .and(wiremock::matchers::body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_chunk_body(&MOCK_CHUNKS), "text/event-stream"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(chat_path))
        .and(query_param("api-version", "2024-03-01-preview"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(completion_body(MOCK_CONTENT_RESPONSE), "application/json"),
        )
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn test_azure_ask() {
    let server = azure_mock().await;
    let provider = AzureProvider::new(server.uri(), "key", AZURE_DEPLOYMENT, false);

    assert_eq!(provider.ask("asd", None).await.unwrap(), MOCK_CONTENT_RESPONSE);
}

#[tokio::test]
async fn test_azure_ask_stream() {
    let server = azure_mock().await;
    let provider = AzureProvider::new(server.uri(), "key", AZURE_DEPLOYMENT, false);

    let stream = provider.ask_stream("asd", None, None).await.unwrap();
    assert_eq!(collect_body(stream).await, expected_stream_body(&MOCK_CHUNKS));
}

#[tokio::test]
async fn test_azure_chat_history() {
    let server = azure_mock().await;
    let provider = AzureProvider::new(server.uri(), "key", AZURE_DEPLOYMENT, false);

    let history = vec![ChatTurn::new("a", "b")];
    provider.ask("c", Some(&history)).await.unwrap();

    assert_history_translation(&last_request_messages(&server).await);
}

// ---------------------------------------------------------------- Selector

#[tokio::test]
async fn test_factory_builds_working_provider_from_config() {
    let server = ollama_mock().await;

    let config: AiProviderConfig = serde_json::from_value(json!({
        "ollama": { "host": server.uri(), "model": "llama2" }
    }))
    .unwrap();

    let provider = ProviderFactory::create(&config).unwrap();
    assert_eq!(provider.ask("asd", None).await.unwrap(), MOCK_CONTENT_RESPONSE);
}
