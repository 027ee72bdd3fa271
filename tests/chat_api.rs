use futures::StreamExt;
use goppy::{
    ApiClient, ChatMessage, ChatRequestBuilder, ChatResponse, ClientConfig, ModelError,
    StreamOptions,
};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client_for(server: &MockServer, project: &str, org: &str) -> ApiClient {
    let config = ClientConfig::resolve_with(None, Some("sk-test"), Some(project), Some(org), |_| None)
        .and_then(|c| c.with_base_url(&server.uri()))
        .expect("valid test config");
    ApiClient::new(config).expect("client")
}

fn completion_body() -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1_677_652_288,
        "model": "gpt-4o-mini",
        "system_fingerprint": "fp_44709d6fcb",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Hello there, how may I assist you today?"},
            "logprobs": null,
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 9, "completion_tokens": 12, "total_tokens": 21}
    })
}

#[tokio::test]
async fn chat_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "messages": [{"role": "user", "content": "Hello!"}],
            "model": "gpt-4o-mini",
            "n": 0,
            "stream": false,
            "parallel_tool_calls": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "", "");
    let request = ChatRequestBuilder::new(vec![ChatMessage::user("Hello!")], "gpt-4o-mini")
        .n(0)
        .stream(false)
        .parallel_tool_calls(false)
        .build();

    let resp = client.request(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let completion: ChatResponse = client.response(resp).await.unwrap();

    assert_eq!(completion.id, "chatcmpl-123");
    assert_eq!(completion.model, "gpt-4o-mini");
    assert_eq!(completion.system_fingerprint.as_deref(), Some("fp_44709d6fcb"));
    assert_eq!(completion.get_content(), Some("Hello there, how may I assist you today?"));
    assert_eq!(completion.choices[0].finish_reason.as_deref(), Some("stop"));
    assert_eq!(completion.choices[0].message.role, "assistant");
    let usage = completion.usage.unwrap();
    assert_eq!((usage.prompt_tokens, usage.completion_tokens, usage.total_tokens), (9, 12, 21));
}

#[tokio::test]
async fn optional_headers_sent_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("openai-organization", "org-42"))
        .and(header("openai-project", "proj-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "proj-7", "org-42");
    let request = ChatRequestBuilder::new(vec![ChatMessage::user("hi")], "gpt-4o-mini").build();
    let completion = client.chat(&request).await.unwrap();
    assert_eq!(completion.choices.len(), 1);
}

#[tokio::test]
async fn optional_headers_omitted_when_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(|req: &Request| {
            !req.headers.contains_key("openai-organization")
                && !req.headers.contains_key("openai-project")
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "", "");
    let request = ChatRequestBuilder::new(vec![ChatMessage::user("hi")], "gpt-4o-mini").build();
    client.chat(&request).await.unwrap();
}

#[tokio::test]
async fn structured_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "bad request", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, "", "");
    let request = ChatRequestBuilder::new(vec![ChatMessage::user("hi")], "gpt-4o-mini").build();
    let resp = client.request(request).await.unwrap();
    let err = client.response::<ChatResponse>(resp).await.unwrap_err();

    let api_err = err.as_api_error().expect("api error");
    assert_eq!(api_err.status, StatusCode::BAD_REQUEST);
    assert_eq!(api_err.message, "bad request");
    assert_eq!(api_err.details, "Type: invalid_request_error, Code: , Param: ");
    assert_eq!(err.status_code(), Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn unparsable_api_error_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream connect error"))
        .mount(&server)
        .await;

    let client = client_for(&server, "", "");
    let request = ChatRequestBuilder::new(vec![ChatMessage::user("hi")], "gpt-4o-mini").build();
    let err = client.chat(&request).await.unwrap_err();

    let api_err = err.as_api_error().expect("api error");
    assert_eq!(api_err.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(api_err.message, "failed to parse API error response");
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let client = client_for(&server, "", "");
    let request = ChatRequestBuilder::new(vec![ChatMessage::user("hi")], "gpt-4o-mini").build();
    let err = client.chat(&request).await.unwrap_err();
    assert!(matches!(err, ModelError::Decode(_)));
    assert!(err.to_string().starts_with("failed to decode JSON response"));
}

#[tokio::test]
async fn unknown_endpoint_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, "", "");
    let err = client
        .request_raw("embeddings", &json!({"input": "hello", "model": "text-embedding-3-small"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::EndpointNotAvailable(ref name) if name == "embeddings"));
}

#[tokio::test]
async fn raw_request_to_known_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_json(json!({"model": "gpt-4o-mini", "messages": []})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "", "");
    let resp = client
        .request_raw("chat/completions", &json!({"model": "gpt-4o-mini", "messages": []}))
        .await
        .unwrap();
    let completion: ChatResponse = client.response(resp).await.unwrap();
    assert_eq!(completion.id, "chatcmpl-123");
}

#[tokio::test]
async fn connection_failure_is_a_transport_error() {
    let config = ClientConfig::resolve_with(None, Some("sk-test"), None, None, |_| None)
        .and_then(|c| c.with_base_url("http://127.0.0.1:1"))
        .unwrap();
    let client = ApiClient::new(config).unwrap();
    let request = ChatRequestBuilder::new(vec![ChatMessage::user("hi")], "gpt-4o-mini").build();
    let err = client.request(request).await.unwrap_err();
    assert!(matches!(err, ModelError::Transport(_)));
}

#[tokio::test]
async fn streamed_completion() {
    let chunk = |content: &str, finish: Option<&str>| {
        json!({
            "id": "chatcmpl-9",
            "object": "chat.completion.chunk",
            "created": 1_694_268_190,
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": finish}]
        })
    };
    let usage = json!({
        "id": "chatcmpl-9",
        "object": "chat.completion.chunk",
        "created": 1_694_268_190,
        "model": "gpt-4o-mini",
        "choices": [],
        "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
    });
    let body = format!(
        "data: {}\n\ndata: {}\n\ndata: {}\n\ndata: [DONE]\n\n",
        chunk("Hel", None),
        chunk("lo", Some("stop")),
        usage
    );

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(|req: &Request| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap_or_default();
            body["stream"] == json!(true) && body["stream_options"] == json!({"include_usage": true})
        })
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "", "");
    let request = ChatRequestBuilder::new(vec![ChatMessage::user("hi")], "gpt-4o-mini")
        .stream_options(StreamOptions {
            include_usage: Some(true),
        })
        .build();
    let chunks: Vec<_> = client
        .chat_stream(&request)
        .await
        .unwrap()
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(chunks.len(), 3);
    let text: String = chunks.iter().filter_map(|c| c.delta_content()).collect();
    assert_eq!(text, "Hello");
    assert_eq!(chunks[1].choices[0].finish_reason.as_deref(), Some("stop"));
    assert_eq!(chunks[2].usage.as_ref().map(|u| u.total_tokens), Some(7));
}

#[tokio::test]
async fn streamed_request_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error", "code": "invalid_api_key"}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, "", "");
    let request = ChatRequestBuilder::new(vec![ChatMessage::user("hi")], "gpt-4o-mini").build();
    let err = match client.chat_stream(&request).await {
        Ok(_) => panic!("expected an API error"),
        Err(err) => err,
    };
    let api_err = err.as_api_error().unwrap();
    assert_eq!(api_err.status, StatusCode::UNAUTHORIZED);
    assert_eq!(api_err.details, "Type: invalid_request_error, Code: invalid_api_key, Param: ");
}

#[tokio::test]
async fn streamed_request_cannot_be_decoded_as_one_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("data: [DONE]\n\n", "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "", "");
    let request = ChatRequestBuilder::new(vec![ChatMessage::user("hi")], "gpt-4o-mini")
        .stream(true)
        .build();
    let resp = client.request(request).await.unwrap();
    assert!(resp.is_streamed());

    let err = client.response::<ChatResponse>(resp).await.unwrap_err();
    assert!(matches!(err, ModelError::InvalidRequest(ref msg) if msg.contains("response_stream")));
}

#[tokio::test]
async fn plain_request_cannot_be_decoded_as_a_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .mount(&server)
        .await;

    let client = client_for(&server, "", "");
    let request = ChatRequestBuilder::new(vec![ChatMessage::user("hi")], "gpt-4o-mini")
        .stream(false)
        .build();
    let resp = client.request(request).await.unwrap();
    assert!(!resp.is_streamed());

    let err = match client.response_stream(resp).await {
        Ok(_) => panic!("expected a mismatch error"),
        Err(err) => err,
    };
    assert!(matches!(err, ModelError::InvalidRequest(_)));
}

#[tokio::test]
async fn raw_payload_stream_flag_is_honoured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "data: {\"id\":\"c\",\"object\":\"chat.completion.chunk\",\"created\":1,\"model\":\"m\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"ok\"}}]}\n\ndata: [DONE]\n\n",
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let client = client_for(&server, "", "");
    let resp = client
        .request_raw(
            "chat/completions",
            &json!({"model": "m", "messages": [], "stream": true}),
        )
        .await
        .unwrap();
    assert!(resp.is_streamed());

    let chunks: Vec<_> = client.response_stream(resp).await.unwrap().collect().await;
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].as_ref().unwrap().delta_content(), Some("ok"));
}
