//! Integration tests for the chat client against a local fake endpoint.
//!
//! Each test binds a throwaway listener on 127.0.0.1, answers one request
//! with a canned HTTP response and hands back the request body it received.

use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use ollama_chat::chat::{ChatConfig, ChatSession, PlainTextRenderer};
use ollama_chat::{ChatBackend, ChatRequest, FailureKind, Model, Ollama, Role};

async fn read_http_request(stream: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let read = stream.read(&mut chunk).await.expect("read request");
        assert!(read > 0, "client closed before sending headers");
        data.extend_from_slice(&chunk[..read]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let headers = String::from_utf8_lossy(&data[..header_end]).to_string();
    let content_length = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);
    while data.len() < header_end + content_length {
        let read = stream.read(&mut chunk).await.expect("read body");
        assert!(read > 0, "client closed before sending body");
        data.extend_from_slice(&chunk[..read]);
    }
    String::from_utf8_lossy(&data[header_end..header_end + content_length]).to_string()
}

/// Serve a single response and return the endpoint URL plus a handle that
/// resolves to the request body the server saw.
async fn serve_once(status: &str, content_type: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local test server");
    let addr = listener.local_addr().expect("local addr");
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len(),
    );

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept connection");
        let request_body = read_http_request(&mut socket).await;
        socket
            .write_all(response.as_bytes())
            .await
            .expect("write response");
        let _ = socket.shutdown().await;
        request_body
    });

    (format!("http://{addr}/api/chat"), server)
}

fn session() -> ChatSession {
    ChatSession::new(Ollama::new().expect("client"), ChatConfig::new())
}

#[tokio::test]
async fn well_formed_reply_is_returned_verbatim() {
    let (url, server) = serve_once(
        "200 OK",
        "application/json",
        r#"{"message":{"content":"hello"}}"#,
    )
    .await;

    let text = session()
        .request_completion("Hi there", Model::Llama2, "Be kind.", &url)
        .await;
    assert_eq!(text, "hello");

    let sent: serde_json::Value =
        serde_json::from_str(&server.await.expect("server task")).expect("request is JSON");
    assert_eq!(
        sent,
        serde_json::json!({
            "model": "llama2",
            "messages": [
                {"role": "system", "content": "Be kind."},
                {"role": "user", "content": "Hi there"}
            ],
            "stream": false
        })
    );
}

#[tokio::test]
async fn missing_content_reports_unexpected_structure() {
    let (url, server) = serve_once("200 OK", "application/json", r#"{"message":{}}"#).await;

    let text = session()
        .request_completion("hi", Model::Mistral, "sys", &url)
        .await;
    assert!(text.contains("Unexpected response structure"), "{text}");
    server.await.expect("server task");
}

#[tokio::test]
async fn error_status_reports_code_and_body() {
    let (url, server) = serve_once("500 Internal Server Error", "text/plain", "boom").await;

    let text = session()
        .request_completion("hi", Model::Mistral, "sys", &url)
        .await;
    assert!(text.contains("500"), "{text}");
    assert!(text.contains("boom"), "{text}");
    server.await.expect("server task");
}

#[tokio::test]
async fn only_200_counts_as_success() {
    let (url, server) = serve_once(
        "201 Created",
        "application/json",
        r#"{"message":{"content":"hello"}}"#,
    )
    .await;

    let text = session()
        .request_completion("hi", Model::Mistral, "sys", &url)
        .await;
    assert!(text.contains("201"), "{text}");
    server.await.expect("server task");
}

#[tokio::test]
async fn unreachable_endpoint_reports_connection_failure() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    let url = format!("http://{addr}/api/chat");

    let text = session()
        .request_completion("hi", Model::Mistral, "sys", &url)
        .await;
    assert!(text.contains("Failed to connect"), "{text}");

    let err = Ollama::new()
        .expect("client")
        .chat(&url, ChatRequest::new(Model::Mistral, "sys", "hi"))
        .await
        .expect_err("nothing is listening");
    assert_eq!(err.kind(), FailureKind::Transport);
    assert!(err.is_connection());
}

#[tokio::test]
async fn non_json_body_reports_decode_failure_with_raw_text() {
    let (url, server) = serve_once("200 OK", "text/html", "<html>not json</html>").await;

    let text = session()
        .request_completion("hi", Model::Mistral, "sys", &url)
        .await;
    assert!(text.contains("Failed to decode JSON"), "{text}");
    assert!(text.contains("<html>not json</html>"), "{text}");
    server.await.expect("server task");
}

#[tokio::test]
async fn submit_records_exchange_and_renders_it() {
    let (url, server) = serve_once(
        "200 OK",
        "application/json",
        r#"{"model":"mistral","message":{"role":"assistant","content":"Paris."},"done":true,"prompt_eval_count":12,"eval_count":3}"#,
    )
    .await;

    let config = ChatConfig::new().with_endpoint_url(url);
    let mut session = ChatSession::new(Ollama::new().expect("client"), config);
    let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
    session
        .submit("What is the capital of France?", &mut renderer)
        .await;
    server.await.expect("server task");

    let turns = session.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role(), Role::User);
    assert_eq!(turns[1].role(), Role::Assistant);
    assert_eq!(turns[1].content(), "Paris.");
    assert_eq!(session.stats().total_eval_tokens, 3);

    let shown = String::from_utf8(renderer.into_inner()).expect("utf-8 output");
    assert_eq!(
        shown,
        "You:\nWhat is the capital of France?\n\nAssistant:\nParis.\n\n"
    );
}

#[tokio::test]
async fn streamed_reply_arrives_in_chunks() {
    let body = concat!(
        r#"{"model":"mistral","message":{"role":"assistant","content":"Hel"},"done":false}"#,
        "\n",
        r#"{"model":"mistral","message":{"role":"assistant","content":"lo"},"done":false}"#,
        "\n",
        r#"{"model":"mistral","message":{"role":"assistant","content":""},"done":true,"eval_count":2}"#,
        "\n",
    );
    let (url, server) = serve_once("200 OK", "application/x-ndjson", body).await;

    let stream = Ollama::new()
        .expect("client")
        .chat_stream(&url, ChatRequest::new(Model::Mistral, "sys", "hi"))
        .await
        .expect("stream opens");
    let chunks: Vec<_> = stream.collect().await;
    let sent: serde_json::Value =
        serde_json::from_str(&server.await.expect("server task")).expect("request is JSON");
    assert_eq!(sent["stream"], serde_json::Value::Bool(true));

    let text: String = chunks
        .iter()
        .map(|chunk| chunk.as_ref().expect("chunk decodes").content().unwrap_or(""))
        .collect();
    assert_eq!(text, "Hello");
    assert!(chunks.last().unwrap().as_ref().unwrap().is_done());
}

#[tokio::test]
async fn streamed_submission_appends_one_reply() {
    let body = concat!(
        r#"{"message":{"content":"4"},"done":false}"#,
        "\n",
        r#"{"message":{"content":""},"done":true}"#,
        "\n",
    );
    let (url, server) = serve_once("200 OK", "application/x-ndjson", body).await;

    let config = ChatConfig::new().with_endpoint_url(url).with_stream(true);
    let mut session = ChatSession::new(Ollama::new().expect("client"), config);
    let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false).without_user_echo();
    session.submit_streaming("2 + 2?", &mut renderer).await;
    server.await.expect("server task");

    assert_eq!(session.turns()[1].content(), "4");
    let shown = String::from_utf8(renderer.into_inner()).expect("utf-8 output");
    assert_eq!(shown, "Assistant:\n4\n\n");
}

#[tokio::test]
async fn streamed_server_error_line_is_shown() {
    let body = concat!(
        r#"{"message":{"content":"Par"},"done":false}"#,
        "\n",
        r#"{"error":"out of memory"}"#,
        "\n",
    );
    let (url, server) = serve_once("200 OK", "application/x-ndjson", body).await;

    let config = ChatConfig::new().with_endpoint_url(url).with_stream(true);
    let mut session = ChatSession::new(Ollama::new().expect("client"), config);
    let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false).without_user_echo();
    session.submit_streaming("capital of France?", &mut renderer).await;
    server.await.expect("server task");

    let reply = session.turns()[1].content();
    assert!(reply.starts_with("Par\n"), "{reply}");
    assert!(reply.contains("out of memory"), "{reply}");
}

#[tokio::test]
async fn streamed_reply_without_done_is_reported() {
    let body = concat!(r#"{"message":{"content":"The answer is"},"done":false}"#, "\n");
    let (url, server) = serve_once("200 OK", "application/x-ndjson", body).await;

    let config = ChatConfig::new().with_endpoint_url(url).with_stream(true);
    let mut session = ChatSession::new(Ollama::new().expect("client"), config);
    let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false).without_user_echo();
    session.submit_streaming("2 + 2?", &mut renderer).await;
    server.await.expect("server task");

    let reply = session.turns()[1].content();
    assert!(reply.starts_with("The answer is\n"), "{reply}");
    assert!(reply.contains("stream ended before done"), "{reply}");
}
