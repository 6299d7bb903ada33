use std::error::Error as StdError;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures::Stream;
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, StatusCode, header};
use tracing::{debug, warn};
use url::Url;

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_BYTES, STREAM_CHUNKS,
    STREAM_ERRORS,
};
use crate::types::{ChatChunk, ChatRequest, ChatResponse};

/// The chat endpoint of an Ollama server on its default port.
pub const DEFAULT_ENDPOINT_URL: &str = "http://localhost:11434/api/chat";

/// Environment variable that overrides [`DEFAULT_ENDPOINT_URL`].
pub const ENDPOINT_ENV_VAR: &str = "OLLAMA_CHAT_ENDPOINT";

/// A boxed stream of response chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

/// The seam between a chat session and whatever produces completions.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send a request and wait for the complete response.
    async fn chat(&self, endpoint_url: &str, request: ChatRequest) -> Result<ChatResponse>;

    /// Send a request and receive the response incrementally.
    async fn chat_stream(&self, endpoint_url: &str, request: ChatRequest) -> Result<ChunkStream>;
}

/// Client for an Ollama-compatible chat endpoint.
///
/// The underlying HTTP client is built without a timeout: a call lasts as
/// long as the server takes to answer.
#[derive(Clone)]
pub struct Ollama {
    client: ReqwestClient,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl std::fmt::Debug for Ollama {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ollama")
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl Ollama {
    /// Create a new client.
    pub fn new() -> Result<Self> {
        let client = ReqwestClient::builder().build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;
        Ok(Self {
            client,
            logger: None,
        })
    }

    /// Attach a logger that observes every request and response.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Create and return default headers for requests.
    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// POST the request and return the response if its status is 200.
    async fn post(&self, endpoint_url: &str, request: &ChatRequest) -> Result<Response> {
        let url = Url::parse(endpoint_url)?;
        if let Some(logger) = &self.logger {
            logger.log_request(endpoint_url, request);
        }
        debug!(endpoint = endpoint_url, model = %request.model, stream = request.stream, "posting chat request");

        let response = self
            .client
            .post(url)
            .headers(Self::default_headers())
            .json(request)
            .send()
            .await
            .map_err(request_error)?;

        if response.status() != StatusCode::OK {
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }

    /// Convert a non-200 response into an [`Error::Api`] carrying the raw body.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        match response.text().await {
            Ok(body) => {
                warn!(status = status_code, "chat endpoint returned an error status");
                Error::api(status_code, body)
            }
            Err(e) => request_error(e),
        }
    }

    async fn send(&self, endpoint_url: &str, request: ChatRequest) -> Result<ChatResponse> {
        let response = self.post(endpoint_url, &request).await?;
        let body = response.text().await.map_err(request_error)?;
        let parsed = ChatResponse::parse(&body)?;
        if let Some(logger) = &self.logger {
            logger.log_response(&parsed);
        }
        Ok(parsed)
    }

    async fn open_stream(&self, endpoint_url: &str, mut request: ChatRequest) -> Result<ChunkStream> {
        request.stream = true;
        let response = self.post(endpoint_url, &request).await?;
        let logger = self.logger.clone();
        let chunks = process_ndjson(response.bytes_stream()).map(move |chunk| {
            match &chunk {
                Ok(chunk) => {
                    STREAM_CHUNKS.click();
                    if let Some(logger) = &logger {
                        logger.log_stream_chunk(chunk);
                    }
                }
                Err(_) => STREAM_ERRORS.click(),
            }
            chunk
        });
        Ok(Box::pin(chunks))
    }
}

#[async_trait::async_trait]
impl ChatBackend for Ollama {
    async fn chat(&self, endpoint_url: &str, request: ChatRequest) -> Result<ChatResponse> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self.send(endpoint_url, request).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            CLIENT_REQUEST_ERRORS.click();
            debug!(kind = ?err.kind(), error = %err, "chat request failed");
        }
        result
    }

    async fn chat_stream(&self, endpoint_url: &str, request: ChatRequest) -> Result<ChunkStream> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self.open_stream(endpoint_url, request).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            CLIENT_REQUEST_ERRORS.click();
            debug!(kind = ?err.kind(), error = %err, "chat stream request failed");
        }
        result
    }
}

/// Map a transport-level reqwest error, keeping the full cause chain in the
/// message so the user sees why the connection failed.
fn request_error(e: reqwest::Error) -> Error {
    let message = describe_chain(&e);
    if e.is_connect() {
        Error::connection(message, Some(Box::new(e)))
    } else {
        Error::http_client(message, Some(Box::new(e)))
    }
}

fn describe_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Process a stream of bytes into a stream of newline-delimited JSON chunks.
fn process_ndjson<S>(byte_stream: S) -> impl Stream<Item = Result<ChatChunk>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    // Convert reqwest errors to our error type
    let stream = byte_stream.map(|result| {
        result.map_err(|e| {
            Error::streaming(describe_chain(&e), Some(Box::new(e)))
        })
    });

    let buffer: Vec<u8> = Vec::new();

    stream::unfold(
        (stream, buffer, false),
        move |(mut stream, mut buffer, finished)| async move {
            if finished {
                return None;
            }
            loop {
                // First check if we have a complete line in the buffer
                if let Some((line, remaining)) = extract_line(&buffer) {
                    buffer = remaining;
                    match line {
                        Some(chunk) => return Some((chunk, (stream, buffer, false))),
                        None => continue,
                    }
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer, true)));
                    }
                    None => {
                        // End of stream; a final line may lack its newline
                        let rest = std::mem::take(&mut buffer);
                        return decode_line(&rest).map(|chunk| (chunk, (stream, buffer, true)));
                    }
                }
            }
        },
    )
}

/// Split the first newline-terminated line off the buffer.
///
/// Returns `None` when no complete line is buffered.  Otherwise returns the
/// decoded line (`None` for a blank line) and the remaining bytes.
fn extract_line(buffer: &[u8]) -> Option<(Option<Result<ChatChunk>>, Vec<u8>)> {
    let newline = buffer.iter().position(|b| *b == b'\n')?;
    let line = &buffer[..newline];
    let rest = buffer[newline + 1..].to_vec();
    Some((decode_line(line), rest))
}

fn decode_line(line: &[u8]) -> Option<Result<ChatChunk>> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(e) => {
            return Some(Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {}", e),
                Some(Box::new(e)),
            )));
        }
    };
    if text.is_empty() {
        return None;
    }
    Some(ChatChunk::parse(text))
}
