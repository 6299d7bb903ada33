use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::utils::time::parse_rfc3339;

/// The `message` object of a chat response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// The role the server attributed the message to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// The generated text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// A response from the chat endpoint.
///
/// Every field is optional so that a structurally incomplete body still
/// deserializes and the missing piece can be reported explicitly.  The same
/// shape is used for each line of a streamed response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The model that produced the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// RFC 3339 creation timestamp, as sent by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// The generated message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ResponseMessage>,

    /// True on the final object of a response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,

    /// Why generation stopped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,

    /// Total wall time in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,

    /// Model load time in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_duration: Option<u64>,

    /// Number of prompt tokens evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,

    /// Number of tokens generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,

    /// Generation time in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,

    /// Error text the server sends in place of a chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One line of a streamed chat response.
pub type ChatChunk = ChatResponse;

impl ChatResponse {
    /// Parses a response body.
    ///
    /// Text that is not JSON is a decode error carrying the raw text.  JSON
    /// that does not fit the response shape (for example a `message` that
    /// is not an object) is an unexpected-structure error.
    pub fn parse(body: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
            Error::decode(e.to_string(), body, Some(Box::new(e)))
        })?;
        serde_json::from_value(value).map_err(|e| {
            Error::unexpected_structure(format!("response does not match chat shape: {e}"))
        })
    }

    /// The generated text, if the response carries it.
    pub fn content(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.content.as_deref())
    }

    /// Consumes the response and returns the generated text.
    ///
    /// A response without `message.content` is an unexpected-structure
    /// error.
    pub fn into_content(self) -> Result<String> {
        match self.message {
            None => Err(Error::unexpected_structure("response has no 'message'")),
            Some(ResponseMessage { content: None, .. }) => Err(Error::unexpected_structure(
                "response 'message' has no 'content'",
            )),
            Some(ResponseMessage {
                content: Some(content),
                ..
            }) => Ok(content),
        }
    }

    /// Converts an in-band `error` object into a streaming error that keeps
    /// the server's text.
    pub fn server_error(&self) -> Option<Error> {
        self.error
            .as_ref()
            .map(|text| Error::streaming(format!("server reported: {text}"), None))
    }

    /// Returns true if this is the final object of a response.
    pub fn is_done(&self) -> bool {
        self.done.unwrap_or(false)
    }

    /// The creation timestamp, if present and well-formed.
    pub fn created_at(&self) -> Option<OffsetDateTime> {
        self.created_at.as_deref().and_then(parse_rfc3339)
    }
}
