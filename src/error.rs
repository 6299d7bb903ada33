//! Error types for the Ollama chat client.
//!
//! Every failure the completion call can produce is an [`Error`].  The chat
//! session never surfaces these to the user as errors; it converts them to a
//! displayable diagnostic via [`Error::diagnostic`] and shows that text in
//! place of a reply.

use std::error;
use std::fmt;
use std::sync::Arc;

/// The closed set of failure classes a completion call can end in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The server answered with a non-200 status.
    HttpStatus,
    /// The server answered 200 with JSON that lacks `message.content`.
    BodyShape,
    /// The request never completed: connection refused, reset, bad URL, etc.
    Transport,
    /// The server answered 200 with a body that is not JSON.
    Decode,
    /// Anything else.
    Unknown,
}

/// The main error type for the chat client.
#[derive(Clone, Debug)]
pub enum Error {
    /// The endpoint returned a status other than 200.
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Raw response body.
        body: String,
    },

    /// The response decoded as JSON but did not have the expected structure.
    UnexpectedStructure {
        /// What was missing or malformed.
        message: String,
    },

    /// Connection error.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// HTTP client error that is not a connection failure.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The response body was not valid JSON.
    Decode {
        /// Human-readable error message.
        message: String,
        /// The raw text that failed to decode.
        body: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Error during validation of configuration or parameters.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// A URL parsing error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// A streaming error occurred.
    Streaming {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Encoding/decoding error.
    Encoding {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Unknown error.
    Unknown {
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Creates a new API (status) error.
    pub fn api(status_code: u16, body: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            body: body.into(),
        }
    }

    /// Creates a new unexpected-structure error.
    pub fn unexpected_structure(message: impl Into<String>) -> Self {
        Error::UnexpectedStructure {
            message: message.into(),
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new decode error carrying the raw body.
    pub fn decode(
        message: impl Into<String>,
        body: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Decode {
            message: message.into(),
            body: body.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new streaming error.
    pub fn streaming(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Streaming {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new encoding error.
    pub fn encoding(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Encoding {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new unknown error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Error::Unknown {
            message: message.into(),
        }
    }

    /// Classifies this error into one of the closed failure kinds.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Api { .. } => FailureKind::HttpStatus,
            Error::UnexpectedStructure { .. } => FailureKind::BodyShape,
            Error::Connection { .. }
            | Error::HttpClient { .. }
            | Error::Url { .. }
            | Error::Streaming { .. } => FailureKind::Transport,
            Error::Decode { .. } => FailureKind::Decode,
            Error::Validation { .. }
            | Error::Encoding { .. }
            | Error::Unknown { .. } => FailureKind::Unknown,
        }
    }

    /// Renders this error as the text shown to the user in place of a reply.
    ///
    /// The mapping from [`FailureKind`] to text is fixed:
    ///
    /// - `HttpStatus`: names the status code and includes the raw body.
    /// - `BodyShape`: a fixed "unexpected response structure" sentence.
    /// - `Transport`: "failed to connect" plus the underlying description.
    /// - `Decode`: the parse error plus the raw response text.
    /// - `Unknown`: a generic sentence plus the error description.
    pub fn diagnostic(&self) -> String {
        match self {
            Error::Api { status_code, body } => format!(
                "Error: Ollama API request failed with status code {status_code} and text: {body}"
            ),
            Error::UnexpectedStructure { .. } => {
                "Error: Unexpected response structure from Ollama.".to_string()
            }
            Error::Decode { message, body, .. } => format!(
                "Error: Failed to decode JSON response from Ollama: {message}.  Response text: {body}"
            ),
            Error::Connection { message, .. }
            | Error::HttpClient { message, .. }
            | Error::Url { message, .. }
            | Error::Streaming { message, .. } => {
                format!("Error: Failed to connect to Ollama API: {message}")
            }
            _ => format!("An unexpected error occurred: {self}"),
        }
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns true if the server responded with a 5xx status.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status_code, .. } if (500..=599).contains(status_code))
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Api { status_code, body } => {
                if body.is_empty() {
                    write!(f, "API error: status {status_code}")
                } else {
                    write!(f, "API error: status {status_code}: {body}")
                }
            }
            Error::UnexpectedStructure { message } => {
                write!(f, "Unexpected response structure: {message}")
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client error: {message}")
            }
            Error::Decode { message, .. } => {
                write!(f, "Decode error: {message}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
            Error::Streaming { message, .. } => {
                write!(f, "Streaming error: {message}")
            }
            Error::Encoding { message, .. } => {
                write!(f, "Encoding error: {message}")
            }
            Error::Unknown { message } => {
                write!(f, "Unknown error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Decode { source, .. }
            | Error::Streaming { source, .. }
            | Error::Encoding { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

/// A specialized Result type for chat client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_diagnostic_names_code_and_body() {
        let err = Error::api(500, "boom");
        assert_eq!(err.kind(), FailureKind::HttpStatus);
        assert!(err.is_server_error());
        let text = err.diagnostic();
        assert!(text.contains("500"));
        assert!(text.contains("boom"));
    }

    #[test]
    fn shape_diagnostic_is_fixed() {
        let err = Error::unexpected_structure("missing message.content");
        assert_eq!(err.kind(), FailureKind::BodyShape);
        assert_eq!(
            err.diagnostic(),
            "Error: Unexpected response structure from Ollama."
        );
    }

    #[test]
    fn decode_diagnostic_carries_raw_text() {
        let err = Error::decode("expected value at line 1 column 1", "not json", None);
        assert_eq!(err.kind(), FailureKind::Decode);
        let text = err.diagnostic();
        assert!(text.contains("Failed to decode JSON"));
        assert!(text.contains("expected value at line 1 column 1"));
        assert!(text.contains("Response text: not json"));
    }

    #[test]
    fn transport_diagnostic_mentions_connect() {
        let err = Error::connection("connection refused", None);
        assert!(err.is_connection());
        assert_eq!(err.kind(), FailureKind::Transport);
        let text = err.diagnostic();
        assert!(text.contains("Failed to connect"));
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn unknown_diagnostic_is_generic() {
        let err = Error::unknown("something odd");
        assert_eq!(err.kind(), FailureKind::Unknown);
        assert_eq!(
            err.diagnostic(),
            "An unexpected error occurred: Unknown error: something odd"
        );
    }

    #[test]
    fn url_error_classifies_as_transport() {
        let err: Error = url::Url::parse("not a url").unwrap_err().into();
        assert_eq!(err.kind(), FailureKind::Transport);
        assert_eq!(err.status_code(), None);
    }
}
