//! Streaming text translation through a chat model.
//!
//! The translator does not run a language model itself. It builds a two-message
//! conversation (an instruction and the text to translate), hands it to a
//! [`ChatClient`], and accumulates the fragments the model streams back until
//! the stream ends or the caller cancels.
//!
//! ## Chat Clients
//!
//! A [`ChatClient`] turns a list of messages into an [`AsyncMessageIterator`]
//! of incremental [`MessageDelta`]s. The bundled client, [`OpenAIClient`],
//! speaks the OpenAI chat completions protocol, which local servers such as
//! Ollama also expose.
//!
//! ## Error Handling
//!
//! Errors are reported through [`Error`], whose [`ErrorKind`] separates problems
//! with the input (empty, too long, unknown language) from problems reaching or
//! understanding the model service. The underlying HTTP or parse error, when
//! there is one, is the error source.

mod openai;
mod sse;
mod translate;

use async_trait::async_trait;
use std::error::Error as StdError;
use std::fmt;

use crate::chat::Message;

pub(crate) use openai::{OpenAIClient, DEFAULT_API_BASE};
pub(crate) use translate::{input_description, translate, TranslationRequest, LANGUAGES};

/// General categories of errors returned while translating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// There is no text to translate.
    EmptyInput,
    /// The text is longer than the character limit.
    InputTooLong,
    /// The target language is not one of the supported languages.
    UnsupportedLanguage,
    /// Failed to connect to the model service.
    Connection,
    /// A request timed out.
    TimedOut,
    /// An API key was not provided or was rejected.
    Authentication,
    /// A rate limit was reached or a quota was exceeded.
    ExcessUsage,
    /// The service is overloaded; a later retry may succeed.
    ApiOverloaded,
    /// The requested model was not found.
    NotFound,
    /// The request was malformed or refused.
    BadRequest,
    /// The service encountered an error.
    InternalError,
    /// A response could not be parsed or violated the protocol.
    UnexpectedResponse,
    /// An error that does not fit into any of the other categories.
    UnspecifiedError,
}

#[derive(Debug)]
pub(crate) struct Error {
    kind: ErrorKind,
    detail: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub(crate) fn from_kind(kind: ErrorKind) -> Error {
        Error {
            kind,
            detail: None,
            source: None,
        }
    }

    pub(crate) fn with_detail<S: Into<String>>(kind: ErrorKind, detail: S) -> Error {
        Error {
            kind,
            detail: Some(detail.into()),
            source: None,
        }
    }

    pub(crate) fn from_source(kind: ErrorKind, source: Box<dyn StdError + Send + Sync>) -> Error {
        Error {
            kind,
            detail: None,
            source: Some(source),
        }
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn message(&self) -> &'static str {
        match self.kind {
            ErrorKind::EmptyInput => "there is no text to translate",
            ErrorKind::InputTooLong => "the text exceeds the maximum length",
            ErrorKind::UnsupportedLanguage => "the language is not supported",
            ErrorKind::Connection => "failed to connect to the model service",
            ErrorKind::TimedOut => "request timed out",
            ErrorKind::Authentication => "authentication failed or not provided",
            ErrorKind::ExcessUsage => "rate limit exceeded or quota crossed",
            ErrorKind::ApiOverloaded => "the model service is currently overloaded",
            ErrorKind::NotFound => "the requested model was not found",
            ErrorKind::BadRequest => "the request was bad or malformed",
            ErrorKind::InternalError => "the model service encountered an internal error",
            ErrorKind::UnexpectedResponse => "the response was unexpected or malformed",
            ErrorKind::UnspecifiedError => "an unspecified error occurred",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.message(), detail),
            None => write!(f, "{}", self.message()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| &**e as _)
    }
}

/// The reason why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FinishReason {
    /// The model generated a stop token.
    Stop,
    /// A content filter was triggered.
    ContentFilter,
    /// The maximum response length was reached.
    Length,
}

/// A "chunk" of the model's streamed reply, usually a single token.
#[derive(Debug, Clone)]
pub(crate) struct MessageDelta {
    pub content: String,
}

/// A streamed response from a completion.
#[async_trait]
pub(crate) trait AsyncMessageIterator: Send {
    /// The next chunk of the message, or `None` once the stream has ended.
    async fn next(&mut self) -> Option<Result<MessageDelta, Error>>;

    /// The reason the model stopped generating, if the service reported one.
    /// Only meaningful once the iterator is exhausted.
    fn finish_reason(&self) -> Option<FinishReason>;
}

/// A chat model service.
#[async_trait]
pub(crate) trait ChatClient: Send + Sync {
    /// Stream the model's reply to `messages`.
    async fn stream_completion(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<Box<dyn AsyncMessageIterator>, Error>;
}
