//! A client for OpenAI-compatible `/chat/completions` endpoints.

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use reqwest::{Client, IntoUrl, Url};
use serde::{Deserialize, Serialize};

use super::sse::{self, EventStream};
use super::{
    AsyncMessageIterator, ChatClient, Error, ErrorKind, FinishReason, MessageDelta,
};
use crate::chat::{Message, Role};

/// Ollama's OpenAI-compatible endpoint on its default port.
pub(crate) const DEFAULT_API_BASE: &str = "http://localhost:11434/v1/";

#[derive(Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum ApiRole {
    System,
    User,
}

impl From<Role> for ApiRole {
    fn from(value: Role) -> Self {
        match value {
            Role::System => ApiRole::System,
            Role::User => ApiRole::User,
        }
    }
}

#[derive(Serialize, Debug)]
struct ChatMessage<'m> {
    role: ApiRole,
    content: &'m str,
}

#[derive(Serialize, Debug)]
struct ChatCompletionRequest<'r> {
    model: &'r str,
    messages: Vec<ChatMessage<'r>>,
    stream: bool,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum ApiFinishReason {
    Stop,
    Length,
    ContentFilter,
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    #[serde(default)]
    delta: Delta,
    finish_reason: Option<ApiFinishReason>,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorPayload {
    message: String,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    error: ApiErrorPayload,
}

/// An error message returned by the service with a failing status.
#[derive(thiserror::Error, Debug)]
#[error("{status}: {message}")]
struct ApiError {
    status: u16,
    message: String,
}

fn kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 409 | 422 => ErrorKind::BadRequest,
        401 | 403 => ErrorKind::Authentication,
        404 => ErrorKind::NotFound,
        429 => ErrorKind::ExcessUsage,
        503 => ErrorKind::ApiOverloaded,
        500..=599 => ErrorKind::InternalError,
        _ => ErrorKind::UnspecifiedError,
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_decode() || err.is_redirect() {
            ErrorKind::UnexpectedResponse
        } else if err.is_timeout() {
            ErrorKind::TimedOut
        } else if err.is_connect() {
            ErrorKind::Connection
        } else if err.is_builder() {
            ErrorKind::BadRequest
        } else {
            ErrorKind::UnspecifiedError
        };

        Error::from_source(kind, Box::new(err))
    }
}

impl From<sse::Error> for Error {
    fn from(err: sse::Error) -> Self {
        let kind = match &err {
            sse::Error::ResponseExceededBuffer | sse::Error::DeserializationFailed { .. } => {
                ErrorKind::UnexpectedResponse
            }
            sse::Error::StreamFailed(_) => ErrorKind::Connection,
        };

        Error::from_source(kind, Box::new(err))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::from_source(ErrorKind::BadRequest, Box::new(err))
    }
}

pub(crate) struct OpenAIClient {
    api_base: Url,
    api_key: Option<String>,
    client: Client,
}

impl OpenAIClient {
    /// `api_base` is the URL the `chat/completions` path is resolved against,
    /// such as `https://api.openai.com/v1/`. A missing trailing slash is added.
    pub(crate) fn new<U: IntoUrl>(api_base: U, api_key: Option<String>) -> Result<OpenAIClient, Error> {
        let mut api_base = api_base.into_url()?;

        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        Ok(OpenAIClient {
            api_base,
            api_key,
            client: Client::new(),
        })
    }

    fn endpoint(&self) -> Result<Url, Error> {
        Ok(self.api_base.join("chat/completions")?)
    }
}

struct OpenAICompletion<S>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    events: EventStream<S>,
    finish_reason: Option<FinishReason>,
}

#[async_trait]
impl<S: Stream<Item = reqwest::Result<Bytes>> + Unpin + Send> AsyncMessageIterator
    for OpenAICompletion<S>
{
    async fn next(&mut self) -> Option<Result<MessageDelta, Error>> {
        loop {
            let chunk = match self.events.next_json::<ChatCompletionChunk>().await? {
                Ok(chunk) => chunk,
                Err(err) => return Some(Err(err.into())),
            };

            // Chunks without choices carry usage only
            let choice = match chunk.choices.into_iter().next() {
                Some(choice) => choice,
                None => continue,
            };

            if let Some(reason) = choice.finish_reason {
                self.finish_reason = match reason {
                    ApiFinishReason::Stop => Some(FinishReason::Stop),
                    ApiFinishReason::Length => Some(FinishReason::Length),
                    ApiFinishReason::ContentFilter => Some(FinishReason::ContentFilter),
                    ApiFinishReason::Other => None,
                };
            }

            match choice.delta.content {
                Some(content) if !content.is_empty() => {
                    return Some(Ok(MessageDelta { content }))
                }
                _ => continue,
            }
        }
    }

    fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }
}

#[async_trait]
impl ChatClient for OpenAIClient {
    async fn stream_completion(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<Box<dyn AsyncMessageIterator>, Error> {
        let request = ChatCompletionRequest {
            model,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.into(),
                    content: &m.content,
                })
                .collect(),
            stream: true,
        };

        let mut builder = self.client.post(self.endpoint()?).json(&request);

        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let res = builder.send().await?;
        let status = res.status();

        if status.is_success() {
            Ok(Box::new(OpenAICompletion {
                events: EventStream::new(res.bytes_stream()),
                finish_reason: None,
            }))
        } else {
            let status = status.as_u16();
            let body = res.text().await?;

            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(response) => response.error.message,
                Err(_) => body,
            };

            Err(Error::from_source(
                kind_from_status(status),
                Box::new(ApiError { status, message }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = OpenAIClient::new("http://localhost:11434/v1", None).unwrap();

        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "http://localhost:11434/v1/chat/completions"
        );

        let client = OpenAIClient::new(DEFAULT_API_BASE, None).unwrap();

        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_invalid_api_base() {
        assert!(OpenAIClient::new("not a url", None).is_err());
    }

    #[test]
    fn test_status_kinds() {
        assert_eq!(kind_from_status(401), ErrorKind::Authentication);
        assert_eq!(kind_from_status(404), ErrorKind::NotFound);
        assert_eq!(kind_from_status(429), ErrorKind::ExcessUsage);
        assert_eq!(kind_from_status(503), ErrorKind::ApiOverloaded);
        assert_eq!(kind_from_status(502), ErrorKind::InternalError);
    }

    #[test]
    fn test_request_serialization() {
        let messages = [Message::system("be brief"), Message::user("hi")];
        let request = ChatCompletionRequest {
            model: "phi3",
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.into(),
                    content: &m.content,
                })
                .collect(),
            stream: true,
        };

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "phi3");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[tokio::test]
    async fn test_completion_chunks() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Bon\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"jour\"},\"finish_reason\":null}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: {\"choices\":[],\"usage\":{\"total_tokens\":9}}\n\n",
            "data: [DONE]\n\n",
        );

        let chunks: Vec<Result<Bytes, reqwest::Error>> = body
            .as_bytes()
            .chunks(7)
            .map(|c| Ok(Bytes::from(c.to_owned())))
            .collect();

        let mut completion = OpenAICompletion {
            events: EventStream::new(futures_util::stream::iter(chunks)),
            finish_reason: None,
        };

        let mut text = String::new();

        while let Some(delta) = completion.next().await {
            text.push_str(&delta.unwrap().content);
        }

        assert_eq!(text, "Bonjour");
        assert_eq!(completion.finish_reason(), Some(FinishReason::Stop));
    }
}
