use std::future::Future;
use tokio::select;

use super::{ChatClient, Error, ErrorKind, FinishReason};
use crate::chat::Message;

/// The longest text, in characters, that will be sent for translation.
pub(crate) const MAX_INPUT_CHARS: usize = 10000;

pub(crate) const LANGUAGES: [&str; 27] = [
    "Afrikaans",
    "Arabic",
    "Czech",
    "Danish",
    "Dutch",
    "English",
    "Filipino",
    "Finnish",
    "French",
    "German",
    "Greek",
    "Hindi",
    "Indonesian",
    "Italian",
    "Japanese",
    "Korean",
    "Mandarin",
    "Polish",
    "Portuguese",
    "Romanian",
    "Russian",
    "Serbian",
    "Slovak",
    "Spanish",
    "Thai",
    "Turkish",
    "Vietnamese",
];

const SYSTEM_PROMPT: &str = "You translate user provided text. Do not reply with any extraneous content besides the translated text itself.";

/// A short account of the input length against the limit, e.g. "120 of 10000".
/// Empty for empty input.
pub(crate) fn input_description(len: usize) -> String {
    if len == 0 {
        String::new()
    } else if len >= MAX_INPUT_CHARS {
        format!("{} of {}. Max characters reached.", len, MAX_INPUT_CHARS)
    } else {
        format!("{} of {}", len, MAX_INPUT_CHARS)
    }
}

/// A validated request to translate `text` into `language`.
#[derive(Debug, Clone)]
pub(crate) struct TranslationRequest {
    text: String,
    language: &'static str,
}

impl TranslationRequest {
    /// The language is matched case-insensitively against [`LANGUAGES`].
    pub(crate) fn new(text: &str, language: &str) -> Result<TranslationRequest, Error> {
        let len = text.chars().count();

        if len == 0 {
            return Err(Error::from_kind(ErrorKind::EmptyInput));
        }

        if len > MAX_INPUT_CHARS {
            return Err(Error::with_detail(
                ErrorKind::InputTooLong,
                input_description(len),
            ));
        }

        let language = LANGUAGES
            .iter()
            .find(|l| l.eq_ignore_ascii_case(language))
            .ok_or_else(|| Error::with_detail(ErrorKind::UnsupportedLanguage, language))?;

        Ok(TranslationRequest {
            text: text.to_string(),
            language,
        })
    }

    pub(crate) fn language(&self) -> &'static str {
        self.language
    }

    pub(crate) fn messages(&self) -> Vec<Message> {
        vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(format!(
                "Translate the following text to {}: '{}'",
                self.language, self.text
            )),
        ]
    }
}

/// The translated text accumulated from the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Translation {
    pub text: String,
    /// The translation was cancelled; `text` holds what arrived before.
    pub cancelled: bool,
    pub finish_reason: Option<FinishReason>,
}

/// Stream a translation from `client`, passing each fragment to `on_fragment`
/// as it arrives.
///
/// When `cancel` completes first, the request is abandoned and the partial
/// text is returned with `cancelled` set.
pub(crate) async fn translate<F, C>(
    client: &dyn ChatClient,
    model: &str,
    request: &TranslationRequest,
    mut on_fragment: F,
    cancel: C,
) -> Result<Translation, Error>
where
    F: FnMut(&str),
    C: Future<Output = ()>,
{
    tokio::pin!(cancel);

    let messages = request.messages();

    let cancelled = |text: String| Translation {
        text,
        cancelled: true,
        finish_reason: None,
    };

    let mut completion = select! {
        completion = client.stream_completion(model, &messages) => completion?,
        _ = &mut cancel => return Ok(cancelled(String::new())),
    };

    let mut text = String::new();

    loop {
        select! {
            delta = completion.next() => {
                let delta = match delta {
                    Some(delta) => delta?,
                    None => break,
                };

                on_fragment(&delta.content);
                text.push_str(&delta.content);
            }
            _ = &mut cancel => return Ok(cancelled(text)),
        }
    }

    Ok(Translation {
        text,
        cancelled: false,
        finish_reason: completion.finish_reason(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;
    use crate::translator::{AsyncMessageIterator, MessageDelta};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// Streams fixed fragments, then either ends or stalls forever.
    struct ScriptedClient {
        fragments: Vec<&'static str>,
        stall: bool,
        requests: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedClient {
        fn new(fragments: Vec<&'static str>, stall: bool) -> ScriptedClient {
            ScriptedClient {
                fragments,
                stall,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    struct ScriptedCompletion {
        fragments: VecDeque<&'static str>,
        stall: bool,
    }

    #[async_trait]
    impl AsyncMessageIterator for ScriptedCompletion {
        async fn next(&mut self) -> Option<Result<MessageDelta, Error>> {
            match self.fragments.pop_front() {
                Some(content) => Some(Ok(MessageDelta {
                    content: content.to_string(),
                })),
                None if self.stall => std::future::pending().await,
                None => None,
            }
        }

        fn finish_reason(&self) -> Option<FinishReason> {
            Some(FinishReason::Stop)
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn stream_completion(
            &self,
            _model: &str,
            messages: &[Message],
        ) -> Result<Box<dyn AsyncMessageIterator>, Error> {
            self.requests.lock().unwrap().push(messages.to_vec());

            Ok(Box::new(ScriptedCompletion {
                fragments: self.fragments.iter().copied().collect(),
                stall: self.stall,
            }))
        }
    }

    struct FailingClient;

    #[async_trait]
    impl ChatClient for FailingClient {
        async fn stream_completion(
            &self,
            _model: &str,
            _messages: &[Message],
        ) -> Result<Box<dyn AsyncMessageIterator>, Error> {
            Err(Error::from_kind(ErrorKind::Connection))
        }
    }

    #[test]
    fn test_input_description() {
        assert_eq!(input_description(0), "");
        assert_eq!(input_description(42), "42 of 10000");
        assert_eq!(
            input_description(10000),
            "10000 of 10000. Max characters reached."
        );
    }

    #[test]
    fn test_request_validation() {
        let err = TranslationRequest::new("", "French").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyInput);

        let long = "a".repeat(MAX_INPUT_CHARS + 1);
        let err = TranslationRequest::new(&long, "French").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputTooLong);

        let limit = "é".repeat(MAX_INPUT_CHARS);
        assert!(TranslationRequest::new(&limit, "French").is_ok());

        let err = TranslationRequest::new("hello", "Klingon").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedLanguage);
    }

    #[test]
    fn test_prompt() {
        let request = TranslationRequest::new("good morning", "french").unwrap();

        assert_eq!(request.language(), "French");

        let messages = request.messages();
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(
            messages[1].content,
            "Translate the following text to French: 'good morning'"
        );
    }

    #[tokio::test]
    async fn test_fragments_accumulate() {
        let client = ScriptedClient::new(vec!["Bon", "jour", " le monde"], false);
        let request = TranslationRequest::new("hello world", "French").unwrap();
        let mut seen = Vec::new();

        let translation = translate(
            &client,
            "phi3",
            &request,
            |f| seen.push(f.to_string()),
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(translation.text, "Bonjour le monde");
        assert!(!translation.cancelled);
        assert_eq!(translation.finish_reason, Some(FinishReason::Stop));
        assert_eq!(seen, vec!["Bon", "jour", " le monde"]);
        assert_eq!(client.requests.lock().unwrap()[0], request.messages());
    }

    #[tokio::test]
    async fn test_cancel_keeps_partial_text() {
        let client = ScriptedClient::new(vec!["Hola", " mundo"], true);
        let request = TranslationRequest::new("hello world", "Spanish").unwrap();

        let (tx, rx) = oneshot::channel::<()>();
        let mut tx = Some(tx);
        let mut fragments = 0;

        let translation = translate(
            &client,
            "phi3",
            &request,
            |_| {
                fragments += 1;

                if fragments == 2 {
                    if let Some(tx) = tx.take() {
                        let _ = tx.send(());
                    }
                }
            },
            async {
                let _ = rx.await;
            },
        )
        .await
        .unwrap();

        assert!(translation.cancelled);
        assert_eq!(translation.text, "Hola mundo");
        assert_eq!(translation.finish_reason, None);
    }

    #[tokio::test]
    async fn test_client_errors_propagate() {
        let request = TranslationRequest::new("hello", "German").unwrap();

        let err = translate(&FailingClient, "phi3", &request, |_| {}, std::future::pending())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
