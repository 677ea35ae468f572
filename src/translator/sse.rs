//! Incremental parsing of server-sent events carrying JSON payloads, as
//! produced by [`reqwest::Response::bytes_stream`].
//!
//! Only the `data` field is used. Other fields (`event`, `id`, `retry`) and
//! comments are skipped, and the `[DONE]` sentinel that chat completion
//! endpoints send last is ignored. An event cut off by the end of the stream is
//! discarded.

use bytes::Bytes;
use futures_core::stream::Stream;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use std::marker::Unpin;

#[derive(thiserror::Error, Debug)]
pub(super) enum Error {
    #[error("the response overflowed the streaming buffer")]
    ResponseExceededBuffer,
    #[error("failed to deserialize the streamed object \"{blob}\"")]
    DeserializationFailed {
        blob: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("the source stream failed")]
    StreamFailed(#[source] reqwest::Error),
}

const DEFAULT_MAX_SIZE: usize = 1 << 22; // 4 MiB

pub(super) struct EventStream<S>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    stream: S,
    buf: Vec<u8>,
    data: Vec<u8>,
    max_size: usize,
}

impl<S: Stream<Item = reqwest::Result<Bytes>> + Unpin> EventStream<S> {
    pub(super) fn new(stream: S) -> EventStream<S> {
        Self::with_max_size(stream, DEFAULT_MAX_SIZE)
    }

    pub(super) fn with_max_size(stream: S, max_size: usize) -> EventStream<S> {
        EventStream {
            stream,
            buf: Vec::with_capacity(1 << 10),
            data: Vec::new(),
            max_size,
        }
    }

    // Consume complete lines from the buffer. Returns true once a
    // blank line terminates an event with data.
    fn take_event(&mut self) -> bool {
        while let Some(end) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=end).collect();

            line.pop();

            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if line.is_empty() {
                if self.data.is_empty() {
                    continue;
                }

                // Drop the newline that joined the last data line
                self.data.pop();

                return true;
            }

            let (field, value) = match line.iter().position(|&b| b == b':') {
                Some(i) => (&line[..i], &line[i + 1..]),
                None => (&line[..], &line[line.len()..]),
            };

            if field != b"data" {
                continue;
            }

            let value = value.strip_prefix(b" ").unwrap_or(value);

            if value == b"[DONE]" {
                continue;
            }

            self.data.extend_from_slice(value);
            self.data.push(b'\n');
        }

        false
    }

    async fn next_event(&mut self) -> Option<Result<Vec<u8>, Error>> {
        self.data.clear();

        loop {
            if self.take_event() {
                return Some(Ok(std::mem::take(&mut self.data)));
            }

            match self.stream.next().await? {
                Ok(chunk) => {
                    if chunk.len() + self.buf.len() > self.max_size {
                        return Some(Err(Error::ResponseExceededBuffer));
                    }

                    self.buf.extend_from_slice(&chunk);
                }
                Err(err) => return Some(Err(Error::StreamFailed(err))),
            }
        }
    }

    /// The payload of the next event, deserialized from JSON.
    pub(super) async fn next_json<T: DeserializeOwned>(&mut self) -> Option<Result<T, Error>> {
        let event = self.next_event().await?;

        Some(event.and_then(|bytes| {
            serde_json::from_slice::<T>(&bytes).map_err(|source| Error::DeserializationFailed {
                blob: String::from_utf8_lossy(&bytes).into_owned(),
                source,
            })
        }))
    }
}
