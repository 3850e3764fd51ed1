use super::{LLMBackend, TextStream, WireMessage};
use crate::config::ChatConfig;
use crate::error::{ChatError, ChatResult};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct OllamaBackend {
    client: Client,
    endpoint: String,
    timeout: Option<Duration>,
}

impl OllamaBackend {
    pub fn new(config: &ChatConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint.clone(),
            timeout: config.request_timeout,
        })
    }

    async fn send(&self, messages: &[WireMessage], model: &str, stream: bool) -> ChatResult<reqwest::Response> {
        tracing::debug!(endpoint = %self.endpoint, model, messages = messages.len(), stream, "sending chat request");
        self.client
            .post(&self.endpoint)
            .json(&OllamaChatRequest {
                model,
                messages,
                stream,
            })
            .send()
            .await
            .map_err(|err| self.transport_error(err))
    }

    fn transport_error(&self, err: reqwest::Error) -> ChatError {
        ChatError::from_transport(&self.endpoint, err, self.timeout)
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
    response: Option<String>,
}

#[derive(Deserialize)]
struct OllamaErrorBody {
    error: Option<String>,
}

/// Reply text from a successful body: `message.content`, else `response`.
/// Empty strings count as missing.
pub(crate) fn extract_reply(body: &str) -> ChatResult<String> {
    let parsed: OllamaChatResponse =
        serde_json::from_str(body).map_err(|_| ChatError::MalformedResponse)?;
    parsed
        .message
        .and_then(|msg| msg.content)
        .filter(|content| !content.is_empty())
        .or(parsed.response.filter(|response| !response.is_empty()))
        .ok_or(ChatError::MalformedResponse)
}

/// The failure message for a non-success status: the body's `error` field when
/// there is one, the status code otherwise.
pub(crate) fn remote_error(status: u16, body: &str) -> ChatError {
    let message = serde_json::from_str::<OllamaErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .filter(|error| !error.is_empty())
        .unwrap_or_else(|| format!("HTTP error! status: {status}"));
    ChatError::Remote(message)
}

#[derive(Deserialize, Debug)]
pub struct StreamChunkMessage {
    pub content: String,
}

#[derive(Deserialize, Debug)]
pub struct StreamChunk {
    pub message: Option<StreamChunkMessage>,
    pub done: Option<bool>,
}

pub fn parse_ollama_stream_line(line_with_ws: &str) -> Option<(String, bool)> {
    let line = line_with_ws.trim();
    if line.is_empty() {
        return None;
    }
    if let Ok(parsed) = serde_json::from_str::<StreamChunk>(line) {
        let mut piece = String::new();
        if let Some(msg) = parsed.message {
            piece.push_str(&msg.content);
        }
        let done = parsed.done.unwrap_or(false);
        return Some((piece, done));
    }
    None
}

struct LineReader {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    buffer: Vec<u8>,
    finished: bool,
    endpoint: String,
    timeout: Option<Duration>,
}

impl LineReader {
    fn take_line(&mut self) -> Option<String> {
        let pos = self.buffer.iter().position(|byte| *byte == b'\n')?;
        let line: Vec<u8> = self.buffer.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    async fn next_piece(&mut self) -> Option<ChatResult<String>> {
        loop {
            if self.finished {
                return None;
            }
            if let Some(line) = self.take_line() {
                if let Some((piece, done)) = parse_ollama_stream_line(&line) {
                    self.finished = done;
                    if !piece.is_empty() {
                        return Some(Ok(piece));
                    }
                }
                continue;
            }
            match self.body.next().await {
                Some(Ok(bytes)) => self.buffer.extend_from_slice(&bytes),
                Some(Err(err)) => {
                    self.finished = true;
                    return Some(Err(ChatError::from_transport(&self.endpoint, err, self.timeout)));
                }
                None => {
                    self.finished = true;
                    let rest = String::from_utf8_lossy(&std::mem::take(&mut self.buffer)).into_owned();
                    return parse_ollama_stream_line(&rest)
                        .map(|(piece, _)| piece)
                        .filter(|piece| !piece.is_empty())
                        .map(Ok);
                }
            }
        }
    }
}

#[async_trait]
impl LLMBackend for OllamaBackend {
    async fn complete(&self, messages: &[WireMessage], model: &str) -> ChatResult<String> {
        let response = self.send(messages, model, false).await?;
        let status = response.status();
        let body = response.text().await.map_err(|err| self.transport_error(err))?;

        if status.is_success() {
            extract_reply(&body)
        } else {
            tracing::warn!(%status, "Ollama returned an error status");
            Err(remote_error(status.as_u16(), &body))
        }
    }

    async fn stream(&self, messages: &[WireMessage], model: &str) -> ChatResult<TextStream> {
        let response = self.send(messages, model, true).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(remote_error(status.as_u16(), &body));
        }

        let reader = LineReader {
            body: response.bytes_stream().map(|item| item.map(|bytes| bytes.to_vec())).boxed(),
            buffer: Vec::new(),
            finished: false,
            endpoint: self.endpoint.clone(),
            timeout: self.timeout,
        };
        let pieces = stream::unfold(reader, |mut reader| async move {
            let item = reader.next_piece().await?;
            Some((item, reader))
        });
        Ok(pieces.boxed())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
