use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;

use crate::error::{EngineError, Result};
use crate::models::config::ModelPreset;
use crate::models::seat::Turn;

/// One streamed fragment. A chunk may carry a reasoning fragment, a content
/// fragment, both, or neither.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionChunk {
    pub reasoning: Option<String>,
    pub content: Option<String>,
}

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<CompletionChunk>> + Send>>;

/// What the completion service hands back for one request: a complete
/// string, or a chunk stream to be demuxed.
pub enum CompletionOutput {
    Full(String),
    Stream(ChunkStream),
}

impl std::fmt::Debug for CompletionOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionOutput::Full(s) => f.debug_tuple("Full").field(s).finish(),
            CompletionOutput::Stream(_) => f.debug_tuple("Stream").field(&"..").finish(),
        }
    }
}

/// The black-box completion capability: given an ordered, role-tagged
/// transcript and a model identifier, produce a reply. Retries and timeouts
/// are the service's concern, not the engine's.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, model: &str, turns: &[Turn]) -> Result<CompletionOutput>;
}

/// Two-channel demux for streamed completions. Reasoning tokens always
/// precede content tokens for a turn; the reasoning channel closes
/// permanently the moment the first content fragment arrives, and any
/// reasoning fragment after that is discarded.
#[derive(Debug, Default)]
pub struct StreamDemux {
    reasoning: String,
    content: String,
    reasoning_closed: bool,
}

impl StreamDemux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &CompletionChunk) {
        if let Some(r) = chunk.reasoning.as_deref() {
            if !self.reasoning_closed && !r.is_empty() {
                self.reasoning.push_str(r);
            }
        }
        if let Some(c) = chunk.content.as_deref() {
            if !c.is_empty() {
                self.reasoning_closed = true;
                self.content.push_str(c);
            }
        }
    }

    pub fn reasoning_closed(&self) -> bool {
        self.reasoning_closed
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.reasoning.is_empty() && self.content.is_empty()
    }

    /// The final message text: `<think>reasoning</think>content` when the
    /// turn carried reasoning, else just the content.
    pub fn assembled(&self) -> String {
        if self.reasoning.is_empty() {
            self.content.clone()
        } else {
            format!("<think>{}</think>{}", self.reasoning, self.content)
        }
    }
}

/// Client for any OpenAI-compatible chat-completions endpoint, consuming
/// the response as an SSE chunk stream.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(preset: &ModelPreset) -> Self {
        OpenAiClient {
            http: reqwest::Client::new(),
            base_url: preset.base_url.trim_end_matches('/').to_string(),
            api_key: preset.api_key.clone(),
        }
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, model: &str, turns: &[Turn]) -> Result<CompletionOutput> {
        let body = json!({
            "model": model,
            "messages": turns,
            "stream": true,
        });
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::CompletionFailure(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EngineError::CompletionFailure(format!(
                "endpoint returned {status}: {detail}"
            )));
        }
        let bytes = response
            .bytes_stream()
            .map(|r| r.map(|b| b.to_vec()))
            .boxed();
        Ok(CompletionOutput::Stream(sse_chunk_stream(bytes)))
    }
}

#[derive(Deserialize)]
struct ApiChunk {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    #[serde(default)]
    delta: ApiDelta,
}

#[derive(Deserialize, Default)]
struct ApiDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

fn parse_data_line(data: &str) -> Result<Option<CompletionChunk>> {
    let parsed: ApiChunk = serde_json::from_str(data)
        .map_err(|e| EngineError::CompletionFailure(format!("unparsable chunk: {e}")))?;
    let Some(choice) = parsed.choices.into_iter().next() else {
        return Ok(None);
    };
    Ok(Some(CompletionChunk {
        reasoning: choice.delta.reasoning_content,
        content: choice.delta.content,
    }))
}

/// Turns an SSE byte stream into a stream of completion chunks. Lines are
/// reassembled across network chunk boundaries; `data: [DONE]` terminates.
fn sse_chunk_stream<B>(bytes: B) -> ChunkStream
where
    B: Stream<Item = reqwest::Result<Vec<u8>>> + Send + Unpin + 'static,
{
    struct SseState<B> {
        inner: B,
        buf: String,
        done: bool,
    }

    let state = SseState {
        inner: bytes,
        buf: String::new(),
        done: false,
    };

    Box::pin(futures::stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }
        loop {
            // Drain complete lines already buffered.
            while let Some(pos) = st.buf.find('\n') {
                let line = st.buf[..pos].trim().to_string();
                st.buf.drain(..=pos);
                match sse_line(&line) {
                    SseLine::Skip => continue,
                    SseLine::Done => {
                        st.done = true;
                        return None;
                    }
                    SseLine::Data(data) => match parse_data_line(&data) {
                        Ok(None) => continue,
                        Ok(Some(chunk)) => return Some((Ok(chunk), st)),
                        Err(e) => {
                            st.done = true;
                            return Some((Err(e), st));
                        }
                    },
                }
            }
            match st.inner.next().await {
                Some(Ok(bytes)) => st.buf.push_str(&String::from_utf8_lossy(&bytes)),
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(EngineError::CompletionFailure(e.to_string())), st));
                }
                None => {
                    st.done = true;
                    // A final line without trailing newline still counts.
                    let line = st.buf.trim().to_string();
                    st.buf.clear();
                    return match sse_line(&line) {
                        SseLine::Data(data) => match parse_data_line(&data) {
                            Ok(Some(chunk)) => Some((Ok(chunk), st)),
                            Ok(None) => None,
                            Err(e) => Some((Err(e), st)),
                        },
                        _ => None,
                    };
                }
            }
        }
    }))
}

enum SseLine {
    Skip,
    Done,
    Data(String),
}

fn sse_line(line: &str) -> SseLine {
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        SseLine::Done
    } else {
        SseLine::Data(data.to_string())
    }
}
