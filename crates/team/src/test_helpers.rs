//! Scripted providers for exercising the team loop without a backend.
//!
//! Test-only; compiled into unit tests via `#[cfg(test)]` in lib.rs.

use async_trait::async_trait;
use colloquy_core::error::ProviderError;
use colloquy_core::provider::{
    Provider, ProviderRequest, ProviderResponse, ProviderToolCall, StreamChunk,
};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One canned reply a [`ScriptedProvider`] plays back.
pub enum ScriptedReply {
    /// Plain text, streamed word by word.
    Text(String),

    /// A native function call with no text.
    ToolCall { name: String, arguments: String },

    /// Emits `partial` then fails the stream.
    FailMidStream {
        partial: String,
        error: ProviderError,
    },
}

/// Plays back a fixed sequence of replies, one per invocation.
///
/// Each agent under test gets its own instance so scripts do not
/// interleave. Running past the end of the script is a test bug and
/// surfaces as an ApiError.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }

    pub fn text(replies: &[&str]) -> Self {
        Self::new(
            replies
                .iter()
                .map(|r| ScriptedReply::Text((*r).to_string()))
                .collect(),
        )
    }

    fn next_reply(&self) -> Option<ScriptedReply> {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        match self.next_reply() {
            Some(ScriptedReply::Text(content)) => Ok(ProviderResponse {
                content,
                tool_calls: vec![],
                usage: None,
                model: "scripted".into(),
            }),
            Some(ScriptedReply::ToolCall { name, arguments }) => Ok(ProviderResponse {
                content: String::new(),
                tool_calls: vec![ProviderToolCall {
                    id: "scripted_call".into(),
                    name,
                    arguments,
                }],
                usage: None,
                model: "scripted".into(),
            }),
            Some(ScriptedReply::FailMidStream { error, .. }) => Err(error),
            None => Err(ProviderError::ApiError {
                status_code: 500,
                message: "scripted provider ran out of replies".into(),
            }),
        }
    }

    async fn stream(
        &self,
        _request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let reply = self.next_reply().ok_or_else(|| ProviderError::ApiError {
            status_code: 500,
            message: "scripted provider ran out of replies".into(),
        })?;

        let (tx, rx) = tokio::sync::mpsc::channel(16);
        tokio::spawn(async move {
            match reply {
                ScriptedReply::Text(content) => {
                    for delta in word_deltas(&content) {
                        if tx
                            .send(Ok(StreamChunk {
                                content: Some(delta),
                                tool_calls: vec![],
                                done: false,
                                usage: None,
                            }))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    let _ = tx
                        .send(Ok(StreamChunk {
                            content: None,
                            tool_calls: vec![],
                            done: true,
                            usage: None,
                        }))
                        .await;
                }
                ScriptedReply::ToolCall { name, arguments } => {
                    let _ = tx
                        .send(Ok(StreamChunk {
                            content: None,
                            tool_calls: vec![ProviderToolCall {
                                id: "scripted_call".into(),
                                name,
                                arguments,
                            }],
                            done: true,
                            usage: None,
                        }))
                        .await;
                }
                ScriptedReply::FailMidStream { partial, error } => {
                    if !partial.is_empty() {
                        let _ = tx
                            .send(Ok(StreamChunk {
                                content: Some(partial),
                                tool_calls: vec![],
                                done: false,
                                usage: None,
                            }))
                            .await;
                    }
                    let _ = tx.send(Err(error)).await;
                }
            }
        });

        Ok(rx)
    }
}

/// Split text into word-sized deltas, keeping the separating spaces.
fn word_deltas(text: &str) -> Vec<String> {
    let mut deltas = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if ch == ' ' {
            deltas.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        deltas.push(current);
    }
    deltas
}
