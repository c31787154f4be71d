//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, Ollama, vLLM, and any endpoint exposing an
//! OpenAI-compatible `/v1/chat/completions` API.
//!
//! Supports:
//! - Chat completions (non-streaming and streaming SSE)
//! - Tool use / function calling

use async_trait::async_trait;
use colloquy_core::error::ProviderError;
use colloquy_core::provider::{
    ChatMessage, ChatRole, Provider, ProviderRequest, ProviderResponse, ProviderToolCall,
    StreamChunk, ToolDefinition, Usage,
};
use futures::StreamExt;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create an Ollama provider (convenience constructor).
    ///
    /// Ollama exposes the OpenAI-compatible API and ignores the key.
    pub fn ollama(base_url: Option<&str>) -> Result<Self, ProviderError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama",
        )
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    fn request_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": match m.role {
                        ChatRole::System => "system",
                        ChatRole::User => "user",
                        ChatRole::Assistant => "assistant",
                    },
                    "content": m.content,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
            "stream": stream,
        });

        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        body
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
        tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect()
    }

    async fn post(
        &self,
        body: &serde_json::Value,
        accept: &str,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", accept)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }
        if status == 404 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ModelNotFound(error_body));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let body = Self::request_body(&request, false);
        let response = self.post(&body, "application/json").await?;

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ProviderToolCall {
                id: tc.id.unwrap_or_default(),
                name: tc.function.name.unwrap_or_default(),
                arguments: tc.function.arguments.unwrap_or_default(),
            })
            .collect();

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage: api_response.usage.map(Usage::from),
            model: api_response.model,
        })
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let body = Self::request_body(&request, true);
        let response = self.post(&body, "text/event-stream").await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Read the SSE byte stream and parse chunks on a background task.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut tool_calls: HashMap<u32, ToolCallAccumulator> = HashMap::new();
            let mut usage: Option<Usage> = None;

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // SSE frames are newline-delimited `data: {...}` lines.
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };

                    if data == "[DONE]" {
                        let _ = tx
                            .send(Ok(StreamChunk {
                                content: None,
                                tool_calls: drain_tool_calls(&mut tool_calls),
                                done: true,
                                usage: usage.take(),
                            }))
                            .await;
                        return;
                    }

                    let parsed: ApiStreamChunk = match serde_json::from_str(data) {
                        Ok(p) => p,
                        Err(e) => {
                            warn!(error = %e, "Skipping unparseable stream frame");
                            continue;
                        }
                    };

                    if let Some(u) = parsed.usage {
                        usage = Some(Usage::from(u));
                    }

                    let Some(choice) = parsed.choices.into_iter().next() else {
                        continue;
                    };

                    for tc in choice.delta.tool_calls.unwrap_or_default() {
                        let acc = tool_calls.entry(tc.index.unwrap_or(0)).or_default();
                        if let Some(id) = tc.id {
                            acc.id = id;
                        }
                        if let Some(name) = tc.function.name {
                            acc.name.push_str(&name);
                        }
                        if let Some(args) = tc.function.arguments {
                            acc.arguments.push_str(&args);
                        }
                    }

                    if let Some(content) = choice.delta.content
                        && !content.is_empty()
                        && tx
                            .send(Ok(StreamChunk {
                                content: Some(content),
                                tool_calls: vec![],
                                done: false,
                                usage: None,
                            }))
                            .await
                            .is_err()
                    {
                        // Receiver dropped, stop reading.
                        return;
                    }
                }
            }

            // Stream ended without an explicit [DONE] (Ollama does this).
            let _ = tx
                .send(Ok(StreamChunk {
                    content: None,
                    tool_calls: drain_tool_calls(&mut tool_calls),
                    done: true,
                    usage: usage.take(),
                }))
                .await;
        });

        Ok(rx)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

#[derive(Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    arguments: String,
}

fn drain_tool_calls(acc: &mut HashMap<u32, ToolCallAccumulator>) -> Vec<ProviderToolCall> {
    let mut entries: Vec<_> = acc.drain().collect();
    entries.sort_by_key(|(index, _)| *index);
    entries
        .into_iter()
        .map(|(_, a)| ProviderToolCall {
            id: a.id,
            name: a.name,
            arguments: a.arguments,
        })
        .collect()
}

// ── API wire types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
    model: String,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Deserialize)]
struct ApiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Deserialize)]
struct ApiToolCall {
    id: Option<String>,
    function: ApiFunction,
}

#[derive(Deserialize)]
struct ApiFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct ApiStreamChunk {
    #[serde(default)]
    choices: Vec<ApiStreamChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiStreamChoice {
    delta: ApiDelta,
}

#[derive(Deserialize)]
struct ApiDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCallDelta>>,
}

#[derive(Deserialize)]
struct ApiToolCallDelta {
    index: Option<u32>,
    id: Option<String>,
    function: ApiFunctionDelta,
}

#[derive(Deserialize)]
struct ApiFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<ApiUsage> for Usage {
    fn from(u: ApiUsage) -> Self {
        Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_includes_tools_when_declared() {
        let request = ProviderRequest {
            model: "qwen3:30b".into(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.7,
            max_tokens: Some(512),
            tools: vec![ToolDefinition {
                name: "write".into(),
                description: "Save a file".into(),
                parameters: serde_json::json!({ "type": "object" }),
            }],
        };

        let body = OpenAiCompatProvider::request_body(&request, false);
        assert_eq!(body["model"], "qwen3:30b");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["tools"][0]["function"]["name"], "write");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn streaming_body_requests_usage() {
        let request = ProviderRequest {
            model: "m".into(),
            messages: vec![],
            temperature: 0.7,
            max_tokens: None,
            tools: vec![],
        };
        let body = OpenAiCompatProvider::request_body(&request, true);
        assert_eq!(body["stream"], true);
        assert_eq!(body["stream_options"]["include_usage"], true);
    }

    #[test]
    fn stream_frame_parses_delta() {
        let data = r#"{"choices":[{"delta":{"content":"Hel"}}]}"#;
        let parsed: ApiStreamChunk = serde_json::from_str(data).unwrap();
        let choice = parsed.choices.into_iter().next().unwrap();
        assert_eq!(choice.delta.content.as_deref(), Some("Hel"));
    }

    #[test]
    fn tool_call_deltas_accumulate_in_index_order() {
        let mut acc: HashMap<u32, ToolCallAccumulator> = HashMap::new();
        acc.insert(
            1,
            ToolCallAccumulator {
                id: "b".into(),
                name: "write".into(),
                arguments: "{}".into(),
            },
        );
        acc.insert(
            0,
            ToolCallAccumulator {
                id: "a".into(),
                name: "read".into(),
                arguments: "{}".into(),
            },
        );

        let calls = drain_tool_calls(&mut acc);
        assert_eq!(calls[0].name, "read");
        assert_eq!(calls[1].name, "write");
        assert!(acc.is_empty());
    }

    #[test]
    fn ollama_constructor_defaults_base_url() {
        let provider = OpenAiCompatProvider::ollama(None).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.base_url, "http://localhost:11434/v1");
    }
}
