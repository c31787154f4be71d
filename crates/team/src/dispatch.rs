//! Tool dispatch — recognizing and executing agent tool requests.
//!
//! The primary contract is typed: a `ToolCall` message carries a serialized
//! `ToolRequest` and dispatch is a registry lookup. A free-text addressed
//! request ("FileHandler, please use the write tool, filename: x,
//! content: ...") is also recognized for backends without function calling;
//! the parser tolerates exactly that phrasing and nothing fancier.
//! Malformed requests become error ToolResults, never crashes and never
//! silence.

use colloquy_core::provider::ProviderToolCall;
use colloquy_core::spec::AgentSpec;
use colloquy_core::tool::{ToolOutcome, ToolRegistry, ToolRequest, ToolStatus};
use colloquy_core::transcript::{AgentId, Message, MessageKind};
use std::time::Instant;
use tracing::{debug, warn};

/// Speaker id used for ToolResult messages appended by the dispatcher.
pub const TOOL_SPEAKER: &str = "tools";

/// The fixed invocation phrasing of the free-text protocol.
const INVOKE_PHRASE: &str = "please use the ";
const TOOL_MARKER: &str = " tool";
const FIELD_LABELS: [&str; 2] = ["filename:", "content:"];

/// What one dispatch produced, for transcript append and event reporting.
#[derive(Debug)]
pub struct Dispatched {
    /// The ToolResult message to append.
    pub message: Message,

    pub tool_name: String,
    pub requesting_agent: AgentId,
    pub success: bool,
    pub duration_ms: u64,
}

pub struct ToolDispatcher {
    registry: ToolRegistry,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Inspect a finalized message and execute any tool request it carries.
    ///
    /// Runs only for speakers whose spec declares tool invocation. Returns
    /// `None` when the message carries no recognizable request.
    pub async fn dispatch(&self, spec: &AgentSpec, message: &Message) -> Option<Dispatched> {
        if !spec.capabilities.can_invoke_tools {
            return None;
        }

        let request = match message.kind {
            MessageKind::ToolCall => {
                match serde_json::from_str::<ToolRequest>(&message.content) {
                    Ok(req) => Ok(req),
                    Err(e) => Err(format!("unreadable tool request: {e}")),
                }
            }
            MessageKind::Text => parse_text_request(&message.speaker, &message.content)?,
            _ => return None,
        };

        Some(match request {
            Ok(req) => self.run(req).await,
            Err(explanation) => {
                warn!(speaker = %message.speaker, %explanation, "Malformed tool request");
                Dispatched {
                    message: Message::tool_result(
                        TOOL_SPEAKER,
                        render_outcome("request", &ToolOutcome::error(&explanation)),
                    ),
                    tool_name: "request".into(),
                    requesting_agent: message.speaker.clone(),
                    success: false,
                    duration_ms: 0,
                }
            }
        })
    }

    /// Execute a typed request; failures become error outcomes.
    async fn run(&self, request: ToolRequest) -> Dispatched {
        debug!(tool = %request.tool, agent = %request.requesting_agent, "Dispatching tool");
        let started = Instant::now();

        let outcome = match self.registry.execute(&request).await {
            Ok(outcome) => outcome,
            Err(e) => ToolOutcome::error(e.to_string()),
        };

        let duration_ms = started.elapsed().as_millis() as u64;

        Dispatched {
            message: Message::tool_result(TOOL_SPEAKER, render_outcome(&request.tool, &outcome)),
            tool_name: request.tool,
            requesting_agent: request.requesting_agent,
            success: outcome.is_ok(),
            duration_ms,
        }
    }
}

/// Render an outcome as the ToolResult message body.
fn render_outcome(tool: &str, outcome: &ToolOutcome) -> String {
    let status = match outcome.status {
        ToolStatus::Ok => "ok",
        ToolStatus::Error => "error",
    };
    format!("{tool} {status}: {}", outcome.payload)
}

/// Build a typed request from a backend function call.
pub fn request_from_provider_call(
    speaker: &AgentId,
    call: &ProviderToolCall,
) -> Result<ToolRequest, String> {
    let args: serde_json::Value = serde_json::from_str(&call.arguments)
        .map_err(|e| format!("tool '{}' got unparseable arguments: {e}", call.name))?;
    Ok(ToolRequest {
        tool: call.name.clone(),
        args,
        requesting_agent: speaker.clone(),
    })
}

/// Recognize the addressed free-text protocol in a text message.
///
/// Returns `None` for plain conversation, `Some(Err(..))` when the
/// invocation phrasing is present but malformed, `Some(Ok(..))` for a
/// well-formed request.
pub fn parse_text_request(
    speaker: &AgentId,
    text: &str,
) -> Option<Result<ToolRequest, String>> {
    let phrase_at = text.find(INVOKE_PHRASE)?;

    // The pattern is addressed: "<AgentName>, please use the ...".
    if text[..phrase_at].trim().trim_end_matches(',').is_empty() {
        return Some(Err(
            "tool request is missing the target agent name before the invocation phrase".into(),
        ));
    }

    let after_phrase = &text[phrase_at + INVOKE_PHRASE.len()..];
    let Some(marker_at) = after_phrase.find(TOOL_MARKER) else {
        return Some(Err(format!(
            "tool request is missing the '{}' marker after the tool name",
            TOOL_MARKER.trim()
        )));
    };

    let tool = after_phrase[..marker_at].trim();
    if tool.is_empty() || tool.contains(char::is_whitespace) {
        return Some(Err(format!("'{tool}' is not a recognizable tool name")));
    }

    let fields_text = &after_phrase[marker_at + TOOL_MARKER.len()..];
    let mut args = serde_json::Map::new();

    for label in FIELD_LABELS {
        if let Some(value) = extract_field(fields_text, label) {
            let key = label.trim_end_matches(':');
            args.insert(key.into(), serde_json::Value::String(value));
        }
    }

    if args.is_empty() {
        return Some(Err(format!(
            "tool request for '{tool}' has no recognizable fields (expected {})",
            FIELD_LABELS.join(" / ")
        )));
    }

    Some(Ok(ToolRequest {
        tool: tool.to_string(),
        args: serde_json::Value::Object(args),
        requesting_agent: speaker.clone(),
    }))
}

/// Pull one labeled field value out of the request tail.
///
/// A field runs from its label to the next known label (or end of text).
/// `content:` may span commas and newlines, so labels are located first.
fn extract_field(text: &str, label: &str) -> Option<String> {
    let start = text.find(label)? + label.len();
    let rest = &text[start..];

    let end = FIELD_LABELS
        .iter()
        .filter(|other| **other != label)
        .filter_map(|other| rest.find(other))
        .min()
        .unwrap_or(rest.len());

    let value = rest[..end].trim().trim_end_matches(',').trim();
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use colloquy_core::error::ToolError;
    use colloquy_core::tool::Tool;

    struct UpperTool;

    #[async_trait]
    impl Tool for UpperTool {
        fn name(&self) -> &str {
            "upper"
        }
        fn description(&self) -> &str {
            "Uppercases the content field"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({ "type": "object" })
        }
        async fn execute(
            &self,
            arguments: serde_json::Value,
        ) -> Result<ToolOutcome, ToolError> {
            let content = arguments["content"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("Missing 'content'".into()))?;
            Ok(ToolOutcome::ok(content.to_uppercase()))
        }
    }

    fn dispatcher() -> ToolDispatcher {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(UpperTool));
        ToolDispatcher::new(registry)
    }

    fn invoking_spec(id: &str) -> AgentSpec {
        let mut spec = AgentSpec::new(id, "directive");
        spec.capabilities.can_invoke_tools = true;
        spec
    }

    // ── free-text parsing ──

    #[test]
    fn parses_well_formed_request() {
        let speaker = AgentId::new("generator");
        let text = "FileHandler, please use the write tool, filename: course, \
                    content: # Lesson\nline two, with a comma";

        let request = parse_text_request(&speaker, text).unwrap().unwrap();
        assert_eq!(request.tool, "write");
        assert_eq!(request.args["filename"], "course");
        assert_eq!(request.args["content"], "# Lesson\nline two, with a comma");
        assert_eq!(request.requesting_agent, speaker);
    }

    #[test]
    fn plain_text_is_not_a_request() {
        let speaker = AgentId::new("a");
        assert!(parse_text_request(&speaker, "The tool of choice is patience.").is_none());
    }

    #[test]
    fn missing_addressee_is_malformed() {
        let speaker = AgentId::new("a");
        let result = parse_text_request(&speaker, "please use the write tool, filename: x");
        assert!(result.unwrap().is_err());
    }

    #[test]
    fn missing_fields_is_malformed() {
        let speaker = AgentId::new("a");
        let result = parse_text_request(&speaker, "Handler, please use the write tool, thanks");
        let err = result.unwrap().unwrap_err();
        assert!(err.contains("no recognizable fields"));
    }

    #[test]
    fn garbled_tool_name_is_malformed() {
        let speaker = AgentId::new("a");
        let result =
            parse_text_request(&speaker, "Handler, please use the big red tool, filename: x");
        assert!(result.unwrap().is_err());
    }

    // ── dispatch ──

    #[tokio::test]
    async fn dispatch_runs_text_protocol_request() {
        let d = dispatcher();
        let message = Message::text(
            "caller",
            "Handler, please use the upper tool, content: shout this",
        );

        let dispatched = d.dispatch(&invoking_spec("caller"), &message).await.unwrap();
        assert!(dispatched.success);
        assert_eq!(dispatched.message.kind, MessageKind::ToolResult);
        assert!(dispatched.message.content.contains("SHOUT THIS"));
        assert_eq!(dispatched.message.speaker.as_str(), TOOL_SPEAKER);
    }

    #[tokio::test]
    async fn dispatch_runs_typed_request() {
        let d = dispatcher();
        let request = ToolRequest {
            tool: "upper".into(),
            args: serde_json::json!({ "content": "typed path" }),
            requesting_agent: AgentId::new("caller"),
        };
        let message = Message::tool_call("caller", serde_json::to_string(&request).unwrap());

        let dispatched = d.dispatch(&invoking_spec("caller"), &message).await.unwrap();
        assert!(dispatched.success);
        assert!(dispatched.message.content.contains("TYPED PATH"));
    }

    #[tokio::test]
    async fn unknown_tool_becomes_error_result() {
        let d = dispatcher();
        let message = Message::text(
            "caller",
            "Handler, please use the shred tool, filename: x",
        );

        let dispatched = d.dispatch(&invoking_spec("caller"), &message).await.unwrap();
        assert!(!dispatched.success);
        assert!(dispatched.message.content.contains("error"));
        assert!(dispatched.message.content.contains("shred"));
    }

    #[tokio::test]
    async fn non_invoking_speaker_is_ignored() {
        let d = dispatcher();
        let message = Message::text(
            "bystander",
            "Handler, please use the upper tool, content: nope",
        );

        let spec = AgentSpec::new("bystander", "directive");
        assert!(d.dispatch(&spec, &message).await.is_none());
    }

    #[tokio::test]
    async fn malformed_request_becomes_error_result() {
        let d = dispatcher();
        let message = Message::text("caller", "please use the upper tool, content: x");

        let dispatched = d.dispatch(&invoking_spec("caller"), &message).await.unwrap();
        assert!(!dispatched.success);
        assert!(dispatched.message.content.contains("target agent name"));
    }

    #[test]
    fn provider_call_conversion() {
        let call = ProviderToolCall {
            id: "call_1".into(),
            name: "write".into(),
            arguments: r#"{"filename":"x"}"#.into(),
        };
        let request = request_from_provider_call(&AgentId::new("a"), &call).unwrap();
        assert_eq!(request.tool, "write");
        assert_eq!(request.args["filename"], "x");

        let bad = ProviderToolCall {
            id: "call_2".into(),
            name: "write".into(),
            arguments: "not json".into(),
        };
        assert!(request_from_provider_call(&AgentId::new("a"), &bad).is_err());
    }
}
