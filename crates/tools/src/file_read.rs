//! File read tool — read a named file from the sandbox directory.

use crate::sandbox::Sandbox;
use async_trait::async_trait;
use colloquy_core::error::ToolError;
use colloquy_core::tool::{Tool, ToolOutcome};
use std::sync::Arc;
use tracing::debug;

pub struct FileReadTool {
    sandbox: Arc<Sandbox>,
}

impl FileReadTool {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "read"
    }

    fn description(&self) -> &str {
        "Read the content of a named file from the shared working directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "The file to read, relative to the working directory"
                }
            },
            "required": ["filename"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolOutcome, ToolError> {
        let filename = arguments["filename"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'filename' argument".into()))?;

        let path = self.sandbox.resolve(filename)?;

        if !path.exists() {
            return Err(ToolError::FileNotFound(filename.to_string()));
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                debug!(file = %path.display(), bytes = content.len(), "Read file");
                Ok(ToolOutcome::ok(content))
            }
            Err(e) => Err(ToolError::IoFailure {
                tool_name: "read".into(),
                reason: e.to_string(),
            }),
        }
    }
}
