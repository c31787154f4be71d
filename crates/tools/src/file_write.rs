//! File write tool — save content to a named file in the sandbox directory.
//!
//! Filenames without an extension get the markdown default appended before
//! resolution. Existing files are overwritten unconditionally.

use crate::sandbox::Sandbox;
use async_trait::async_trait;
use colloquy_core::error::ToolError;
use colloquy_core::tool::{Tool, ToolOutcome};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Extension appended when a filename has none.
pub const DEFAULT_EXTENSION: &str = "md";

pub struct FileWriteTool {
    sandbox: Arc<Sandbox>,
}

impl FileWriteTool {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "write"
    }

    fn description(&self) -> &str {
        "Save content to a named file in the shared working directory. \
         Overwrites the file if it already exists."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "The file to write, relative to the working directory. \
                                    '.md' is appended when no extension is given."
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["filename", "content"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolOutcome, ToolError> {
        let filename = arguments["filename"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'filename' argument".into()))?;

        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        let filename = if Path::new(filename).extension().is_none() {
            format!("{filename}.{DEFAULT_EXTENSION}")
        } else {
            filename.to_string()
        };

        let path = self.sandbox.resolve(&filename)?;

        match tokio::fs::write(&path, content).await {
            Ok(()) => {
                debug!(file = %path.display(), bytes = content.len(), "Wrote file");
                Ok(ToolOutcome::ok(format!(
                    "Saved {} bytes to {}",
                    content.len(),
                    path.display()
                )))
            }
            Err(e) => Err(ToolError::IoFailure {
                tool_name: "write".into(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox_in(dir: &tempfile::TempDir) -> Arc<Sandbox> {
        Arc::new(Sandbox::new(dir.path()).unwrap())
    }

    #[tokio::test]
    async fn write_and_verify() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileWriteTool::new(sandbox_in(&dir));

        let outcome = tool
            .execute(serde_json::json!({
                "filename": "course.md",
                "content": "# Prompt Engineering"
            }))
            .await
            .unwrap();

        assert!(outcome.is_ok());
        assert!(outcome.payload.contains("course.md"));

        let content = std::fs::read_to_string(dir.path().join("course.md")).unwrap();
        assert_eq!(content, "# Prompt Engineering");
    }

    #[tokio::test]
    async fn missing_extension_gets_markdown_default() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileWriteTool::new(sandbox_in(&dir));

        tool.execute(serde_json::json!({
            "filename": "outline",
            "content": "sections"
        }))
        .await
        .unwrap();

        assert!(dir.path().join("outline.md").exists());
        assert!(!dir.path().join("outline").exists());
    }

    #[tokio::test]
    async fn overwrite_keeps_second_content() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileWriteTool::new(sandbox_in(&dir));

        for content in ["first draft", "second draft"] {
            tool.execute(serde_json::json!({
                "filename": "draft.md",
                "content": content
            }))
            .await
            .unwrap();
        }

        let content = std::fs::read_to_string(dir.path().join("draft.md")).unwrap();
        assert_eq!(content, "second draft");
    }

    #[tokio::test]
    async fn missing_content_argument() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileWriteTool::new(sandbox_in(&dir));

        let err = tool
            .execute(serde_json::json!({ "filename": "x.md" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileWriteTool::new(sandbox_in(&dir));

        let err = tool
            .execute(serde_json::json!({
                "filename": "../outside.md",
                "content": "escape"
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SandboxViolation(_)));
    }
}
