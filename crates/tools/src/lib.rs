//! Built-in tools for colloquy agents.
//!
//! Both tools operate inside one fixed sandbox directory; invocations are
//! serialized by the single-threaded turn loop, so there is no concurrent
//! writer. A parallel turn loop would need mutual exclusion around the
//! sandbox.

pub mod file_read;
pub mod file_write;
pub mod sandbox;

pub use file_read::FileReadTool;
pub use file_write::{DEFAULT_EXTENSION, FileWriteTool};
pub use sandbox::Sandbox;

use colloquy_core::error::ToolError;
use colloquy_core::tool::ToolRegistry;
use std::path::Path;
use std::sync::Arc;

/// Build a registry with the read and write tools scoped to `base_dir`.
pub fn sandboxed_registry(base_dir: impl AsRef<Path>) -> Result<ToolRegistry, ToolError> {
    let sandbox = Arc::new(Sandbox::new(base_dir.as_ref())?);
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(FileReadTool::new(sandbox.clone())));
    registry.register(Box::new(FileWriteTool::new(sandbox)));
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_core::tool::ToolRequest;
    use colloquy_core::transcript::AgentId;

    #[tokio::test]
    async fn registry_round_trip_with_default_extension() {
        let dir = tempfile::tempdir().unwrap();
        let registry = sandboxed_registry(dir.path()).unwrap();

        let write = ToolRequest {
            tool: "write".into(),
            args: serde_json::json!({ "filename": "x", "content": "round trip" }),
            requesting_agent: AgentId::new("file_handler"),
        };
        let outcome = registry.execute(&write).await.unwrap();
        assert!(outcome.is_ok());

        let read = ToolRequest {
            tool: "read".into(),
            args: serde_json::json!({ "filename": "x.md" }),
            requesting_agent: AgentId::new("file_handler"),
        };
        let outcome = registry.execute(&read).await.unwrap();
        assert_eq!(outcome.payload, "round trip");
    }

    #[test]
    fn registry_has_both_tools() {
        let dir = tempfile::tempdir().unwrap();
        let registry = sandboxed_registry(dir.path()).unwrap();
        let mut names = registry.names();
        names.sort_unstable();
        assert_eq!(names, vec!["read", "write"]);
    }
}
