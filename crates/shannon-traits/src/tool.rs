//! Tool execution contract. The sandboxed code-exec runtime and any tool
//! backends are opaque per spec.md §1, so this crate only owns the trait +
//! result shape.

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ToolError {
    pub kind: String,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: kind.into(), message: message.into() }
    }
}

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub success: bool,
    pub result: Value,
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn success(result: Value) -> Self {
        Self { success: true, result, error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, result: Value::Null, error: Some(message.into()) }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError>;
}
