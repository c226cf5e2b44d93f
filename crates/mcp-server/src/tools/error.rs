use issue_graph::{FetchError, GraphError};
use rmcp::model::{CallToolResult, Content};
use serde_json::json;
use thiserror::Error;

/// Failure reported back to the MCP client as a tool error, not a transport error
#[derive(Debug, Error)]
pub(crate) enum ToolError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    pub(crate) const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal",
        }
    }

    pub(crate) fn into_result(self) -> CallToolResult {
        let message = self.to_string();
        let mut result = CallToolResult::error(vec![Content::text(message.clone())]);
        result.structured_content = Some(json!({
            "error": { "code": self.code(), "message": message }
        }));
        result
    }
}

impl From<GraphError> for ToolError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            GraphError::FocusUnavailable {
                source: FetchError::NotFound | FetchError::Forbidden,
                ..
            } => Self::NotFound(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}
