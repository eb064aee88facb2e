//! Session failures as tool errors
//!
//! Errors the caller can fix (blank term lists, missing credentials, a
//! load-more before any search, an unknown term) become `invalid_params`.
//! Everything else is an `internal_error`.

use case_aggregator::SessionError;
use case_common::{IntoMcpError, McpError};

/// A [`SessionError`] on its way back to the MCP client
#[derive(Debug)]
pub struct ToolError(pub SessionError);

impl From<SessionError> for ToolError {
    fn from(err: SessionError) -> Self {
        Self(err)
    }
}

impl IntoMcpError for ToolError {
    fn into_mcp_error(self) -> McpError {
        if self.0.is_caller_error() {
            McpError::invalid_params(self.0.to_string(), None)
        } else {
            McpError::internal_error(self.0.to_string(), None)
        }
    }
}
