//! Shared MCP plumbing for the case image servers
//!
//! - **Initialization**: [`init_tracing`] sets up stderr logging
//! - **Errors**: [`IntoMcpError`] and [`ResultExt`] map server errors to MCP errors
//! - **Results**: [`json_success`] and [`text_success`] build tool responses

pub mod error;
pub mod init;
pub mod result;

pub use error::{IntoMcpError, McpResult, ResultExt};
pub use init::init_tracing;
pub use result::{json_success, text_success};

pub use rmcp::{model::CallToolResult, ErrorData as McpError};
