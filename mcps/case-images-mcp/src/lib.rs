//! Case Images MCP Library
//!
//! MCP front end for `case-aggregator`: multi-term image search with
//! per-term "load more" and ZIP archive download.
//!
//! ```rust,ignore
//! use case_images_mcp::CaseImagesMcpServer;
//!
//! let server = CaseImagesMcpServer::new(case_aggregator::Config::load()?)?;
//! ```

pub mod error;
pub mod handlers;
pub mod params;
pub mod server;

pub use error::ToolError;
pub use server::CaseImagesMcpServer;

pub use params::*;
