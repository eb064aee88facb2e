//! Tracing setup for stdio MCP servers

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for an MCP server
///
/// Logs go to stderr because stdout carries the MCP protocol. Every crate in
/// `crate_names` gets an `info` directive on top of whatever `RUST_LOG`
/// says. `LOG_FORMAT=json` switches to structured JSON lines.
///
/// ```rust,ignore
/// case_common::init_tracing(&["case_images_mcp", "case_aggregator"])?;
/// ```
pub fn init_tracing(crate_names: &[&str]) -> anyhow::Result<()> {
    let mut filter = EnvFilter::from_default_env();
    for name in crate_names {
        filter = filter.add_directive(format!("{}=info", name).parse()?);
    }

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .init();
    }

    Ok(())
}
