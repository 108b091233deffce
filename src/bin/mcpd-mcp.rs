//! mcpd MCP Server Binary
//! This binary provides a JSON-RPC server for AI assistants to drive mcpd
//! using the MCP.
//!
//! ## Usage
//! The server communicates via stdio, reading JSON-RPC requests from stdin
//! and writing responses to stdout.
//!
//! ```bash
//! mcpd-mcp
//! ```
//!
//! ## Available Tools
//!
//! - `handle_request` - Classify, route, and execute/report an operator request
//! - `health_status` - Run service health checks
//! - `verify_cloud` - Probe the cloud credential and classify the outcome
//! - `run_boot_check` - Probe the host for learned failure patterns
//! - `list_incidents` - List recorded incidents and learned patterns

use mcpd::mcp::McpServer;

fn main() {
    let server = McpServer::new();

    if let Err(e) = server.run() {
        eprintln!("MCP server error: {}", e);
        std::process::exit(1);
    }
}
