//! MCP server for mcpd
//! Provides a JSON-RPC based API for AI assistants to drive the request
//! engine, health checks, and boot inspection.

pub mod handlers;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};

/// MCP Server configuration
pub struct McpServer {
    pub name: String,
    pub version: String,
}

impl Default for McpServer {
    fn default() -> Self {
        Self {
            name: "mcpd-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// JSON-RPC request structure
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<serde_json::Value>,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response structure
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<serde_json::Value>, code: i32, message: &str) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.to_string(),
                data: None,
            }),
        }
    }
}

/// MCP Tool definition
#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

impl McpServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the MCP server (stdio mode)
    pub fn run(&self) -> Result<()> {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        let reader = BufReader::new(stdin.lock());

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }

            let response = self.handle_request(&line);
            let response_json = serde_json::to_string(&response)?;
            writeln!(stdout, "{}", response_json)?;
            stdout.flush()?;
        }

        Ok(())
    }

    /// Handle a single JSON-RPC request
    fn handle_request(&self, input: &str) -> JsonRpcResponse {
        // Parse the request
        let request: JsonRpcRequest = match serde_json::from_str(input) {
            Ok(r) => r,
            Err(e) => {
                return JsonRpcResponse::error(None, -32700, &format!("Parse error: {}", e));
            }
        };

        // Route to handler
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => self.handle_list_tools(request.id),
            "tools/call" => self.handle_call_tool(request.id, request.params),
            _ => JsonRpcResponse::error(
                request.id,
                -32601,
                &format!("Method not found: {}", request.method),
            ),
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, id: Option<serde_json::Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            serde_json::json!({
                "protocolVersion": "2024-11-05",
                "serverInfo": {
                    "name": self.name,
                    "version": self.version
                },
                "capabilities": {
                    "tools": {}
                }
            }),
        )
    }

    /// Handle list tools request
    fn handle_list_tools(&self, id: Option<serde_json::Value>) -> JsonRpcResponse {
        let tools = vec![
            Tool {
                name: "handle_request".to_string(),
                description: "Classify and handle an operator request: routes it through the model chains, then either executes the planned commands, reports why nothing ran, or returns a structured explanation.".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The operator request (any language)"
                        }
                    },
                    "required": ["text"]
                }),
            },
            Tool {
                name: "health_status".to_string(),
                description: "Run the service health checks (unit state, heartbeat freshness, secrets, runtime directory) and return structured results with an aggregate healthy flag.".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "category": {
                            "type": "string",
                            "enum": ["service", "state", "secrets", "cloud"],
                            "description": "Only run checks in this category"
                        },
                        "cloud": {
                            "type": "boolean",
                            "description": "Include the cloud endpoint probe (network round trip, default: false)"
                        }
                    },
                    "required": []
                }),
            },
            Tool {
                name: "verify_cloud".to_string(),
                description: "Probe the cloud endpoint with the configured bearer credential and return exactly one classified outcome: success, invalid-credential, rate-limited, server-error, network-unreachable, name-resolution-failure, or failure.".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
            Tool {
                name: "run_boot_check".to_string(),
                description: "Probe the host for the failure patterns learned from past incidents (OOM, DISK, SERVICE, NETWORK) and write boot_report.json.".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
            Tool {
                name: "list_incidents".to_string(),
                description: "List recorded incidents (failed commands, exhausted model chains) with their learned pattern tags, most recent last.".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "limit": {
                            "type": "number",
                            "description": "Only return the most recent N incidents (default: 20)"
                        }
                    },
                    "required": []
                }),
            },
        ];

        JsonRpcResponse::success(id, serde_json::json!({ "tools": tools }))
    }

    /// Handle tool call request
    fn handle_call_tool(
        &self,
        id: Option<serde_json::Value>,
        params: serde_json::Value,
    ) -> JsonRpcResponse {
        let name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or(serde_json::json!({}));

        let result = match name {
            "handle_request" => handlers::handle_request(&arguments),
            "health_status" => handlers::health_status(&arguments),
            "verify_cloud" => handlers::verify_cloud(&arguments),
            "run_boot_check" => handlers::run_boot_check(&arguments),
            "list_incidents" => handlers::list_incidents(&arguments),
            _ => {
                return JsonRpcResponse::error(id, -32602, &format!("Unknown tool: {}", name));
            }
        };

        match result {
            Ok(content) => JsonRpcResponse::success(
                id,
                serde_json::json!({
                    "content": [{
                        "type": "text",
                        "text": serde_json::to_string_pretty(&content).unwrap_or_default()
                    }]
                }),
            ),
            Err(e) => JsonRpcResponse::error(id, -32000, &e.to_string()),
        }
    }
}
