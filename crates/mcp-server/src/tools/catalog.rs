use super::IssueGraphService;
use serde_json::{json, Value};

/// `--print-tools` payload: server version plus every tool with its input schema
pub fn tool_inventory_json(version: &str) -> String {
    let tools: Vec<Value> = IssueGraphService::tools()
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool.input_schema.as_ref(),
            })
        })
        .collect();
    let payload = json!({
        "server": "issue-graph-mcp",
        "version": version,
        "tools": tools,
    });
    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
}
