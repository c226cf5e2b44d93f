use anyhow::{Context, Result};
use rmcp::model::CallToolResult;
use rmcp::service::{RoleClient, RunningService};
use rmcp::{model::CallToolRequestParam, service::ServiceExt, transport::TokioChildProcess};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

fn locate_issue_graph_mcp_bin() -> Result<PathBuf> {
    if let Some(path) = option_env!("CARGO_BIN_EXE_issue-graph-mcp") {
        return Ok(PathBuf::from(path));
    }

    // `.../target/{debug|release}/deps/<test>` → `.../target/{debug|release}/issue-graph-mcp`
    if let Ok(exe) = std::env::current_exe() {
        if let Some(target_profile_dir) = exe.parent().and_then(|p| p.parent()) {
            let candidate = target_profile_dir.join("issue-graph-mcp");
            if candidate.exists() {
                return Ok(candidate);
            }
        }
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let repo_root = manifest_dir
        .ancestors()
        .nth(2)
        .context("failed to resolve repo root from CARGO_MANIFEST_DIR")?;
    for rel in ["target/debug/issue-graph-mcp", "target/release/issue-graph-mcp"] {
        let candidate = repo_root.join(rel);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    anyhow::bail!("failed to locate issue-graph-mcp binary")
}

fn write_snapshot(dir: &Path) -> Result<PathBuf> {
    let snapshot = json!({
        "items": [
            {
                "owner": "acme", "repo": "api", "number": 1, "is_pr": false,
                "title": "Roadmap", "state": "open", "labels": ["epic"],
                "sub_issues": [{ "number": 2, "title": "Login form" }]
            },
            {
                "owner": "acme", "repo": "api", "number": 2, "is_pr": false,
                "title": "Login form", "state": "open", "body": "Needs design",
                "parent": { "owner": "acme", "repo": "api", "number": 1 },
                "cross_referenced_by": [{ "owner": "acme", "repo": "api", "number": 3 }]
            },
            {
                "owner": "acme", "repo": "api", "number": 3, "is_pr": true,
                "title": "Implement login form", "state": "open", "body": "Fixes #2"
            }
        ]
    });
    let path = dir.join("snapshot.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&snapshot)?).context("write snapshot")?;
    Ok(path)
}

async fn start_server(snapshot: &Path) -> Result<RunningService<RoleClient, ()>> {
    let bin = locate_issue_graph_mcp_bin()?;
    let mut cmd = Command::new(bin);
    cmd.env("ISSUE_GRAPH_SNAPSHOT", snapshot);
    cmd.env("RUST_LOG", "warn");

    let transport = TokioChildProcess::new(cmd).context("spawn mcp server")?;
    let service = tokio::time::timeout(Duration::from_secs(10), ().serve(transport))
        .await
        .context("timeout starting MCP server")??;
    Ok(service)
}

async fn call_issue_graph(
    service: &RunningService<RoleClient, ()>,
    args: Value,
) -> Result<CallToolResult> {
    let result = tokio::time::timeout(
        Duration::from_secs(10),
        service.call_tool(CallToolRequestParam {
            name: "issue_graph".into(),
            arguments: args.as_object().cloned(),
        }),
    )
    .await
    .context("timeout calling issue_graph")??;
    Ok(result)
}

fn text_of(result: &CallToolResult) -> Result<&str> {
    result
        .content
        .first()
        .and_then(|c| c.as_text())
        .map(|t| t.text.as_str())
        .context("issue_graph did not return text content")
}

#[tokio::test]
async fn test_issue_graph_tool_over_stdio() -> Result<()> {
    let tmp = tempfile::tempdir().context("tempdir")?;
    let snapshot = write_snapshot(tmp.path())?;
    let service = start_server(&snapshot).await?;

    let tools = tokio::time::timeout(
        Duration::from_secs(10),
        service.list_tools(Default::default()),
    )
    .await
    .context("timeout listing tools")??;
    let tool_names: Vec<&str> = tools.tools.iter().map(|t| t.name.as_ref()).collect();
    assert_eq!(tool_names, vec!["issue_graph"]);

    let result = call_issue_graph(
        &service,
        json!({ "owner": "acme", "repo": "api", "issue_number": 2 }),
    )
    .await?;
    assert_ne!(result.is_error, Some(true), "issue_graph returned error");
    let text = text_of(&result)?;
    assert!(text.starts_with("GRAPH SUMMARY\n=============\nFocus: #2 (task) \"Login form\"\n"));
    assert!(text.contains("#2|task|open|Login form [FOCUS]\n"));
    assert!(text.contains("#1|epic|open|Roadmap\n"));
    assert!(text.contains("#1 → #2\n"));
    assert!(text.contains("#3 (OPEN) ↔ #2\n"));
    assert!(text.ends_with("NODES (3 total)\n"));

    let result = call_issue_graph(
        &service,
        json!({
            "owner": "acme", "repo": "api", "issue_number": 2,
            "focus": "epic", "verbose": true
        }),
    )
    .await?;
    let text = text_of(&result)?;
    assert!(text.contains("Focus: #1 (epic) \"Roadmap\"\n"));
    assert!(text.contains("Focus shifted: from #2 via sub-issue hierarchy\n"));
    assert!(text.contains("#1|epic|open|Roadmap [FOCUS]\n"));
    assert!(text.contains("CRAWL STATISTICS\n"));

    service.cancel().await.context("shutdown mcp service")?;
    Ok(())
}

#[tokio::test]
async fn test_issue_graph_tool_errors() -> Result<()> {
    let tmp = tempfile::tempdir().context("tempdir")?;
    let snapshot = write_snapshot(tmp.path())?;
    let service = start_server(&snapshot).await?;

    let missing = call_issue_graph(
        &service,
        json!({ "owner": "acme", "repo": "api", "issue_number": 999 }),
    )
    .await?;
    assert_eq!(missing.is_error, Some(true));
    let envelope = missing.structured_content.clone().unwrap_or_default();
    assert_eq!(envelope["error"]["code"], "not_found");
    assert!(text_of(&missing)?.contains("acme/api#999"));

    let bad_focus = call_issue_graph(
        &service,
        json!({ "owner": "acme", "repo": "api", "issue_number": 2, "focus": "sprint" }),
    )
    .await?;
    assert_eq!(bad_focus.is_error, Some(true));
    let envelope = bad_focus.structured_content.clone().unwrap_or_default();
    assert_eq!(envelope["error"]["code"], "invalid_request");

    let empty_owner = call_issue_graph(
        &service,
        json!({ "owner": " ", "repo": "api", "issue_number": 2 }),
    )
    .await?;
    assert_eq!(empty_owner.is_error, Some(true));
    let envelope = empty_owner.structured_content.clone().unwrap_or_default();
    assert_eq!(envelope["error"]["code"], "invalid_request");

    service.cancel().await.context("shutdown mcp service")?;
    Ok(())
}
