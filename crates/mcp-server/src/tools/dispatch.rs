use super::error::ToolError;
use super::schemas::IssueGraphRequest;
use anyhow::{Context as AnyhowContext, Result};
use issue_graph::{
    build_issue_graph, format_graph_output, CrawlConfig, FocusPreference, GraphRequest,
    IssueSource, SnapshotSource,
};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use std::path::PathBuf;
use std::sync::Arc;

const SNAPSHOT_ENV: &str = "ISSUE_GRAPH_SNAPSHOT";

/// Issue Graph MCP Service
#[derive(Clone)]
pub struct IssueGraphService {
    source: Arc<dyn IssueSource>,
    config: CrawlConfig,
    tool_router: ToolRouter<Self>,
}

impl IssueGraphService {
    pub fn new(source: Arc<dyn IssueSource>, config: CrawlConfig) -> Self {
        Self {
            source,
            config,
            tool_router: Self::tool_router(),
        }
    }

    /// Snapshot from `ISSUE_GRAPH_SNAPSHOT` and limits from the `ISSUE_GRAPH_*` variables
    pub fn from_env() -> Result<Self> {
        let source = match std::env::var_os(SNAPSHOT_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                let snapshot = SnapshotSource::from_path(&path)
                    .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
                log::info!("Loaded {} items from {}", snapshot.len(), path.display());
                snapshot
            }
            None => {
                log::warn!("{SNAPSHOT_ENV} is not set; every lookup will report not found");
                SnapshotSource::new()
            }
        };
        Ok(Self::new(Arc::new(source), CrawlConfig::from_env()))
    }

    /// Definitions of every tool the server exposes
    pub(crate) fn tools() -> Vec<Tool> {
        Self::tool_router().list_all()
    }
}

#[tool_handler]
impl ServerHandler for IssueGraphService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Issue Graph maps the relationships around a GitHub issue or pull request: parent and sub-issues, tasklist links and cross-references. Call 'issue_graph' with focus='epic' or focus='batch' to re-center on the initiative an item belongs to.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

#[tool_router]
impl IssueGraphService {
    /// Relationship graph around an issue or pull request
    #[tool(
        description = "Build the relationship graph around a GitHub issue or pull request: parents, sub-issues, tasklist links and cross-references, classified as epic, batch, task or pr. Returns a compact text summary, node list and edge sections. Use focus='epic' or 'batch' to re-center on the enclosing initiative."
    )]
    pub async fn issue_graph(
        &self,
        Parameters(request): Parameters<IssueGraphRequest>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let Some(focus) = FocusPreference::parse(request.focus.as_deref()) else {
            return Ok(ToolError::InvalidRequest(format!(
                "Unknown focus '{}': expected provided, epic or batch",
                request.focus.unwrap_or_default()
            ))
            .into_result());
        };

        let mut graph_request =
            GraphRequest::new(request.owner.as_str(), request.repo.as_str(), request.issue_number);
        graph_request.focus = focus;
        graph_request.verbose = request.verbose.unwrap_or(false);

        let config = self
            .config
            .clone()
            .with_overrides(request.max_depth, request.max_nodes);

        let graph = match build_issue_graph(
            Arc::clone(&self.source),
            &graph_request,
            config,
            &context.ct,
        )
        .await
        {
            Ok(graph) => graph,
            Err(e) => {
                log::debug!(
                    "issue_graph {}/{}#{} failed: {e}",
                    request.owner,
                    request.repo,
                    request.issue_number
                );
                return Ok(ToolError::from(e).into_result());
            }
        };

        Ok(CallToolResult::success(vec![Content::text(
            format_graph_output(&graph),
        )]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_lists_issue_graph() {
        let names: Vec<String> = IssueGraphService::tools()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        assert_eq!(names, vec!["issue_graph".to_string()]);
    }
}
