use rmcp::schemars;
use serde::Deserialize;

/// Arguments of the `issue_graph` tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IssueGraphRequest {
    /// Repository owner
    #[schemars(description = "Repository owner (user or organization)")]
    pub owner: String,

    /// Repository name
    #[schemars(description = "Repository name")]
    pub repo: String,

    /// Issue or pull request number
    #[schemars(description = "Issue or pull request number to build the graph around")]
    pub issue_number: u64,

    /// Focus preference
    #[schemars(
        description = "Which node to center the graph on: 'provided' (default) keeps the requested item, 'epic' or 'batch' walks up the hierarchy and cross-references to the nearest one"
    )]
    pub focus: Option<String>,

    /// Attach crawl statistics
    #[schemars(description = "Append crawl statistics to the output (default: false)")]
    pub verbose: Option<bool>,

    /// Hierarchy depth override
    #[schemars(description = "Maximum hierarchy depth to crawl (1-8, server default: 4)")]
    pub max_depth: Option<usize>,

    /// Node budget override
    #[schemars(description = "Maximum number of nodes to fetch (1-500, server default: 60)")]
    pub max_nodes: Option<usize>,
}
