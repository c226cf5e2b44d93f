//! # Issue Graph
//!
//! Relationship graph around a GitHub issue or pull request, rendered as compact text for AI
//! agents.
//!
//! ## Features
//!
//! - **Reference extraction** - closing keywords, `owner/repo#N`, GitHub URLs and bare `#N`
//! - **Hierarchy crawling** - sub-issues, parents and tasklist links across repositories
//! - **Node classification** - epic, batch, task or pull request
//! - **Focus resolution** - re-center the graph on the nearest epic or batch
//!
//! ## Architecture
//!
//! ```text
//! GraphRequest (owner, repo, number, focus)
//!     │
//!     ├──> GraphCrawler (bounded, concurrent)
//!     │      ├─ IssueSource: item, sub-issues, parent, comments, milestone, timeline
//!     │      ├─ Reference / tasklist extraction
//!     │      ├─ Classification, preview, status
//!     │      └─ Nodes + edges + parent map
//!     │
//!     ├──> FocusResolver
//!     │      ├─ Ancestor chain
//!     │      └─ Cross-references and their ancestors
//!     │
//!     ├──> Project boards of the final focus
//!     │
//!     └──> IssueGraph ──> format_graph_output ──> text
//! ```

mod classify;
mod config;
mod crawler;
mod error;
mod focus;
mod format;
mod references;
mod sanitize;
mod snapshot;
mod source;
mod stats;
mod status;
mod summary;
mod tasklist;
mod types;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use classify::classify_node;
pub use config::{CrawlConfig, MAX_DEPTH_LIMIT, MAX_NODES_LIMIT};
pub use crawler::GraphCrawler;
pub use error::{GraphError, Result};
pub use format::{format_graph_output, format_node_ref};
pub use references::{extract_references, strip_code_blocks};
pub use sanitize::{preview_limits, sanitize_body_for_graph, truncate_chars};
pub use snapshot::{SnapshotItem, SnapshotSource};
pub use source::{
    FetchError, IssueSource, ItemLocation, ItemRecord, Milestone, ProjectInfo, SubIssueRecord,
};
pub use stats::CrawlStats;
pub use status::{combine_status, extract_status_update, milestone_status};
pub use tasklist::extract_tasklist_items;
pub use types::{
    FocusPreference, FocusSource, GraphEdge, GraphNode, IssueGraph, IssueReference, NodeKey,
    NodeType, Relation, TasklistItem,
};

/// What the caller asked about
#[derive(Debug, Clone)]
pub struct GraphRequest {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub focus: FocusPreference,
    /// Attach crawl statistics
    pub verbose: bool,
}

impl GraphRequest {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
            focus: FocusPreference::Provided,
            verbose: false,
        }
    }

    fn validate(&self) -> Result<NodeKey> {
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() {
            return Err(GraphError::InvalidRequest(
                "owner and repo must not be empty".to_string(),
            ));
        }
        if self.number == 0 {
            return Err(GraphError::InvalidRequest(
                "issue number must be positive".to_string(),
            ));
        }
        Ok(NodeKey::new(self.owner.trim(), self.repo.trim(), self.number))
    }
}

/// Crawl the neighbourhood of the requested item and assemble its graph.
///
/// Fails only for an invalid request or when the requested item itself cannot be fetched; a
/// timeout, cancellation or exhausted budget yields a graph with `partial` set.
pub async fn build_issue_graph(
    source: Arc<dyn IssueSource>,
    request: &GraphRequest,
    config: CrawlConfig,
    cancel: &CancellationToken,
) -> Result<IssueGraph> {
    let key = request.validate()?;
    let mut crawler = GraphCrawler::new(Arc::clone(&source), key, config);
    crawler.crawl(cancel).await?;
    let mut graph = crawler.into_graph(request.focus, request.verbose);

    if !cancel.is_cancelled() {
        let focus = &graph.focus;
        graph.focus_projects = match source
            .fetch_projects(&focus.owner, &focus.repo, focus.number)
            .await
        {
            Ok(projects) => projects,
            Err(err) => {
                log::debug!("No projects for {focus}: {err}");
                Vec::new()
            }
        };
    }
    Ok(graph)
}
