use std::collections::BTreeSet;

/// Bookkeeping collected while crawling, rendered in verbose mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub nodes_fetched: usize,
    /// Queue entries skipped because the node was already stored or queued
    pub skipped_visited: usize,
    pub fetch_failures: usize,
    pub max_depth_reached: usize,
    pub depth_limit: usize,
    pub sub_issues: usize,
    pub tasklist_links: usize,
    pub timeline_refs: usize,
    pub repos_accessed: BTreeSet<String>,
    pub inaccessible_repos: BTreeSet<String>,
    pub budget_exhausted: bool,
    /// Timeout or cancellation
    pub interrupted: bool,
}

impl CrawlStats {
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("CRAWL STATISTICS\n");
        out.push_str("================\n");
        out.push_str(&format!("Nodes fetched: {}\n", self.nodes_fetched));
        out.push_str(&format!("Nodes skipped (already visited): {}\n", self.skipped_visited));
        if self.fetch_failures > 0 {
            out.push_str(&format!("Fetch failures (dropped): {}\n", self.fetch_failures));
        }
        out.push_str(&format!(
            "Max depth reached: {} (limit: {})\n",
            self.max_depth_reached, self.depth_limit
        ));
        out.push_str(&format!("Sub-issues crawled: {}\n", self.sub_issues));
        out.push_str(&format!("Tasklist refs crawled: {}\n", self.tasklist_links));
        out.push_str(&format!("Cross-refs found: {}\n", self.timeline_refs));
        out.push_str(&format!("Repos accessed: {}\n", self.repos_accessed.len()));
        for repo in &self.repos_accessed {
            out.push_str(&format!("  - {repo}\n"));
        }
        for repo in &self.inaccessible_repos {
            out.push_str(&format!("Inaccessible repo: {repo}\n"));
        }
        if self.budget_exhausted {
            out.push_str("Node budget exhausted - remaining references were not crawled\n");
        }
        if self.interrupted {
            out.push_str("Crawl timed out or was cancelled - results may be incomplete\n");
        }
        out
    }
}
