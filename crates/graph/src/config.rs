use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const MAX_DEPTH_LIMIT: usize = 8;
pub const MAX_NODES_LIMIT: usize = 500;

/// Crawl budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    /// Hops from the focus beyond which nodes are not expanded
    pub max_depth: usize,
    /// Upper bound on stored plus in-flight nodes
    pub max_nodes: usize,
    pub max_concurrency: usize,
    pub max_per_repo: usize,
    pub timeout: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            max_nodes: 60,
            max_concurrency: 5,
            max_per_repo: 3,
            timeout: Duration::from_secs(10),
        }
    }
}

impl CrawlConfig {
    /// Defaults overridden by `ISSUE_GRAPH_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let read = |key: &str, fallback: usize| -> usize {
            parse_positive(key, lookup(key).as_deref()).unwrap_or(fallback)
        };

        let config = Self {
            max_depth: read("ISSUE_GRAPH_MAX_DEPTH", defaults.max_depth),
            max_nodes: read("ISSUE_GRAPH_MAX_NODES", defaults.max_nodes),
            max_concurrency: read("ISSUE_GRAPH_MAX_CONCURRENCY", defaults.max_concurrency),
            max_per_repo: read("ISSUE_GRAPH_MAX_PER_REPO", defaults.max_per_repo),
            timeout: parse_positive::<u64>(
                "ISSUE_GRAPH_TIMEOUT_MS",
                lookup("ISSUE_GRAPH_TIMEOUT_MS").as_deref(),
            )
            .map_or(defaults.timeout, Duration::from_millis),
        };
        config.with_overrides(None, None)
    }

    /// Apply per-request overrides, clamped to `1..=MAX_DEPTH_LIMIT` / `1..=MAX_NODES_LIMIT`.
    #[must_use]
    pub fn with_overrides(mut self, max_depth: Option<usize>, max_nodes: Option<usize>) -> Self {
        if let Some(depth) = max_depth {
            self.max_depth = depth;
        }
        if let Some(nodes) = max_nodes {
            self.max_nodes = nodes;
        }
        self.max_depth = self.max_depth.clamp(1, MAX_DEPTH_LIMIT);
        self.max_nodes = self.max_nodes.clamp(1, MAX_NODES_LIMIT);
        self.max_concurrency = self.max_concurrency.max(1);
        self.max_per_repo = self.max_per_repo.clamp(1, self.max_concurrency);
        self
    }
}

fn parse_positive<T>(key: &str, raw: Option<&str>) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    let raw = raw?.trim();
    match raw.parse::<T>() {
        Ok(value) if value > T::default() => Some(value),
        _ => {
            log::warn!("Ignoring {key}={raw:?}: expected a positive integer");
            None
        }
    }
}
