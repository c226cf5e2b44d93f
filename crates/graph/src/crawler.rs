use crate::classify::classify_node;
use crate::config::CrawlConfig;
use crate::error::{GraphError, Result};
use crate::references::extract_references;
use crate::sanitize::{preview_limits, sanitize_body_for_graph};
use crate::source::{FetchError, IssueSource, ItemLocation, ItemRecord, Milestone, SubIssueRecord};
use crate::stats::CrawlStats;
use crate::status::combine_status;
use crate::tasklist::extract_tasklist_items;
use crate::types::{
    FocusPreference, FocusSource, GraphEdge, GraphNode, IssueGraph, NodeKey, NodeType, Relation,
};
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How far a dequeued node is expanded once fetched, weakest first.
///
/// A node reached again through a stronger route is upgraded, whether it is still queued,
/// in flight or already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Expansion {
    /// Reached through a plain cross-reference; only the parent chain is followed
    Leaf,
    /// Reached by walking up; parent and body references only, siblings are not crawled
    Ancestor,
    /// Parent, sub-issues, tasklist links, body references and (for the focus) timeline
    Full,
}

#[derive(Debug, Clone)]
struct QueueEntry {
    key: NodeKey,
    depth: usize,
    expansion: Expansion,
}

/// Everything one fetch task learned about a node
#[derive(Debug, Clone)]
struct FetchedItem {
    record: ItemRecord,
    sub_issues: Vec<SubIssueRecord>,
    parent: Option<ItemLocation>,
    comments: Vec<String>,
    milestone: Option<Milestone>,
    cross_references: Vec<ItemLocation>,
}

struct FetchOutcome {
    entry: QueueEntry,
    result: std::result::Result<FetchedItem, FetchError>,
}

type FetchFuture = Pin<Box<dyn Future<Output = FetchOutcome> + Send>>;

/// Stored node that was expanded below [`Expansion::Full`] and may still be upgraded
struct WeakExpansion {
    depth: usize,
    expansion: Expansion,
    fetched: FetchedItem,
}

/// Bounded crawler over the issue/PR neighbourhood of a focus item.
///
/// Fetch tasks run concurrently but never touch crawler state: they return a [`FetchOutcome`]
/// which the dispatch loop applies, so every map has a single writer.
pub struct GraphCrawler {
    source: Arc<dyn IssueSource>,
    pub(crate) config: CrawlConfig,
    pub(crate) focus: NodeKey,
    pub(crate) original: NodeKey,
    pub(crate) focus_source: FocusSource,
    pub(crate) nodes: HashMap<NodeKey, GraphNode>,
    pub(crate) edges: Vec<GraphEdge>,
    pub(crate) parent_map: HashMap<NodeKey, NodeKey>,
    queue: VecDeque<QueueEntry>,
    queued: HashSet<NodeKey>,
    /// Stronger modes requested for entries already in flight
    upgrades: HashMap<NodeKey, Expansion>,
    weak: HashMap<NodeKey, WeakExpansion>,
    inaccessible: HashSet<String>,
    pub(crate) stats: CrawlStats,
    pub(crate) partial: bool,
    /// Reference time for milestone due dates
    started: DateTime<Utc>,
}

impl GraphCrawler {
    /// `config` is clamped to the same ranges as per-request overrides.
    pub fn new(source: Arc<dyn IssueSource>, focus: NodeKey, config: CrawlConfig) -> Self {
        let config = config.with_overrides(None, None);
        let stats = CrawlStats {
            depth_limit: config.max_depth,
            ..CrawlStats::default()
        };
        Self {
            source,
            config,
            original: focus.clone(),
            focus,
            focus_source: FocusSource::Itself,
            nodes: HashMap::new(),
            edges: Vec::new(),
            parent_map: HashMap::new(),
            queue: VecDeque::new(),
            queued: HashSet::new(),
            upgrades: HashMap::new(),
            weak: HashMap::new(),
            inaccessible: HashSet::new(),
            stats,
            partial: false,
            started: Utc::now(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Crawl until the queue drains, the budget is spent, the timeout fires or `cancel` is
    /// triggered. Only a failure to fetch the focus itself is an error.
    pub async fn crawl(&mut self, cancel: &CancellationToken) -> Result<()> {
        let deadline = tokio::time::sleep(self.config.timeout);
        tokio::pin!(deadline);

        let mut in_flight: FuturesUnordered<FetchFuture> = FuturesUnordered::new();
        let mut per_repo: HashMap<String, usize> = HashMap::new();
        let mut timed_out = false;

        self.enqueue(self.focus.clone(), 0, Expansion::Full);

        loop {
            self.dispatch(&mut in_flight, &mut per_repo);
            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    log::debug!("Crawl of {} cancelled", self.original);
                    self.interrupt(in_flight.len());
                    break;
                }
                () = &mut deadline => {
                    log::debug!("Crawl of {} timed out after {:?}", self.original, self.config.timeout);
                    timed_out = true;
                    self.interrupt(in_flight.len());
                    break;
                }
                Some(outcome) = in_flight.next() => {
                    let slug = outcome.entry.key.repo_slug();
                    if let Some(count) = per_repo.get_mut(&slug) {
                        *count = count.saturating_sub(1);
                    }
                    self.apply(outcome)?;
                }
            }
        }

        if !self.nodes.contains_key(&self.focus) {
            let reason = if cancel.is_cancelled() {
                "crawl cancelled"
            } else if timed_out {
                "crawl timed out"
            } else {
                "crawl stopped before the item was fetched"
            };
            return Err(GraphError::FocusUnavailable {
                key: self.focus.clone(),
                source: FetchError::Unavailable(reason.to_string()),
            });
        }

        if !self.queue.is_empty() {
            log::debug!(
                "Node budget of {} reached, dropping {} queued entries",
                self.config.max_nodes,
                self.queue.len()
            );
            self.queue.clear();
            self.stats.budget_exhausted = true;
            self.partial = true;
        }

        log::info!(
            "Crawled {} nodes and {} edges around {}{}",
            self.nodes.len(),
            self.edges.len(),
            self.original,
            if self.partial { " (partial)" } else { "" }
        );
        Ok(())
    }

    fn interrupt(&mut self, abandoned: usize) {
        if abandoned > 0 {
            log::debug!("Abandoning {abandoned} in-flight fetches");
        }
        self.stats.interrupted = true;
        self.partial = true;
        self.queue.clear();
    }

    /// Queue `key` unless it was already stored or queued; a known key is upgraded to
    /// `expansion` instead when that is stronger.
    fn enqueue(&mut self, key: NodeKey, depth: usize, expansion: Expansion) -> bool {
        if self.nodes.contains_key(&key) {
            self.stats.skipped_visited += 1;
            self.upgrade_stored(&key, expansion);
            return false;
        }
        if self.queued.contains(&key) {
            self.stats.skipped_visited += 1;
            self.upgrade_pending(&key, depth, expansion);
            return false;
        }
        self.queued.insert(key.clone());
        self.queue.push_back(QueueEntry {
            key,
            depth,
            expansion,
        });
        true
    }

    fn upgrade_pending(&mut self, key: &NodeKey, depth: usize, expansion: Expansion) {
        if let Some(entry) = self.queue.iter_mut().find(|entry| entry.key == *key) {
            entry.expansion = entry.expansion.max(expansion);
            entry.depth = entry.depth.min(depth);
            return;
        }
        let pending = self.upgrades.entry(key.clone()).or_insert(expansion);
        *pending = (*pending).max(expansion);
    }

    /// Re-expand a stored node with the stronger `expansion`, reusing what was fetched for it.
    fn upgrade_stored(&mut self, key: &NodeKey, expansion: Expansion) {
        let Some(weak) = self.weak.get_mut(key) else {
            return;
        };
        if weak.expansion >= expansion {
            return;
        }
        log::debug!("Upgrading {key} from {:?} to {expansion:?}", weak.expansion);
        weak.expansion = expansion;
        let depth = weak.depth;
        let fetched = weak.fetched.clone();
        if expansion == Expansion::Full {
            self.weak.remove(key);
        }
        let Some(node) = self.nodes.get(key).cloned() else {
            return;
        };

        let entry = QueueEntry {
            key: key.clone(),
            depth,
            expansion,
        };
        self.expand(&entry, &fetched, &node);
    }

    fn dispatch(
        &mut self,
        in_flight: &mut FuturesUnordered<FetchFuture>,
        per_repo: &mut HashMap<String, usize>,
    ) {
        let mut deferred = Vec::new();

        while in_flight.len() < self.config.max_concurrency {
            let Some(entry) = self.queue.pop_front() else {
                break;
            };

            let slug = entry.key.repo_slug();
            if self.inaccessible.contains(&slug) {
                log::debug!("Skipping {}: repository is inaccessible", entry.key);
                continue;
            }
            if entry.depth > self.config.max_depth {
                continue;
            }
            if self.nodes.len() + in_flight.len() >= self.config.max_nodes {
                self.queue.push_front(entry);
                break;
            }
            let running = per_repo.entry(slug).or_insert(0);
            if *running >= self.config.max_per_repo {
                deferred.push(entry);
                continue;
            }
            *running += 1;

            self.stats.max_depth_reached = self.stats.max_depth_reached.max(entry.depth);
            let is_focus = entry.key == self.focus;
            let expand = entry.depth < self.config.max_depth;
            in_flight.push(Box::pin(fetch_node(
                Arc::clone(&self.source),
                entry,
                is_focus,
                expand,
            )));
        }

        for entry in deferred.into_iter().rev() {
            self.queue.push_front(entry);
        }
    }

    fn apply(&mut self, outcome: FetchOutcome) -> Result<()> {
        let FetchOutcome { mut entry, result } = outcome;
        if let Some(upgrade) = self.upgrades.remove(&entry.key) {
            entry.expansion = entry.expansion.max(upgrade);
        }
        let fetched = match result {
            Ok(fetched) => fetched,
            Err(source) if entry.key == self.focus => {
                return Err(GraphError::FocusUnavailable {
                    key: entry.key,
                    source,
                });
            }
            Err(err) => {
                log::debug!("Dropping {}: {err}", entry.key);
                self.stats.fetch_failures += 1;
                if err == FetchError::Forbidden {
                    let slug = entry.key.repo_slug();
                    self.stats.inaccessible_repos.insert(slug.clone());
                    self.inaccessible.insert(slug);
                }
                return Ok(());
            }
        };

        self.stats.nodes_fetched += 1;
        self.stats.repos_accessed.insert(entry.key.repo_slug());

        let node = self.build_node(&entry, &fetched);
        self.nodes.insert(entry.key.clone(), node.clone());
        if entry.depth >= self.config.max_depth {
            return Ok(());
        }
        if entry.expansion < Expansion::Full {
            self.weak.insert(
                entry.key.clone(),
                WeakExpansion {
                    depth: entry.depth,
                    expansion: entry.expansion,
                    fetched: fetched.clone(),
                },
            );
        }
        self.expand(&entry, &fetched, &node);
        Ok(())
    }

    fn build_node(&self, entry: &QueueEntry, fetched: &FetchedItem) -> GraphNode {
        let record = &fetched.record;
        let key = &entry.key;
        let node_type = classify_node(
            record.is_pr,
            &record.labels,
            &record.title,
            record.issue_type.as_deref(),
            !fetched.sub_issues.is_empty(),
        );
        let (max_lines, max_line_len) = preview_limits(entry.depth);
        let status_update = match node_type {
            NodeType::Epic | NodeType::Batch => combine_status(
                &record.body,
                fetched.milestone.as_ref(),
                &fetched.comments,
                self.started,
            ),
            NodeType::Task | NodeType::PullRequest => None,
        };

        GraphNode {
            owner: key.owner.clone(),
            repo: key.repo.clone(),
            number: key.number,
            node_type,
            state: record.effective_state(),
            state_reason: record.effective_state_reason(),
            status_update,
            title: record.title.clone(),
            body_preview: sanitize_body_for_graph(&record.body, max_lines, max_line_len),
            tasklist: extract_tasklist_items(&record.body, &key.owner, &key.repo),
            depth: entry.depth,
            is_focus: *key == self.focus,
        }
    }

    fn expand(&mut self, entry: &QueueEntry, fetched: &FetchedItem, node: &GraphNode) {
        let key = &entry.key;
        let depth = entry.depth;

        if let Some(parent) = &fetched.parent {
            let parent = NodeKey::new(parent.owner.clone(), parent.repo.clone(), parent.number);
            if parent != *key && parent.number > 0 {
                self.link_hierarchy(&parent, key);
                let mode = match entry.expansion {
                    Expansion::Leaf => Expansion::Leaf,
                    Expansion::Full | Expansion::Ancestor => Expansion::Ancestor,
                };
                self.enqueue(parent, depth, mode);
            }
        }

        if entry.expansion == Expansion::Full {
            for sub in &fetched.sub_issues {
                let child = NodeKey::new(
                    sub.owner.clone().unwrap_or_else(|| key.owner.clone()),
                    sub.repo.clone().unwrap_or_else(|| key.repo.clone()),
                    sub.number,
                );
                if child == *key || child.number == 0 {
                    continue;
                }
                self.link_hierarchy(key, &child);
                if self.enqueue(child, depth + 1, Expansion::Full) {
                    self.stats.sub_issues += 1;
                }
            }

            for linked in node.tasklist.iter().filter_map(|item| item.linked_ref.as_ref()) {
                let child = linked.key();
                if child == *key || self.nodes.contains_key(&child) {
                    continue;
                }
                self.link_hierarchy(key, &child);
                if self.enqueue(child, depth + 1, Expansion::Full) {
                    self.stats.tasklist_links += 1;
                }
            }
        }

        if matches!(entry.expansion, Expansion::Full | Expansion::Ancestor) {
            for reference in extract_references(&fetched.record.body, &key.owner, &key.repo) {
                let target = reference.key();
                if target == *key {
                    continue;
                }
                self.push_edge(key.clone(), target.clone(), Relation::Related);
                if reference.is_parent && entry.expansion == Expansion::Full {
                    self.parent_map
                        .entry(key.clone())
                        .or_insert_with(|| target.clone());
                    self.enqueue(target, depth + 1, Expansion::Full);
                } else {
                    self.enqueue(target, depth + 1, Expansion::Leaf);
                }
            }
        }

        if *key == self.focus {
            for location in &fetched.cross_references {
                let source =
                    NodeKey::new(location.owner.clone(), location.repo.clone(), location.number);
                if source == *key || source.number == 0 {
                    continue;
                }
                self.push_edge(source.clone(), key.clone(), Relation::Related);
                self.stats.timeline_refs += 1;
                self.enqueue(source, depth + 1, Expansion::Leaf);
            }
        }
    }

    /// Record `parent` → `child` as an edge pair; the first parent recorded for a child wins.
    fn link_hierarchy(&mut self, parent: &NodeKey, child: &NodeKey) {
        self.push_edge(parent.clone(), child.clone(), Relation::Parent);
        self.push_edge(child.clone(), parent.clone(), Relation::Child);
        self.parent_map
            .entry(child.clone())
            .or_insert_with(|| parent.clone());
    }

    fn push_edge(&mut self, from: NodeKey, to: NodeKey, relation: Relation) {
        self.edges.push(GraphEdge { from, to, relation });
    }

    /// Resolve the requested focus and assemble the final graph.
    #[must_use]
    pub fn into_graph(mut self, preference: FocusPreference, verbose: bool) -> IssueGraph {
        let requested = preference.target_type();
        if let Some(desired) = requested {
            let (key, source) = self.find_best_focus(desired);
            if key == self.focus {
                self.focus_source = source;
            } else {
                log::debug!("Refocusing from {} to {key} ({source:?})", self.focus);
                self.refocus_to(&key, source);
            }
        }

        let edges = self.final_edges();
        let summary = self.generate_summary(&edges, requested);
        IssueGraph {
            focus: self.focus.clone(),
            original: self.original.clone(),
            focus_source: self.focus_source,
            summary,
            nodes: self.sorted_nodes(),
            edges,
            focus_projects: Vec::new(),
            crawl_summary: verbose.then(|| self.stats.render()),
            partial: self.partial,
        }
    }

    /// Nodes in output order: depth, number, then case-folded owner/repo.
    pub(crate) fn sorted_nodes(&self) -> Vec<GraphNode> {
        let mut nodes: Vec<GraphNode> = self.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| {
            a.depth
                .cmp(&b.depth)
                .then(a.number.cmp(&b.number))
                .then_with(|| a.key().cmp(&b.key()))
        });
        nodes
    }

    /// Edges between stored nodes, duplicates removed, insertion order kept.
    pub(crate) fn final_edges(&self) -> Vec<GraphEdge> {
        let mut seen = HashSet::new();
        self.edges
            .iter()
            .filter(|edge| self.nodes.contains_key(&edge.from) && self.nodes.contains_key(&edge.to))
            .filter(|edge| seen.insert((*edge).clone()))
            .cloned()
            .collect()
    }
}

async fn fetch_node(
    source: Arc<dyn IssueSource>,
    entry: QueueEntry,
    is_focus: bool,
    expand: bool,
) -> FetchOutcome {
    let result = fetch_item_details(source.as_ref(), &entry.key, is_focus, expand).await;
    FetchOutcome { entry, result }
}

async fn fetch_item_details(
    source: &dyn IssueSource,
    key: &NodeKey,
    is_focus: bool,
    expand: bool,
) -> std::result::Result<FetchedItem, FetchError> {
    let (owner, repo, number) = (key.owner.as_str(), key.repo.as_str(), key.number);
    let record = source.fetch_item(owner, repo, number).await?;

    let mut sub_issues = Vec::new();
    let mut parent = None;
    if !record.is_pr {
        sub_issues = optional(
            key,
            "sub-issues",
            source.fetch_sub_issues(owner, repo, number).await,
        );
        if expand {
            parent = optional(key, "parent", source.fetch_parent(owner, repo, number).await);
        }
    }

    let node_type = classify_node(
        record.is_pr,
        &record.labels,
        &record.title,
        record.issue_type.as_deref(),
        !sub_issues.is_empty(),
    );
    let (comments, milestone) = if matches!(node_type, NodeType::Epic | NodeType::Batch) {
        (
            optional(
                key,
                "comments",
                source.fetch_recent_comments(owner, repo, number).await,
            ),
            optional(
                key,
                "milestone",
                source.fetch_milestone(owner, repo, number).await,
            ),
        )
    } else {
        (Vec::new(), None)
    };

    let cross_references = if is_focus {
        optional(
            key,
            "cross-references",
            source.fetch_cross_references(owner, repo, number).await,
        )
    } else {
        Vec::new()
    };

    Ok(FetchedItem {
        record,
        sub_issues,
        parent,
        comments,
        milestone,
        cross_references,
    })
}

/// Enrichment lookups degrade to "absent" on failure.
fn optional<T: Default>(
    key: &NodeKey,
    what: &str,
    result: std::result::Result<T, FetchError>,
) -> T {
    result.unwrap_or_else(|err| {
        log::debug!("No {what} for {key}: {err}");
        T::default()
    })
}
