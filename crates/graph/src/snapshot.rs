//! In-memory [`IssueSource`] backed by a JSON snapshot.
//!
//! File layout:
//!
//! ```json
//! {
//!   "items": [
//!     { "owner": "acme", "repo": "api", "number": 7, "is_pr": false, "title": "Login",
//!       "state": "open", "body": "...", "labels": ["bug"],
//!       "sub_issues": [{ "number": 8, "title": "Form" }],
//!       "parent": { "owner": "acme", "repo": "api", "number": 1 },
//!       "comments": ["newest first"],
//!       "milestone": { "title": "Beta", "due_on": "2024-06-01T00:00:00Z" },
//!       "projects": [{ "title": "Roadmap", "status": "In Progress" }],
//!       "cross_referenced_by": [{ "owner": "acme", "repo": "web", "number": 3 }] }
//!   ],
//!   "forbidden_repos": ["acme/secret"]
//! }
//! ```

use crate::error::{GraphError, Result};
use crate::source::{
    FetchError, IssueSource, ItemLocation, ItemRecord, Milestone, ProjectInfo, SubIssueRecord,
};
use crate::types::NodeKey;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    #[serde(flatten)]
    pub record: ItemRecord,
    #[serde(default)]
    pub sub_issues: Vec<SubIssueRecord>,
    #[serde(default)]
    pub parent: Option<ItemLocation>,
    #[serde(default)]
    pub comments: Vec<String>,
    #[serde(default)]
    pub milestone: Option<Milestone>,
    #[serde(default)]
    pub projects: Vec<ProjectInfo>,
    #[serde(default)]
    pub cross_referenced_by: Vec<ItemLocation>,
}

impl SnapshotItem {
    pub fn issue(owner: &str, repo: &str, number: u64, title: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
            record: ItemRecord {
                is_pr: false,
                title: title.to_string(),
                state: "open".to_string(),
                ..ItemRecord::default()
            },
            sub_issues: Vec::new(),
            parent: None,
            comments: Vec::new(),
            milestone: None,
            projects: Vec::new(),
            cross_referenced_by: Vec::new(),
        }
    }

    pub fn pull_request(owner: &str, repo: &str, number: u64, title: &str) -> Self {
        let mut item = Self::issue(owner, repo, number, title);
        item.record.is_pr = true;
        item
    }

    #[must_use]
    pub fn body(mut self, body: &str) -> Self {
        self.record.body = body.to_string();
        self
    }

    #[must_use]
    pub fn label(mut self, label: &str) -> Self {
        self.record.labels.push(label.to_string());
        self
    }

    #[must_use]
    pub fn closed(mut self, reason: &str) -> Self {
        self.record.state = "closed".to_string();
        self.record.state_reason = Some(reason.to_string());
        self
    }

    #[must_use]
    pub fn merged(mut self) -> Self {
        self.record.state = "closed".to_string();
        self.record.merged = true;
        self
    }

    /// Sub-issue in the same repository.
    #[must_use]
    pub fn sub_issue(mut self, number: u64) -> Self {
        self.sub_issues.push(SubIssueRecord {
            owner: None,
            repo: None,
            number,
            title: String::new(),
        });
        self
    }

    #[must_use]
    pub fn parent(mut self, owner: &str, repo: &str, number: u64) -> Self {
        self.parent = Some(ItemLocation {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
        });
        self
    }

    #[must_use]
    pub fn comment(mut self, body: &str) -> Self {
        self.comments.push(body.to_string());
        self
    }

    #[must_use]
    pub fn milestone(mut self, title: &str, due_on: Option<DateTime<Utc>>) -> Self {
        self.milestone = Some(Milestone {
            title: title.to_string(),
            due_on,
        });
        self
    }

    #[must_use]
    pub fn project(mut self, title: &str, status: Option<&str>) -> Self {
        self.projects.push(ProjectInfo {
            title: title.to_string(),
            status: status.map(str::to_string),
        });
        self
    }

    #[must_use]
    pub fn cross_referenced_by(mut self, owner: &str, repo: &str, number: u64) -> Self {
        self.cross_referenced_by.push(ItemLocation {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
        });
        self
    }

    fn key(&self) -> NodeKey {
        NodeKey::new(self.owner.clone(), self.repo.clone(), self.number)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    items: Vec<SnapshotItem>,
    #[serde(default)]
    forbidden_repos: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SnapshotSource {
    items: HashMap<NodeKey, SnapshotItem>,
    forbidden: HashSet<String>,
    latency: Option<Duration>,
    item_fetches: Mutex<HashMap<NodeKey, usize>>,
}

impl SnapshotSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: SnapshotFile = serde_json::from_str(json)?;
        let mut source = Self::new();
        for item in file.items {
            if item.number == 0 {
                return Err(GraphError::Snapshot(format!(
                    "item {}/{} has number 0",
                    item.owner, item.repo
                )));
            }
            source.insert(item);
        }
        for repo in file.forbidden_repos {
            source.forbidden.insert(repo.to_ascii_lowercase());
        }
        Ok(source)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw).map_err(|err| match err {
            GraphError::JsonError(err) => {
                GraphError::Snapshot(format!("{}: {err}", path.display()))
            }
            other => other,
        })
    }

    pub fn insert(&mut self, item: SnapshotItem) {
        self.items.insert(item.key(), item);
    }

    #[must_use]
    pub fn with_item(mut self, item: SnapshotItem) -> Self {
        self.insert(item);
        self
    }

    /// Every fetch against `owner/repo` fails with [`FetchError::Forbidden`].
    #[must_use]
    pub fn with_forbidden_repo(mut self, owner: &str, repo: &str) -> Self {
        self.forbidden.insert(NodeKey::new(owner, repo, 0).repo_slug());
        self
    }

    /// Delay every `fetch_item` call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// How many times `fetch_item` was called for `key`.
    #[must_use]
    pub fn item_fetches(&self, key: &NodeKey) -> usize {
        self.item_fetches
            .lock()
            .map(|counts| counts.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn lookup(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> std::result::Result<&SnapshotItem, FetchError> {
        let key = NodeKey::new(owner, repo, number);
        if self.forbidden.contains(&key.repo_slug()) {
            return Err(FetchError::Forbidden);
        }
        self.items.get(&key).ok_or(FetchError::NotFound)
    }
}

#[async_trait]
impl IssueSource for SnapshotSource {
    async fn fetch_item(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> std::result::Result<ItemRecord, FetchError> {
        if let Ok(mut counts) = self.item_fetches.lock() {
            *counts.entry(NodeKey::new(owner, repo, number)).or_insert(0) += 1;
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.lookup(owner, repo, number).map(|item| item.record.clone())
    }

    async fn fetch_sub_issues(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> std::result::Result<Vec<SubIssueRecord>, FetchError> {
        self.lookup(owner, repo, number).map(|item| item.sub_issues.clone())
    }

    async fn fetch_parent(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> std::result::Result<Option<ItemLocation>, FetchError> {
        self.lookup(owner, repo, number).map(|item| item.parent.clone())
    }

    async fn fetch_recent_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> std::result::Result<Vec<String>, FetchError> {
        self.lookup(owner, repo, number).map(|item| item.comments.clone())
    }

    async fn fetch_cross_references(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> std::result::Result<Vec<ItemLocation>, FetchError> {
        self.lookup(owner, repo, number)
            .map(|item| item.cross_referenced_by.clone())
    }

    async fn fetch_milestone(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> std::result::Result<Option<Milestone>, FetchError> {
        self.lookup(owner, repo, number).map(|item| item.milestone.clone())
    }

    async fn fetch_projects(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> std::result::Result<Vec<ProjectInfo>, FetchError> {
        self.lookup(owner, repo, number).map(|item| item.projects.clone())
    }
}
