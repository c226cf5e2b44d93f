//! Data-access capability consumed by the crawler.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("not found")]
    NotFound,

    /// Access denied; the whole repository is treated as inaccessible for the rest of the crawl.
    #[error("access denied")]
    Forbidden,

    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Metadata of an issue or pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub is_pr: bool,
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// "open" or "closed"
    pub state: String,
    #[serde(default)]
    pub state_reason: Option<String>,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

impl ItemRecord {
    /// Normalized state: merged pull requests report "merged".
    #[must_use]
    pub fn effective_state(&self) -> String {
        if self.is_pr && self.merged {
            "merged".to_string()
        } else {
            self.state.to_lowercase()
        }
    }

    #[must_use]
    pub fn effective_state_reason(&self) -> Option<String> {
        if self.is_pr && self.merged {
            return Some("merged".to_string());
        }
        self.state_reason
            .as_deref()
            .map(str::to_lowercase)
            .filter(|reason| !reason.is_empty())
    }
}

/// Child issue as returned by the sub-issue listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubIssueRecord {
    /// Defaults to the parent's owner
    #[serde(default)]
    pub owner: Option<String>,
    /// Defaults to the parent's repository
    #[serde(default)]
    pub repo: Option<String>,
    pub number: u64,
    #[serde(default)]
    pub title: String,
}

/// Location of a related item (parent issue, cross-reference source).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLocation {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

/// Milestone an issue is scheduled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub due_on: Option<DateTime<Utc>>,
}

/// Project board membership and the item's status column on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ProjectInfo {
    /// `title [status]`, or the bare title when no status is set.
    #[must_use]
    pub fn display(&self) -> String {
        match self.status.as_deref().map(str::trim) {
            Some(status) if !status.is_empty() => format!("{} [{status}]", self.title),
            _ => self.title.clone(),
        }
    }
}

/// Read access to issues and pull requests.
///
/// Only [`IssueSource::fetch_item`] and [`IssueSource::fetch_sub_issues`] are required; the
/// remaining lookups enrich the graph and default to "nothing found".
#[async_trait]
pub trait IssueSource: Send + Sync {
    async fn fetch_item(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<ItemRecord, FetchError>;

    async fn fetch_sub_issues(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<SubIssueRecord>, FetchError>;

    /// Parent in the sub-issue hierarchy.
    async fn fetch_parent(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Option<ItemLocation>, FetchError> {
        Ok(None)
    }

    /// Comment bodies, newest first.
    async fn fetch_recent_comments(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Vec<String>, FetchError> {
        Ok(Vec::new())
    }

    /// Items whose timeline mentions this one.
    async fn fetch_cross_references(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Vec<ItemLocation>, FetchError> {
        Ok(Vec::new())
    }

    async fn fetch_milestone(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Option<Milestone>, FetchError> {
        Ok(None)
    }

    /// Project boards the item is on (pull requests included).
    async fn fetch_projects(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Vec<ProjectInfo>, FetchError> {
        Ok(Vec::new())
    }
}
