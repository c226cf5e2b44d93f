use crate::source::ProjectInfo;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of an issue or pull request: `(owner, repo, number)`.
///
/// Owner and repository compare ASCII case-insensitively (GitHub treats them that way), while
/// the spelling the key was created with is kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeKey {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl NodeKey {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
        }
    }

    /// Whether `owner`/`repo` name this key's repository.
    #[must_use]
    pub fn same_repo(&self, owner: &str, repo: &str) -> bool {
        self.owner.eq_ignore_ascii_case(owner) && self.repo.eq_ignore_ascii_case(repo)
    }

    /// Lowercased `owner/repo`, used for per-repository bookkeeping.
    #[must_use]
    pub fn repo_slug(&self) -> String {
        format!(
            "{}/{}",
            self.owner.to_ascii_lowercase(),
            self.repo.to_ascii_lowercase()
        )
    }

    fn folded(&self) -> (String, String, u64) {
        (
            self.owner.to_ascii_lowercase(),
            self.repo.to_ascii_lowercase(),
            self.number,
        )
    }
}

impl PartialEq for NodeKey {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number && self.same_repo(&other.owner, &other.repo)
    }
}

impl Eq for NodeKey {}

impl Hash for NodeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.owner.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
        state.write_u8(b'/');
        for b in self.repo.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
        self.number.hash(state);
    }
}

impl PartialOrd for NodeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(&other.folded())
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Role of a work item in the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Epic,
    Batch,
    Task,
    #[serde(rename = "pr")]
    PullRequest,
}

impl NodeType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Batch => "batch",
            Self::Task => "task",
            Self::PullRequest => "pr",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship carried by an edge, naming the role `from` plays toward `to`.
///
/// A sub-issue link between parent `P` and child `C` is stored as the pair
/// `P -Parent-> C` and `C -Child-> P`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Parent,
    Child,
    Related,
}

impl Relation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Child => "child",
            Self::Related => "related",
        }
    }
}

/// Reference to an issue/PR extracted from free text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueReference {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    /// Extracted through a closing keyword ("fixes #1"): the referenced item is a parent.
    pub is_parent: bool,
}

impl IssueReference {
    #[must_use]
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.owner.clone(), self.repo.clone(), self.number)
    }
}

/// Single markdown checklist line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasklistItem {
    pub text: String,
    pub completed: bool,
    pub linked_ref: Option<IssueReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub node_type: NodeType,
    /// "open", "closed" or "merged"
    pub state: String,
    /// Close reason for issues ("completed", "not_planned", ...), "merged" for merged PRs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<String>,
    /// Status line extracted for epics and batches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_update: Option<String>,
    pub title: String,
    pub body_preview: String,
    pub tasklist: Vec<TasklistItem>,
    pub depth: usize,
    pub is_focus: bool,
}

impl GraphNode {
    #[must_use]
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.owner.clone(), self.repo.clone(), self.number)
    }

    /// `state (reason)` when the reason adds information, otherwise the bare state.
    #[must_use]
    pub fn display_state(&self) -> String {
        match self.state_reason.as_deref() {
            Some(reason) if !reason.is_empty() && reason != self.state => {
                format!("{} ({reason})", self.state)
            }
            _ => self.state.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: NodeKey,
    pub to: NodeKey,
    pub relation: Relation,
}

/// How the final focus node was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusSource {
    /// The requested node already matched
    #[serde(rename = "self")]
    Itself,
    /// Found by walking the parent chain
    Ancestor,
    /// Found through a cross-referencing node or its ancestors
    CrossRefAncestor,
    /// No node of the requested type was reachable
    NotFound,
}

/// Which node the caller wants the graph centered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusPreference {
    #[default]
    Provided,
    Epic,
    Batch,
}

impl FocusPreference {
    /// Parse the tool argument (`provided`, `epic`, `batch`; empty means provided).
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim).unwrap_or_default() {
            "" | "provided" => Some(Self::Provided),
            "epic" => Some(Self::Epic),
            "batch" => Some(Self::Batch),
            _ => None,
        }
    }

    #[must_use]
    pub const fn target_type(self) -> Option<NodeType> {
        match self {
            Self::Provided => None,
            Self::Epic => Some(NodeType::Epic),
            Self::Batch => Some(NodeType::Batch),
        }
    }
}

/// Result of a crawl, ready for rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueGraph {
    pub focus: NodeKey,
    /// Coordinates the caller asked about (differs from `focus` after a refocus)
    pub original: NodeKey,
    pub focus_source: FocusSource,
    pub summary: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Project boards of the final focus
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub focus_projects: Vec<ProjectInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawl_summary: Option<String>,
    /// Budget, timeout or cancellation cut the crawl short
    pub partial: bool,
}

impl IssueGraph {
    #[must_use]
    pub fn node(&self, key: &NodeKey) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.key() == *key)
    }

    #[must_use]
    pub fn focus_node(&self) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.is_focus)
    }

    #[must_use]
    pub fn edges_with(&self, relation: Relation) -> Vec<&GraphEdge> {
        self.edges
            .iter()
            .filter(|e| e.relation == relation)
            .collect()
    }
}
