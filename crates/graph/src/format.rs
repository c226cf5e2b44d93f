//! Plain-text rendering of an [`IssueGraph`], compact enough to hand to a language model.

use crate::sanitize::truncate_chars;
use crate::types::{GraphEdge, GraphNode, IssueGraph, NodeKey, NodeType, Relation};

const LEGEND: &str =
    "Node types: epic (large initiative), batch (has sub-issues), task (regular issue), pr (pull request)";
const TASK_TEXT_CHARS: usize = 80;

/// `#N` when `owner/repo` is the focus repository, `owner/repo#N` otherwise.
#[must_use]
pub fn format_node_ref(
    owner: &str,
    repo: &str,
    number: u64,
    focus_owner: &str,
    focus_repo: &str,
) -> String {
    if owner.eq_ignore_ascii_case(focus_owner) && repo.eq_ignore_ascii_case(focus_repo) {
        format!("#{number}")
    } else {
        format!("{owner}/{repo}#{number}")
    }
}

fn key_ref(key: &NodeKey, focus: &NodeKey) -> String {
    format_node_ref(&key.owner, &key.repo, key.number, &focus.owner, &focus.repo)
}

fn section(out: &mut String, title: &str) {
    out.push_str(&format!("\n{title}\n"));
    out.push_str(&format!("{}\n", "=".repeat(title.chars().count())));
}

fn write_node(out: &mut String, node: &GraphNode, focus: &NodeKey) {
    let marker = if node.is_focus { " [FOCUS]" } else { "" };
    out.push_str(&format!(
        "{}|{}|{}|{}{marker}\n",
        key_ref(&node.key(), focus),
        node.node_type,
        node.display_state(),
        node.title
    ));
    if !node.body_preview.is_empty() {
        out.push_str(&format!("  Preview: {}\n", node.body_preview));
    }
    if let Some(status) = &node.status_update {
        out.push_str(&format!("  Status: {status}\n"));
    }
    if node.tasklist.is_empty() {
        return;
    }

    let completed = node.tasklist.iter().filter(|item| item.completed).count();
    out.push_str(&format!(
        "  Tasklist ({completed}/{} completed):\n",
        node.tasklist.len()
    ));
    for item in &node.tasklist {
        let checkbox = if item.completed { "[x]" } else { "[ ]" };
        let linked = item
            .linked_ref
            .as_ref()
            .map(|r| format!(" → {}", key_ref(&r.key(), focus)))
            .unwrap_or_default();
        out.push_str(&format!(
            "    {checkbox} {}{linked}\n",
            truncate_chars(&item.text, TASK_TEXT_CHARS)
        ));
    }
}

fn write_hierarchy(out: &mut String, edges: &[GraphEdge], focus: &NodeKey) {
    section(out, "SUB-ISSUES (parent → child)");
    let mut any = false;
    for edge in edges.iter().filter(|e| e.relation == Relation::Parent) {
        any = true;
        out.push_str(&format!(
            "{} → {}\n",
            key_ref(&edge.from, focus),
            key_ref(&edge.to, focus)
        ));
    }
    if !any {
        out.push_str("(none)\n");
    }
}

fn write_cross_references(out: &mut String, graph: &IssueGraph) {
    section(out, "CROSS-REFERENCES (mentioned/referenced)");
    let mut any = false;
    for edge in graph.edges.iter().filter(|e| e.relation == Relation::Related) {
        any = true;
        let from = key_ref(&edge.from, &graph.focus);
        let to = key_ref(&edge.to, &graph.focus);
        match graph.node(&edge.from) {
            Some(node) if node.node_type == NodeType::PullRequest => {
                let status = node.state_reason.as_deref().unwrap_or(&node.state);
                out.push_str(&format!("{from} ({}) ↔ {to}\n", status.to_uppercase()));
            }
            _ => {
                out.push_str(&format!("{from} ↔ {to}\n"));
            }
        }
    }
    if !any {
        out.push_str("(none)\n");
    }
}

/// Render the graph: summary, focus project boards, legend, nodes (with preview, status and tasklist), hierarchy and
/// cross-reference sections, verbose crawl statistics and the node count trailer.
#[must_use]
pub fn format_graph_output(graph: &IssueGraph) -> String {
    let mut out = String::new();
    out.push_str("GRAPH SUMMARY\n");
    out.push_str("=============\n");
    out.push_str(&graph.summary);
    if !graph.summary.ends_with('\n') {
        out.push('\n');
    }
    if !graph.focus_projects.is_empty() {
        let projects: Vec<String> = graph.focus_projects.iter().map(|p| p.display()).collect();
        out.push_str(&format!("Projects: {}\n", projects.join(", ")));
    }
    out.push_str(&format!("\n{LEGEND}\n\n"));

    for node in &graph.nodes {
        write_node(&mut out, node, &graph.focus);
    }

    write_hierarchy(&mut out, &graph.edges, &graph.focus);
    write_cross_references(&mut out, graph);

    if let Some(stats) = &graph.crawl_summary {
        out.push('\n');
        out.push_str(stats);
    }

    out.push_str(&format!("\nNODES ({} total)\n", graph.nodes.len()));
    out
}
