use crate::crawler::GraphCrawler;
use crate::format::format_node_ref;
use crate::types::{FocusSource, GraphEdge, NodeType, Relation};

impl GraphCrawler {
    /// Natural-language header for the rendered graph.
    ///
    /// `requested` is the node type the caller asked to focus on, if any.
    pub(crate) fn generate_summary(
        &self,
        edges: &[GraphEdge],
        requested: Option<NodeType>,
    ) -> String {
        let Some(focus_node) = self.nodes.get(&self.focus) else {
            return "Unable to fetch the requested issue or pull request.\n".to_string();
        };
        let focus = &self.focus;
        let short = |owner: &str, repo: &str, number: u64| {
            format_node_ref(owner, repo, number, &focus.owner, &focus.repo)
        };

        let mut out = String::new();
        let focus_ref = format_node_ref(
            &focus.owner,
            &focus.repo,
            focus.number,
            &self.original.owner,
            &self.original.repo,
        );
        out.push_str(&format!(
            "Focus: {focus_ref} ({}) \"{}\"\n",
            focus_node.node_type, focus_node.title
        ));
        out.push_str(&format!("State: {}\n", focus_node.display_state()));

        let original_ref = short(&self.original.owner, &self.original.repo, self.original.number);
        match self.focus_source {
            FocusSource::Ancestor => {
                out.push_str(&format!(
                    "Focus shifted: from {original_ref} via sub-issue hierarchy\n"
                ));
            }
            FocusSource::CrossRefAncestor => {
                out.push_str(&format!(
                    "Focus shifted: from {original_ref} via cross-reference (found closest matching {} - verify this is the correct parent)\n",
                    focus_node.node_type
                ));
            }
            FocusSource::Itself | FocusSource::NotFound => {
                if let Some(wanted) = requested.filter(|t| *t != focus_node.node_type) {
                    out.push_str(&format!(
                        "No {wanted} found: searched hierarchy and cross-references from {original_ref}\n"
                    ));
                    out.push_str("Suggestions:\n");
                    out.push_str(&format!(
                        "  1. Provide a link: if you know the {wanted}, share owner/repo#number\n"
                    ));
                    out.push_str(&format!(
                        "  2. Add a link: reference the {wanted} in the issue body using 'Part of owner/repo#N'\n"
                    ));
                    out.push_str(&format!(
                        "  3. Create one: open a tracking {wanted} issue and add this item as a sub-issue\n"
                    ));
                }
            }
        }

        let ancestors: Vec<String> = self
            .ancestors(focus)
            .iter()
            .rev()
            .filter_map(|key| self.nodes.get(key))
            .map(|node| {
                let node_ref = short(&node.owner, &node.repo, node.number);
                format!("{node_ref} ({})", node.node_type)
            })
            .collect();
        if !ancestors.is_empty() {
            out.push_str(&format!(
                "Hierarchy: {} → #{} ({})\n",
                ancestors.join(" → "),
                focus.number,
                focus_node.node_type
            ));
        }

        let children = edges
            .iter()
            .filter(|e| e.relation == Relation::Parent && e.from == *focus)
            .count();
        if children > 0 {
            out.push_str(&format!("Direct children: {children}\n"));
        }

        if let Some(parent) = self.parent_map.get(focus) {
            let siblings = self
                .parent_map
                .iter()
                .filter(|(child, p)| {
                    *p == parent && *child != focus && self.nodes.contains_key(*child)
                })
                .count();
            if siblings > 0 {
                out.push_str(&format!("Siblings (same parent): {siblings}\n"));
            }
        }

        out.push('\n');

        let count = |t: NodeType| self.nodes.values().filter(|n| n.node_type == t).count();
        let parts: Vec<String> = [
            (count(NodeType::Epic), "epic(s)"),
            (count(NodeType::Batch), "batch issue(s)"),
            (count(NodeType::Task), "task(s)"),
            (count(NodeType::PullRequest), "PR(s)"),
        ]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, label)| format!("{n} {label}"))
        .collect();
        out.push_str(&format!(
            "Graph contains {} nodes: {}\n",
            self.nodes.len(),
            parts.join(", ")
        ));
        out
    }
}
