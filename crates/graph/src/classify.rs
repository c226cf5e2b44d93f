use crate::types::NodeType;

/// Determine the role of a work item. First matching rule wins:
/// pull request, then epic (label, `[Epic]` title tag or issue type), then batch (has
/// sub-issues), then task.
#[must_use]
pub fn classify_node(
    is_pr: bool,
    labels: &[String],
    title: &str,
    issue_type: Option<&str>,
    has_sub_issues: bool,
) -> NodeType {
    if is_pr {
        return NodeType::PullRequest;
    }

    let epic_label = labels
        .iter()
        .any(|label| label.to_lowercase().contains("epic"));
    let epic_title = title.to_lowercase().contains("[epic]");
    let epic_type = issue_type.is_some_and(|t| t.trim().eq_ignore_ascii_case("epic"));
    if epic_label || epic_title || epic_type {
        return NodeType::Epic;
    }

    if has_sub_issues {
        NodeType::Batch
    } else {
        NodeType::Task
    }
}
