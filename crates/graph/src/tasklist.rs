use crate::references::{extract_references, static_regex};
use crate::types::TasklistItem;
use once_cell::sync::Lazy;
use regex::Regex;

// `- [ ] todo`, `* [x] done`, optionally indented
static CHECKBOX: Lazy<Regex> =
    Lazy::new(|| static_regex(r"(?m)^[\t ]*[-*][\t ]+\[([ xX])\][\t ]+(.+?)$"));

/// Extract markdown checklist items (legacy tasklists, not GitHub sub-issues).
///
/// Each item keeps the first issue/PR reference found in its text as `linked_ref`.
#[must_use]
pub fn extract_tasklist_items(
    body: &str,
    default_owner: &str,
    default_repo: &str,
) -> Vec<TasklistItem> {
    CHECKBOX
        .captures_iter(body)
        .filter_map(|caps| {
            let text = caps[2].trim();
            if text.is_empty() {
                return None;
            }
            let linked_ref = extract_references(text, default_owner, default_repo)
                .into_iter()
                .next();
            Some(TasklistItem {
                text: text.to_string(),
                completed: caps[1].eq_ignore_ascii_case("x"),
                linked_ref,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IssueReference;
    use pretty_assertions::assert_eq;

    fn item(text: &str, completed: bool) -> TasklistItem {
        TasklistItem {
            text: text.to_string(),
            completed,
            linked_ref: None,
        }
    }

    #[test]
    fn parses_checked_and_unchecked() {
        assert_eq!(
            extract_tasklist_items("- [ ] a\n- [x] b", "owner", "repo"),
            vec![item("a", false), item("b", true)]
        );
        assert_eq!(
            extract_tasklist_items("- [X] Another completed\r\n* [ ] asterisk", "o", "r"),
            vec![item("Another completed", true), item("asterisk", false)]
        );
    }

    #[test]
    fn accepts_indentation_and_surrounding_text() {
        let body = "## Tasks\n\nSome description here.\n\n  - [ ] First task\n    - [x] Second task\n\nMore text after the list.";
        assert_eq!(
            extract_tasklist_items(body, "owner", "repo"),
            vec![item("First task", false), item("Second task", true)]
        );
    }

    #[test]
    fn links_first_reference() {
        let body = "- [ ] Implement feature #123\n- [x] Fix bug in other/repo#456\n- [ ] Review https://github.com/owner/repo/pull/789";
        let items = extract_tasklist_items(body, "owner", "repo");
        let linked: Vec<Option<IssueReference>> =
            items.into_iter().map(|i| i.linked_ref).collect();
        assert_eq!(
            linked,
            vec![
                Some(IssueReference {
                    owner: "owner".into(),
                    repo: "repo".into(),
                    number: 123,
                    is_parent: false,
                }),
                Some(IssueReference {
                    owner: "other".into(),
                    repo: "repo".into(),
                    number: 456,
                    is_parent: false,
                }),
                Some(IssueReference {
                    owner: "owner".into(),
                    repo: "repo".into(),
                    number: 789,
                    is_parent: false,
                }),
            ]
        );
    }

    #[test]
    fn no_checklist_lines_yields_nothing() {
        assert!(extract_tasklist_items("Just a regular body.", "o", "r").is_empty());
        assert!(extract_tasklist_items("", "o", "r").is_empty());
        assert!(extract_tasklist_items("- [ ]   \n-[x] missing space", "o", "r").is_empty());
    }
}
