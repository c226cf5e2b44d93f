use crate::types::{IssueReference, NodeKey};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;

const OWNER: &str = r"[a-zA-Z0-9](?:[a-zA-Z0-9._-]*[a-zA-Z0-9])?";
const REPO: &str = r"[a-zA-Z0-9._-]+";

/// Compile a hard-coded pattern. Every pattern is exercised by the unit tests below.
pub(crate) fn static_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(err) => unreachable!("static regex {pattern:?}: {err}"),
    }
}

/// `fixes #1`, `Closes other/repo#2`, `resolved: https://github.com/o/r/issues/3`
static CLOSING_REF: Lazy<Regex> = Lazy::new(|| {
    static_regex(&format!(
        r"(?i)\b(?:close[sd]?|fix(?:e[sd])?|resolve[sd]?):?\s+(?:https?://(?:www\.)?github\.com/({OWNER})/({REPO})/(?:issues|pull)/(\d+)|(?:({OWNER})/({REPO}))?#(\d+))"
    ))
});

static CROSS_REPO_REF: Lazy<Regex> =
    Lazy::new(|| static_regex(&format!(r"({OWNER})/({REPO})#(\d+)")));

static GITHUB_URL_REF: Lazy<Regex> = Lazy::new(|| {
    static_regex(&format!(
        r"https?://(?:www\.)?github\.com/({OWNER})/({REPO})/(?:issues|pull)/(\d+)"
    ))
});

static SAME_REPO_REF: Lazy<Regex> = Lazy::new(|| static_regex(r"(?:^|[^\w])#(\d+)"));

static FENCED_CODE: Lazy<Regex> = Lazy::new(|| static_regex(r"(?s)```.*?```"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| static_regex(r"`[^`\n]+`"));

/// Remove fenced blocks and inline code so example references are not picked up.
#[must_use]
pub fn strip_code_blocks(text: &str) -> String {
    let without_fences = FENCED_CODE.replace_all(text, "");
    INLINE_CODE.replace_all(&without_fences, "").into_owned()
}

/// Collects references in pass order, skipping keys seen in an earlier pass.
struct ReferenceSet {
    refs: Vec<IssueReference>,
    seen: HashSet<NodeKey>,
}

impl ReferenceSet {
    fn new() -> Self {
        Self {
            refs: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn push(&mut self, owner: &str, repo: &str, number: &str, is_parent: bool) {
        let Ok(number) = number.parse::<u64>() else {
            return;
        };
        if number == 0 {
            return;
        }
        let key = NodeKey::new(owner, repo, number);
        if self.seen.insert(key) {
            self.refs.push(IssueReference {
                owner: owner.to_string(),
                repo: repo.to_string(),
                number,
                is_parent,
            });
        }
    }
}

fn group<'t>(caps: &'t Captures<'_>, idx: usize) -> Option<&'t str> {
    caps.get(idx).map(|m| m.as_str())
}

/// Extract issue/PR references from free text.
///
/// Passes run in a fixed order: closing keywords, `owner/repo#N`, full GitHub URLs, bare `#N`.
/// References without an explicit repository resolve to `default_owner/default_repo`.
#[must_use]
pub fn extract_references(
    text: &str,
    default_owner: &str,
    default_repo: &str,
) -> Vec<IssueReference> {
    let text = strip_code_blocks(text);
    let mut set = ReferenceSet::new();

    for caps in CLOSING_REF.captures_iter(&text) {
        if let (Some(owner), Some(repo), Some(number)) =
            (group(&caps, 1), group(&caps, 2), group(&caps, 3))
        {
            set.push(owner, repo, number, true);
            continue;
        }
        let Some(number) = group(&caps, 6) else {
            continue;
        };
        match (group(&caps, 4), group(&caps, 5)) {
            (Some(owner), Some(repo)) => set.push(owner, repo, number, true),
            _ => set.push(default_owner, default_repo, number, true),
        }
    }

    for caps in CROSS_REPO_REF.captures_iter(&text) {
        set.push(&caps[1], &caps[2], &caps[3], false);
    }

    for caps in GITHUB_URL_REF.captures_iter(&text) {
        set.push(&caps[1], &caps[2], &caps[3], false);
    }

    for caps in SAME_REPO_REF.captures_iter(&text) {
        set.push(default_owner, default_repo, &caps[1], false);
    }

    set.refs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reference(owner: &str, repo: &str, number: u64, is_parent: bool) -> IssueReference {
        IssueReference {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
            is_parent,
        }
    }

    #[test]
    fn closing_keyword_marks_parent() {
        assert_eq!(
            extract_references("This fixes #123", "owner", "repo"),
            vec![reference("owner", "repo", 123, true)]
        );
        assert_eq!(
            extract_references("Resolves #200", "owner", "repo"),
            vec![reference("owner", "repo", 200, true)]
        );
        assert_eq!(
            extract_references("Closed: other/thing#9", "owner", "repo"),
            vec![reference("other", "thing", 9, true)]
        );
    }

    #[test]
    fn closing_keyword_accepts_full_urls() {
        assert_eq!(
            extract_references(
                "fixes https://github.com/acme/api/pull/77",
                "owner",
                "repo"
            ),
            vec![reference("acme", "api", 77, true)]
        );
    }

    #[test]
    fn passes_run_in_fixed_order() {
        assert_eq!(
            extract_references(
                "Fixes #100, see https://github.com/other/repo/issues/200 and other/project#300",
                "owner",
                "repo"
            ),
            vec![
                reference("owner", "repo", 100, true),
                reference("other", "project", 300, false),
                reference("other", "repo", 200, false),
            ]
        );
        assert_eq!(
            extract_references("Closes #1, related to #2 and other/project#3", "owner", "repo"),
            vec![
                reference("owner", "repo", 1, true),
                reference("other", "project", 3, false),
                reference("owner", "repo", 2, false),
            ]
        );
    }

    #[test]
    fn cross_repo_shorthand_and_urls() {
        assert_eq!(
            extract_references("Related to other/repo#456", "owner", "repo"),
            vec![reference("other", "repo", 456, false)]
        );
        assert_eq!(
            extract_references(
                "See https://www.github.com/other/project/pull/456 for the fix",
                "owner",
                "repo"
            ),
            vec![reference("other", "project", 456, false)]
        );
    }

    #[test]
    fn duplicates_collapse_case_insensitively() {
        let refs = extract_references("fixes Other/Repo#5 and other/repo#5 and #5", "o", "r");
        assert_eq!(
            refs,
            vec![
                reference("Other", "Repo", 5, true),
                reference("o", "r", 5, false),
            ]
        );
    }

    #[test]
    fn ignores_code_words_and_zero() {
        let text = "prefix #0 in `see #4`\n```\nfixes #5\n```\nabc#6";
        assert!(extract_references(text, "owner", "repo").is_empty());
        assert!(extract_references("This is just a comment", "owner", "repo").is_empty());
        assert!(extract_references("", "owner", "repo").is_empty());
    }

    #[test]
    fn keyword_needs_word_boundary() {
        assert_eq!(
            extract_references("prefix #3", "owner", "repo"),
            vec![reference("owner", "repo", 3, false)]
        );
    }
}
