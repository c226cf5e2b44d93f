//! Best-effort status detection for epics and batches.
//!
//! Looks for lines such as `Status: on track` or `ETA: end of March` in the body and in the most
//! recent comments, plus the milestone due date when one is set. Returns nothing when no clear
//! signal is present.

use crate::references::static_regex;
use crate::sanitize::truncate_chars;
use crate::source::Milestone;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

const MAX_MATCHES: usize = 3;
const MAX_PARTS: usize = 2;
const MAX_VALUE_CHARS: usize = 60;

static STATUS_LINE: Lazy<Regex> = Lazy::new(|| {
    static_regex(
        r"(?i)(?:^|\W)(status|on[- ]?track|delayed|at[- ]?risk|blocked|behind|ahead|eta|target|due|deadline)[:\s]+([^\n]{3,80})",
    )
});

fn label_for(keyword: &str) -> Option<&'static str> {
    let keyword = keyword.to_lowercase();
    if keyword == "status" {
        Some("Status")
    } else if keyword.contains("track") {
        Some("On-track")
    } else if keyword.contains("delay") || keyword.contains("behind") {
        Some("Delayed")
    } else if keyword.contains("risk") {
        Some("At-risk")
    } else if keyword.contains("block") {
        Some("Blocked")
    } else if ["eta", "target", "due", "deadline"].contains(&keyword.as_str()) {
        Some("Target")
    } else {
        None
    }
}

fn status_parts(text: &str) -> Vec<String> {
    STATUS_LINE
        .captures_iter(text)
        .take(MAX_MATCHES)
        .filter_map(|caps| {
            let label = label_for(&caps[1])?;
            let value = truncate_chars(caps[2].trim(), MAX_VALUE_CHARS);
            Some(format!("{label}: {value}"))
        })
        .collect()
}

fn join_parts(mut parts: Vec<String>) -> Option<String> {
    parts.truncate(MAX_PARTS);
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

/// Extract up to two status fragments from `text`, joined with `; `.
#[must_use]
pub fn extract_status_update(text: &str) -> Option<String> {
    join_parts(status_parts(text))
}

/// Distance to the milestone due date in whole days, e.g. `Milestone 'Beta' overdue by 3 days`.
#[must_use]
pub fn milestone_status(milestone: &Milestone, now: DateTime<Utc>) -> Option<String> {
    let due = milestone.due_on?;
    let title = milestone.title.trim();
    let name = if title.is_empty() {
        "Milestone".to_string()
    } else {
        format!("Milestone '{title}'")
    };
    if due < now {
        Some(format!("{name} overdue by {} days", (now - due).num_days()))
    } else {
        Some(format!("{name} due in {} days", (due - now).num_days()))
    }
}

/// Combine the body status with the newest comment that carries one.
///
/// The milestone fragment leads the body status and counts toward its two-part limit.
/// `comments` are expected newest first.
#[must_use]
pub fn combine_status(
    body: &str,
    milestone: Option<&Milestone>,
    comments: &[String],
    now: DateTime<Utc>,
) -> Option<String> {
    let mut parts: Vec<String> = milestone
        .and_then(|m| milestone_status(m, now))
        .into_iter()
        .collect();
    parts.extend(status_parts(body));
    let body_status = join_parts(parts);
    let comment_status = comments.iter().find_map(|c| extract_status_update(c));

    match (comment_status, body_status) {
        (Some(comment), Some(body)) if comment != body => Some(format!("{comment} | {body}")),
        (Some(comment), None) => Some(comment),
        (_, body) => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn milestone(title: &str, due_in_hours: i64) -> Milestone {
        Milestone {
            title: title.to_string(),
            due_on: Some(now() + Duration::hours(due_in_hours)),
        }
    }

    #[test]
    fn extracts_known_keywords() {
        assert_eq!(
            extract_status_update("Intro\nStatus: on track for beta\nETA: March 3rd"),
            Some("Status: on track for beta; Target: March 3rd".to_string())
        );
        assert_eq!(
            extract_status_update("We are blocked: waiting on infra review"),
            Some("Blocked: waiting on infra review".to_string())
        );
        assert_eq!(extract_status_update("Nothing to see here"), None);
    }

    #[test]
    fn long_values_are_truncated() {
        let body = format!("Status: {}", "x".repeat(75));
        let status = extract_status_update(&body).unwrap_or_default();
        assert_eq!(status.chars().count(), "Status: ".len() + MAX_VALUE_CHARS);
        assert!(status.ends_with("..."));
    }

    #[test]
    fn newest_comment_status_takes_precedence() {
        let comments = vec![
            "thanks!".to_string(),
            "Delayed: vendor slipped a week".to_string(),
            "Status: green".to_string(),
        ];
        assert_eq!(
            combine_status("Status: on track", None, &comments, now()),
            Some("Delayed: vendor slipped a week | Status: on track".to_string())
        );
        assert_eq!(
            combine_status("", None, &comments, now()),
            Some("Delayed: vendor slipped a week".to_string())
        );
        assert_eq!(
            combine_status("Status: on track", None, &[], now()),
            Some("Status: on track".to_string())
        );
        assert_eq!(combine_status("", None, &[], now()), None);
    }

    #[test]
    fn milestone_distance_is_reported_in_days() {
        assert_eq!(
            milestone_status(&milestone("Beta", 5 * 24 + 12), now()).as_deref(),
            Some("Milestone 'Beta' due in 5 days")
        );
        assert_eq!(
            milestone_status(&milestone("Beta", -(3 * 24 + 12)), now()).as_deref(),
            Some("Milestone 'Beta' overdue by 3 days")
        );
        assert_eq!(
            milestone_status(&milestone("", -(2 * 24 + 1)), now()).as_deref(),
            Some("Milestone overdue by 2 days")
        );
        let undated = Milestone {
            title: "Someday".to_string(),
            due_on: None,
        };
        assert_eq!(milestone_status(&undated, now()), None);
    }

    #[test]
    fn milestone_leads_the_body_status() {
        let beta = milestone("Beta", 10 * 24 + 2);
        assert_eq!(
            combine_status("Status: green\nETA: June", Some(&beta), &[], now()).as_deref(),
            Some("Milestone 'Beta' due in 10 days; Status: green")
        );
        assert_eq!(
            combine_status("", Some(&beta), &["Blocked: on legal".to_string()], now()).as_deref(),
            Some("Blocked: on legal | Milestone 'Beta' due in 10 days")
        );
    }
}
