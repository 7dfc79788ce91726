//! Candidate selection
//!
//! Two phases, like the backport driver:
//! 1. Gather - fetch the tracker issues linked from cached PRs (effectful)
//! 2. Select - filter the cached PRs down to backport candidates (pure)

use crate::error::{Error, Result};
use crate::tracker::TrackerService;
use crate::types::{PrState, PullRequest, TrackerIssue};
use std::collections::{BTreeSet, HashMap};
use std::hash::BuildHasher;
use tracing::{debug, warn};

/// Filters applied by [`select_candidates`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectOptions {
    /// Don't drop PRs whose tracker issue is already backported
    pub ignore_tracker: bool,
    /// Keep PRs that are not merged
    pub ignore_not_merged: bool,
}

/// Why a cached PR is not a candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    /// PR is open or was closed without merging
    NotMerged(PrState),
    /// A linked tracker issue has a resolved backport to the target branch
    AlreadyBackported {
        /// Tracker issue ID
        issue: String,
    },
}

impl std::fmt::Display for Exclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotMerged(state) => write!(f, "not merged ({state})"),
            Self::AlreadyBackported { issue } => {
                write!(f, "tracker issue {issue} already backported")
            }
        }
    }
}

/// Decide whether `entry` is dropped, and why
pub fn classify<S: BuildHasher>(
    entry: &PullRequest,
    issues: &HashMap<String, TrackerIssue, S>,
    target_branch: &str,
    options: SelectOptions,
) -> Option<Exclusion> {
    if !options.ignore_not_merged && !entry.is_merged() {
        return Some(Exclusion::NotMerged(entry.state));
    }
    if !options.ignore_tracker {
        let backported = entry
            .issues
            .iter()
            .filter_map(|id| issues.get(id))
            .find(|issue| issue.is_backported_to(target_branch));
        if let Some(issue) = backported {
            return Some(Exclusion::AlreadyBackported {
                issue: issue.id.clone(),
            });
        }
    }
    None
}

/// Fail with every requested number that is not in `entries`
pub fn check_requested(entries: &[PullRequest], requested: Option<&[u64]>) -> Result<()> {
    let Some(requested) = requested else {
        return Ok(());
    };
    let cached: BTreeSet<u64> = entries.iter().map(|pr| pr.number).collect();
    let missing: Vec<u64> = requested
        .iter()
        .copied()
        .collect::<BTreeSet<u64>>()
        .difference(&cached)
        .copied()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::UnknownPr(missing))
    }
}

/// Entries whose linked issues have to be looked up on the tracker.
///
/// Only requested entries that pass the merge filter need it, and none do
/// with `ignore_tracker`. Unknown requested numbers fail first.
pub fn tracker_scope<'a>(
    entries: &'a [PullRequest],
    options: SelectOptions,
    requested: Option<&[u64]>,
) -> Result<Vec<&'a PullRequest>> {
    check_requested(entries, requested)?;
    if options.ignore_tracker {
        return Ok(Vec::new());
    }
    Ok(entries
        .iter()
        .filter(|pr| requested.is_none_or(|r| r.contains(&pr.number)))
        .filter(|pr| options.ignore_not_merged || pr.is_merged())
        .filter(|pr| !pr.issues.is_empty())
        .collect())
}

/// PR numbers that still need a backport to `target_branch`, ascending.
///
/// With `requested`, only those PRs are considered and every one of them
/// must be cached; otherwise the error lists all missing numbers.
pub fn select_candidates<S: BuildHasher>(
    entries: &[PullRequest],
    issues: &HashMap<String, TrackerIssue, S>,
    target_branch: &str,
    options: SelectOptions,
    requested: Option<&[u64]>,
) -> Result<Vec<u64>> {
    check_requested(entries, requested)?;
    let wanted: Option<BTreeSet<u64>> = requested.map(|ids| ids.iter().copied().collect());

    let candidates: BTreeSet<u64> = entries
        .iter()
        .filter(|pr| wanted.as_ref().is_none_or(|w| w.contains(&pr.number)))
        .filter(|pr| match classify(pr, issues, target_branch, options) {
            Some(reason) => {
                debug!(number = pr.number, %reason, "excluded");
                false
            }
            None => true,
        })
        .map(|pr| pr.number)
        .collect();

    Ok(candidates.into_iter().collect())
}

/// Fetch every tracker issue linked from `entries`, once each.
///
/// Issues the tracker doesn't know are skipped with a warning.
pub async fn gather_tracker_issues<'a>(
    entries: impl IntoIterator<Item = &'a PullRequest>,
    tracker: &dyn TrackerService,
) -> Result<HashMap<String, TrackerIssue>> {
    let ids: BTreeSet<&str> = entries
        .into_iter()
        .flat_map(|pr| pr.issues.iter().map(String::as_str))
        .collect();

    let mut issues = HashMap::with_capacity(ids.len());
    for id in ids {
        match tracker.fetch_issue(id).await {
            Ok(issue) => {
                issues.insert(id.to_string(), issue);
            }
            Err(Error::NotFound(what)) => {
                warn!(issue = id, %what, "tracker issue not found, skipping");
            }
            Err(e) => return Err(e),
        }
    }
    debug!(count = issues.len(), "gathered tracker issues");
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IssueBackport;

    fn pr(number: u64, state: PrState, issues: &[&str]) -> PullRequest {
        PullRequest {
            number,
            title: format!("PR {number}"),
            body: None,
            merged: state == PrState::Merged,
            state,
            base: "master".to_string(),
            merged_at: None,
            html_url: String::new(),
            labels: vec![],
            issues: issues.iter().map(ToString::to_string).collect(),
            commits: vec![],
        }
    }

    fn backported(id: &str, branch: &str, resolved: bool) -> TrackerIssue {
        TrackerIssue {
            id: id.to_string(),
            subject: "issue".to_string(),
            status: "Pending Backport".to_string(),
            linked_pr: None,
            backports: vec![IssueBackport {
                id: format!("{id}0"),
                branch: branch.to_string(),
                status: if resolved { "Resolved" } else { "New" }.to_string(),
                resolved,
            }],
        }
    }

    #[test]
    fn test_classify_reasons() {
        let issues = HashMap::from([("9".to_string(), backported("9", "pacific", true))]);
        let options = SelectOptions::default();

        assert_eq!(
            classify(&pr(1, PrState::Open, &[]), &issues, "pacific", options),
            Some(Exclusion::NotMerged(PrState::Open))
        );
        assert_eq!(
            classify(&pr(2, PrState::Merged, &["9"]), &issues, "pacific", options),
            Some(Exclusion::AlreadyBackported {
                issue: "9".to_string()
            })
        );
        assert_eq!(classify(&pr(3, PrState::Merged, &["9"]), &issues, "octopus", options), None);
    }

    #[test]
    fn test_unresolved_backport_keeps_candidate() {
        let issues = HashMap::from([("9".to_string(), backported("9", "pacific", false))]);
        let entries = vec![pr(5, PrState::Merged, &["9"])];
        let result =
            select_candidates(&entries, &issues, "pacific", SelectOptions::default(), None).unwrap();
        assert_eq!(result, vec![5]);
    }

    #[test]
    fn test_unknown_issue_does_not_exclude() {
        let issues: HashMap<String, TrackerIssue> = HashMap::new();
        let entries = vec![pr(5, PrState::Merged, &["404"])];
        let result =
            select_candidates(&entries, &issues, "pacific", SelectOptions::default(), None).unwrap();
        assert_eq!(result, vec![5]);
    }

    #[test]
    fn test_tracker_scope_checks_requested_first() {
        let entries = vec![pr(5, PrState::Merged, &["9"])];
        let result = tracker_scope(&entries, SelectOptions::default(), Some(&[42][..]));
        assert!(matches!(result, Err(Error::UnknownPr(missing)) if missing == vec![42]));
    }

    #[test]
    fn test_tracker_scope_only_requested_merged_with_issues() {
        let entries = vec![
            pr(1, PrState::Merged, &["9"]),
            pr(2, PrState::Open, &["10"]),
            pr(3, PrState::Merged, &[]),
            pr(4, PrState::Merged, &["11"]),
        ];
        let numbers = |scope: Vec<&PullRequest>| scope.iter().map(|pr| pr.number).collect::<Vec<_>>();

        let all = tracker_scope(&entries, SelectOptions::default(), None).unwrap();
        assert_eq!(numbers(all), vec![1, 4]);

        let requested = tracker_scope(&entries, SelectOptions::default(), Some(&[2, 4][..])).unwrap();
        assert_eq!(numbers(requested), vec![4]);

        let unmerged = SelectOptions {
            ignore_not_merged: true,
            ..SelectOptions::default()
        };
        let with_open = tracker_scope(&entries, unmerged, Some(&[2, 4][..])).unwrap();
        assert_eq!(numbers(with_open), vec![2, 4]);

        let skip = SelectOptions {
            ignore_tracker: true,
            ..SelectOptions::default()
        };
        assert!(tracker_scope(&entries, skip, None).unwrap().is_empty());
    }

    #[test]
    fn test_requested_duplicates_are_collapsed() {
        let issues: HashMap<String, TrackerIssue> = HashMap::new();
        let entries = vec![pr(5, PrState::Merged, &[]), pr(6, PrState::Merged, &[])];
        let result = select_candidates(
            &entries,
            &issues,
            "pacific",
            SelectOptions::default(),
            Some(&[6, 6][..]),
        )
        .unwrap();
        assert_eq!(result, vec![6]);
    }
}
