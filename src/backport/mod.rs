//! Backport engine
//!
//! Three-phase pattern:
//! 1. Gather - resolve the requested PRs from the cache or the tracker
//! 2. Plan - create `BackportPlan` (pure, testable)
//! 3. Execute - cherry-pick, push and open the PR (effectful)

mod execute;
mod plan;
mod progress;

pub use execute::{
    BackportReport, PrBackportStatus, backport, create_backport_pr, gather_prs,
};
pub use plan::{
    BackportChecks, BackportPlan, MAX_BRANCH_NUMBERS_LEN, backport_branch_name,
    backport_branch_numbers, backport_labels, build_pull_request, check_merged, compose_body,
    compose_title, create_backport_plan,
};
pub use progress::{NoopProgress, ProgressCallback};
