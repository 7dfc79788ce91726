//! CLI command implementations

mod backport;
mod context;
mod create_pr;
mod crunch;
mod search;
pub mod style;

pub use backport::run_backport;
pub use context::GlobalOptions;
pub use create_pr::{CreatePrOptions, run_create_backport_pr};
pub use crunch::{CrunchOptions, run_crunch};
pub use search::run_search;

use anstream::eprintln;
use async_trait::async_trait;
use backport_pr::backport::{PrBackportStatus, ProgressCallback};
use backport_pr::types::PullRequest;
use style::{Stylize, check, cross};

/// Progress reporter printing to stderr
pub struct CliProgress;

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_message(&self, message: &str) {
        eprintln!("{}", message.muted());
    }

    async fn on_pr_started(&self, pr: &PullRequest) {
        eprintln!(
            "Cherry-picking {} {} ({} commit(s))",
            format!("#{}", pr.number).accent(),
            pr.title,
            pr.commits.len()
        );
    }

    async fn on_pr_finished(&self, number: u64, status: &PrBackportStatus) {
        match status {
            PrBackportStatus::CherryPickConflict { .. } => {
                eprintln!("  {} #{number}: {}", cross(), status.to_string().error());
            }
            PrBackportStatus::AlreadyApplied => {
                eprintln!("  {} #{number}: {}", check(), status.to_string().muted());
            }
            PrBackportStatus::Success { .. } => {
                eprintln!("  {} #{number}: {status}", check());
            }
        }
    }
}
