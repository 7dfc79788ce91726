//! backport-pr: find merged pull requests that still need a backport
//!
//! Fetches PRs merged into a source branch, cross-references their tracker
//! issues, and drives the cherry-picks and the backport PR for a release
//! branch.
//!
//! # Architecture
//!
//! - [`cache`] - local JSON snapshot of fetched PRs, one per target branch
//! - [`tracker`] - GitHub and Redmine clients behind [`tracker::TrackerService`]
//! - [`select`] - candidate filtering over a cached snapshot
//! - [`backport`] - cherry-pick and PR creation via [`repo::RepoOps`]
//! - [`repo`] - git operations
//! - [`config`] / [`auth`] - settings and GitHub credentials

pub mod auth;
pub mod backport;
pub mod cache;
pub mod config;
pub mod error;
pub mod repo;
pub mod select;
pub mod tracker;
pub mod types;

pub use error::{Error, Result};
