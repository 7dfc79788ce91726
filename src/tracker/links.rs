//! Extraction of tracker issue links from PR bodies and commit messages

use crate::error::{Error, Result};
use regex::Regex;
use url::Url;

/// Finds `<tracker>/issues/<id>` links in free text
#[derive(Debug, Clone)]
pub struct IssueLinkMatcher {
    pattern: Regex,
}

impl IssueLinkMatcher {
    /// Build a matcher for the tracker at `tracker_url`.
    ///
    /// The scheme is ignored, so `http://` and `https://` links both match.
    pub fn new(tracker_url: &str) -> Result<Self> {
        let url = Url::parse(tracker_url)
            .map_err(|e| Error::Config(format!("invalid tracker_url '{tracker_url}': {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::Config(format!("tracker_url '{tracker_url}' has no host")))?;
        let path = url.path().trim_end_matches('/');

        let pattern = format!(
            r"https?://{}{}/issues/(\d+)",
            regex::escape(host),
            regex::escape(path)
        );
        let pattern = Regex::new(&pattern)
            .map_err(|e| Error::Internal(format!("bad issue link pattern: {e}")))?;
        Ok(Self { pattern })
    }

    /// Issue IDs linked from any of `texts`, sorted numerically and deduplicated
    pub fn extract<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut ids: Vec<u64> = texts
            .into_iter()
            .flat_map(|text| self.pattern.captures_iter(text))
            .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().map(|id| id.to_string()).collect()
    }
}
