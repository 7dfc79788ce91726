//! Persistence for PR snapshots under the user cache directory.

use super::Cache;
use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of cache files
const CACHE_EXT: &str = "json";

/// Suffix of the temporary file written before the atomic rename
const TMP_SUFFIX: &str = ".tmp";

/// Reads and writes [`Cache`] files in a fixed directory.
///
/// The directory is passed in explicitly so tests can point it at a
/// temporary location.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    default_labels: Vec<String>,
}

impl CacheStore {
    /// Create a store rooted at `dir`.
    ///
    /// Snapshots searched with exactly `default_labels` get the plain
    /// `<branch>.json` name; any other label set is encoded in the file name.
    pub fn new(dir: impl Into<PathBuf>, default_labels: &[String]) -> Self {
        let mut default_labels = default_labels.to_vec();
        default_labels.sort();
        Self {
            dir: dir.into(),
            default_labels,
        }
    }

    /// Directory holding the cache files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the cache file for `branch` searched with `labels`.
    pub fn path(&self, branch: &str, labels: &[String]) -> PathBuf {
        let mut labels = labels.to_vec();
        labels.sort();
        let name = if labels == self.default_labels {
            branch.to_string()
        } else {
            format!("{branch}-{}", labels.join(","))
        };
        self.dir.join(format!("{name}.{CACHE_EXT}"))
    }

    /// Load the snapshot for `branch`.
    ///
    /// Returns `Ok(None)` if no snapshot was saved yet.
    pub fn load(&self, branch: &str, labels: &[String]) -> Result<Option<Cache>> {
        let path = self.path(branch, labels);

        if !path.exists() {
            debug!(path = %path.display(), "no cache file");
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Cache(format!("failed to read {}: {e}", path.display())))?;

        let cache: Cache = serde_json::from_str(&content).map_err(|e| {
            Error::Cache(format!(
                "failed to parse {}: {e}. Run 'backport-pr search' to rebuild it",
                path.display()
            ))
        })?;

        debug!(path = %path.display(), prs = cache.prs.len(), "loaded cache");
        Ok(Some(cache))
    }

    /// Save a snapshot, replacing any previous one for the same branch and labels.
    ///
    /// Writes to a temporary file, syncs it and renames it over the target,
    /// so an interrupted save never leaves a truncated cache behind.
    pub fn save(&self, cache: &Cache) -> Result<PathBuf> {
        let path = self.path(&cache.target_branch, &cache.labels);

        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                Error::Cache(format!("failed to create {}: {e}", self.dir.display()))
            })?;
        }

        let content = serde_json::to_string_pretty(cache)
            .map_err(|e| Error::Cache(format!("failed to serialize cache: {e}")))?;

        let mut tmp_name = path.clone().into_os_string();
        tmp_name.push(TMP_SUFFIX);
        let tmp_path = PathBuf::from(tmp_name);

        write_synced(&tmp_path, content.as_bytes())
            .map_err(|e| Error::Cache(format!("failed to write {}: {e}", tmp_path.display())))?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            Error::Cache(format!(
                "failed to move {} to {}: {e}",
                tmp_path.display(),
                path.display()
            ))
        })?;

        debug!(path = %path.display(), prs = cache.prs.len(), "saved cache");
        Ok(path)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PrState, PullRequest};
    use tempfile::TempDir;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn make_pr(number: u64, merged: bool) -> PullRequest {
        PullRequest {
            number,
            title: format!("PR {number}"),
            body: None,
            merged,
            state: if merged { PrState::Merged } else { PrState::Open },
            base: "master".to_string(),
            merged_at: None,
            html_url: format!("https://github.com/ceph/ceph/pull/{number}"),
            labels: vec![],
            issues: vec![],
            commits: vec![],
        }
    }

    fn store(temp: &TempDir) -> CacheStore {
        CacheStore::new(temp.path().join("cache"), &labels(&["orchestrator", "cephadm"]))
    }

    #[test]
    fn test_path_default_labels_is_plain_branch() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let path = store.path("pacific", &labels(&["cephadm", "orchestrator"]));
        assert!(path.ends_with("cache/pacific.json"));
    }

    #[test]
    fn test_path_other_labels_are_encoded() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let path = store.path("pacific", &labels(&["rook", "mgr"]));
        assert!(path.ends_with("cache/pacific-mgr,rook.json"));
    }

    #[test]
    fn test_load_missing_file_returns_none() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        assert!(store.load("pacific", &labels(&["cephadm", "orchestrator"])).unwrap().is_none());
    }

    #[test]
    fn test_save_creates_directory_and_roundtrips() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        assert!(!store.dir().exists());

        let cache = Cache::new(
            "master",
            "pacific",
            labels(&["cephadm", "orchestrator"]),
            vec![make_pr(102, true), make_pr(100, true), make_pr(101, false)],
        );
        store.save(&cache).unwrap();

        let loaded = store
            .load("pacific", &labels(&["cephadm", "orchestrator"]))
            .unwrap()
            .unwrap();
        assert_eq!(loaded, cache);
        assert_eq!(loaded.numbers(), vec![100, 101, 102]);
    }

    #[test]
    fn test_save_overwrites_instead_of_merging() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let default = labels(&["cephadm", "orchestrator"]);

        store
            .save(&Cache::new("master", "pacific", default.clone(), vec![make_pr(1, true), make_pr(2, true)]))
            .unwrap();
        store
            .save(&Cache::new("master", "pacific", default.clone(), vec![make_pr(3, true)]))
            .unwrap();

        let loaded = store.load("pacific", &default).unwrap().unwrap();
        assert_eq!(loaded.numbers(), vec![3]);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let cache = Cache::new("master", "pacific", labels(&["cephadm", "orchestrator"]), vec![]);
        let path = store.save(&cache).unwrap();

        let names: Vec<String> = fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["pacific.json".to_string()]);
        assert!(path.exists());
    }

    #[test]
    fn test_stale_temp_file_does_not_affect_load() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let default = labels(&["cephadm", "orchestrator"]);
        store
            .save(&Cache::new("master", "pacific", default.clone(), vec![make_pr(5, true)]))
            .unwrap();

        // Simulate a crash mid-save
        fs::write(store.dir().join("pacific.json.tmp"), "{\"prs\": [").unwrap();

        let loaded = store.load("pacific", &default).unwrap().unwrap();
        assert_eq!(loaded.numbers(), vec![5]);
    }

    #[test]
    fn test_corrupt_file_is_cache_error() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.dir().join("pacific.json"), "not json").unwrap();

        let err = store
            .load("pacific", &labels(&["cephadm", "orchestrator"]))
            .unwrap_err();
        assert!(matches!(err, Error::Cache(_)));
    }

    #[test]
    fn test_file_exposes_prs_numbers() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let cache = Cache::new(
            "master",
            "pacific",
            labels(&["cephadm", "orchestrator"]),
            vec![make_pr(100, true), make_pr(101, false)],
        );
        let path = store.save(&cache).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        let numbers: Vec<u64> = raw["prs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|pr| pr["number"].as_u64().unwrap())
            .collect();
        assert_eq!(numbers, vec![100, 101]);
        assert_eq!(raw["prs"][0]["merged"], serde_json::Value::Bool(true));
    }
}
