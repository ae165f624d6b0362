//! Resolution of the `paths` option into per-chunk content file lists.

use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::config::EntryPathSpec;
use crate::error::{PurifyError, Result};

/// Key applied to chunks that have no entry of their own.
pub const WILDCARD: &str = "*";

/// Normalized `paths` option: chunk name (or [`WILDCARD`]) to ordered path list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedEntryPaths {
    by_chunk: IndexMap<String, Vec<String>>,
}

/// Normalize the user supplied `paths` option.
///
/// A per-chunk mapping is kept as is, a flat list is registered under [`WILDCARD`].
pub fn entry_paths(spec: &EntryPathSpec) -> ResolvedEntryPaths {
    let by_chunk = match spec {
        EntryPathSpec::List(paths) => {
            IndexMap::from([(WILDCARD.to_string(), paths.as_slice().to_vec())])
        }
        EntryPathSpec::PerChunk(map) => map
            .iter()
            .map(|(name, paths)| (name.clone(), paths.as_slice().to_vec()))
            .collect(),
    };

    ResolvedEntryPaths { by_chunk }
}

impl ResolvedEntryPaths {
    /// Every distinct path across all chunk keys, in first-seen order.
    pub fn flatten(&self) -> Vec<String> {
        let seen: IndexSet<&str> = self
            .by_chunk
            .values()
            .flatten()
            .map(String::as_str)
            .collect();

        seen.into_iter().map(str::to_string).collect()
    }

    /// Paths registered for `chunk_name`, falling back to the wildcard list, then to nothing.
    pub fn entries(&self, chunk_name: Option<&str>) -> &[String] {
        chunk_name
            .and_then(|name| self.by_chunk.get(name))
            .or_else(|| self.by_chunk.get(WILDCARD))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Fail on the first configured path that does not exist on disk.
    pub fn verify_exist(&self) -> Result<()> {
        for path in self.flatten() {
            if !Path::new(&path).exists() {
                return Err(PurifyError::PathNotFound(path.into()));
            }
            debug!(path = %path, "content path exists");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathList;
    use serde_json::{Value, json};
    use tempfile::tempdir;

    fn spec(value: Value) -> EntryPathSpec {
        serde_json::from_value(value).expect("valid paths option")
    }

    #[test]
    fn flat_lists_apply_to_every_chunk() {
        let resolved = entry_paths(&spec(json!(["./a", "./b"])));
        let expected = vec!["./a".to_string(), "./b".to_string()];

        assert_eq!(resolved.entries(Some("main")), expected.as_slice());
        assert_eq!(resolved.entries(Some("vendor")), expected.as_slice());
        assert_eq!(resolved.entries(None), expected.as_slice());
    }

    #[test]
    fn per_chunk_lookup_falls_back_to_wildcard() {
        let resolved = entry_paths(&spec(json!({ "main": ["./main"], "*": "./shared" })));

        assert_eq!(resolved.entries(Some("main")), ["./main".to_string()].as_slice());
        assert_eq!(resolved.entries(Some("other")), ["./shared".to_string()].as_slice());
        assert_eq!(resolved.entries(None), ["./shared".to_string()].as_slice());
    }

    #[test]
    fn unmatched_chunks_get_no_entries() {
        let resolved = entry_paths(&spec(json!({ "main": ["./main"] })));

        assert!(resolved.entries(Some("admin")).is_empty());
        assert!(resolved.entries(None).is_empty());
    }

    #[test]
    fn flatten_dedups_in_first_seen_order() {
        let resolved = entry_paths(&spec(json!({
            "a": ["./x", "./y"],
            "b": ["./y", "./z", "./x"]
        })));
        assert_eq!(resolved.flatten(), vec!["./x", "./y", "./z"]);

        let reordered = entry_paths(&spec(json!({
            "b": ["./y", "./z", "./x"],
            "a": ["./x", "./y"]
        })));
        let mut left = resolved.flatten();
        let mut right = reordered.flatten();
        left.sort();
        right.sort();
        assert_eq!(left, right);
    }

    #[test]
    fn verify_exist_names_missing_path() {
        let temp = tempdir().expect("failed to create temp dir");
        let present = temp.path().join("present");
        std::fs::create_dir_all(&present).unwrap();
        let missing = temp.path().join("missing");

        let resolved = entry_paths(&EntryPathSpec::List(PathList(vec![
            present.display().to_string(),
            missing.display().to_string(),
        ])));

        let err = resolved.verify_exist().unwrap_err();
        assert!(matches!(err, PurifyError::PathNotFound(ref path) if path == &missing));
        assert_eq!(
            err.to_string(),
            format!("Path {} does not exist.", missing.display())
        );
    }

    #[test]
    fn verify_exist_accepts_empty_configuration() {
        let resolved = entry_paths(&EntryPathSpec::List(PathList::default()));
        assert!(resolved.verify_exist().is_ok());
    }
}
