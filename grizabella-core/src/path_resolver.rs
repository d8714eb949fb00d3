//! Resolves a logical database name or directory to the three substrate
//! locations: a relational file, a vector directory, and a graph directory.

use std::path::{Path, PathBuf};

use crate::error::{GrizabellaError, Result};

/// The relational file, vector directory, and graph directory for a single
/// database instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSet {
    pub root: PathBuf,
    pub relational_file: PathBuf,
    pub vector_dir: PathBuf,
    pub graph_dir: PathBuf,
}

const RELATIONAL_FILE_NAME: &str = "sqlite.db";
const VECTOR_DIR_NAME: &str = "lancedb_data";
const GRAPH_DIR_NAME: &str = "kuzu_data";

/// Resolve `db_name_or_path` to a [`PathSet`], creating the root directory if
/// `create_if_not_exists` is set.
///
/// A name without path separators resolves under a stable per-user base
/// directory; anything containing a separator is used as an explicit
/// instance root.
pub fn resolve(db_name_or_path: &str, create_if_not_exists: bool) -> Result<PathSet> {
    let root = if is_bare_name(db_name_or_path) {
        user_base_dir()?.join(db_name_or_path)
    } else {
        PathBuf::from(db_name_or_path)
    };

    if create_if_not_exists && !root.exists() {
        std::fs::create_dir_all(&root).map_err(|e| {
            GrizabellaError::Configuration(format!(
                "failed to create database root {}: {e}",
                root.display()
            ))
        })?;
    }

    if root.exists() {
        let metadata = std::fs::metadata(&root).map_err(|e| {
            GrizabellaError::Configuration(format!(
                "cannot stat database root {}: {e}",
                root.display()
            ))
        })?;
        if metadata.permissions().readonly() {
            return Err(GrizabellaError::Configuration(format!(
                "database root {} is not writable",
                root.display()
            )));
        }
    }

    Ok(PathSet {
        relational_file: root.join(RELATIONAL_FILE_NAME),
        vector_dir: root.join(VECTOR_DIR_NAME),
        graph_dir: root.join(GRAPH_DIR_NAME),
        root,
    })
}

fn is_bare_name(name: &str) -> bool {
    !name.contains(std::path::MAIN_SEPARATOR) && !name.contains('/')
}

fn user_base_dir() -> Result<PathBuf> {
    directories::ProjectDirs::from("com", "grizabella", "grizabella")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            GrizabellaError::Configuration("could not determine per-user data directory".into())
        })
}

/// Path to the lockfile convention used by the graph adapter's connection
/// pool: a single `.lock` file directly at the root of the graph directory.
pub fn graph_lockfile(graph_dir: &Path) -> PathBuf {
    graph_dir.join(".lock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_is_used_as_instance_root() {
        let tmp = tempfile::tempdir().unwrap();
        let explicit = tmp.path().join("mydb");
        let paths = resolve(explicit.to_str().unwrap(), true).unwrap();
        assert_eq!(paths.root, explicit);
        assert_eq!(paths.relational_file, explicit.join("sqlite.db"));
        assert_eq!(paths.vector_dir, explicit.join("lancedb_data"));
        assert_eq!(paths.graph_dir, explicit.join("kuzu_data"));
    }

    #[test]
    fn bare_name_resolves_under_user_base() {
        let paths = resolve("some_logical_name", false).unwrap();
        assert!(paths.root.ends_with("some_logical_name"));
    }

    #[test]
    fn lockfile_is_a_single_file_at_graph_dir_root() {
        let graph_dir = PathBuf::from("/tmp/griz/kuzu_data");
        assert_eq!(graph_lockfile(&graph_dir), graph_dir.join(".lock"));
    }
}
