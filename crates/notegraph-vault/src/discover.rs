//! File enumeration under a vault root.

use std::path::{Path, PathBuf};

use notegraph_core::{NotegraphError, Result, VaultConfig};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Relative paths of every note, media and canvas file under `root`,
/// sorted.
///
/// Hidden files and directories (leading `.`) are skipped. With
/// `include_subdirs` set, only files whose parent directory is exactly one
/// of the listed directories are kept, plus root-level files when
/// `include_root` is on.
///
/// # Errors
///
/// Returns [`NotegraphError::Io`] if `root` is not a readable directory.
/// Unreadable entries below the root are logged and skipped.
pub fn discover(root: &Path, config: &VaultConfig) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(NotegraphError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("vault directory not found: {}", root.display()),
        )));
    }

    let subdirs: Vec<String> = config
        .include_subdirs
        .iter()
        .map(|dir| dir.replace('\\', "/").trim_matches('/').to_string())
        .collect();

    let mut paths = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable vault entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel_path) = entry.path().strip_prefix(root) else {
            continue;
        };
        if config.classify(rel_path).is_none() || !parent_included(rel_path, &subdirs, config) {
            continue;
        }
        paths.push(rel_path.to_path_buf());
    }
    paths.sort();
    debug!(root = %root.display(), files = paths.len(), "discovered vault files");
    Ok(paths)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

fn parent_included(rel_path: &Path, subdirs: &[String], config: &VaultConfig) -> bool {
    let parent = rel_path
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();
    if parent.is_empty() {
        return config.include_root;
    }
    subdirs.is_empty() || subdirs.iter().any(|dir| *dir == parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn vault() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for sub in ["lipsum", "lipsum/deeper", "media", ".obsidian"] {
            fs::create_dir_all(root.join(sub)).unwrap();
        }
        for file in [
            "Sussudio.md",
            "Board.canvas",
            "lipsum/Isolated note.md",
            "lipsum/deeper/Brevissima.md",
            "media/Egg.jpg",
            ".obsidian/workspace.md",
            ".hidden.md",
            "script.py",
        ] {
            fs::write(root.join(file), "").unwrap();
        }
        dir
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|p| p.to_string_lossy().replace('\\', "/")).collect()
    }

    #[test]
    fn finds_tracked_files_and_skips_hidden() {
        let dir = vault();
        let paths = discover(dir.path(), &VaultConfig::default()).unwrap();
        assert_eq!(
            names(&paths),
            vec![
                "Board.canvas",
                "Sussudio.md",
                "lipsum/Isolated note.md",
                "lipsum/deeper/Brevissima.md",
                "media/Egg.jpg",
            ]
        );
    }

    #[test]
    fn subdirectory_filter_matches_parents_exactly() {
        let dir = vault();
        let config = VaultConfig {
            include_subdirs: vec!["lipsum".to_string()],
            ..VaultConfig::default()
        };
        let paths = discover(dir.path(), &config).unwrap();
        assert_eq!(
            names(&paths),
            vec!["Board.canvas", "Sussudio.md", "lipsum/Isolated note.md"]
        );

        let config = VaultConfig {
            include_root: false,
            ..config
        };
        let paths = discover(dir.path(), &config).unwrap();
        assert_eq!(names(&paths), vec!["lipsum/Isolated note.md"]);
    }

    #[test]
    fn root_can_be_excluded_without_subdirs() {
        let dir = vault();
        let config = VaultConfig {
            include_root: false,
            ..VaultConfig::default()
        };
        let paths = discover(dir.path(), &config).unwrap();
        assert_eq!(paths.len(), 3);
        assert!(paths.iter().all(|p| p.parent() != Some(Path::new(""))));
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(&dir.path().join("nope"), &VaultConfig::default()).unwrap_err();
        assert!(matches!(err, NotegraphError::Io(_)));
    }
}
