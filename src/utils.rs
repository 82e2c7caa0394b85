//! Utility functions for cross-platform path handling

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` segments and fold `..` into its parent.
///
/// Never touches the filesystem, so it works for paths that no longer exist
/// (deleted files in a changeset) and for synthetic paths in tests.
pub fn normalize_path(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        let popped = matches!(out.components().next_back(), Some(Component::Normal(_))) && out.pop();
        if !popped && !out.has_root() {
          out.push("..");
        }
      }
      other => out.push(other.as_os_str()),
    }
  }
  out
}

/// Join `path` onto `base` unless it is already absolute, then normalize.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    normalize_path(path)
  } else {
    normalize_path(&base.join(path))
  }
}

/// True when `path` lies strictly inside `folder`, compared segment by segment.
///
/// `Lib` contains `Lib/a.swift` but neither `Lib` itself nor `Libraries/a.swift`.
pub fn is_strictly_within(path: &Path, folder: &Path) -> bool {
  path != folder && path.starts_with(folder)
}

/// Number of normal segments in a path; used to rank folder matches.
pub fn segment_count(path: &Path) -> usize {
  path
    .components()
    .filter(|c| matches!(c, Component::Normal(_)))
    .count()
}
