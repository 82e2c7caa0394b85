//! Changesets: changed paths with per-file line counts
//!
//! Parsed from `git diff --stat` output, one line per file:
//!
//! ```text
//!  Sources/App/main.swift          | 12 +++++-----
//!  Assets/logo.png                 | Bin 0 -> 1234 bytes
//!  Sources/{Old => New}/File.swift |  4 ++--
//!  3 files changed, 16 insertions(+), 7 deletions(-)
//! ```

use crate::utils::{absolutize, is_strictly_within};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One changed file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChangesetMetadata {
  pub path: PathBuf,
  pub changed_lines: u64,
}

impl ChangesetMetadata {
  pub fn new(path: impl Into<PathBuf>, changed_lines: u64) -> Self {
    Self {
      path: path.into(),
      changed_lines,
    }
  }

  /// Parse one diff-stat line.
  ///
  /// Returns `None` for lines without a pipe-delimited count (summary lines,
  /// blanks). A missing or non-numeric count (binary files) becomes 0.
  pub fn parse_diff_stat_line(line: &str) -> Option<Self> {
    let (path, stat) = line.rsplit_once('|')?;
    let path = path.trim();
    if path.is_empty() {
      return None;
    }

    let changed_lines = stat
      .split_whitespace()
      .next()
      .and_then(|n| n.parse::<u64>().ok())
      .unwrap_or(0);

    Some(Self::new(resolve_rename(path), changed_lines))
  }
}

/// Resolve git's rename notation to the destination path.
///
/// `a.swift => b.swift` becomes `b.swift`; `Sources/{Old => New}/F.swift`
/// becomes `Sources/New/F.swift`.
fn resolve_rename(path: &str) -> String {
  if let (Some(open), Some(close)) = (path.find('{'), path.rfind('}'))
    && open < close
    && let Some((_, to)) = path[open + 1..close].split_once(" => ")
  {
    let joined = format!("{}{}{}", &path[..open], to, &path[close + 1..]);
    return joined.replace("//", "/");
  }

  match path.split_once(" => ") {
    Some((_, to)) => to.trim().to_string(),
    None => path.to_string(),
  }
}

/// A set of changed files, deduplicated by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
  files: BTreeMap<PathBuf, ChangesetMetadata>,
}

impl Changeset {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse full `git diff --stat` output.
  pub fn from_diff_stat(output: &str) -> Self {
    output
      .lines()
      .filter_map(ChangesetMetadata::parse_diff_stat_line)
      .collect()
  }

  /// Build from an explicit file list; line counts are unknown and recorded as 0.
  pub fn from_paths<I, P>(paths: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    paths.into_iter().map(|p| ChangesetMetadata::new(p, 0)).collect()
  }

  /// Insert a change. A path seen twice keeps the larger line count.
  pub fn insert(&mut self, change: ChangesetMetadata) {
    match self.files.get_mut(&change.path) {
      Some(existing) => existing.changed_lines = existing.changed_lines.max(change.changed_lines),
      None => {
        self.files.insert(change.path.clone(), change);
      }
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = &ChangesetMetadata> {
    self.files.values()
  }

  pub fn paths(&self) -> impl Iterator<Item = &Path> {
    self.files.keys().map(PathBuf::as_path)
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }

  /// Rebase every relative path onto `base`.
  pub fn absolutize(self, base: &Path) -> Self {
    self
      .files
      .into_values()
      .map(|c| ChangesetMetadata::new(absolutize(base, &c.path), c.changed_lines))
      .collect()
  }

  /// Drop changes lying inside any of the excluded folders.
  pub fn without_excluded(self, excluded: &[PathBuf]) -> Self {
    self
      .files
      .into_values()
      .filter(|c| {
        let skip = excluded.iter().any(|folder| is_strictly_within(&c.path, folder));
        if skip {
          tracing::debug!(path = %c.path.display(), "Ignoring change in excluded folder");
        }
        !skip
      })
      .collect()
  }
}

impl FromIterator<ChangesetMetadata> for Changeset {
  fn from_iter<T: IntoIterator<Item = ChangesetMetadata>>(iter: T) -> Self {
    let mut changeset = Changeset::new();
    for change in iter {
      changeset.insert(change);
    }
    changeset
  }
}
