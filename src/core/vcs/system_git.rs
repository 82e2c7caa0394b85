//! System git backend - zero dependencies
//!
//! Uses git porcelain `diff --stat` for changesets and plumbing for metadata.
//! Every command runs with an isolated environment.

use crate::core::error::{GitError, ResultExt, SelectError, SelectResult};
use crate::graph::Changeset;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Reference substituted when the local diff runs on a detached HEAD
const PSEUDO_REF: &str = "HEAD";

/// Widths large enough that git never abbreviates paths in `--stat` output
const STAT_WIDTH: &str = "--stat=100000,90000";

/// Git backend using system git (zero crate dependencies)
pub struct SystemGit {
  /// Repository working directory
  pub(crate) repo_path: PathBuf,

  /// Working tree root
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// This performs ONE subprocess call to get the repository metadata.
  pub fn open(path: &Path) -> SelectResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(SelectError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(SelectError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    Ok(Self {
      repo_path: path.to_path_buf(),
      work_tree: PathBuf::from(work_tree),
    })
  }

  /// Current branch name, or `None` on a detached or unborn HEAD
  pub fn current_branch(&self) -> SelectResult<Option<String>> {
    let output = self
      .git_cmd()
      .args(["symbolic-ref", "--short", "-q", "HEAD"])
      .output()
      .context("Failed to get current branch")?;

    if !output.status.success() {
      return Ok(None);
    }

    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!branch.is_empty()).then_some(branch))
  }

  /// Changed files with line counts.
  ///
  /// - With `base`: changes on the current branch since it forked from `base`
  ///   (`git diff base...current`). Requires a current branch.
  /// - Without: local uncommitted changes against the current branch, falling
  ///   back to `HEAD` with a warning when detached.
  ///
  /// Paths in the result are absolute (joined onto the working tree).
  pub fn changeset(&self, base: Option<&str>) -> SelectResult<Changeset> {
    let range = match base {
      Some(base) => {
        let current = self
          .current_branch()?
          .ok_or_else(|| GitError::MissingCurrentBranch { base: base.to_string() })?;
        format!("{}...{}", base, current)
      }
      None => match self.current_branch()? {
        Some(current) => current,
        None => {
          tracing::warn!(reference = PSEUDO_REF, "No current branch, diffing local changes against HEAD");
          PSEUDO_REF.to_string()
        }
      },
    };

    let stat = self.diff_stat(&range)?;
    let changeset = Changeset::from_diff_stat(&stat).absolutize(&self.work_tree);
    tracing::debug!(range = %range, files = changeset.len(), "Collected changeset");
    Ok(changeset)
  }

  /// Raw `git diff --stat` output for a revision or range
  fn diff_stat(&self, range: &str) -> SelectResult<String> {
    let output = self
      .git_cmd()
      .args(["diff", "--no-color", STAT_WIDTH, range, "--"])
      .output()
      .context("Failed to run git diff")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(SelectError::Git(GitError::CommandFailed {
        command: format!("git diff --stat {}", range),
        stderr: stderr.to_string(),
      }));
    }

    Ok(String::from_utf8(output.stdout)?)
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables
  /// - Whitelists only PATH and HOME
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);

    // Isolated environment (don't trust global config)
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }

    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII
    cmd.arg("-c").arg("diff.renames=true");

    cmd
  }
}
