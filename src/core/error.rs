//! Error types for selective-testing with contextual messages and exit codes
//!
//! Every fatal condition of a run maps onto one category here. Warnings
//! (unattributed changes, unresolvable test-plan entries) are never errors; they
//! go through `tracing` instead.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for selective-testing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, malformed containers)
  User = 1,
  /// System error (git, I/O)
  System = 2,
  /// Validation failure (scheme or test plan unusable)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for selective-testing
#[derive(Debug)]
pub enum SelectError {
  /// A container or manifest could not be parsed
  Parse(ParseError),

  /// Git operation errors
  Git(GitError),

  /// Scheme / test plan errors
  TestPlan(TestPlanError),

  /// Configuration errors
  Config(ConfigError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl SelectError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    SelectError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    SelectError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Shorthand for a parse failure of the container at `path`
  pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
    SelectError::Parse(ParseError {
      path: path.into(),
      reason: reason.into(),
    })
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      SelectError::Message { message, context, help } => SelectError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      SelectError::Io(err) => SelectError::Message {
        message: format!("I/O error: {}", err),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      SelectError::Parse(_) => ExitCode::User,
      SelectError::Git(_) => ExitCode::System,
      SelectError::TestPlan(_) => ExitCode::Validation,
      SelectError::Config(_) => ExitCode::User,
      SelectError::Io(_) => ExitCode::System,
      SelectError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      SelectError::Parse(e) => e.help_message(),
      SelectError::Git(e) => e.help_message(),
      SelectError::TestPlan(e) => e.help_message(),
      SelectError::Config(e) => e.help_message(),
      SelectError::Message { help, .. } => help.clone(),
      SelectError::Io(_) => None,
    }
  }
}

impl fmt::Display for SelectError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SelectError::Parse(e) => write!(f, "{}", e),
      SelectError::Git(e) => write!(f, "{}", e),
      SelectError::TestPlan(e) => write!(f, "{}", e),
      SelectError::Config(e) => write!(f, "{}", e),
      SelectError::Io(e) => write!(f, "I/O error: {}", e),
      SelectError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for SelectError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      SelectError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for SelectError {
  fn from(err: io::Error) -> Self {
    SelectError::Io(err)
  }
}

impl From<String> for SelectError {
  fn from(msg: String) -> Self {
    SelectError::message(msg)
  }
}

impl From<&str> for SelectError {
  fn from(msg: &str) -> Self {
    SelectError::message(msg)
  }
}

impl From<ParseError> for SelectError {
  fn from(err: ParseError) -> Self {
    SelectError::Parse(err)
  }
}

impl From<GitError> for SelectError {
  fn from(err: GitError) -> Self {
    SelectError::Git(err)
  }
}

impl From<TestPlanError> for SelectError {
  fn from(err: TestPlanError) -> Self {
    SelectError::TestPlan(err)
  }
}

impl From<ConfigError> for SelectError {
  fn from(err: ConfigError) -> Self {
    SelectError::Config(err)
  }
}

impl From<serde_json::Error> for SelectError {
  fn from(err: serde_json::Error) -> Self {
    SelectError::message(format!("JSON error: {}", err))
  }
}

impl From<toml_edit::de::Error> for SelectError {
  fn from(err: toml_edit::de::Error) -> Self {
    SelectError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<std::str::Utf8Error> for SelectError {
  fn from(err: std::str::Utf8Error) -> Self {
    SelectError::message(format!("UTF-8 error: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for SelectError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    SelectError::message(format!("UTF-8 conversion error: {}", err))
  }
}

/// A container, manifest or workspace file that could not be read
#[derive(Debug)]
pub struct ParseError {
  pub path: PathBuf,
  pub reason: String,
}

impl ParseError {
  fn help_message(&self) -> Option<String> {
    Some(format!(
      "Fix or exclude the container at {} and run again.",
      self.path.display()
    ))
  }
}

impl fmt::Display for ParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Failed to parse {}: {}", self.path.display(), self.reason)
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// HEAD is detached or unborn, but a branch comparison needs a current branch
  MissingCurrentBranch { base: String },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::RepoNotFound { path } => Some(format!(
        "Run from inside a git repository or pass --path. Looked at: {}",
        path.display()
      )),
      GitError::MissingCurrentBranch { .. } => Some(
        "Check out a branch before comparing against a base branch, or pass --changed-files explicitly.".to_string(),
      ),
      GitError::CommandFailed { .. } => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::MissingCurrentBranch { base } => {
        write!(f, "Cannot compare against '{}': the repository has no current branch", base)
      }
    }
  }
}

/// Scheme and test-plan errors
#[derive(Debug)]
pub enum TestPlanError {
  /// The requested scheme does not exist under the workspace root
  SchemeNotFound { name: String, root: PathBuf },

  /// The scheme embeds its testables inline instead of referencing a test plan
  UnsupportedDocumentMode { scheme: String },

  /// The test plan could not be decoded or lacks required structure
  Malformed { path: PathBuf, reason: String },
}

impl TestPlanError {
  fn help_message(&self) -> Option<String> {
    match self {
      TestPlanError::SchemeNotFound { .. } => {
        Some("Shared schemes live in xcshareddata/xcschemes. Check the scheme name and that it is shared.".to_string())
      }
      TestPlanError::UnsupportedDocumentMode { .. } => Some(
        "Convert the scheme to use a test plan, or pass --test-plan pointing at an existing test plan.".to_string(),
      ),
      TestPlanError::Malformed { .. } => None,
    }
  }
}

impl fmt::Display for TestPlanError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TestPlanError::SchemeNotFound { name, root } => {
        write!(f, "Scheme '{}' not found under {}", name, root.display())
      }
      TestPlanError::UnsupportedDocumentMode { scheme } => {
        write!(
          f,
          "Scheme '{}' declares inline testables; only schemes referencing a test plan can be rewritten",
          scheme
        )
      }
      TestPlanError::Malformed { path, reason } => {
        write!(f, "Malformed test plan {}: {}", path.display(), reason)
      }
    }
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// Configuration file exists but is invalid
  Invalid { path: PathBuf, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::Invalid { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::Invalid { path, reason } => {
        write!(f, "Invalid configuration in {}: {}", path.display(), reason)
      }
    }
  }
}

/// Result type alias for selective-testing
pub type SelectResult<T> = Result<T, SelectError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> SelectResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> SelectResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<SelectError>,
{
  fn context(self, ctx: impl Into<String>) -> SelectResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> SelectResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &SelectError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
