//! Test plan document: raw JSON tree with typed views
//!
//! The raw tree keeps every key the tool does not understand, and typed views
//! are decoded from it on demand. The only write-back is the `enabled` flag of
//! a `testTargets` entry, and it is spliced into the source text: encoding
//! never re-serializes the tree, so everything else stays byte-identical.

use super::spans::{self, ObjectSpan};
use crate::core::error::{ResultExt, SelectResult, TestPlanError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const TEST_TARGETS: &str = "testTargets";
const ENABLED: &str = "enabled";

/// `target` descriptor of a test target entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetReference {
  pub container_path: String,
  pub name: String,
  #[serde(default)]
  pub identifier: Option<String>,
}

/// Typed view of one `testTargets` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestTargetEntry {
  pub target: TargetReference,
  /// Absent means enabled
  #[serde(default)]
  pub enabled: Option<bool>,
  #[serde(default)]
  pub selected_tests: Option<Value>,
  #[serde(default)]
  pub skipped_tests: Option<Value>,
}

impl TestTargetEntry {
  pub fn is_enabled(&self) -> bool {
    self.enabled.unwrap_or(true)
  }
}

/// Typed view of one entry of `configurations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationEntry {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
}

/// A loaded test plan
#[derive(Debug, Clone)]
pub struct TestPlanDocument {
  path: PathBuf,
  source: String,
  raw: Value,
  /// Source spans of the `testTargets` entries, by index
  entries: Vec<Option<ObjectSpan>>,
  /// Requested `enabled` state per entry index
  edits: BTreeMap<usize, bool>,
}

impl TestPlanDocument {
  pub fn load(path: &Path) -> SelectResult<Self> {
    let source =
      std::fs::read_to_string(path).with_context(|| format!("Failed to read test plan {}", path.display()))?;
    Self::parse(path, &source)
  }

  /// Decode `source`; `path` is only used for reporting and writing back.
  pub fn parse(path: &Path, source: &str) -> SelectResult<Self> {
    let malformed = |reason: String| TestPlanError::Malformed {
      path: path.to_path_buf(),
      reason,
    };

    let raw: Value = serde_json::from_str(source).map_err(|e| malformed(e.to_string()))?;
    if !raw.is_object() {
      return Err(malformed("top level is not an object".to_string()).into());
    }
    if let Some(targets) = raw.get(TEST_TARGETS)
      && !targets.is_array()
    {
      return Err(malformed(format!("`{}` is not an array", TEST_TARGETS)).into());
    }

    let entries = spans::test_target_entries(source, TEST_TARGETS).map_err(malformed)?;

    Ok(Self {
      path: path.to_path_buf(),
      source: source.to_string(),
      raw,
      entries,
      edits: BTreeMap::new(),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn version(&self) -> Option<u64> {
    self.raw.get("version").and_then(Value::as_u64)
  }

  pub fn configurations(&self) -> Vec<ConfigurationEntry> {
    self
      .raw
      .get("configurations")
      .and_then(Value::as_array)
      .map(|entries| {
        entries
          .iter()
          .filter_map(|e| serde_json::from_value(e.clone()).ok())
          .collect()
      })
      .unwrap_or_default()
  }

  /// Typed view of every `testTargets` entry, `None` where the entry has no
  /// recognizable target descriptor. Indexes match the raw array.
  pub fn test_targets(&self) -> Vec<Option<TestTargetEntry>> {
    self
      .raw
      .get(TEST_TARGETS)
      .and_then(Value::as_array)
      .map(|entries| {
        entries
          .iter()
          .map(|e| serde_json::from_value(e.clone()).ok())
          .collect()
      })
      .unwrap_or_default()
  }

  /// Set the `enabled` flag of entry `index`.
  ///
  /// An absent flag already means enabled, so enabling never adds the key.
  /// Returns whether the document changed.
  pub fn set_enabled(&mut self, index: usize, enabled: bool) -> bool {
    let Some(Value::Object(entry)) = self
      .raw
      .get_mut(TEST_TARGETS)
      .and_then(Value::as_array_mut)
      .and_then(|entries| entries.get_mut(index))
    else {
      return false;
    };

    let changed = match entry.get_mut(ENABLED) {
      Some(current) => {
        if current.as_bool() == Some(enabled) {
          return false;
        }
        *current = Value::Bool(enabled);
        true
      }
      None if enabled => false,
      None => {
        entry.insert(ENABLED.to_string(), Value::Bool(enabled));
        true
      }
    };
    if changed {
      self.edits.insert(index, enabled);
    }
    changed
  }

  /// The source text with every `enabled` edit spliced in.
  ///
  /// An existing flag has its value replaced. A new flag copies the entry's
  /// own indentation and key separator, and goes in sorted position when the
  /// entry's keys are sorted, otherwise after the last member.
  pub fn encode(&self) -> String {
    let separator = spans::top_level_separator(&self.source).unwrap_or_else(|| " : ".to_string());
    let mut splices: Vec<(std::ops::Range<usize>, String)> = Vec::new();

    for (&index, &enabled) in &self.edits {
      let Some(Some(entry)) = self.entries.get(index) else {
        continue;
      };
      let literal = if enabled { "true" } else { "false" };

      if let Some(member) = entry.member(ENABLED) {
        if &self.source[member.value.clone()] != literal {
          splices.push((member.value.clone(), literal.to_string()));
        }
        continue;
      }
      // Absent already means enabled
      if enabled {
        continue;
      }

      let Some(first) = entry.members.first() else {
        let at = entry.open + 1;
        splices.push((at..at, format!("\"{}\"{}{}", ENABLED, separator, literal)));
        continue;
      };
      let key_separator = first.separator(&self.source);
      let sorted = entry.members.iter().map(|m| m.key.as_str()).is_sorted();
      let next = entry.members.iter().find(|m| m.key.as_str() > ENABLED);

      match next {
        Some(next) if sorted => {
          let leading = &self.source[next.leading.clone()];
          let at = next.key_span.start;
          splices.push((at..at, format!("\"{}\"{}{},{}", ENABLED, key_separator, literal, leading)));
        }
        _ => {
          let last = entry.members.last().unwrap_or(first);
          let leading = &self.source[last.leading.clone()];
          let at = last.value.end;
          splices.push((at..at, format!(",{}\"{}\"{}{}", leading, ENABLED, key_separator, literal)));
        }
      }
    }

    let mut out = self.source.clone();
    splices.sort_by_key(|(range, _)| range.start);
    for (range, text) in splices.into_iter().rev() {
      out.replace_range(range, &text);
    }
    out
  }
}
